// THEORY:
// Heatmaps map a single 0..255 change intensity to a color. JET is built from a
// handful of control points with linear interpolation in between, which is close
// enough to the classic lookup table for a human reading the picture.

use image::Rgb;

#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb<u8>,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self { t, color: Rgb([r, g, b]) }
    }
}

pub const JET_STOPS: &[ColorStop] = &[
    ColorStop::new(0.000, 0, 0, 128),
    ColorStop::new(0.125, 0, 0, 255),
    ColorStop::new(0.375, 0, 255, 255),
    ColorStop::new(0.625, 255, 255, 0),
    ColorStop::new(0.875, 255, 0, 0),
    ColorStop::new(1.000, 128, 0, 0),
];

fn lerp_color(a: Rgb<u8>, b: Rgb<u8>, ratio: f64) -> Rgb<u8> {
    let channel = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * ratio).round() as u8;
    Rgb([channel(0), channel(1), channel(2)])
}

/// Evaluates piecewise-linear `stops` at `t`, clamped to `[0, 1]`. No stops gives black.
pub fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb<u8> {
    let (Some(&first), Some(&last)) = (stops.first(), stops.last()) else {
        return Rgb([0, 0, 0]);
    };
    if t <= first.t {
        return first.color;
    }
    if t >= last.t {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t <= hi.t {
            return lerp_color(lo.color, hi.color, (t - lo.t) / (hi.t - lo.t));
        }
    }
    last.color
}

/// JET color for an 8-bit intensity.
pub fn jet(value: u8) -> Rgb<u8> {
    multi_stop(JET_STOPS, value as f64 / 255.0)
}
