// THEORY:
// The `differencer` turns two aligned images into a `ChangeMap`: one scalar per
// pixel saying how different the two captures are at that spot.
//
// Key steps:
// 1.  **Luminance**: both images collapse to a single Rec. 601 luminance channel.
// 2.  **Smoothing**: each luminance grid goes through a separable 5x5 Gaussian
//     (binomial taps 1-4-6-4-1). Single-pixel sensor or compression noise is
//     averaged away before it can be mistaken for change; region-scale
//     differences survive almost untouched.
// 3.  **Absolute difference**: the ChangeMap is `|smooth(ref) - smooth(cur)|`.
//
// Borders are handled with reflect-101 (`dcb|abcd|cba`), so edge pixels are not
// darkened by an implicit zero frame.

use crate::core_modules::pixel::pixel::luminance_grid;
use crate::error::{Error, Result};
use image::{GrayImage, Luma, RgbImage};

/// A W x H grid of per-pixel dissimilarity in [0, 255].
pub type ChangeMap = GrayImage;

/// Binomial approximation of a Gaussian with sigma ~1.1.
const SMOOTHING_TAPS: [u32; 5] = [1, 4, 6, 4, 1];
const SMOOTHING_RADIUS: i64 = 2;
/// Sum of the taps along one axis.
const TAP_SUM: u32 = 16;

/// Maps an out-of-range index back into `0..len` by mirroring without repeating the edge.
fn reflect_101(index: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }
    let mut i = index;
    while i < 0 || i >= len {
        i = if i < 0 { -i } else { 2 * len - 2 - i };
    }
    i as usize
}

/// Applies the 5x5 smoothing kernel to a single-channel grid.
pub fn smooth(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as i64, height as i64);
    let source = gray.as_raw();

    // Horizontal pass keeps full precision (max 255 * 16).
    let mut horizontal = vec![0u32; source.len()];
    for y in 0..h {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = 0u32;
            for (k, tap) in SMOOTHING_TAPS.iter().enumerate() {
                let sx = reflect_101(x + k as i64 - SMOOTHING_RADIUS, w);
                acc += tap * source[row + sx] as u32;
            }
            horizontal[row + x as usize] = acc;
        }
    }

    let norm = TAP_SUM * TAP_SUM;
    let mut output = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for (k, tap) in SMOOTHING_TAPS.iter().enumerate() {
                let sy = reflect_101(y + k as i64 - SMOOTHING_RADIUS, h);
                acc += tap * horizontal[(sy as i64 * w + x) as usize];
            }
            let value = (acc + norm / 2) / norm;
            output.put_pixel(x as u32, y as u32, Luma([value.min(255) as u8]));
        }
    }
    output
}

/// Per-pixel absolute difference of the smoothed luminance grids.
pub fn change_map_from_luma(reference: &GrayImage, current: &GrayImage) -> Result<ChangeMap> {
    if reference.dimensions() != current.dimensions() {
        return Err(Error::InternalInvariant(format!(
            "differencer received {:?} and {:?}; images must be aligned first",
            reference.dimensions(),
            current.dimensions()
        )));
    }

    let reference = smooth(reference);
    let current = smooth(current);
    let (width, height) = reference.dimensions();
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let a = reference.get_pixel(x, y)[0];
        let b = current.get_pixel(x, y)[0];
        Luma([a.abs_diff(b)])
    }))
}

/// Builds the ChangeMap straight from two aligned color images.
pub fn change_map(reference: &RgbImage, current: &RgbImage) -> Result<ChangeMap> {
    change_map_from_luma(&luminance_grid(reference), &luminance_grid(current))
}
