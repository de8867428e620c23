// THEORY:
// The visualizer is a side consumer: it reads the aligned images, the ChangeMap,
// the cleaned mask and the kept regions, and never feeds anything back into the
// decision stages. Five pictures come out:
//
// *   **overlay**: the current image with changed regions tinted red and outlined.
// *   **heatmap**: the ChangeMap through JET, blended half and half with current.
// *   **difference**: the cleaned mask as a black and white picture.
// *   **annotated reference / current**: a box and a `D{n}` label per region,
//     green on the reference and red on the current capture.

use crate::core_modules::colormap;
use crate::core_modules::differencer::ChangeMap;
use crate::core_modules::glyphs;
use crate::core_modules::region::{BoundingBox, Region};
use crate::error::{Error, Result};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::fmt;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

const OVERLAY_TINT: f64 = 0.4;
const HEATMAP_WEIGHT: f64 = 0.5;
const LABEL_GAP: u32 = 3;

/// The five rendered pictures of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Visualizations {
    pub overlay: RgbImage,
    pub heatmap: RgbImage,
    pub difference: RgbImage,
    pub annotated_reference: RgbImage,
    pub annotated_current: RgbImage,
}

impl Visualizations {
    pub fn get(&self, kind: VisualizationKind) -> &RgbImage {
        match kind {
            VisualizationKind::Overlay => &self.overlay,
            VisualizationKind::Heatmap => &self.heatmap,
            VisualizationKind::Difference => &self.difference,
            VisualizationKind::AnnotatedReference => &self.annotated_reference,
            VisualizationKind::AnnotatedCurrent => &self.annotated_current,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualizationKind {
    Overlay,
    Heatmap,
    Difference,
    AnnotatedReference,
    AnnotatedCurrent,
}

impl VisualizationKind {
    pub const ALL: [VisualizationKind; 5] = [
        VisualizationKind::Overlay,
        VisualizationKind::Heatmap,
        VisualizationKind::Difference,
        VisualizationKind::AnnotatedReference,
        VisualizationKind::AnnotatedCurrent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualizationKind::Overlay => "overlay",
            VisualizationKind::Heatmap => "heatmap",
            VisualizationKind::Difference => "difference",
            VisualizationKind::AnnotatedReference => "annotated_reference",
            VisualizationKind::AnnotatedCurrent => "annotated_current",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for VisualizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn blend(base: Rgb<u8>, other: Rgb<u8>, other_weight: f64) -> Rgb<u8> {
    let channel = |i: usize| {
        (base[i] as f64 * (1.0 - other_weight) + other[i] as f64 * other_weight).round() as u8
    };
    Rgb([channel(0), channel(1), channel(2)])
}

/// Region index per pixel, 0 where no kept region lies.
fn label_grid(width: u32, height: u32, regions: &[Region]) -> Vec<usize> {
    let mut labels = vec![0usize; width as usize * height as usize];
    for region in regions {
        for point in &region.pixels {
            labels[point.y as usize * width as usize + point.x as usize] = region.index;
        }
    }
    labels
}

/// Tints region pixels and paints their outline, thickened by one pixel down and right.
pub fn render_overlay(current: &RgbImage, regions: &[Region]) -> RgbImage {
    let (width, height) = current.dimensions();
    let labels = label_grid(width, height, regions);
    let label_at = |x: i64, y: i64| -> usize {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            0
        } else {
            labels[y as usize * width as usize + x as usize]
        }
    };

    let mut overlay = current.clone();
    let mut boundary = Vec::new();
    for region in regions {
        for point in &region.pixels {
            let tinted = blend(*current.get_pixel(point.x, point.y), RED, OVERLAY_TINT);
            overlay.put_pixel(point.x, point.y, tinted);

            let (x, y) = (point.x as i64, point.y as i64);
            let on_edge = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
                .filter(|&(dx, dy)| dx != 0 || dy != 0)
                .any(|(dx, dy)| label_at(x + dx, y + dy) != region.index);
            if on_edge {
                boundary.push(*point);
            }
        }
    }

    for point in boundary {
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let (x, y) = (point.x + dx, point.y + dy);
            if x < width && y < height {
                overlay.put_pixel(x, y, RED);
            }
        }
    }
    overlay
}

pub fn render_heatmap(current: &RgbImage, change_map: &ChangeMap) -> RgbImage {
    RgbImage::from_fn(current.width(), current.height(), |x, y| {
        let heat = colormap::jet(change_map.get_pixel(x, y)[0]);
        blend(*current.get_pixel(x, y), heat, HEATMAP_WEIGHT)
    })
}

pub fn render_difference(mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        let value = mask.get_pixel(x, y)[0];
        Rgb([value, value, value])
    })
}

/// Top-left corner of a label: above the box when there is room, else just inside it.
fn label_origin(bbox: &BoundingBox, text: &str, image_width: u32) -> (i64, i64) {
    let x = bbox.x.min(image_width.saturating_sub(glyphs::text_width(text)));
    let y = if bbox.y >= glyphs::GLYPH_HEIGHT + LABEL_GAP {
        bbox.y - glyphs::GLYPH_HEIGHT - LABEL_GAP
    } else {
        bbox.y + LABEL_GAP
    };
    (x as i64, y as i64)
}

/// Two-pixel box plus `D{n}` label for every region.
pub fn render_annotated(base: &RgbImage, regions: &[Region], color: Rgb<u8>) -> RgbImage {
    let mut annotated = base.clone();
    for region in regions {
        let bbox = region.bounding_box;
        let outer = Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height);
        draw_hollow_rect_mut(&mut annotated, outer, color);
        if bbox.width > 2 && bbox.height > 2 {
            let inner = Rect::at(bbox.x as i32 + 1, bbox.y as i32 + 1)
                .of_size(bbox.width - 2, bbox.height - 2);
            draw_hollow_rect_mut(&mut annotated, inner, color);
        }

        let label = region.label();
        let (x, y) = label_origin(&bbox, &label, annotated.width());
        glyphs::draw_text(&mut annotated, x, y, &label, color);
    }
    annotated
}

/// Renders all five pictures. Every raster must share the aligned dimensions.
pub fn render(
    reference: &RgbImage,
    current: &RgbImage,
    change_map: &ChangeMap,
    mask: &GrayImage,
    regions: &[Region],
) -> Result<Visualizations> {
    let dimensions = current.dimensions();
    if reference.dimensions() != dimensions
        || change_map.dimensions() != dimensions
        || mask.dimensions() != dimensions
    {
        return Err(Error::InternalInvariant(format!(
            "visualizer inputs disagree on size: \
             reference {:?}, current {:?}, change map {:?}, mask {:?}",
            reference.dimensions(),
            dimensions,
            change_map.dimensions(),
            mask.dimensions()
        )));
    }
    if let Some(region) = regions
        .iter()
        .find(|region| !region.bounding_box.fits_within(dimensions.0, dimensions.1))
    {
        return Err(Error::InternalInvariant(format!(
            "region {} lies outside the {}x{} image",
            region.label(),
            dimensions.0,
            dimensions.1
        )));
    }

    Ok(Visualizations {
        overlay: render_overlay(current, regions),
        heatmap: render_heatmap(current, change_map),
        difference: render_difference(mask),
        annotated_reference: render_annotated(reference, regions, GREEN),
        annotated_current: render_annotated(current, regions, RED),
    })
}
