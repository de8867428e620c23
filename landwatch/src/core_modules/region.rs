// THEORY:
// The `Region` module is the data side of the spatial grouping stage. A `Region`
// is one connected patch of significant change in the cleaned mask: the pixels
// that belong to it, the rectangle that encloses them, and how strongly the
// ChangeMap reacts inside that rectangle.
//
// Like the other data containers in this crate it is "dumb": it carries what the
// extractor measured and nothing more. Classification lives in `classifier`.

use serde::Serialize;

/// A pixel coordinate on the image grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned rectangle in pixel coordinates, `width`/`height` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Smallest box containing both inclusive corners.
    pub fn from_corners(min: Point, max: Point) -> Self {
        Self {
            x: min.x,
            y: min.y,
            width: max.x - min.x + 1,
            height: max.y - min.y + 1,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// True when the box lies fully inside `[0, width) x [0, height)`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }
}

/// One connected patch of significant change.
#[derive(Debug, Clone)]
pub struct Region {
    /// 1-based position in discovery order. Stable for identical inputs.
    pub index: usize,
    /// The rectangle that encloses every pixel of the region.
    pub bounding_box: BoundingBox,
    /// Number of pixels in the connected set, not the bounding box area.
    pub area_pixels: u64,
    /// Mean ChangeMap value over the bounding box window.
    pub mean_intensity: f64,
    /// Every pixel of the connected set, in the order the region was grown.
    pub pixels: Vec<Point>,
}

impl Region {
    /// The public identity of the region, e.g. `D3`.
    pub fn label(&self) -> String {
        format!("D{}", self.index)
    }
}
