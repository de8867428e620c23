// THEORY:
// Binary morphology for the cleaned change mask. A mask pixel is "on" at 255 and
// "off" at 0. The structuring element is a set of (dx, dy) offsets around a center.
//
// Border policy:
// - dilation treats everything outside the image as off, so nothing grows in from
//   the frame;
// - erosion treats everything outside the image as on, so regions that touch the
//   frame are not eaten away from the edge.
//
// Both operators iterate over "on" pixels only, which keeps them cheap on the
// sparse masks the change detector produces.

use image::{GrayImage, Luma};

pub const ON: u8 = 255;
pub const OFF: u8 = 0;

/// A 5x5 ellipse as produced by the usual elliptical kernel construction.
const ELLIPSE_5X5: [[bool; 5]; 5] = [
    [false, false, true, false, false],
    [true, true, true, true, true],
    [true, true, true, true, true],
    [true, true, true, true, true],
    [false, false, true, false, false],
];

/// Shape of a structuring element, stored as offsets relative to its center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// The 5x5 elliptical element used to clean change masks.
    pub fn ellipse_5x5() -> Self {
        Self::from_mask(&ELLIPSE_5X5)
    }

    /// Builds an element from an odd-sized square mask centered on its middle cell.
    pub fn from_mask<const N: usize>(mask: &[[bool; N]; N]) -> Self {
        let center = (N / 2) as i32;
        let mut offsets = Vec::new();
        for (row, cells) in mask.iter().enumerate() {
            for (col, &active) in cells.iter().enumerate() {
                if active {
                    offsets.push((col as i32 - center, row as i32 - center));
                }
            }
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

impl Default for StructuringElement {
    fn default() -> Self {
        Self::ellipse_5x5()
    }
}

#[inline]
fn is_on(mask: &GrayImage, x: u32, y: u32) -> bool {
    mask.get_pixel(x, y)[0] != OFF
}

#[inline]
fn shifted(x: u32, y: u32, dx: i32, dy: i32, width: u32, height: u32) -> Option<(u32, u32)> {
    let nx = x as i64 + dx as i64;
    let ny = y as i64 + dy as i64;
    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
        None
    } else {
        Some((nx as u32, ny as u32))
    }
}

/// Every "on" pixel stamps the element around itself.
pub fn dilate(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] == OFF {
            continue;
        }
        for &(dx, dy) in element.offsets() {
            if let Some((nx, ny)) = shifted(x, y, dx, dy, width, height) {
                output.put_pixel(nx, ny, Luma([ON]));
            }
        }
    }
    output
}

/// A pixel stays "on" only if the whole element around it is "on".
pub fn erode(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] == OFF {
            continue;
        }
        let survives = element.offsets().iter().all(|&(dx, dy)| {
            match shifted(x, y, dx, dy, width, height) {
                Some((nx, ny)) => is_on(mask, nx, ny),
                None => true,
            }
        });
        if survives {
            output.put_pixel(x, y, Luma([ON]));
        }
    }
    output
}

/// Dilate then erode: bridges small gaps between nearby fragments.
pub fn close(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    erode(&dilate(mask, element), element)
}

/// Erode then dilate: removes speckle smaller than the element.
pub fn open(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    dilate(&erode(mask, element), element)
}

/// Number of "on" pixels.
pub fn count_on(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] != OFF).count() as u64
}
