// THEORY:
// The `aligner` is the first stage of the pipeline. Its only job is to put the
// reference map and the current capture on the same pixel grid so that every
// later stage can compare them pixel for pixel.
//
// The reference is authoritative: its width and height define the grid, and the
// current image is resampled onto it. Shrinking uses area averaging so that fine
// texture in a high-resolution capture does not alias into false change. Growing
// uses Catmull-Rom. Both paths are deterministic for fixed inputs.

use crate::error::{Error, Result};
use image::RgbImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Rejects images with no pixels before any stage divides by their area.
pub fn ensure_non_empty(image: &RgbImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::Dimension { width, height });
    }
    Ok(())
}

/// Returns `(reference, current')` where `current'` has the reference's exact size.
pub fn align(reference: RgbImage, current: RgbImage) -> Result<(RgbImage, RgbImage)> {
    ensure_non_empty(&reference)?;
    ensure_non_empty(&current)?;

    let (width, height) = reference.dimensions();
    if current.dimensions() == (width, height) {
        return Ok((reference, current));
    }

    debug!(
        from = ?current.dimensions(),
        to = ?(width, height),
        "resampling current image onto reference grid"
    );

    let resized = if width <= current.width() && height <= current.height() {
        imageops::thumbnail(&current, width, height)
    } else {
        imageops::resize(&current, width, height, FilterType::CatmullRom)
    };

    Ok((reference, resized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn same_size_is_untouched() {
        let reference = RgbImage::from_pixel(8, 6, Rgb([1, 2, 3]));
        let current = RgbImage::from_pixel(8, 6, Rgb([4, 5, 6]));
        let (r, c) = align(reference.clone(), current.clone()).unwrap();
        assert_eq!(r, reference);
        assert_eq!(c, current);
    }

    #[test]
    fn larger_current_is_area_averaged_down() {
        let reference = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let mut current = RgbImage::new(20, 20);
        // A 2x2 checkerboard averages to mid gray.
        for (x, y, pixel) in current.enumerate_pixels_mut() {
            let v = if (x + y) % 2 == 0 { 200 } else { 100 };
            *pixel = Rgb([v, v, v]);
        }
        let (_, aligned) = align(reference, current).unwrap();
        assert_eq!(aligned.dimensions(), (10, 10));
        for pixel in aligned.pixels() {
            assert!((pixel[0] as i32 - 150).abs() <= 1, "got {}", pixel[0]);
        }
    }

    #[test]
    fn smaller_current_is_upsampled() {
        let reference = RgbImage::from_pixel(40, 30, Rgb([0, 0, 0]));
        let current = RgbImage::from_pixel(10, 10, Rgb([90, 90, 90]));
        let (_, aligned) = align(reference, current).unwrap();
        assert_eq!(aligned.dimensions(), (40, 30));
        assert!(aligned.pixels().all(|p| (p[0] as i32 - 90).abs() <= 1));
    }

    #[test]
    fn resampling_is_deterministic() {
        let reference = RgbImage::from_pixel(33, 17, Rgb([0, 0, 0]));
        let current = RgbImage::from_fn(101, 57, |x, y| {
            Rgb([(x * 3) as u8, (y * 5) as u8, (x ^ y) as u8])
        });
        let (_, first) = align(reference.clone(), current.clone()).unwrap();
        let (_, second) = align(reference, current).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_image_is_a_dimension_error() {
        let reference = RgbImage::new(0, 5);
        let current = RgbImage::from_pixel(5, 5, Rgb([0, 0, 0]));
        assert!(matches!(
            align(reference, current),
            Err(Error::Dimension { width: 0, height: 5 })
        ));
    }
}
