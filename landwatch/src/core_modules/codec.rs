// THEORY:
// The codec is the only place raw bytes become rasters and back. Inputs arrive as
// whatever the client uploaded (PNG, JPEG, ...), so decoding guesses the format and
// always normalizes to 8-bit RGB. Outputs are JPEG for visualizations and PNG where
// a lossless copy matters.

use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::path::Path;

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Decodes an uploaded buffer. `role` names the input in the error ("reference", "current").
pub fn decode(role: &'static str, bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes).map_err(|e| Error::Decode {
        role,
        reason: e.to_string(),
    })?;
    Ok(image.to_rgb8())
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(buffer)
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new(&mut buffer);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(buffer)
}

pub fn save_jpeg(path: impl AsRef<Path>, image: &RgbImage, quality: u8) -> Result<()> {
    let bytes = encode_jpeg(image, quality)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
