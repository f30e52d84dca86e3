//! PNG interchange helpers.
//!
//! PNG is the encoded format for every raster that crosses a boundary
//! (capture, import, history, stack and preprocess output) so no stage
//! introduces compression artifacts that would degrade recognition.

use crate::error::AppError;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// Encode a raster as PNG
pub fn encode(image: &RgbaImage) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| AppError::ImageEncode(e.to_string()))?;
    Ok(data)
}

/// Decode any supported encoded image into an RGBA raster
pub fn decode(data: &[u8]) -> Result<RgbaImage, AppError> {
    let image = image::load_from_memory(data).map_err(|e| AppError::ImageDecode(e.to_string()))?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_round_trip_is_lossless() {
        let img = RgbaImage::from_fn(17, 9, |x, y| {
            Rgba([x as u8 * 10, y as u8 * 20, 77, 255 - x as u8])
        });

        let encoded = encode(&img).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(AppError::ImageDecode(_))
        ));
    }
}
