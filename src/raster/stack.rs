use crate::error::AppError;
use image::{imageops, Rgba, RgbaImage};

/// Fewest images a stack may combine
pub const MIN_STACK_INPUTS: usize = 2;

/// Opaque white, filling every canvas area no input covers
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Concatenate rasters top-to-bottom on a white canvas.
///
/// The canvas is as wide as the widest input and as tall as all inputs
/// combined. Each image keeps its size and is centered horizontally; input
/// order determines vertical order, so the same sequence always produces a
/// byte-identical result. Pixels are copied verbatim (no blending).
pub fn stack(images: &[&RgbaImage]) -> Result<RgbaImage, AppError> {
    if images.len() < MIN_STACK_INPUTS {
        return Err(AppError::InsufficientInput {
            selected: images.len(),
            required: MIN_STACK_INPUTS,
        });
    }

    let max_width = images.iter().map(|img| img.width()).max().unwrap_or(0);
    let total_height: u32 = images.iter().map(|img| img.height()).sum();

    let mut canvas = RgbaImage::from_pixel(max_width, total_height, BACKGROUND);

    let mut offset_y = 0i64;
    for img in images {
        let offset_x = ((max_width - img.width()) / 2) as i64;
        imageops::replace(&mut canvas, *img, offset_x, offset_y);
        offset_y += img.height() as i64;
    }

    Ok(canvas)
}
