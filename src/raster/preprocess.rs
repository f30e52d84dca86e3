use image::{imageops, imageops::FilterType, RgbaImage};
use serde::Deserialize;

/// Perceptual luma weights (ITU-R BT.601)
const LUMA_RED: f64 = 0.299;
const LUMA_GREEN: f64 = 0.587;
const LUMA_BLUE: f64 = 0.114;

/// Pixels with luminance strictly above this become white, the rest black
const BINARIZE_THRESHOLD: f64 = 128.0;

/// Preprocessing configuration chosen in the UI before each run
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
    /// Upscale factor applied before recognition. Must be >= 1.
    pub scale_factor: f32,
    /// Reduce the image to pure black/white via a luminance threshold
    pub binarize: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            scale_factor: 2.0,
            binarize: true,
        }
    }
}

/// Rescale and optionally binarize a raster for recognition.
///
/// Resampling is nearest-neighbor so the edges of small text stay crisp
/// instead of being smoothed away, which helps recognition on low-resolution
/// captures. With `scale_factor` 1 and `binarize` off this is the identity.
///
/// A `scale_factor` below 1 is a caller contract violation and is not
/// validated here.
pub fn preprocess(source: &RgbaImage, options: &PreprocessOptions) -> RgbaImage {
    let mut out = if options.scale_factor == 1.0 {
        source.clone()
    } else {
        let width = (source.width() as f32 * options.scale_factor).round() as u32;
        let height = (source.height() as f32 * options.scale_factor).round() as u32;
        imageops::resize(source, width, height, FilterType::Nearest)
    };

    if options.binarize {
        for pixel in out.pixels_mut() {
            let [r, g, b, _] = pixel.0;
            let luma = LUMA_RED * r as f64 + LUMA_GREEN * g as f64 + LUMA_BLUE * b as f64;
            let value = if luma > BINARIZE_THRESHOLD { 255 } else { 0 };
            pixel.0[0] = value;
            pixel.0[1] = value;
            pixel.0[2] = value;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 25).min(255) as u8,
                (y * 25).min(255) as u8,
                100,
                (200 + x).min(255) as u8,
            ])
        })
    }

    #[test]
    fn test_identity_when_no_scaling_or_binarization() {
        let img = gradient(10, 10);
        let options = PreprocessOptions {
            scale_factor: 1.0,
            binarize: false,
        };

        let result = preprocess(&img, &options);
        assert_eq!(result, img);
    }

    #[test]
    fn test_output_dimensions_are_rounded() {
        let img = gradient(10, 10);
        let options = PreprocessOptions {
            scale_factor: 1.25,
            binarize: false,
        };

        // 10 * 1.25 = 12.5, rounds to 13
        let result = preprocess(&img, &options);
        assert_eq!(result.dimensions(), (13, 13));
    }

    #[test]
    fn test_binarize_produces_pure_black_and_white() {
        let img = gradient(10, 10);
        let options = PreprocessOptions {
            scale_factor: 1.0,
            binarize: true,
        };

        let result = preprocess(&img, &options);
        for pixel in result.pixels() {
            let [r, g, b, _] = pixel.0;
            assert!(r == 0 || r == 255, "expected binary channel, got {}", r);
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
    }

    #[test]
    fn test_binarize_preserves_alpha() {
        let img = gradient(10, 10);
        let options = PreprocessOptions {
            scale_factor: 1.0,
            binarize: true,
        };

        let result = preprocess(&img, &options);
        for (original, processed) in img.pixels().zip(result.pixels()) {
            assert_eq!(original.0[3], processed.0[3]);
        }
    }

    #[test]
    fn test_threshold_boundary() {
        // Luma of a uniform gray (v,v,v) is v; 128 stays black, 129 goes white
        let dark = RgbaImage::from_pixel(4, 4, Rgba([128, 128, 128, 255]));
        let light = RgbaImage::from_pixel(4, 4, Rgba([129, 129, 129, 255]));
        let options = PreprocessOptions {
            scale_factor: 1.0,
            binarize: true,
        };

        assert_eq!(preprocess(&dark, &options).get_pixel(0, 0).0[0], 0);
        assert_eq!(preprocess(&light, &options).get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_scale_and_binarize_scenario() {
        // 10x10 at scale 2 with binarization: 20x20, every channel 0 or 255
        let img = gradient(10, 10);
        let options = PreprocessOptions {
            scale_factor: 2.0,
            binarize: true,
        };

        let result = preprocess(&img, &options);
        assert_eq!(result.dimensions(), (20, 20));
        for pixel in result.pixels() {
            assert!(pixel.0[0] == 0 || pixel.0[0] == 255);
            assert!(pixel.0[1] == 0 || pixel.0[1] == 255);
            assert!(pixel.0[2] == 0 || pixel.0[2] == 255);
        }
    }

    #[test]
    fn test_nearest_neighbor_duplicates_pixels() {
        // Upscaling 1x1 must replicate the single pixel, not blend
        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 40]));
        let options = PreprocessOptions {
            scale_factor: 3.0,
            binarize: false,
        };

        let result = preprocess(&img, &options);
        assert_eq!(result.dimensions(), (3, 3));
        for pixel in result.pixels() {
            assert_eq!(pixel.0, [10, 20, 30, 40]);
        }
    }

    #[test]
    fn test_source_is_not_mutated() {
        let img = gradient(8, 8);
        let copy = img.clone();
        let options = PreprocessOptions::default();

        let _ = preprocess(&img, &options);
        assert_eq!(img, copy);
    }
}
