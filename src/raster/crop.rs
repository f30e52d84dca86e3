use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

/// A sub-rectangle in source-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SelectionArea {
    /// Map an area given in displayed (on-screen) coordinates back to the
    /// image's native pixel coordinates, scaling each axis by
    /// `natural / displayed`.
    ///
    /// Fractional pixels are rounded half-up on every component. Display
    /// layers that scale an image for presentation must convert drag
    /// coordinates through this before cropping.
    pub fn from_display(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        natural: (u32, u32),
        displayed: (u32, u32),
    ) -> Self {
        let scale_x = natural.0 as f32 / displayed.0 as f32;
        let scale_y = natural.1 as f32 / displayed.1 as f32;
        Self {
            x: round_half_up(x * scale_x),
            y: round_half_up(y * scale_y),
            width: round_half_up(width * scale_x),
            height: round_half_up(height * scale_y),
        }
    }

    /// Clamp the area to an image of the given dimensions. Returns `None`
    /// when nothing of the area remains. Callers clamp before [`crop`],
    /// which itself assumes an in-bounds area.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<SelectionArea> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(SelectionArea {
            x: self.x,
            y: self.y,
            width: w,
            height: h,
        })
    }
}

fn round_half_up(value: f32) -> u32 {
    (value + 0.5).floor() as u32
}

/// Extract exactly the pixels of `area` from `source`.
///
/// The area must lie within the source bounds; clamping out-of-range areas
/// is the caller's responsibility.
pub fn crop(source: &RgbaImage, area: &SelectionArea) -> RgbaImage {
    imageops::crop_imm(source, area.x, area.y, area.width, area.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn numbered(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn test_crop_extracts_exact_subgrid() {
        let img = numbered(200, 200);
        let area = SelectionArea {
            x: 50,
            y: 50,
            width: 100,
            height: 100,
        };

        let result = crop(&img, &area);
        assert_eq!(result.dimensions(), (100, 100));
        for y in 0..100 {
            for x in 0..100 {
                assert_eq!(result.get_pixel(x, y), img.get_pixel(x + 50, y + 50));
            }
        }
    }

    #[test]
    fn test_crop_whole_image_is_identity() {
        let img = numbered(20, 15);
        let area = SelectionArea {
            x: 0,
            y: 0,
            width: 20,
            height: 15,
        };

        assert_eq!(crop(&img, &area), img);
    }

    #[test]
    fn test_from_display_scales_back_to_native() {
        // Image shown at half size: display coords double on the way back
        let area = SelectionArea::from_display(10.0, 20.0, 30.0, 40.0, (200, 200), (100, 100));
        assert_eq!(
            area,
            SelectionArea {
                x: 20,
                y: 40,
                width: 60,
                height: 80,
            }
        );
    }

    #[test]
    fn test_from_display_rounds_half_up() {
        // Scale 1.5: 3 * 1.5 = 4.5 which must round up to 5
        let area = SelectionArea::from_display(3.0, 3.0, 1.0, 1.0, (150, 150), (100, 100));
        assert_eq!(area.x, 5);
        assert_eq!(area.y, 5);
        // 1 * 1.5 = 1.5 rounds up to 2
        assert_eq!(area.width, 2);
    }

    #[test]
    fn test_clamp_trims_overhang() {
        let area = SelectionArea {
            x: 80,
            y: 90,
            width: 50,
            height: 50,
        };

        let clamped = area.clamp_to(100, 100).unwrap();
        assert_eq!(clamped.width, 20);
        assert_eq!(clamped.height, 10);
    }

    #[test]
    fn test_clamp_rejects_area_outside_image() {
        let area = SelectionArea {
            x: 120,
            y: 0,
            width: 10,
            height: 10,
        };
        assert!(area.clamp_to(100, 100).is_none());
    }

    #[test]
    fn test_clamp_keeps_in_bounds_area_unchanged() {
        let area = SelectionArea {
            x: 5,
            y: 5,
            width: 10,
            height: 10,
        };
        assert_eq!(area.clamp_to(100, 100), Some(area));
    }
}
