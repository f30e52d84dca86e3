//! Screen capture backend
//!
//! Capture source enumeration, capture-by-id and display metadata via xcap.
//! xcap calls run on blocking tasks: on Wayland it talks to the portal
//! through zbus, which spins up its own runtime internally.

pub mod hotkey;

use crate::error::AppError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbaImage;
use serde::Serialize;
use xcap::{Monitor, Window, XCapError};

/// Preview thumbnails fit within this box
const THUMBNAIL_WIDTH: u32 = 300;
const THUMBNAIL_HEIGHT: u32 = 200;

/// An addressable screen or window available for capture
#[derive(Debug, Clone, Serialize)]
pub struct CaptureSource {
    /// "screen:<id>" or "window:<id>", stable for one enumeration
    pub id: String,
    pub name: String,
    /// PNG preview as a data URL
    pub thumbnail: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Per-display metadata, informational only
#[derive(Debug, Clone, Serialize)]
pub struct DisplayInfo {
    pub id: u32,
    pub bounds: Bounds,
    /// xcap exposes no distinct work area; mirrors `bounds`
    pub work_area: Bounds,
    pub scale_factor: f32,
    pub is_primary: bool,
}

/// Enumerate monitors and capturable windows with preview thumbnails
pub async fn enumerate_sources() -> Result<Vec<CaptureSource>, AppError> {
    run_blocking(list_sources).await
}

/// Capture a previously enumerated source by id
pub async fn capture_by_id(id: String) -> Result<RgbaImage, AppError> {
    run_blocking(move || capture_source(&id)).await
}

/// Capture the primary display (hotkey and default capture path)
pub async fn capture_primary() -> Result<RgbaImage, AppError> {
    run_blocking(capture_primary_blocking).await
}

/// Display metadata for every monitor
pub async fn display_info() -> Result<Vec<DisplayInfo>, AppError> {
    run_blocking(list_displays).await
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Capture task failed: {}", e)))?
}

fn list_sources() -> Result<Vec<CaptureSource>, AppError> {
    let mut sources = Vec::new();

    for monitor in Monitor::all().map_err(capture_unavailable)? {
        let id = monitor.id().map_err(capture_unavailable)?;
        let name = monitor.name().map_err(capture_unavailable)?;
        let image = monitor.capture_image().map_err(capture_failed)?;
        sources.push(CaptureSource {
            id: format!("screen:{}", id),
            name,
            thumbnail: thumbnail_data_url(&image)?,
        });
    }

    for window in Window::all().map_err(capture_unavailable)? {
        if window.is_minimized().unwrap_or(true) {
            continue;
        }
        let id = window.id().map_err(capture_unavailable)?;
        let title = window.title().map_err(capture_unavailable)?;
        if title.is_empty() {
            continue;
        }
        // A window can disappear between enumeration and capture; skip it
        // rather than failing the whole listing
        match window.capture_image() {
            Ok(image) => sources.push(CaptureSource {
                id: format!("window:{}", id),
                name: title,
                thumbnail: thumbnail_data_url(&image)?,
            }),
            Err(e) => tracing::debug!("Skipping window '{}': {}", title, e),
        }
    }

    Ok(sources)
}

fn capture_source(id: &str) -> Result<RgbaImage, AppError> {
    match id.split_once(':') {
        Some(("screen", raw)) => {
            let target: u32 = raw
                .parse()
                .map_err(|_| AppError::CaptureSourceNotFound(id.to_string()))?;
            let monitor = Monitor::all()
                .map_err(capture_unavailable)?
                .into_iter()
                .find(|m| m.id().map(|mid| mid == target).unwrap_or(false))
                .ok_or_else(|| AppError::CaptureSourceNotFound(id.to_string()))?;
            monitor.capture_image().map_err(capture_failed)
        }
        Some(("window", raw)) => {
            let target: u32 = raw
                .parse()
                .map_err(|_| AppError::CaptureSourceNotFound(id.to_string()))?;
            let window = Window::all()
                .map_err(capture_unavailable)?
                .into_iter()
                .find(|w| w.id().map(|wid| wid == target).unwrap_or(false))
                .ok_or_else(|| AppError::CaptureSourceNotFound(id.to_string()))?;
            window.capture_image().map_err(capture_failed)
        }
        _ => Err(AppError::CaptureSourceNotFound(id.to_string())),
    }
}

fn capture_primary_blocking() -> Result<RgbaImage, AppError> {
    let monitors = Monitor::all().map_err(capture_unavailable)?;
    let primary = monitors
        .iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or_else(|| monitors.first())
        .ok_or_else(|| AppError::CaptureUnavailable("No monitors detected".to_string()))?;
    primary.capture_image().map_err(capture_failed)
}

fn list_displays() -> Result<Vec<DisplayInfo>, AppError> {
    let mut displays = Vec::new();
    for monitor in Monitor::all().map_err(capture_unavailable)? {
        let bounds = Bounds {
            x: monitor.x().map_err(capture_unavailable)?,
            y: monitor.y().map_err(capture_unavailable)?,
            width: monitor.width().map_err(capture_unavailable)?,
            height: monitor.height().map_err(capture_unavailable)?,
        };
        displays.push(DisplayInfo {
            id: monitor.id().map_err(capture_unavailable)?,
            bounds,
            work_area: bounds,
            scale_factor: monitor.scale_factor().map_err(capture_unavailable)?,
            is_primary: monitor.is_primary().map_err(capture_unavailable)?,
        });
    }
    Ok(displays)
}

fn capture_unavailable(e: XCapError) -> AppError {
    AppError::CaptureUnavailable(e.to_string())
}

fn capture_failed(e: XCapError) -> AppError {
    let message = e.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") {
        AppError::CapturePermissionDenied(message)
    } else {
        AppError::CaptureUnavailable(message)
    }
}

fn thumbnail_data_url(image: &RgbaImage) -> Result<String, AppError> {
    let (width, height) = image.dimensions();
    let scale = (THUMBNAIL_WIDTH as f32 / width as f32)
        .min(THUMBNAIL_HEIGHT as f32 / height as f32)
        .min(1.0);
    let thumb_width = ((width as f32 * scale) as u32).max(1);
    let thumb_height = ((height as f32 * scale) as u32).max(1);

    let thumb = image::imageops::thumbnail(image, thumb_width, thumb_height);
    let png = crate::raster::png::encode(&thumb)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_bogus_source_id_is_not_found() {
        for id in ["", "screen", "screen:abc", "webcam:1"] {
            assert!(matches!(
                capture_source(id),
                Err(AppError::CaptureSourceNotFound(_))
            ));
        }
    }

    #[test]
    fn test_thumbnail_fits_preview_box() {
        let image = RgbaImage::from_pixel(1920, 1080, Rgba([1, 2, 3, 255]));
        let url = thumbnail_data_url(&image).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let encoded = url.trim_start_matches("data:image/png;base64,");
        let png = BASE64.decode(encoded).unwrap();
        let thumb = crate::raster::png::decode(&png).unwrap();
        assert!(thumb.width() <= THUMBNAIL_WIDTH);
        assert!(thumb.height() <= THUMBNAIL_HEIGHT);
    }

    #[test]
    fn test_small_images_are_not_upscaled() {
        let image = RgbaImage::from_pixel(40, 30, Rgba([1, 2, 3, 255]));
        let url = thumbnail_data_url(&image).unwrap();

        let encoded = url.trim_start_matches("data:image/png;base64,");
        let png = BASE64.decode(encoded).unwrap();
        let thumb = crate::raster::png::decode(&png).unwrap();
        assert_eq!(thumb.dimensions(), (40, 30));
    }
}
