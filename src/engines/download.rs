//! Shared download cache for engine assets (recognition models, tessdata)

use crate::error::AppError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Return the cached path for `filename` under the per-user cache directory,
/// downloading it from `url` on first use
pub fn fetch_cached(url: &str, subdir: &str, filename: &str) -> Result<PathBuf, AppError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ocrshot")
        .join(subdir);

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        AppError::EngineInitialization(format!("Failed to create cache directory: {}", e))
    })?;

    let path = cache_dir.join(filename);

    if !path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &path)?;
        tracing::info!("Downloaded {} to {:?}", filename, path);
    } else {
        tracing::debug!("Using cached {} from {:?}", filename, path);
    }

    Ok(path)
}

/// Download a file from URL to path using ureq.
///
/// Writes to a process-unique temp name first so concurrent processes never
/// see a half-written asset at the final path.
fn download_file(url: &str, path: &Path) -> Result<(), AppError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| AppError::EngineInitialization(format!("Failed to download {}: {}", url, e)))?;

    let tmp_path = path.with_extension(format!("part-{}", std::process::id()));
    let mut file = File::create(&tmp_path)
        .map_err(|e| AppError::EngineInitialization(format!("Failed to create file: {}", e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        AppError::EngineInitialization(format!("Failed to read response body: {}", e))
    })?;

    file.write_all(&buffer)
        .map_err(|e| AppError::EngineInitialization(format!("Failed to write file: {}", e)))?;
    drop(file);

    std::fs::rename(&tmp_path, path)
        .map_err(|e| AppError::EngineInitialization(format!("Failed to move file: {}", e)))?;

    Ok(())
}
