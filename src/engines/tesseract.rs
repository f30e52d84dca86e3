//! Tesseract engine implementation
//!
//! Statically linked Tesseract (no system dependencies). Heavier to build
//! than the pure Rust engine, but supports many languages and an explicit
//! page segmentation mode, which maps directly onto the layout hint.
//! Downloads tessdata (training data) per language on first use.

use crate::config::Config;
use crate::engine::{LayoutMode, OcrEngine, ProgressSink, Recognition, RecognizeOptions};
use crate::error::AppError;
use image::RgbaImage;
use std::io::Cursor;
use tesseract_static::tesseract::Tesseract;

use super::download;

/// Tesseract OCR engine
pub struct TesseractEngine {
    /// Path to the tessdata directory
    tessdata_path: String,
    /// Language used when a request carries no hint
    default_language: String,
}

impl TesseractEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let default_language = config.default_language.clone();

        // Ensure tessdata for the default language is available
        let tessdata_path = ensure_tessdata(&default_language)?;

        // Validate that tessdata is usable with a test initialization
        let probe = Tesseract::new(Some(&tessdata_path), Some(&default_language)).map_err(|e| {
            AppError::EngineInitialization(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(probe);

        tracing::info!(
            "Tesseract engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            default_language
        );

        Ok(Self {
            tessdata_path,
            default_language,
        })
    }
}

/// Tesseract page segmentation mode for a layout hint
fn page_seg_mode(layout: LayoutMode) -> &'static str {
    match layout {
        LayoutMode::Auto => "3",
        LayoutMode::SingleBlock => "6",
        LayoutMode::SingleLine => "7",
        LayoutMode::SingleWord => "8",
        LayoutMode::SparseText => "11",
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - multi-language, supports layout hints"
    }

    fn recognize(
        &self,
        image: &RgbaImage,
        options: &RecognizeOptions,
        progress: ProgressSink<'_>,
    ) -> Result<Recognition, AppError> {
        let language = if options.language.is_empty() {
            self.default_language.as_str()
        } else {
            options.language.as_str()
        };

        // Compound hints like "kor+eng" need every pack present
        for lang in language.split('+') {
            ensure_tessdata(lang).map_err(|e| {
                AppError::Recognition(format!("Missing tessdata for '{}': {}", lang, e))
            })?;
        }

        // Convert to BMP in memory (BMP is always supported by leptonica)
        let rgb_img = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| AppError::Recognition(format!("Failed to convert to BMP: {}", e)))?;
        progress(10);

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(language))
            .map_err(|e| AppError::Recognition(format!("Failed to create Tesseract: {}", e)))?;

        tess = tess
            .set_variable("tessedit_pageseg_mode", page_seg_mode(options.layout))
            .map_err(|e| AppError::Recognition(format!("Failed to set layout mode: {}", e)))?;

        tess = tess
            .set_image_from_mem(&bmp_data)
            .map_err(|e| AppError::Recognition(format!("Failed to set image: {}", e)))?;
        progress(30);

        tess = tess
            .recognize()
            .map_err(|e| AppError::Recognition(format!("Failed to recognize text: {}", e)))?;
        progress(90);

        let text = tess
            .get_text()
            .map_err(|e| AppError::Recognition(format!("Failed to get text: {}", e)))?;

        // mean_text_conf is 0-100, convert to 0.0-1.0
        let confidence = tess.mean_text_conf() as f32 / 100.0;
        progress(100);

        Ok(Recognition {
            text: text.trim().to_string(),
            confidence,
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        // Tesseract supports many languages; these are the ones offered in
        // the session UI. Others work if tessdata for them downloads.
        vec![
            "eng".to_string(),
            "kor".to_string(),
            "kor+eng".to_string(),
            "jpn".to_string(),
            "chi_sim".to_string(),
            "deu".to_string(),
            "fra".to_string(),
            "spa".to_string(),
        ]
    }
}

/// Ensure tessdata for a language is cached, returning the directory path
fn ensure_tessdata(language: &str) -> Result<String, AppError> {
    let filename = format!("{}.traineddata", language);
    let path = download::fetch_cached(&tessdata_url(language), "tessdata", &filename)?;

    // Tesseract expects the directory, not the file
    path.parent()
        .and_then(|dir| dir.to_str())
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::EngineInitialization("Invalid tessdata path".to_string()))
}

/// Get the tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_hints_map_to_psm() {
        assert_eq!(page_seg_mode(LayoutMode::Auto), "3");
        assert_eq!(page_seg_mode(LayoutMode::SingleBlock), "6");
        assert_eq!(page_seg_mode(LayoutMode::SingleLine), "7");
        assert_eq!(page_seg_mode(LayoutMode::SingleWord), "8");
        assert_eq!(page_seg_mode(LayoutMode::SparseText), "11");
    }

    #[test]
    fn test_tessdata_url_targets_fast_models() {
        let url = tessdata_url("kor");
        assert!(url.ends_with("/kor.traineddata"));
        assert!(url.contains("tessdata_fast"));
    }
}
