use crate::error::AppError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Advisory progress callback, 0-100. Purely UI feedback; engines call it
/// when they can and callers must not depend on any particular cadence.
pub type ProgressSink<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// How the text in the image is assumed to be arranged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Let the engine segment the page itself
    #[default]
    Auto,
    SingleBlock,
    SingleLine,
    SingleWord,
    SparseText,
}

/// Options for one recognition run
#[derive(Debug, Clone)]
pub struct RecognizeOptions {
    /// Language hint, e.g. "eng" or "kor+eng"
    pub language: String,
    pub layout: LayoutMode,
}

/// Recognition result
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Extracted text, leading/trailing whitespace trimmed
    pub text: String,
    pub confidence: f32,
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g. "ocrs", "tesseract", "vision")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in a raster
    fn recognize(
        &self,
        image: &RgbaImage,
        options: &RecognizeOptions,
        progress: ProgressSink<'_>,
    ) -> Result<Recognition, AppError>;

    /// Get supported language hints
    fn supported_languages(&self) -> Vec<String>;
}
