//! ocrs engine implementation
//!
//! Pure Rust local OCR using the ocrs library. No system dependencies;
//! downloads its neural network models automatically on first use.

use crate::config::Config;
use crate::engine::{OcrEngine, ProgressSink, Recognition, RecognizeOptions};
use crate::error::AppError;
use image::RgbaImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;
use std::sync::Arc;

use super::download;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: Arc<OcrsOcrEngine>,
}

impl OcrsEngine {
    /// Create a new engine, downloading models if needed
    pub fn new(_config: &Config) -> Result<Self, AppError> {
        tracing::info!("Initializing ocrs OCR engine...");

        let detection_model_path =
            download::fetch_cached(DETECTION_MODEL_URL, "models", "text-detection.rten")?;
        let recognition_model_path =
            download::fetch_cached(RECOGNITION_MODEL_URL, "models", "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            AppError::EngineInitialization(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            AppError::EngineInitialization(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            AppError::EngineInitialization(format!("Failed to create OCR engine: {}", e))
        })?;

        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust local OCR engine - no system dependencies required"
    }

    fn recognize(
        &self,
        image: &RgbaImage,
        options: &RecognizeOptions,
        progress: ProgressSink<'_>,
    ) -> Result<Recognition, AppError> {
        // ocrs is English-only and segments lines itself, so both the
        // language hint and the layout hint are advisory at best
        if options.language != "eng" {
            tracing::warn!(
                "ocrs only recognizes Latin text, ignoring language hint '{}'",
                options.language
            );
        }

        let rgb_img = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            AppError::Recognition(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| AppError::Recognition(format!("Failed to prepare input: {}", e)))?;
        progress(20);

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| AppError::Recognition(format!("Failed to detect words: {}", e)))?;
        progress(50);

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);
        progress(60);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| AppError::Recognition(format!("Failed to recognize text: {}", e)))?;
        progress(95);

        let text: String = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");
        let text = text.trim().to_string();

        let confidence = estimate_confidence(&text);
        progress(100);

        Ok(Recognition { text, confidence })
    }

    fn supported_languages(&self) -> Vec<String> {
        // ocrs currently only supports English/Latin alphabet
        vec!["eng".to_string()]
    }
}

/// Estimate a confidence score from the recognized text itself.
///
/// ocrs reports no per-character scores, so this looks for the signatures of
/// garbled output: few letters, odd word lengths and long character runs.
fn estimate_confidence(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    if total < 5 {
        // Too short to judge accurately
        return 0.5;
    }

    let letters = text.chars().filter(|c| c.is_alphanumeric()).count();
    let letter_score = ((letters as f32 / total as f32) * 1.25).min(1.0);

    let words: Vec<&str> = text.split_whitespace().collect();
    let avg_len = words.iter().map(|w| w.len()).sum::<usize>() as f32 / words.len().max(1) as f32;
    let word_score = if (2.0..=12.0).contains(&avg_len) { 1.0 } else { 0.4 };

    let mut longest_run = 1usize;
    let mut run = 1usize;
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if Some(c) == prev && !c.is_whitespace() {
            run += 1;
            longest_run = longest_run.max(run);
        } else {
            run = 1;
        }
        prev = Some(c);
    }
    let repetition_score = if longest_run <= 3 {
        1.0
    } else if longest_run <= 6 {
        0.6
    } else {
        0.2
    };

    (0.5 * letter_score + 0.3 * word_score + 0.2 * repetition_score).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(estimate_confidence(""), 0.0);
    }

    #[test]
    fn test_short_text_scores_half() {
        assert_eq!(estimate_confidence("Hi"), 0.5);
    }

    #[test]
    fn test_clean_sentence_scores_high() {
        let confidence = estimate_confidence("The quick brown fox jumps over the lazy dog");
        assert!(confidence > 0.8, "expected > 0.8, got {}", confidence);
    }

    #[test]
    fn test_symbol_soup_scores_low() {
        let confidence = estimate_confidence("#### $$$$ %%%% &&&&");
        assert!(confidence < 0.5, "expected < 0.5, got {}", confidence);
    }

    #[test]
    fn test_character_runs_lower_the_score() {
        let clean = estimate_confidence("Hello World again");
        let garbled = estimate_confidence("Hellooooooooo World again");
        assert!(garbled < clean);
    }
}
