//! Google Vision engine implementation
//!
//! Remote OCR via the Vision `images:annotate` endpoint. Nothing is
//! downloaded or linked locally; recognition needs network access and an API
//! key. The engine constructs without a key so the server can still start,
//! and every failure (missing key, network, auth, API error payload)
//! surfaces as a recognition error carrying the underlying message.

use crate::config::Config;
use crate::engine::{OcrEngine, ProgressSink, Recognition, RecognizeOptions};
use crate::error::AppError;
use crate::raster;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

pub struct VisionEngine {
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    image_context: ImageContext,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
    max_results: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl VisionEngine {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        if config.vision_api_key.is_none() {
            tracing::warn!(
                "Vision engine has no API key configured; recognition will fail until one is provided"
            );
        }
        Ok(Self {
            endpoint: config.vision_endpoint.clone(),
            api_key: config.vision_api_key.clone(),
        })
    }

    fn build_request(&self, png: &[u8], options: &RecognizeOptions) -> AnnotateRequest {
        // Compound hints like "kor+eng" become individual entries
        let language_hints = options
            .language
            .split('+')
            .filter(|hint| !hint.is_empty())
            .map(str::to_string)
            .collect();

        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: BASE64.encode(png),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION".to_string(),
                    max_results: 1,
                }],
                image_context: ImageContext { language_hints },
            }],
        }
    }
}

impl OcrEngine for VisionEngine {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn description(&self) -> &'static str {
        "Google Vision remote OCR - needs network access and an API key"
    }

    fn recognize(
        &self,
        image: &RgbaImage,
        options: &RecognizeOptions,
        progress: ProgressSink<'_>,
    ) -> Result<Recognition, AppError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AppError::Recognition(
                "Vision API key not configured (--vision-api-key or VISION_API_KEY)".to_string(),
            )
        })?;

        // Text is assumed TEXT_DETECTION regardless of the layout hint; the
        // Vision API does its own segmentation
        let png = raster::png::encode(image)?;
        let body = self.build_request(&png, options);
        progress(25);

        let url = format!("{}?key={}", self.endpoint, api_key);
        let mut response = ureq::post(&url)
            .send_json(&body)
            .map_err(|e| AppError::Recognition(format!("Vision API request failed: {}", e)))?;
        progress(75);

        let parsed: AnnotateResponse = response.body_mut().read_json().map_err(|e| {
            AppError::Recognition(format!("Failed to parse Vision API response: {}", e))
        })?;

        let annotated = parsed.responses.into_iter().next().ok_or_else(|| {
            AppError::Recognition("Vision API returned no responses".to_string())
        })?;

        if let Some(error) = annotated.error {
            return Err(AppError::Recognition(format!(
                "Vision API error: {}",
                error.message
            )));
        }
        progress(100);

        let text = annotated
            .text_annotations
            .first()
            .map(|annotation| annotation.description.trim().to_string())
            .unwrap_or_default();

        // The annotation carries no score; a non-empty result counts as a
        // confident read, an empty one as a miss
        let confidence = if text.is_empty() { 0.0 } else { 0.9 };

        Ok(Recognition { text, confidence })
    }

    fn supported_languages(&self) -> Vec<String> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LayoutMode;

    fn engine_with_key() -> VisionEngine {
        VisionEngine {
            endpoint: "http://127.0.0.1:0/annotate".to_string(),
            api_key: Some("test-key".to_string()),
        }
    }

    fn options(language: &str) -> RecognizeOptions {
        RecognizeOptions {
            language: language.to_string(),
            layout: LayoutMode::Auto,
        }
    }

    #[test]
    fn test_request_splits_compound_language_hints() {
        let engine = engine_with_key();
        let request = engine.build_request(b"png-bytes", &options("kor+eng"));

        let hints = &request.requests[0].image_context.language_hints;
        assert_eq!(hints, &["kor".to_string(), "eng".to_string()]);
    }

    #[test]
    fn test_request_carries_base64_image_and_text_detection() {
        let engine = engine_with_key();
        let request = engine.build_request(b"png-bytes", &options("eng"));

        let inner = &request.requests[0];
        assert_eq!(inner.image.content, BASE64.encode(b"png-bytes"));
        assert_eq!(inner.features[0].kind, "TEXT_DETECTION");
    }

    #[test]
    fn test_request_serializes_with_camel_case_keys() {
        let engine = engine_with_key();
        let request = engine.build_request(b"x", &options("eng"));

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"imageContext\""));
        assert!(json.contains("\"languageHints\""));
        assert!(json.contains("\"maxResults\""));
    }

    #[test]
    fn test_response_parsing_extracts_first_annotation() {
        let json = r#"{"responses":[{"textAnnotations":[
            {"description":"  Hello World  "},
            {"description":"Hello"}
        ]}]}"#;

        let parsed: AnnotateResponse = serde_json::from_str(json).unwrap();
        let annotation = &parsed.responses[0].text_annotations[0];
        assert_eq!(annotation.description.trim(), "Hello World");
    }

    #[test]
    fn test_response_parsing_surfaces_api_error() {
        let json = r#"{"responses":[{"error":{"message":"invalid api key"}}]}"#;

        let parsed: AnnotateResponse = serde_json::from_str(json).unwrap();
        let error = parsed.responses[0].error.as_ref().unwrap();
        assert_eq!(error.message, "invalid api key");
    }

    #[test]
    fn test_recognize_without_key_fails_with_recognition_error() {
        let engine = VisionEngine {
            endpoint: "http://127.0.0.1:0/annotate".to_string(),
            api_key: None,
        };
        let image = RgbaImage::new(4, 4);

        let result = engine.recognize(&image, &options("eng"), &|_| {});
        match result {
            Err(AppError::Recognition(message)) => {
                assert!(message.contains("API key"), "unexpected message: {}", message)
            }
            other => panic!("expected Recognition error, got {:?}", other),
        }
    }
}
