//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(any(feature = "engine-ocrs", feature = "engine-tesseract"))]
mod download;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

#[cfg(feature = "engine-vision")]
pub mod vision;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::AppError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_languages: Vec<String>,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new registry with every engine enabled at compile time.
    ///
    /// An engine that fails to come up (missing models, no network) is
    /// skipped with a warning so the session can fall back to the remaining
    /// ones; only an empty registry is an error.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        match ocrs::OcrsEngine::new(config) {
            Ok(engine) => {
                tracing::info!("ocrs engine ready");
                engines.push(Arc::new(engine));
            }
            Err(e) => tracing::warn!("ocrs engine unavailable: {}", e),
        }

        #[cfg(feature = "engine-tesseract")]
        match tesseract::TesseractEngine::new(config) {
            Ok(engine) => {
                tracing::info!("tesseract engine ready");
                engines.push(Arc::new(engine));
            }
            Err(e) => tracing::warn!("tesseract engine unavailable: {}", e),
        }

        #[cfg(feature = "engine-vision")]
        match vision::VisionEngine::new(config) {
            Ok(engine) => {
                tracing::info!("vision engine ready");
                engines.push(Arc::new(engine));
            }
            Err(e) => tracing::warn!("vision engine unavailable: {}", e),
        }

        if engines.is_empty() {
            return Err(AppError::EngineInitialization(
                "No OCR engines available. Build with --features engine-ocrs, engine-tesseract or engine-vision".to_string()
            ));
        }

        let mut default_engine = engines[0].name().to_string();
        if let Some(requested) = &config.default_engine {
            if engines.iter().any(|e| e.name() == requested.as_str()) {
                default_engine = requested.clone();
            } else {
                tracing::warn!(
                    "Requested default engine '{}' is not available, using '{}'",
                    requested,
                    default_engine
                );
            }
        }

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default(&self) -> Option<Arc<dyn OcrEngine>> {
        self.get(&self.default_engine)
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
                supported_languages: e.supported_languages(),
            })
            .collect()
    }
}
