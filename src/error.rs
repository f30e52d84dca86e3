use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Screen capture is not available: {0}")]
    CaptureUnavailable(String),

    #[error("Screen capture permission denied: {0}")]
    CapturePermissionDenied(String),

    #[error("Capture source not found: {0}")]
    CaptureSourceNotFound(String),

    #[error("Not an image file: {0}")]
    InvalidFileType(String),

    #[error("Stacking needs at least {required} images, {selected} selected")]
    InsufficientInput { selected: usize, required: usize },

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("Failed to initialize OCR engine: {0}")]
    EngineInitialization(String),

    #[error("Unknown OCR engine: {0}")]
    UnknownEngine(String),

    #[error("No capture with id {0} in history")]
    HistoryEntryNotFound(u64),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Failed to encode image: {0}")]
    ImageEncode(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::CaptureUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "CAPTURE_UNAVAILABLE")
            }
            AppError::CapturePermissionDenied(_) => {
                (StatusCode::FORBIDDEN, "CAPTURE_PERMISSION_DENIED")
            }
            AppError::CaptureSourceNotFound(_) => {
                (StatusCode::NOT_FOUND, "CAPTURE_SOURCE_NOT_FOUND")
            }
            AppError::InvalidFileType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "INVALID_FILE_TYPE")
            }
            AppError::InsufficientInput { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_INPUT"),
            AppError::Recognition(_) => (StatusCode::BAD_GATEWAY, "RECOGNITION_ERROR"),
            AppError::EngineInitialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_INIT_ERROR")
            }
            AppError::UnknownEngine(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_ENGINE"),
            AppError::HistoryEntryNotFound(_) => (StatusCode::NOT_FOUND, "HISTORY_NOT_FOUND"),
            AppError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            AppError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            AppError::ImageDecode(_) => (StatusCode::BAD_REQUEST, "IMAGE_DECODE_ERROR"),
            AppError::ImageEncode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IMAGE_ENCODE_ERROR"),
            AppError::Clipboard(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CLIPBOARD_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
