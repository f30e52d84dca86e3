//! Clipboard export via arboard

use crate::error::AppError;
use arboard::Clipboard;

/// Copy recognized text to the system clipboard
pub fn copy_text(text: &str) -> Result<(), AppError> {
    let mut clipboard = Clipboard::new()
        .map_err(|e| AppError::Clipboard(format!("Failed to open clipboard: {}", e)))?;
    clipboard
        .set_text(text)
        .map_err(|e| AppError::Clipboard(format!("Failed to copy text: {}", e)))
}
