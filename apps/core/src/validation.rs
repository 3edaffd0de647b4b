//! Input checks shared by the note and chat entry points.
//!
//! Lengths count Unicode scalar values, not bytes.

use crate::error::AppError;

const NUL: char = '\u{0}';
const SUB: char = '\u{1a}';

/// Enforces `min <= trimmed length` and `raw length <= max`, and rejects NUL/SUB.
pub fn validate_bounded_text(text: &str, min: usize, max: usize, label: &str) -> Result<(), AppError> {
    if text.trim().chars().count() < min {
        return Err(AppError::Validation(format!(
            "{} must be at least {} characters",
            label, min
        )));
    }
    if text.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} exceeds {} characters",
            label, max
        )));
    }
    if text.chars().any(|c| c == NUL || c == SUB) {
        return Err(AppError::Validation(format!(
            "{} contains invalid control characters",
            label
        )));
    }
    Ok(())
}

/// Rejects empty or whitespace-only identifiers. Ids key quotas and audit hashes.
pub fn require_id(value: &str, label: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", label)));
    }
    Ok(())
}

/// Decodes bytes received from a transport that does not guarantee UTF-8.
pub fn decode_utf8(bytes: Vec<u8>, label: &str) -> Result<String, AppError> {
    String::from_utf8(bytes)
        .map_err(|_| AppError::Validation(format!("{} must be valid UTF-8", label)))
}
