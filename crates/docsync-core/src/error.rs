//! Error types for docsync core.

use thiserror::Error;

/// Errors raised by the pure primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("document body must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            CoreError::Decoding(e.to_string())
        } else {
            CoreError::Encoding(e.to_string())
        }
    }
}
