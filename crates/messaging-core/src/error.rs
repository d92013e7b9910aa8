//! Error types for message handling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    /// The message is structurally valid JSON but violates the message
    /// contract (missing node or action, empty recipient, ...)
    #[error("Invalid message: {0}")]
    Invalid(String),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MessageError>;
