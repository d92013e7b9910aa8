//! Error types for API client operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or timeout failure surfaced by the transport layer
    #[error("Network error: {0}")]
    Network(String),

    /// No valid service descriptor set could be loaded
    #[error("No service descriptor set available")]
    DescriptorUnavailable,

    /// The named service is absent from the descriptor set
    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// The request could not be constructed (bad method, bad URI, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A state machine transition that is not legal for the entity
    #[error("Invalid transaction transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Network(format!("request timed out: {}", e))
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
