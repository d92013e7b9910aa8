//! Common error types for the peerkit infrastructure layer.

pub mod context;

pub use context::{ErrorContext, ErrorExt};

use thiserror::Error;

/// Infrastructure-level error type.
///
/// Domain crates define their own richer error enums; this type covers
/// failures in the shared infrastructure itself (logging setup, lifecycle
/// plumbing).
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity lifecycle contract was violated by the caller
    #[error("Lifecycle contract violation: {0}")]
    Lifecycle(String),

    /// Catch-all for wrapped errors with added context
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
