//! Error types for signaling operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalingError {
    /// No session with the given id is currently tracked
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A session with the given id is already tracked; peer-supplied
    /// sids must be unique among live sessions
    #[error("Duplicate session id: {0}")]
    DuplicateSession(String),

    /// The operation is not legal in the session's current state
    #[error("Invalid operation in state {state}: {operation}")]
    InvalidState { state: String, operation: String },

    /// A state machine transition that is not legal for the session
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// A lifecycle contract was violated by the caller; programming
    /// error, not a recoverable condition
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SignalingError>;
