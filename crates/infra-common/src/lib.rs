//! # Infra-Common - Shared Infrastructure for Peerkit
//!
//! This crate provides the infrastructure pieces shared by every other
//! crate in the peerkit stack:
//!
//! - [`logging`] - tracing subscriber setup with env-filter support
//! - [`errors`] - common error type and context helpers
//! - [`lifecycle`] - the generic entity lifecycle engine: a guarded
//!   registry that tracks asynchronous entities (sessions, transactions),
//!   consumes their completion events, and deregisters each exactly once

pub mod errors;
pub mod lifecycle;
pub mod logging;

pub use errors::{Error, Result};
pub use lifecycle::{
    CompletionEvent, CompletionNotifier, EntityId, EntityOutcome, EntityRegistry, TrackedEntity,
};
