//! # Peerkit
//!
//! A networking/signaling toolkit: it establishes and authenticates
//! remote API calls, negotiates long-lived peer-to-peer signaling
//! sessions, and ships a lightweight structured-messaging protocol for
//! control traffic. The common core is a lifecycle engine for transient
//! protocol entities: a guarded registry owning asynchronous,
//! state-machine-driven workers that are tracked, cancellable, and
//! deregistered exactly once on completion.
//!
//! This crate re-exports the individual `peerkit-*` crates under one
//! roof:
//!
//! - [`infra`] - logging, errors, the entity lifecycle engine
//! - [`api`] - authenticated HTTP API client with tracked transactions
//! - [`signaling`] - negotiated media-signaling sessions
//! - [`messaging`] - node/action control commands over JSON

pub use peerkit_api_client as api;
pub use peerkit_infra_common as infra;
pub use peerkit_messaging_core as messaging;
pub use peerkit_signaling_core as signaling;

/// Commonly used types, one `use` away.
pub mod prelude {
    pub use crate::api::{ApiClient, ApiRequest, ApiResponse, ApiTransaction, ClientConfig};
    pub use crate::infra::lifecycle::{EntityId, EntityOutcome, TrackedEntity};
    pub use crate::infra::logging::{init_logging, LoggingConfig};
    pub use crate::messaging::{Command, Message};
    pub use crate::signaling::{
        MediaSource, Session, SessionEvent, SessionManager, SessionState, SourceOwnership,
    };
}
