//! # Signaling-Core - Negotiated Media Sessions for Peerkit
//!
//! Long-lived peer-to-peer signaling sessions managed as lifecycle
//! entities. A session moves through
//! `Pending -> Active -> Terminating -> Terminated`; media sources bound
//! to it are torn down exactly once on termination, respecting per-source
//! ownership. The [`SessionManager`] is the registry that creates,
//! tracks, terminates and deregisters sessions.

pub mod error;
pub mod events;
pub mod manager;
pub mod media;
pub mod session;

pub use error::{Result, SignalingError};
pub use events::{SessionEvent, SessionEventProcessor};
pub use manager::SessionManager;
pub use media::{MediaSource, SourceOwnership};
pub use session::{Session, SessionState};

/// Session identity: a printable token, 16 random bytes when the remote
/// peer supplies none.
pub use peerkit_infra_common::lifecycle::EntityId as SessionId;
pub use peerkit_infra_common::lifecycle::TrackedEntity;
