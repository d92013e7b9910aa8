//! Entity Lifecycle Engine
//!
//! The shared machinery for tracking transient protocol entities. An
//! entity is a long-lived asynchronous unit of work (an API transaction,
//! a signaling session) governed by its own state machine. This module
//! owns the parts every entity has in common:
//!
//! - an opaque [`EntityId`] identity,
//! - a [`CompletionNotifier`] that announces the terminal state at most
//!   once, as a message back to the registry rather than a re-entrant
//!   call,
//! - an [`EntityRegistry`] that remembers live entities behind a single
//!   mutex, removes each exactly once when its completion event arrives,
//!   and can detach-then-cancel everything at shutdown.
//!
//! Domain-specific events (parsed responses, termination reasons) stay in
//! the domain crates; the engine only carries identity and outcome.

pub mod events;
pub mod registry;

pub use events::{CompletionEvent, CompletionNotifier, EntityId, EntityOutcome};
pub use registry::{EntityRegistry, TrackedEntity};
