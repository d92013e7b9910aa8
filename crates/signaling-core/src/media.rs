//! Dependent media resources.
//!
//! A session may accumulate media sources while it is being negotiated
//! or active. Each binding records, once, whether the session owns the
//! source; ownership is never mutated afterwards. On termination owned
//! sources are closed, borrowed sources are merely detached.

use std::sync::Arc;

/// A media source that can be bound to a session.
pub trait MediaSource: Send + Sync {
    /// Human-readable name, used for logging.
    fn name(&self) -> &str;

    /// Release the source's underlying resources.
    ///
    /// Called exactly once, and only for sources the session owns.
    fn close(&self);
}

/// Whether a session owns a bound source or merely references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOwnership {
    /// The session closes the source on termination
    Owned,
    /// The source outlives the session; the session only drops its
    /// reference on termination
    Borrowed,
}

/// One bound source plus its ownership tag.
pub(crate) struct MediaBinding {
    pub source: Arc<dyn MediaSource>,
    pub ownership: SourceOwnership,
}
