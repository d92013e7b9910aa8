//! Completion events and the per-entity notifier.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opaque identity of a tracked entity.
///
/// Ids are printable strings. When no identity is supplied by a remote
/// peer, [`EntityId::random`] generates a 16-byte random token rendered
/// as 32 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    /// Generate a fresh 16-byte random token, hex-encoded.
    pub fn random() -> Self {
        let mut token = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut token);
        EntityId(hex::encode(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a tracked entity ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityOutcome {
    /// The entity ran to normal completion
    Completed,
    /// The entity was cancelled before completing
    Cancelled,
    /// The entity failed; carries the failure description
    Failed(String),
}

/// Generic completion event consumed by the registry to deregister the
/// entity. Carries only identity and outcome; domain payloads travel on
/// the entity's own event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub entity: EntityId,
    pub outcome: EntityOutcome,
}

/// Per-entity handle used to announce the terminal state.
///
/// Cloneable; all clones share the same once-flag, so however many copies
/// an entity's internals hold, [`notify`](Self::notify) fires at most
/// once. After the registry detaches the notifier (during `cancel_all`),
/// notifications are dropped so that completing entities no longer touch
/// the registry.
#[derive(Debug, Clone)]
pub struct CompletionNotifier {
    entity: EntityId,
    tx: mpsc::UnboundedSender<CompletionEvent>,
    fired: Arc<AtomicBool>,
    detached: Arc<AtomicBool>,
}

impl CompletionNotifier {
    pub(crate) fn new(
        entity: EntityId,
        tx: mpsc::UnboundedSender<CompletionEvent>,
        detached: Arc<AtomicBool>,
    ) -> Self {
        CompletionNotifier {
            entity,
            tx,
            fired: Arc::new(AtomicBool::new(false)),
            detached,
        }
    }

    /// Announce the entity's terminal state.
    ///
    /// Returns `true` if this call actually dispatched the event. Repeat
    /// calls (including concurrent ones) are silent no-ops.
    pub fn notify(&self, outcome: EntityOutcome) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!(entity = %self.entity, "duplicate completion ignored");
            return false;
        }
        if self.detached.load(Ordering::SeqCst) {
            tracing::debug!(entity = %self.entity, "completion after detach dropped");
            return false;
        }
        let event = CompletionEvent {
            entity: self.entity.clone(),
            outcome,
        };
        // Receiver gone means the registry itself is shutting down.
        let _ = self.tx.send(event);
        true
    }

    /// Whether the terminal state was already announced.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_distinct_16_byte_tokens() {
        let a = EntityId::random();
        let b = EntityId::random();
        assert_eq!(a.as_str().len(), 32);
        assert_eq!(b.as_str().len(), 32);
        assert_ne!(a, b);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn notify_fires_at_most_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = CompletionNotifier::new(
            EntityId::new("t1"),
            tx,
            Arc::new(AtomicBool::new(false)),
        );

        assert!(notifier.notify(EntityOutcome::Completed));
        assert!(!notifier.notify(EntityOutcome::Completed));
        assert!(!notifier.clone().notify(EntityOutcome::Failed("late".into())));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.outcome, EntityOutcome::Completed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn detached_notifier_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let detached = Arc::new(AtomicBool::new(false));
        let notifier = CompletionNotifier::new(EntityId::new("t2"), tx, detached.clone());

        detached.store(true, Ordering::SeqCst);
        assert!(!notifier.notify(EntityOutcome::Cancelled));
        assert!(rx.try_recv().is_err());
    }
}
