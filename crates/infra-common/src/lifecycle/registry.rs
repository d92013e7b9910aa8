//! Guarded registry of live entities.
//!
//! The registry is the only state shared across threads. A single mutex
//! protects the collection and is held only for insert/lookup/remove,
//! never across an event dispatch, so a listener re-entering the registry
//! cannot deadlock it.

use super::events::{CompletionEvent, CompletionNotifier, EntityId};
use crate::errors::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Contract every registry-tracked entity fulfills.
pub trait TrackedEntity: Send + Sync + 'static {
    /// Stable identity of this entity.
    fn entity_id(&self) -> &EntityId;

    /// Request best-effort cancellation.
    ///
    /// Must be idempotent and must not block; the entity announces its
    /// own terminal state through its notifier once cancellation takes
    /// effect.
    fn cancel(&self);
}

struct Entry<E> {
    entity: Arc<E>,
    detached: Arc<AtomicBool>,
}

/// Concurrency-safe owner/tracker of live entities.
///
/// Entities announce completion through the [`CompletionNotifier`] handed
/// out by [`track`](Self::track); a background listener consumes those
/// events and removes each entity exactly once. Removal is idempotent: a
/// stale or duplicate completion is a silent no-op.
///
/// Cloning the registry yields another handle to the same collection.
pub struct EntityRegistry<E: TrackedEntity> {
    entities: Arc<Mutex<HashMap<EntityId, Entry<E>>>>,
    completion_tx: mpsc::UnboundedSender<CompletionEvent>,
    removals: broadcast::Sender<CompletionEvent>,
}

impl<E: TrackedEntity> Clone for EntityRegistry<E> {
    fn clone(&self) -> Self {
        EntityRegistry {
            entities: Arc::clone(&self.entities),
            completion_tx: self.completion_tx.clone(),
            removals: self.removals.clone(),
        }
    }
}

impl<E: TrackedEntity> std::fmt::Debug for EntityRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl<E: TrackedEntity> EntityRegistry<E> {
    /// Create a registry and spawn its completion listener.
    ///
    /// Must be called from within a Tokio runtime. The listener task ends
    /// on its own once every registry handle has been dropped.
    pub fn new() -> Self {
        let entities: Arc<Mutex<HashMap<EntityId, Entry<E>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<CompletionEvent>();
        let (removals, _) = broadcast::channel(256);

        let listener_map = Arc::clone(&entities);
        let listener_removals = removals.clone();
        tokio::spawn(async move {
            while let Some(event) = completion_rx.recv().await {
                // Lock scope covers only the map operation; the entry (and
                // with it the last registry-held Arc) drops outside it.
                let removed = { listener_map.lock().remove(&event.entity) };
                match removed {
                    Some(_) => {
                        tracing::debug!(entity = %event.entity, outcome = ?event.outcome,
                            "entity deregistered");
                        let _ = listener_removals.send(event);
                    }
                    None => {
                        tracing::trace!(entity = %event.entity, "stale completion, ignoring");
                    }
                }
            }
        });

        EntityRegistry {
            entities,
            completion_tx,
            removals,
        }
    }

    /// Insert an entity and subscribe the registry's completion listener.
    ///
    /// Returns the notifier the entity must fire when it reaches a
    /// terminal state. Never blocks on I/O. An already tracked id is
    /// refused and the existing entry is left untouched; ids may be
    /// peer-supplied, so a collision is an input error, not a caller bug.
    pub fn track(&self, entity: Arc<E>) -> Result<CompletionNotifier> {
        let id = entity.entity_id().clone();
        let detached = Arc::new(AtomicBool::new(false));
        let notifier =
            CompletionNotifier::new(id.clone(), self.completion_tx.clone(), detached.clone());

        {
            let mut entities = self.entities.lock();
            if entities.contains_key(&id) {
                tracing::warn!(entity = %id, "refusing to track a duplicate entity id");
                return Err(Error::Lifecycle(format!("entity {} is already tracked", id)));
            }
            entities.insert(id.clone(), Entry { entity, detached });
        }
        tracing::debug!(entity = %id, "entity tracked");
        Ok(notifier)
    }

    /// Look up a live entity by id.
    pub fn get(&self, id: &EntityId) -> Option<Arc<E>> {
        self.entities.lock().get(id).map(|e| Arc::clone(&e.entity))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.lock().is_empty()
    }

    /// Ids of all currently tracked entities.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.lock().keys().cloned().collect()
    }

    /// Remove an entity directly, bypassing the completion channel.
    ///
    /// Idempotent; used by owners that deregister explicitly rather than
    /// through a completion event.
    pub fn remove(&self, id: &EntityId) -> Option<Arc<E>> {
        let removed = { self.entities.lock().remove(id) };
        removed.map(|entry| {
            tracing::debug!(entity = %id, "entity removed");
            entry.entity
        })
    }

    /// Cancel and forget every tracked entity.
    ///
    /// Each entity's notifier is detached before its `cancel()` is called,
    /// so completions racing this call never re-enter the registry. The
    /// cancel calls themselves run outside the lock. Entities deallocate
    /// themselves once their cancellation completes and the last handle
    /// drops; the registry never frees them.
    pub fn cancel_all(&self) {
        let drained: Vec<Entry<E>> = {
            let mut map = self.entities.lock();
            map.drain().map(|(_, entry)| entry).collect()
        };
        if drained.is_empty() {
            return;
        }
        tracing::debug!(count = drained.len(), "cancelling all tracked entities");
        for entry in &drained {
            entry.detached.store(true, Ordering::SeqCst);
        }
        for entry in drained {
            entry.entity.cancel();
        }
    }

    /// Subscribe to deregistration events.
    ///
    /// One event per actual removal; stale completions produce nothing.
    pub fn subscribe_removals(&self) -> broadcast::Receiver<CompletionEvent> {
        self.removals.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::EntityOutcome;
    use std::time::Duration;
    use tokio::time::timeout;

    struct TestEntity {
        id: EntityId,
        cancelled: AtomicBool,
    }

    impl TestEntity {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(TestEntity {
                id: EntityId::new(id),
                cancelled: AtomicBool::new(false),
            })
        }
    }

    impl TrackedEntity for TestEntity {
        fn entity_id(&self) -> &EntityId {
            &self.id
        }

        fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn completion_removes_entity_exactly_once() {
        let registry: EntityRegistry<TestEntity> = EntityRegistry::new();
        let mut removals = registry.subscribe_removals();

        let entity = TestEntity::new("a");
        let notifier = registry.track(entity).unwrap();
        assert_eq!(registry.len(), 1);

        notifier.notify(EntityOutcome::Completed);
        notifier.notify(EntityOutcome::Completed);

        let event = timeout(Duration::from_secs(1), removals.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.entity, EntityId::new("a"));
        assert_eq!(registry.len(), 0);

        // No second removal for the duplicate signal.
        assert!(timeout(Duration::from_millis(100), removals.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn stale_completion_is_a_no_op() {
        let registry: EntityRegistry<TestEntity> = EntityRegistry::new();
        let entity = TestEntity::new("b");
        let notifier = registry.track(entity).unwrap();

        let removed = registry.remove(&EntityId::new("b")).unwrap();
        assert_eq!(registry.len(), 0);
        drop(removed);

        // Completion for an already removed entity must not crash or
        // produce a removal event.
        let mut removals = registry.subscribe_removals();
        notifier.notify(EntityOutcome::Failed("late".into()));
        assert!(timeout(Duration::from_millis(100), removals.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn duplicate_ids_are_refused() {
        let registry: EntityRegistry<TestEntity> = EntityRegistry::new();
        let mut removals = registry.subscribe_removals();

        let first = TestEntity::new("dup");
        let notifier = registry.track(Arc::clone(&first)).unwrap();

        assert!(registry.track(TestEntity::new("dup")).is_err());
        assert_eq!(registry.len(), 1);
        // The original entry survives the refused insert intact.
        assert!(Arc::ptr_eq(
            &registry.get(&EntityId::new("dup")).unwrap(),
            &first
        ));

        // And still deregisters normally.
        notifier.notify(EntityOutcome::Completed);
        let event = timeout(Duration::from_secs(1), removals.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.entity, EntityId::new("dup"));
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn cancel_all_detaches_then_cancels() {
        let registry: EntityRegistry<TestEntity> = EntityRegistry::new();
        let mut removals = registry.subscribe_removals();

        let entities: Vec<_> = (0..5).map(|i| TestEntity::new(&format!("e{}", i))).collect();
        let notifiers: Vec<_> = entities
            .iter()
            .map(|e| registry.track(Arc::clone(e)).unwrap())
            .collect();
        assert_eq!(registry.len(), 5);

        registry.cancel_all();
        assert_eq!(registry.len(), 0);
        for entity in &entities {
            assert!(entity.cancelled.load(Ordering::SeqCst));
        }

        // Completions after shutdown never reach the registry.
        for notifier in &notifiers {
            notifier.notify(EntityOutcome::Cancelled);
        }
        assert!(timeout(Duration::from_millis(100), removals.recv())
            .await
            .is_err());
    }
}
