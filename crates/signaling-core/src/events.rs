//! Session event system.
//!
//! A single broadcast channel fans session events out to any number of
//! application-level observers. Events for cancelled sessions are
//! suppressed at the source; only the generic completion still reaches
//! the registry.

use crate::session::SessionState;
use peerkit_infra_common::lifecycle::EntityId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events published over a session manager's event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A session was created and tracked
    SessionCreated {
        sid: EntityId,
        initiator: String,
        responder: String,
    },

    /// A session's state changed
    StateChanged {
        sid: EntityId,
        old_state: SessionState,
        new_state: SessionState,
    },

    /// Termination started; dependent-resource teardown is in progress
    SessionTerminating { sid: EntityId, reason: String },

    /// Termination finished
    SessionTerminated { sid: EntityId, reason: String },
}

/// Broadcast fan-out for [`SessionEvent`]s.
#[derive(Debug, Clone)]
pub struct SessionEventProcessor {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventProcessor {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        SessionEventProcessor { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: SessionEvent) {
        tracing::trace!(?event, "publishing session event");
        let _ = self.sender.send(event);
    }
}

impl Default for SessionEventProcessor {
    fn default() -> Self {
        SessionEventProcessor::new()
    }
}
