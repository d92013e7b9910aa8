//! Session manager.
//!
//! The registry for session entities. It is the only party permitted to
//! drive a session's terminal transitions and the only party that
//! removes sessions from the tracked set.

use crate::error::{Result, SignalingError};
use crate::events::{SessionEvent, SessionEventProcessor};
use crate::session::Session;
use peerkit_infra_common::lifecycle::{CompletionEvent, EntityId, EntityRegistry, TrackedEntity};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Creates, tracks, terminates and deregisters signaling sessions.
pub struct SessionManager {
    sessions: EntityRegistry<Session>,
    events: SessionEventProcessor,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("active_sessions", &self.sessions.len())
            .finish()
    }
}

impl SessionManager {
    /// Create a manager. Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        SessionManager {
            sessions: EntityRegistry::new(),
            events: SessionEventProcessor::new(),
        }
    }

    /// Create and track a session.
    ///
    /// When `sid` is `None` a fresh 16-byte random token is generated.
    /// A peer-supplied sid that collides with a live session is
    /// rejected; the existing session is left untouched. The returned
    /// handle is non-owning; the session stays alive in the registry
    /// until it terminates.
    pub fn create_session(
        &self,
        initiator: impl Into<String>,
        responder: impl Into<String>,
        sid: Option<String>,
    ) -> Result<Arc<Session>> {
        let session = Session::new(self.events.clone(), initiator, responder, sid);
        let notifier = match self.sessions.track(Arc::clone(&session)) {
            Ok(notifier) => notifier,
            Err(_) => {
                let sid = session.sid().to_string();
                // Wind the rejected session down quietly so it reaches
                // a terminal state before the handle drops.
                session.cancel();
                return Err(SignalingError::DuplicateSession(sid));
            }
        };
        session.bind_notifier(notifier);
        self.events.publish(SessionEvent::SessionCreated {
            sid: session.sid().clone(),
            initiator: session.initiator().to_string(),
            responder: session.responder().to_string(),
        });
        Ok(session)
    }

    /// Look up a tracked session.
    pub fn get_session(&self, sid: &EntityId) -> Option<Arc<Session>> {
        self.sessions.get(sid)
    }

    /// Accept a pending session: `Pending -> Active`.
    pub fn accept_session(&self, sid: &EntityId) -> Result<()> {
        let session = self
            .sessions
            .get(sid)
            .ok_or_else(|| SignalingError::SessionNotFound(sid.to_string()))?;
        session.activate()
    }

    /// Terminate a session through its state machine.
    ///
    /// Works from either peer's perspective and for the local error
    /// path alike; deregistration follows from the session's completion
    /// event. Terminating an already terminating session is a no-op.
    pub fn terminate_session(&self, sid: &EntityId, reason: &str) -> Result<()> {
        let session = self
            .sessions
            .get(sid)
            .ok_or_else(|| SignalingError::SessionNotFound(sid.to_string()))?;
        session.begin_terminate(reason);
        Ok(())
    }

    /// Drop the registry's reference to a session.
    ///
    /// Only legal once the session is terminating or terminated;
    /// anything else is a contract violation. Unknown sids are a silent
    /// no-op (the session already removed itself).
    pub fn destroy_session(&self, sid: &EntityId) -> Result<()> {
        let Some(session) = self.sessions.get(sid) else {
            tracing::debug!(%sid, "destroy for unknown session ignored");
            return Ok(());
        };
        let state = session.state();
        if !state.is_ending() {
            return Err(SignalingError::ContractViolation(format!(
                "session {} destroyed in state {:?}; terminate it first",
                sid, state
            )));
        }
        self.sessions.remove(sid);
        Ok(())
    }

    /// Cancel and forget every tracked session.
    ///
    /// Cancelled sessions still wind down through their state machine
    /// but publish no domain events.
    pub fn terminate_all(&self) {
        tracing::debug!("terminating all sessions");
        self.sessions.cancel_all();
    }

    /// Number of sessions still tracked.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Ids of all tracked sessions.
    pub fn session_ids(&self) -> Vec<EntityId> {
        self.sessions.ids()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Subscribe to session deregistration events.
    pub fn subscribe_removals(&self) -> broadcast::Receiver<CompletionEvent> {
        self.sessions.subscribe_removals()
    }
}
