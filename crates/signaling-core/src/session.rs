//! Session implementation.
//!
//! A session is a lifecycle entity for one negotiated peer-to-peer
//! exchange. State transitions are totally ordered; dependent media
//! sources are released exactly once, on entering `Terminating`, and
//! only the owning manager drives the terminal transitions.

use crate::error::{Result, SignalingError};
use crate::events::{SessionEvent, SessionEventProcessor};
use crate::media::{MediaBinding, MediaSource, SourceOwnership};
use parking_lot::{Mutex, RwLock};
use peerkit_infra_common::lifecycle::{CompletionNotifier, EntityId, EntityOutcome, TrackedEntity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created; negotiation not yet accepted
    Pending,
    /// Negotiation succeeded; media may flow
    Active,
    /// Termination in progress; the only state from which dependent
    /// resources are torn down
    Terminating,
    /// Fully wound down
    Terminated,
}

impl SessionState {
    /// Whether termination has started or finished.
    pub fn is_ending(&self) -> bool {
        matches!(self, SessionState::Terminating | SessionState::Terminated)
    }

    /// Legal transitions of the session state machine.
    ///
    /// Rejection of a pending session also routes through `Terminating`
    /// so resource teardown has exactly one home.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Pending, Active) | (Pending, Terminating) | (Active, Terminating)
                | (Terminating, Terminated)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Pending => "Pending",
            SessionState::Active => "Active",
            SessionState::Terminating => "Terminating",
            SessionState::Terminated => "Terminated",
        };
        write!(f, "{}", s)
    }
}

/// One negotiated, stateful peer-to-peer signaling exchange.
pub struct Session {
    sid: EntityId,
    initiator: String,
    responder: String,
    state: RwLock<SessionState>,
    sources: Mutex<Vec<MediaBinding>>,
    sources_released: AtomicBool,
    cancelled: AtomicBool,
    notifier: Mutex<Option<CompletionNotifier>>,
    events: SessionEventProcessor,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("sid", &self.sid)
            .field("state", &*self.state.read())
            .field("initiator", &self.initiator)
            .field("responder", &self.responder)
            .finish()
    }
}

impl Session {
    /// Construct a session; generates a random sid when none is supplied
    /// by the remote peer.
    pub(crate) fn new(
        events: SessionEventProcessor,
        initiator: impl Into<String>,
        responder: impl Into<String>,
        sid: Option<String>,
    ) -> Arc<Self> {
        let sid = match sid {
            Some(sid) => EntityId::new(sid),
            None => EntityId::random(),
        };
        tracing::debug!(%sid, "session created");
        Arc::new(Session {
            sid,
            initiator: initiator.into(),
            responder: responder.into(),
            state: RwLock::new(SessionState::Pending),
            sources: Mutex::new(Vec::new()),
            sources_released: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            notifier: Mutex::new(None),
            events,
        })
    }

    pub fn sid(&self) -> &EntityId {
        &self.sid
    }

    pub fn initiator(&self) -> &str {
        &self.initiator
    }

    pub fn responder(&self) -> &str {
        &self.responder
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Bind a media source to this session.
    ///
    /// Ownership is recorded once and never mutated afterwards. Fails
    /// once termination has started.
    pub fn add_media_source(
        &self,
        source: Arc<dyn MediaSource>,
        ownership: SourceOwnership,
    ) -> Result<()> {
        let state = self.state();
        if state.is_ending() {
            return Err(SignalingError::InvalidState {
                state: format!("{:?}", state),
                operation: "add_media_source".into(),
            });
        }
        tracing::debug!(sid = %self.sid, source = source.name(), ?ownership, "media source bound");
        self.sources.lock().push(MediaBinding { source, ownership });
        Ok(())
    }

    /// Number of currently bound media sources.
    pub fn media_source_count(&self) -> usize {
        self.sources.lock().len()
    }

    pub(crate) fn bind_notifier(&self, notifier: CompletionNotifier) {
        *self.notifier.lock() = Some(notifier);
    }

    fn notify(&self, outcome: EntityOutcome) {
        if let Some(notifier) = &*self.notifier.lock() {
            notifier.notify(outcome);
        }
    }

    fn publish(&self, event: SessionEvent) {
        // Cancelled sessions keep the domain channel silent.
        if !self.is_cancelled() {
            self.events.publish(event);
        }
    }

    fn transition(&self, next: SessionState) -> Result<()> {
        let mut state = self.state.write();
        if !state.can_transition_to(next) {
            return Err(SignalingError::InvalidTransition {
                from: format!("{:?}", *state),
                to: format!("{:?}", next),
            });
        }
        let old = *state;
        *state = next;
        tracing::debug!(sid = %self.sid, from = ?old, to = ?next, "state transition");
        // Published while still holding the state lock, so observers
        // see StateChanged events in transition order even when
        // transitions race on different threads.
        self.publish(SessionEvent::StateChanged {
            sid: self.sid.clone(),
            old_state: old,
            new_state: next,
        });
        Ok(())
    }

    /// `Pending -> Active`; the responder accepted the negotiation.
    pub(crate) fn activate(&self) -> Result<()> {
        self.transition(SessionState::Active)
    }

    /// Drive the session through `Terminating` into `Terminated`.
    ///
    /// Returns `false` when termination had already started; the
    /// resource teardown and the completion notification happen exactly
    /// once regardless of which trigger got here first.
    pub(crate) fn begin_terminate(&self, reason: &str) -> bool {
        if self.transition(SessionState::Terminating).is_err() {
            tracing::debug!(sid = %self.sid, "termination already in progress");
            return false;
        }
        self.publish(SessionEvent::SessionTerminating {
            sid: self.sid.clone(),
            reason: reason.to_string(),
        });

        self.release_media_sources();

        if let Err(e) = self.transition(SessionState::Terminated) {
            // Unreachable: this path owns the Terminating state.
            tracing::error!(sid = %self.sid, error = %e, "terminal transition failed");
        }
        self.publish(SessionEvent::SessionTerminated {
            sid: self.sid.clone(),
            reason: reason.to_string(),
        });

        let outcome = if self.is_cancelled() {
            EntityOutcome::Cancelled
        } else {
            EntityOutcome::Completed
        };
        self.notify(outcome);
        true
    }

    /// Tear down bound media sources, once.
    ///
    /// Owned sources are closed; borrowed sources are detached intact.
    fn release_media_sources(&self) {
        if self.sources_released.swap(true, Ordering::SeqCst) {
            return;
        }
        let bindings: Vec<MediaBinding> = {
            let mut sources = self.sources.lock();
            sources.drain(..).collect()
        };
        for binding in bindings {
            match binding.ownership {
                SourceOwnership::Owned => {
                    tracing::debug!(sid = %self.sid, source = binding.source.name(),
                        "closing owned media source");
                    binding.source.close();
                }
                SourceOwnership::Borrowed => {
                    tracing::debug!(sid = %self.sid, source = binding.source.name(),
                        "detaching borrowed media source");
                }
            }
        }
    }
}

impl TrackedEntity for Session {
    fn entity_id(&self) -> &EntityId {
        &self.sid
    }

    /// Cancel the session: terminate it with domain events suppressed.
    ///
    /// The generic completion still fires so the registry deregisters
    /// the session.
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.begin_terminate("cancelled");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Sessions are managed by their SessionManager and must be
        // terminated through the state machine before the last handle
        // drops; anything else is a caller bug.
        let state = *self.state.get_mut();
        if !state.is_ending() {
            tracing::error!(sid = %self.sid, ?state,
                "contract violation: session dropped without termination");
            if !std::thread::panicking() {
                debug_assert!(
                    false,
                    "session {} dropped in state {:?}; terminate it through the manager first",
                    self.sid, state
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_the_lifecycle() {
        use SessionState::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(Terminating));
        assert!(Active.can_transition_to(Terminating));
        assert!(Terminating.can_transition_to(Terminated));

        assert!(!Pending.can_transition_to(Terminated));
        assert!(!Active.can_transition_to(Pending));
        assert!(!Terminated.can_transition_to(Pending));
        assert!(!Terminated.can_transition_to(Terminating));
    }

    #[test]
    fn ending_states_are_terminating_and_terminated() {
        assert!(!SessionState::Pending.is_ending());
        assert!(!SessionState::Active.is_ending());
        assert!(SessionState::Terminating.is_ending());
        assert!(SessionState::Terminated.is_ending());
    }
}
