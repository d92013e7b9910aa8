//! API transactions.
//!
//! A transaction is the tracked lifecycle entity behind one outbound
//! call. Its state machine is
//! `Created -> InProgress -> {Completed | Cancelled | Failed}`; each
//! terminal state is entered at most once. Cancellation suppresses the
//! domain event channel but still fires the generic completion so the
//! registry can deregister the transaction.

use crate::error::{ApiError, Result};
use crate::request::ApiRequest;
use crate::transport::{ApiResponse, Transport};
use parking_lot::{Mutex, RwLock};
use peerkit_infra_common::lifecycle::{CompletionNotifier, EntityId, EntityOutcome, TrackedEntity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Transaction lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Constructed; request attached but not yet dispatched
    Created,
    /// Dispatched; awaiting the transport's verdict
    InProgress,
    /// The call returned a response
    Completed,
    /// Cancelled before completion; late responses are discarded
    Cancelled,
    /// The transport reported a failure
    Failed,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Completed | TransactionState::Cancelled | TransactionState::Failed
        )
    }

    /// Legal transitions of the transaction state machine.
    pub fn can_transition_to(&self, next: TransactionState) -> bool {
        use TransactionState::*;
        matches!(
            (self, next),
            (Created, InProgress) | (Created, Cancelled) | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (InProgress, Failed)
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::Created => "Created",
            TransactionState::InProgress => "InProgress",
            TransactionState::Completed => "Completed",
            TransactionState::Cancelled => "Cancelled",
            TransactionState::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// Domain events published on a transaction's own channel.
///
/// Never published for a cancelled transaction.
#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// The call completed; carries the service name (when resolved from a
    /// descriptor) and the full response
    Completed {
        service: Option<String>,
        response: ApiResponse,
    },
    /// The call failed at the transport layer
    Failed {
        service: Option<String>,
        error: String,
    },
}

/// One outbound authenticated remote call and its eventual result.
pub struct ApiTransaction {
    id: EntityId,
    request: ApiRequest,
    state: RwLock<TransactionState>,
    cancelled: AtomicBool,
    notifier: Mutex<Option<CompletionNotifier>>,
    events: broadcast::Sender<TransactionEvent>,
    response: Mutex<Option<ApiResponse>>,
}

impl fmt::Debug for ApiTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTransaction")
            .field("id", &self.id)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl ApiTransaction {
    pub fn new(request: ApiRequest) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(ApiTransaction {
            id: EntityId::random(),
            request,
            state: RwLock::new(TransactionState::Created),
            cancelled: AtomicBool::new(false),
            notifier: Mutex::new(None),
            events,
            response: Mutex::new(None),
        })
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn state(&self) -> TransactionState {
        *self.state.read()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Subscribe to this transaction's domain events.
    pub fn subscribe(&self) -> broadcast::Receiver<TransactionEvent> {
        self.events.subscribe()
    }

    /// The response, once the transaction completed.
    pub fn response(&self) -> Option<ApiResponse> {
        self.response.lock().clone()
    }

    pub(crate) fn bind_notifier(&self, notifier: CompletionNotifier) {
        *self.notifier.lock() = Some(notifier);
    }

    fn notify(&self, outcome: EntityOutcome) {
        if let Some(notifier) = &*self.notifier.lock() {
            notifier.notify(outcome);
        }
    }

    fn transition(&self, next: TransactionState) -> Result<()> {
        let mut state = self.state.write();
        if !state.can_transition_to(next) {
            return Err(ApiError::InvalidTransition {
                from: state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(transaction = %self.id, from = %*state, to = %next, "state transition");
        *state = next;
        Ok(())
    }

    /// Dispatch the call on the shared runtime.
    ///
    /// Returns immediately; completion is announced through the bound
    /// notifier and the domain event channel.
    pub(crate) fn spawn(self: &Arc<Self>, transport: Arc<dyn Transport>) {
        if self.transition(TransactionState::InProgress).is_err() {
            // Cancelled between construction and dispatch. The cancel
            // may have run before any notifier was bound, so announce
            // the terminal state here; the once-flag absorbs the
            // duplicate when the cancel raced the binding instead.
            tracing::debug!(transaction = %self.id, "skipping dispatch of cancelled transaction");
            self.notify(EntityOutcome::Cancelled);
            return;
        }

        let transaction = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = transport.execute(&transaction.request).await;
            transaction.finish(outcome);
        });
    }

    fn finish(&self, outcome: Result<ApiResponse>) {
        if self.is_cancelled() {
            tracing::debug!(transaction = %self.id, "late response for cancelled transaction dropped");
            return;
        }
        match outcome {
            Ok(response) => {
                if self.transition(TransactionState::Completed).is_err() {
                    // Lost the race against a concurrent cancel.
                    return;
                }
                *self.response.lock() = Some(response.clone());
                let service = self.request.service.as_ref().map(|s| s.name.clone());
                let _ = self.events.send(TransactionEvent::Completed { service, response });
                self.notify(EntityOutcome::Completed);
            }
            Err(error) => {
                if self.transition(TransactionState::Failed).is_err() {
                    return;
                }
                tracing::warn!(transaction = %self.id, %error, "transaction failed");
                let service = self.request.service.as_ref().map(|s| s.name.clone());
                let _ = self.events.send(TransactionEvent::Failed {
                    service,
                    error: error.to_string(),
                });
                self.notify(EntityOutcome::Failed(error.to_string()));
            }
        }
    }
}

impl TrackedEntity for ApiTransaction {
    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    /// Force the `Cancelled` terminal state.
    ///
    /// Best-effort: the in-flight network operation is not interrupted,
    /// but its eventual response is detected and silently dropped. Fires
    /// the generic completion (deregistration still happens); domain
    /// events are suppressed.
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        match self.transition(TransactionState::Cancelled) {
            Ok(()) => {
                tracing::debug!(transaction = %self.id, "transaction cancelled");
                self.notify(EntityOutcome::Cancelled);
            }
            Err(_) => {
                // Already terminal; nothing left to cancel.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_cannot_be_left() {
        use TransactionState::*;
        for terminal in [Completed, Cancelled, Failed] {
            for next in [Created, InProgress, Completed, Cancelled, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn cancel_is_legal_before_and_during_flight() {
        use TransactionState::*;
        assert!(Created.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(Created.can_transition_to(InProgress));
        assert!(!Created.can_transition_to(Completed));
    }

    #[tokio::test]
    async fn cancelling_twice_is_idempotent() {
        let transaction = ApiTransaction::new(ApiRequest::new("GET", "/ping"));
        transaction.cancel();
        transaction.cancel();
        assert_eq!(transaction.state(), TransactionState::Cancelled);
        assert!(transaction.is_cancelled());
    }
}
