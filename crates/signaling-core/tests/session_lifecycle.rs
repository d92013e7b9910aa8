//! Session lifecycle tests.
//!
//! Cover the manager's registry contract: ownership-respecting teardown,
//! sid generation, the guarded destruction rule, and domain-event
//! suppression on cancellation.

use peerkit_infra_common::lifecycle::EntityOutcome;
use peerkit_signaling_core::{
    MediaSource, SessionEvent, SessionManager, SessionState, SignalingError, SourceOwnership,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

struct TestSource {
    name: String,
    close_calls: AtomicUsize,
}

impl TestSource {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(TestSource {
            name: name.to_string(),
            close_calls: AtomicUsize::new(0),
        })
    }

    fn closed(&self) -> bool {
        self.close_calls.load(Ordering::SeqCst) > 0
    }
}

impl MediaSource for TestSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn ownership_respecting_teardown() {
    let manager = SessionManager::new();
    let session = manager
        .create_session("alice@example.com", "bob@example.com", None)
        .unwrap();

    let owned = TestSource::new("camera");
    let borrowed = TestSource::new("shared-mic");
    session
        .add_media_source(owned.clone() as Arc<dyn MediaSource>, SourceOwnership::Owned)
        .unwrap();
    session
        .add_media_source(
            borrowed.clone() as Arc<dyn MediaSource>,
            SourceOwnership::Borrowed,
        )
        .unwrap();
    assert_eq!(session.media_source_count(), 2);

    manager.accept_session(session.sid()).unwrap();
    manager.terminate_session(session.sid(), "done").unwrap();

    assert_eq!(session.state(), SessionState::Terminated);
    assert_eq!(session.media_source_count(), 0);
    assert!(owned.closed());
    // The borrowed source is detached but intact and still usable.
    assert!(!borrowed.closed());
    assert_eq!(borrowed.name(), "shared-mic");
}

#[tokio::test]
async fn teardown_runs_exactly_once() {
    let manager = SessionManager::new();
    let session = manager.create_session("a", "b", None).unwrap();
    let source = TestSource::new("camera");
    session
        .add_media_source(source.clone() as Arc<dyn MediaSource>, SourceOwnership::Owned)
        .unwrap();

    manager.terminate_session(session.sid(), "rejected").unwrap();
    // A second termination trigger must not re-run the teardown pass.
    manager.terminate_session(session.sid(), "again").ok();
    assert_eq!(source.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn session_ids_are_fresh_random_tokens() {
    let manager = SessionManager::new();
    let a = manager.create_session("a", "b", None).unwrap();
    let b = manager.create_session("a", "b", None).unwrap();

    assert_ne!(a.sid(), b.sid());
    assert_eq!(a.sid().as_str().len(), 32);
    assert!(a.sid().as_str().chars().all(|c| c.is_ascii_hexdigit()));

    // A peer-supplied sid is kept verbatim.
    let c = manager
        .create_session("a", "b", Some("peer-sid-1".into()))
        .unwrap();
    assert_eq!(c.sid().as_str(), "peer-sid-1");

    manager.terminate_all();
}

#[tokio::test]
async fn duplicate_peer_sid_is_rejected() {
    let manager = SessionManager::new();
    let mut events = manager.subscribe();

    let first = manager
        .create_session("alice", "bob", Some("peer-sid".into()))
        .unwrap();
    let err = manager
        .create_session("carol", "dave", Some("peer-sid".into()))
        .unwrap_err();
    assert!(matches!(err, SignalingError::DuplicateSession(_)));

    // The original session is untouched and still tracked.
    assert_eq!(manager.active_sessions(), 1);
    assert_eq!(first.state(), SessionState::Pending);
    assert!(Arc::ptr_eq(
        &manager.get_session(first.sid()).unwrap(),
        &first
    ));

    // Only the accepted creation produced an event.
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::SessionCreated { initiator, .. }) if initiator == "alice"
    ));
    assert!(events.try_recv().is_err());

    manager.terminate_all();
}

#[tokio::test]
async fn destroying_a_live_session_is_a_contract_violation() {
    let manager = SessionManager::new();
    let session = manager.create_session("a", "b", None).unwrap();
    manager.accept_session(session.sid()).unwrap();

    let err = manager.destroy_session(session.sid()).unwrap_err();
    assert!(matches!(err, SignalingError::ContractViolation(_)));
    // The refusal left the session tracked and untouched.
    assert_eq!(manager.active_sessions(), 1);
    assert_eq!(session.state(), SessionState::Active);

    manager.terminate_session(session.sid(), "cleanup").unwrap();
    assert!(manager.destroy_session(session.sid()).is_ok());
}

#[tokio::test]
async fn termination_publishes_ordered_domain_events() {
    let manager = SessionManager::new();
    let mut events = manager.subscribe();
    let mut removals = manager.subscribe_removals();

    let session = manager.create_session("alice", "bob", None).unwrap();
    let sid = session.sid().clone();
    manager.accept_session(&sid).unwrap();
    manager.terminate_session(&sid, "bye").unwrap();

    let mut seen = Vec::new();
    for _ in 0..6 {
        let event = timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push(event);
    }

    assert!(matches!(&seen[0], SessionEvent::SessionCreated { sid: s, .. } if *s == sid));
    assert!(matches!(
        &seen[1],
        SessionEvent::StateChanged {
            old_state: SessionState::Pending,
            new_state: SessionState::Active,
            ..
        }
    ));
    assert!(matches!(
        &seen[2],
        SessionEvent::StateChanged {
            new_state: SessionState::Terminating,
            ..
        }
    ));
    assert!(matches!(
        &seen[3],
        SessionEvent::SessionTerminating { reason, .. } if reason == "bye"
    ));
    assert!(matches!(
        &seen[4],
        SessionEvent::StateChanged {
            new_state: SessionState::Terminated,
            ..
        }
    ));
    assert!(matches!(
        &seen[5],
        SessionEvent::SessionTerminated { reason, .. } if reason == "bye"
    ));

    // The generic completion deregisters the session.
    let removal = timeout(Duration::from_secs(1), removals.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removal.entity, sid);
    assert_eq!(removal.outcome, EntityOutcome::Completed);
    assert_eq!(manager.active_sessions(), 0);
}

#[tokio::test]
async fn terminate_all_suppresses_domain_events() {
    let manager = SessionManager::new();
    let sessions: Vec<_> = (0..3)
        .map(|_| manager.create_session("a", "b", None).unwrap())
        .collect();
    assert_eq!(manager.active_sessions(), 3);

    // Subscribe after creation so only shutdown-era events would show up.
    let mut events = manager.subscribe();
    manager.terminate_all();

    assert_eq!(manager.active_sessions(), 0);
    for session in &sessions {
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(session.is_cancelled());
    }
    assert!(timeout(Duration::from_millis(100), events.recv())
        .await
        .is_err());
}

#[tokio::test]
async fn concurrent_transitions_keep_event_order() {
    for _ in 0..25 {
        let manager = Arc::new(SessionManager::new());
        let mut events = manager.subscribe();
        let session = manager.create_session("a", "b", None).unwrap();
        let sid = session.sid().clone();

        let accept = {
            let manager = Arc::clone(&manager);
            let sid = sid.clone();
            tokio::spawn(async move {
                let _ = manager.accept_session(&sid);
            })
        };
        let terminate = {
            let manager = Arc::clone(&manager);
            let sid = sid.clone();
            tokio::spawn(async move {
                let _ = manager.terminate_session(&sid, "bye");
            })
        };
        accept.await.unwrap();
        terminate.await.unwrap();

        // Every publish happened inside the two calls above, so the
        // channel already holds the full history. StateChanged events
        // must chain: each starts where the previous one ended.
        let mut last: Option<SessionState> = None;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::StateChanged {
                old_state,
                new_state,
                ..
            } = event
            {
                if let Some(previous) = last {
                    assert_eq!(old_state, previous);
                }
                last = Some(new_state);
            }
        }
        assert_eq!(last, Some(SessionState::Terminated));
    }
}

#[tokio::test]
async fn media_sources_cannot_be_added_after_termination_starts() {
    let manager = SessionManager::new();
    let session = manager.create_session("a", "b", None).unwrap();
    manager.terminate_session(session.sid(), "early exit").unwrap();

    let source = TestSource::new("late");
    let err = session
        .add_media_source(source as Arc<dyn MediaSource>, SourceOwnership::Owned)
        .unwrap_err();
    assert!(matches!(err, SignalingError::InvalidState { .. }));
}
