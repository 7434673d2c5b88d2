//! Integration tests for the session coordinator.
//!
//! Most tests run two coordinators on one in-memory hub. A small failing
//! session double covers the transmission-failure path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use coplay_protocol::messages::{GameEventMessage, GameStartMessage};
use coplay_protocol::{GroupContext, GroupMessage, ProtocolError};
use coplay_roster::{RosterConfig, RosterHandle};
use coplay_session::{
    Recipient, SendFailure, SessionConfig, SessionCoordinator, SessionError, SessionState,
};
use coplay_transport::{
    DeliveryMode, GroupSession, Incoming, MemoryHub, MemorySession, Messenger, ParticipantId,
    TransportError,
};
use futures_util::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pid(n: u64) -> ParticipantId {
    ParticipantId::new(n)
}

fn quick_config() -> SessionConfig {
    SessionConfig {
        join_delay: Duration::ZERO,
        local_participant: Some(pid(900)),
    }
}

fn coordinator(context: GroupContext) -> SessionCoordinator<MemorySession> {
    SessionCoordinator::new(context, quick_config())
}

type Received = mpsc::UnboundedReceiver<(GameStartMessage, ParticipantId)>;

fn record_starts(context: &GroupContext) -> Received {
    let (tx, rx) = mpsc::unbounded_channel();
    context.handlers().on(move |message: GameStartMessage, sender| {
        let tx = tx.clone();
        async move {
            let _ = tx.send((message, sender));
        }
    });
    rx
}

async fn recv_within(rx: &mut Received) -> (GameStartMessage, ParticipantId) {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("message should arrive within a second")
        .expect("handler channel open")
}

/// A message type nobody registered with the type registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    window_id: String,
    message_id: String,
    text: String,
}

impl GroupMessage for Note {
    fn window_id(&self) -> &str {
        &self.window_id
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}

// ---------------------------------------------------------------------------
// Failing session double
// ---------------------------------------------------------------------------

struct FailingSession;

struct FailingMessenger(DeliveryMode);

impl Messenger for FailingMessenger {
    async fn send(&self, _data: Vec<u8>, _to: &[ParticipantId]) -> Result<(), TransportError> {
        Err(TransportError::SendFailed("link down".into()))
    }

    fn incoming(&self) -> BoxStream<'static, Incoming> {
        Box::pin(stream::pending())
    }

    fn delivery_mode(&self) -> DeliveryMode {
        self.0
    }
}

impl GroupSession for FailingSession {
    type Messenger = FailingMessenger;

    fn local_participant(&self) -> ParticipantId {
        pid(1)
    }

    fn active_participants(&self) -> Vec<ParticipantId> {
        vec![pid(1), pid(2)]
    }

    fn participant_updates(&self) -> BoxStream<'static, Vec<ParticipantId>> {
        Box::pin(stream::pending())
    }

    fn messenger(&self, mode: DeliveryMode) -> FailingMessenger {
        FailingMessenger(mode)
    }

    async fn join(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn leave(&self) {}
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_send_without_session_dispatches_locally_once() {
    let hub = MemoryHub::new();
    let context = GroupContext::new();
    let mut received = record_starts(&context);
    let coordinator = coordinator(context);

    coordinator
        .send(&GameStartMessage::new("default"), Recipient::Others, true)
        .await
        .expect("send should succeed");

    let (message, sender) = recv_within(&mut received).await;
    assert_eq!(message.game_mode, "default");
    assert_eq!(sender, pid(900));
    assert!(received.try_recv().is_err(), "dispatched exactly once");
    assert_eq!(hub.send_count(), 0);
}

#[tokio::test]
async fn test_two_coordinators_exchange_messages_on_both_channels() {
    let hub = MemoryHub::new();
    let alice = coordinator(GroupContext::new());
    let bob_context = GroupContext::new();
    let mut bob_received = record_starts(&bob_context);
    let bob = coordinator(bob_context);

    alice.configure(hub.create_session()).await.unwrap();
    bob.configure(hub.create_session()).await.unwrap();
    let alice_id = alice.local_participant().await;

    let start = GameStartMessage::new("coop");
    alice.send(&start, Recipient::Others, false).await.unwrap();
    let (message, sender) = recv_within(&mut bob_received).await;
    assert_eq!(message, start);
    assert_eq!(sender, alice_id);

    let quick = GameStartMessage::new("quick");
    alice
        .send_unreliable(&quick, Recipient::Others, false)
        .await
        .unwrap();
    let (message, _) = recv_within(&mut bob_received).await;
    assert_eq!(message, quick);
}

#[tokio::test]
async fn test_send_to_only_local_transmits_nothing() {
    let hub = MemoryHub::new();
    let alice = coordinator(GroupContext::new());
    let bob = coordinator(GroupContext::new());
    alice.configure(hub.create_session()).await.unwrap();
    bob.configure(hub.create_session()).await.unwrap();
    let alice_id = alice.local_participant().await;

    alice
        .send(&GameStartMessage::new("solo"), Recipient::only([alice_id]), false)
        .await
        .unwrap();

    assert_eq!(hub.send_count(), 0);
}

#[tokio::test]
async fn test_unregistered_message_is_rejected_without_local_dispatch() {
    let context = GroupContext::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    context.handlers().on(move |note: Note, _sender| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(note.text);
        }
    });
    let coordinator = coordinator(context);
    let note = Note {
        window_id: String::new(),
        message_id: "n-1".into(),
        text: "hi".into(),
    };

    let result = coordinator.send(&note, Recipient::Others, true).await;

    assert!(matches!(result, Err(SessionError::Protocol(_))));
    assert!(rx.try_recv().is_err(), "nothing dispatched locally");
}

#[tokio::test]
async fn test_non_finite_payload_is_rejected_before_echo_or_transmit() {
    let hub = MemoryHub::new();
    let context = GroupContext::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    context.handlers().on(move |event: GameEventMessage, _sender| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(event.value);
        }
    });
    let alice = coordinator(context);
    let bob = coordinator(GroupContext::new());
    alice.configure(hub.create_session()).await.unwrap();
    bob.configure(hub.create_session()).await.unwrap();

    let result = alice
        .send(&GameEventMessage::new(1, f64::NAN), Recipient::Others, true)
        .await;

    assert!(matches!(
        result,
        Err(SessionError::Protocol(ProtocolError::Encode(_)))
    ));
    assert!(rx.try_recv().is_err(), "nothing dispatched locally");
    assert_eq!(hub.send_count(), 0);
}

#[tokio::test]
async fn test_transmission_failure_reaches_hook_and_send_still_succeeds() {
    let coordinator: SessionCoordinator<FailingSession> =
        SessionCoordinator::new(GroupContext::new(), quick_config());
    let failures: Arc<Mutex<Vec<(DeliveryMode, Vec<ParticipantId>)>>> = Arc::default();
    let sink = Arc::clone(&failures);
    coordinator.on_send_failure(move |failure: &SendFailure| {
        sink.lock()
            .unwrap()
            .push((failure.mode, failure.recipients.clone()));
    });
    coordinator.configure(FailingSession).await.unwrap();

    let result = coordinator
        .send(&GameStartMessage::new("default"), Recipient::Others, false)
        .await;

    assert!(result.is_ok());
    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0], (DeliveryMode::Reliable, vec![pid(2)]));
}

// ---------------------------------------------------------------------------
// Receiving
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_malformed_envelope_does_not_stop_listening() {
    let hub = MemoryHub::new();
    let bob_context = GroupContext::new();
    let mut bob_received = record_starts(&bob_context);
    let bob = coordinator(bob_context);
    bob.configure(hub.create_session()).await.unwrap();
    let bob_id = bob.local_participant().await;

    let intruder = hub.create_session();
    intruder.join().await.unwrap();
    let raw = intruder.messenger(DeliveryMode::Reliable);
    let valid = GroupContext::new()
        .encode(&GameStartMessage::new("after"))
        .unwrap();

    raw.send(b"not an envelope".to_vec(), &[bob_id]).await.unwrap();
    raw.send(valid, &[bob_id]).await.unwrap();

    let (message, sender) = recv_within(&mut bob_received).await;
    assert_eq!(message.game_mode, "after");
    assert_eq!(sender, intruder.local_participant());
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_configure_then_cleanup_walks_states() {
    let hub = MemoryHub::new();
    let coordinator = coordinator(GroupContext::new());
    assert_eq!(coordinator.state(), SessionState::Idle);

    coordinator.configure(hub.create_session()).await.unwrap();
    assert_eq!(coordinator.state(), SessionState::Active);
    assert_eq!(hub.members().len(), 1);

    coordinator.cleanup().await;
    assert_eq!(coordinator.state(), SessionState::Idle);
    assert!(hub.members().is_empty());
    assert!(coordinator.active_participants().await.is_empty());
}

#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let hub = MemoryHub::new();
    let coordinator = coordinator(GroupContext::new());

    coordinator.cleanup().await;
    coordinator.configure(hub.create_session()).await.unwrap();
    coordinator.cleanup().await;
    coordinator.cleanup().await;

    assert_eq!(coordinator.state(), SessionState::Idle);
    assert_eq!(coordinator.local_participant().await, pid(900));
}

#[tokio::test]
async fn test_configure_replaces_previous_session() {
    let hub = MemoryHub::new();
    let coordinator = coordinator(GroupContext::new());
    let first = hub.create_session();
    let second = hub.create_session();
    let second_id = second.local_participant();

    coordinator.configure(first).await.unwrap();
    coordinator.configure(second).await.unwrap();

    assert_eq!(hub.members(), vec![second_id]);
    assert_eq!(coordinator.local_participant().await, second_id);
    assert_eq!(coordinator.state(), SessionState::Active);
}

#[tokio::test]
async fn test_cleanup_during_join_delay_supersedes_configure() {
    let hub = MemoryHub::new();
    let coordinator: SessionCoordinator<MemorySession> = SessionCoordinator::new(
        GroupContext::new(),
        SessionConfig {
            join_delay: Duration::from_millis(300),
            local_participant: None,
        },
    );
    let pending = {
        let coordinator = coordinator.clone();
        let session = hub.create_session();
        tokio::spawn(async move { coordinator.configure(session).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.state(), SessionState::Joining);

    coordinator.cleanup().await;

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(SessionError::Superseded)));
    assert_eq!(coordinator.state(), SessionState::Idle);
    assert!(hub.members().is_empty());
}

#[tokio::test]
async fn test_invalidation_cleans_up_and_clears_roster() {
    let hub = MemoryHub::new();
    let roster = RosterHandle::spawn(RosterConfig::default());
    let coordinator: SessionCoordinator<MemorySession> =
        SessionCoordinator::with_roster(GroupContext::new(), roster.clone(), quick_config());
    let session = hub.create_session();
    let id = session.local_participant();

    coordinator.configure(session).await.unwrap();
    let mut view = roster.subscribe();
    tokio::time::timeout(
        Duration::from_secs(1),
        view.wait_for(|v| v.local_player.is_some()),
    )
    .await
    .expect("snapshot applied")
    .unwrap();

    hub.invalidate(id);

    let mut state = coordinator.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(1),
        state.wait_for(|s| *s == SessionState::Idle),
    )
    .await
    .expect("coordinator went idle")
    .unwrap();
    tokio::time::timeout(
        Duration::from_secs(1),
        view.wait_for(|v| v.local_player.is_none() && v.players.is_empty()),
    )
    .await
    .expect("roster cleared")
    .unwrap();
}

#[tokio::test]
async fn test_handler_may_clean_up_its_own_session() {
    let hub = MemoryHub::new();
    let alice = coordinator(GroupContext::new());
    let bob_context = GroupContext::new();
    let bob = coordinator(bob_context.clone());
    {
        let bob = bob.clone();
        bob_context.handlers().on(move |_: GameStartMessage, _sender| {
            let bob = bob.clone();
            async move { bob.cleanup().await }
        });
    }

    alice.configure(hub.create_session()).await.unwrap();
    bob.configure(hub.create_session()).await.unwrap();
    alice
        .send(&GameStartMessage::new("end"), Recipient::Others, false)
        .await
        .unwrap();

    let mut state = bob.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(1),
        state.wait_for(|s| *s == SessionState::Idle),
    )
    .await
    .expect("bob cleaned up")
    .unwrap();
    assert_eq!(alice.state(), SessionState::Active);
}
