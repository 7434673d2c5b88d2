//! In-process group session transport.
//!
//! A [`MemoryHub`] plays the role of the platform: it hands out
//! [`MemorySession`]s, tracks who has joined, and routes frames between
//! their messengers through unbounded channels. Nothing leaves the
//! process, which makes it the transport of choice for tests and demos.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{self, BoxStream};
use rand::Rng;
use tokio::sync::{mpsc, watch};

use crate::{
    DeliveryMode, GroupSession, Incoming, Messenger, ParticipantId, TransportError,
};

/// Configuration for a [`MemoryHub`].
#[derive(Debug, Clone)]
pub struct MemoryHubConfig {
    /// Probability (0.0–1.0) that a frame sent on the unreliable channel
    /// is silently lost. Reliable frames are never lost.
    pub unreliable_drop_rate: f64,
}

impl Default for MemoryHubConfig {
    fn default() -> Self {
        Self {
            unreliable_drop_rate: 0.0,
        }
    }
}

/// An in-process stand-in for the platform's group session service.
///
/// Cheap to clone; all clones share the same participants.
#[derive(Clone)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: MemoryHubConfig,
    next_id: AtomicU64,
    send_calls: AtomicU64,
    membership: watch::Sender<Vec<ParticipantId>>,
    state: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    /// Joined participants, in join order.
    members: Vec<ParticipantId>,
    inboxes: HashMap<(ParticipantId, DeliveryMode), mpsc::UnboundedSender<Incoming>>,
    alive: HashMap<ParticipantId, watch::Sender<bool>>,
    invalidated: HashSet<ParticipantId>,
}

impl MemoryHub {
    /// Creates a hub with default settings (lossless unreliable channel).
    pub fn new() -> Self {
        Self::with_config(MemoryHubConfig::default())
    }

    /// Creates a hub with the given settings.
    pub fn with_config(config: MemoryHubConfig) -> Self {
        let (membership, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(HubInner {
                config,
                next_id: AtomicU64::new(1),
                send_calls: AtomicU64::new(0),
                membership,
                state: Mutex::new(HubState::default()),
            }),
        }
    }

    /// Creates a session for a new participant. The participant becomes
    /// active once it calls [`GroupSession::join`].
    pub fn create_session(&self) -> MemorySession {
        let id = ParticipantId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (alive_tx, alive_rx) = watch::channel(true);
        self.state().alive.insert(id, alive_tx);
        tracing::debug!(participant = %id, "memory session created");
        MemorySession {
            id,
            hub: self.clone(),
            alive: alive_rx,
        }
    }

    /// Invalidates a participant's session, as the platform would when the
    /// activity ends. Its membership and incoming streams end.
    pub fn invalidate(&self, participant: ParticipantId) {
        {
            let mut state = self.state();
            state.invalidated.insert(participant);
            state.remove(participant);
        }
        self.publish_membership();
        tracing::info!(%participant, "memory session invalidated");
    }

    /// Currently joined participants, in join order.
    pub fn members(&self) -> Vec<ParticipantId> {
        self.state().members.clone()
    }

    /// Number of [`Messenger::send`] calls made through this hub.
    pub fn send_count(&self) -> u64 {
        self.inner.send_calls.load(Ordering::Relaxed)
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_membership(&self) {
        let members = self.members();
        self.inner.membership.send_replace(members);
    }

    fn should_drop(&self, mode: DeliveryMode) -> bool {
        let rate = self.inner.config.unreliable_drop_rate.clamp(0.0, 1.0);
        mode == DeliveryMode::Unreliable && rate > 0.0 && rand::rng().random_bool(rate)
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl HubState {
    fn remove(&mut self, participant: ParticipantId) {
        self.members.retain(|m| *m != participant);
        self.inboxes.retain(|(owner, _), _| *owner != participant);
        if let Some(alive) = self.alive.remove(&participant) {
            alive.send_replace(false);
        }
    }
}

/// One participant's view of a [`MemoryHub`].
pub struct MemorySession {
    id: ParticipantId,
    hub: MemoryHub,
    alive: watch::Receiver<bool>,
}

impl MemorySession {
    /// The hub this session belongs to.
    pub fn hub(&self) -> &MemoryHub {
        &self.hub
    }
}

impl GroupSession for MemorySession {
    type Messenger = MemoryMessenger;

    fn local_participant(&self) -> ParticipantId {
        self.id
    }

    fn active_participants(&self) -> Vec<ParticipantId> {
        self.hub.members()
    }

    fn participant_updates(&self) -> BoxStream<'static, Vec<ParticipantId>> {
        let membership = self.hub.inner.membership.subscribe();
        let alive = self.alive.clone();

        Box::pin(stream::unfold(
            (membership, alive, true),
            |(mut membership, mut alive, first)| async move {
                if !*alive.borrow() {
                    return None;
                }
                if first {
                    let snapshot = membership.borrow_and_update().clone();
                    return Some((snapshot, (membership, alive, false)));
                }
                loop {
                    tokio::select! {
                        changed = membership.changed() => {
                            changed.ok()?;
                            if !*alive.borrow() {
                                return None;
                            }
                            let snapshot = membership.borrow_and_update().clone();
                            return Some((snapshot, (membership, alive, false)));
                        }
                        changed = alive.changed() => {
                            changed.ok()?;
                            if !*alive.borrow_and_update() {
                                return None;
                            }
                        }
                    }
                }
            },
        ))
    }

    fn messenger(&self, mode: DeliveryMode) -> MemoryMessenger {
        let (tx, rx) = mpsc::unbounded_channel();
        // A newer messenger for the same mode replaces the older inbox,
        // which ends the older messenger's incoming stream.
        self.hub.state().inboxes.insert((self.id, mode), tx);
        MemoryMessenger {
            owner: self.id,
            mode,
            hub: self.hub.clone(),
            receiver: Mutex::new(Some(rx)),
        }
    }

    /// Joins the hub. A session that has left or been invalidated can't
    /// join again; create a new one instead.
    async fn join(&self) -> Result<(), TransportError> {
        {
            let mut state = self.hub.state();
            if state.invalidated.contains(&self.id) || !*self.alive.borrow() {
                return Err(TransportError::Invalidated);
            }
            if !state.members.contains(&self.id) {
                state.members.push(self.id);
            }
        }
        self.hub.publish_membership();
        tracing::info!(participant = %self.id, "joined memory session");
        Ok(())
    }

    fn leave(&self) {
        let was_member = {
            let mut state = self.hub.state();
            let was_member = state.members.contains(&self.id);
            state.remove(self.id);
            was_member
        };
        if was_member {
            self.hub.publish_membership();
            tracing::info!(participant = %self.id, "left memory session");
        }
    }
}

/// A messenger routed through a [`MemoryHub`].
pub struct MemoryMessenger {
    owner: ParticipantId,
    mode: DeliveryMode,
    hub: MemoryHub,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Incoming>>>,
}

impl Messenger for MemoryMessenger {
    async fn send(
        &self,
        data: Vec<u8>,
        to: &[ParticipantId],
    ) -> Result<(), TransportError> {
        self.hub.inner.send_calls.fetch_add(1, Ordering::Relaxed);

        let targets = {
            let state = self.hub.state();
            if !state.members.contains(&self.owner) {
                return Err(TransportError::NotJoined);
            }
            let mut targets = Vec::with_capacity(to.len());
            for recipient in to {
                if !state.members.contains(recipient) {
                    return Err(TransportError::UnknownParticipant(*recipient));
                }
                if let Some(inbox) = state.inboxes.get(&(*recipient, self.mode)) {
                    targets.push((*recipient, inbox.clone()));
                }
            }
            targets
        };

        for (recipient, inbox) in targets {
            if self.hub.should_drop(self.mode) {
                tracing::trace!(from = %self.owner, to = %recipient, "unreliable frame lost");
                continue;
            }
            let frame = Incoming {
                data: data.clone(),
                sender: self.owner,
            };
            if inbox.send(frame).is_err() {
                tracing::trace!(to = %recipient, "recipient inbox closed");
            }
        }
        Ok(())
    }

    fn incoming(&self) -> BoxStream<'static, Incoming> {
        let taken = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(rx) => Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|frame| (frame, rx))
            })),
            None => {
                tracing::debug!(
                    participant = %self.owner,
                    mode = %self.mode,
                    "incoming stream already taken"
                );
                Box::pin(stream::empty())
            }
        }
    }

    fn delivery_mode(&self) -> DeliveryMode {
        self.mode
    }
}
