//! The session coordinator.
//!
//! Owns the current platform session, its two messengers and the two
//! long-lived subscription loops bound to it:
//!
//! - the **envelope loop** reads frames from both messengers, decodes
//!   them and dispatches them through the handler registry;
//! - the **membership loop** forwards membership snapshots to the roster
//!   and, when the platform ends the stream, cleans the session up.
//!
//! Everything that sends goes through [`SessionCoordinator::send`]; no
//! other component ever holds a messenger.
//!
//! # Generations
//!
//! Every `configure` and every `cleanup` bumps an epoch counter. Work
//! that was started for one session (a pending join, an invalidation
//! noticed by a membership loop) checks the epoch before touching shared
//! state, so a stale session can never tear down or activate its
//! replacement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use coplay_protocol::{Codec, GroupContext, GroupMessage, JsonCodec};
use coplay_roster::{MembershipSnapshot, RosterHandle};
use coplay_transport::{
    DeliveryMode, GroupSession, Incoming, Messenger, ParticipantId, TransportError,
};
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::StreamExt;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::{Recipient, SessionConfig, SessionError, SessionState};

/// A transmission the messenger rejected.
#[derive(Debug)]
pub struct SendFailure {
    /// Rust type name of the message.
    pub message_type: &'static str,
    /// Channel it was sent on.
    pub mode: DeliveryMode,
    /// Who it was addressed to.
    pub recipients: Vec<ParticipantId>,
    /// What the messenger reported.
    pub error: TransportError,
}

type FailureHook = Arc<dyn Fn(&SendFailure) + Send + Sync>;

struct ActiveSession<S: GroupSession> {
    epoch: u64,
    session: Arc<S>,
    reliable: Arc<S::Messenger>,
    unreliable: Arc<S::Messenger>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner<S: GroupSession, C: Codec> {
    context: GroupContext<C>,
    roster: Option<RosterHandle>,
    config: SessionConfig,
    /// Sender identity for local echoes while no session is active.
    fallback_local: ParticipantId,
    active: Mutex<Option<ActiveSession<S>>>,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
    on_send_failure: RwLock<Option<FailureHook>>,
}

impl<S: GroupSession, C: Codec> Drop for Inner<S, C> {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            for task in &active.tasks {
                task.abort();
            }
            active.session.leave();
        }
    }
}

/// Coordinates one group session at a time.
///
/// Cheap to clone; clones share the same session.
///
/// ```rust,no_run
/// use coplay_protocol::{GroupContext, messages::GameStartMessage};
/// use coplay_session::{Recipient, SessionConfig, SessionCoordinator};
/// use coplay_transport::{MemoryHub, MemorySession};
///
/// # async fn demo() -> Result<(), coplay_session::SessionError> {
/// let hub = MemoryHub::new();
/// let coordinator: SessionCoordinator<MemorySession> =
///     SessionCoordinator::new(GroupContext::new(), SessionConfig::default());
///
/// coordinator.configure(hub.create_session()).await?;
/// coordinator
///     .send(&GameStartMessage::new("default"), Recipient::Others, true)
///     .await?;
/// coordinator.cleanup().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionCoordinator<S: GroupSession, C: Codec = JsonCodec> {
    inner: Arc<Inner<S, C>>,
}

impl<S: GroupSession, C: Codec> Clone for SessionCoordinator<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GroupSession, C: Codec> SessionCoordinator<S, C> {
    /// Creates an idle coordinator without a roster.
    pub fn new(context: GroupContext<C>, config: SessionConfig) -> Self {
        Self::build(context, None, config)
    }

    /// Creates an idle coordinator that feeds membership snapshots to
    /// `roster` and clears it on teardown.
    pub fn with_roster(context: GroupContext<C>, roster: RosterHandle, config: SessionConfig) -> Self {
        Self::build(context, Some(roster), config)
    }

    fn build(context: GroupContext<C>, roster: Option<RosterHandle>, config: SessionConfig) -> Self {
        let fallback_local = config
            .local_participant
            .unwrap_or_else(|| ParticipantId::new(rand::random()));
        let (state, _) = watch::channel(SessionState::Idle);

        Self {
            inner: Arc::new(Inner {
                context,
                roster,
                config,
                fallback_local,
                active: Mutex::new(None),
                state,
                epoch: AtomicU64::new(0),
                on_send_failure: RwLock::new(None),
            }),
        }
    }

    /// The registries this coordinator encodes and dispatches with.
    pub fn context(&self) -> &GroupContext<C> {
        &self.inner.context
    }

    /// The roster membership snapshots go to, if any.
    pub fn roster(&self) -> Option<&RosterHandle> {
        self.inner.roster.as_ref()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Installs the hook that is told about failed transmissions,
    /// replacing any previous one.
    pub fn on_send_failure(&self, hook: impl Fn(&SendFailure) + Send + Sync + 'static) {
        *self
            .inner
            .on_send_failure
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    /// This device's identity: the session's local participant, or the
    /// configured fallback while no session is active.
    pub async fn local_participant(&self) -> ParticipantId {
        let active = self.inner.active.lock().await;
        active
            .as_ref()
            .map_or(self.inner.fallback_local, |a| a.session.local_participant())
    }

    /// Active participants of the current session; empty when idle.
    pub async fn active_participants(&self) -> Vec<ParticipantId> {
        let active = self.inner.active.lock().await;
        active
            .as_ref()
            .map(|a| a.session.active_participants())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Replaces the current session with `session` and joins it.
    ///
    /// Tears down any existing session first, waits
    /// [`SessionConfig::join_delay`], starts both subscription loops and
    /// joins. The state is [`SessionState::Active`] when this returns `Ok`.
    ///
    /// # Errors
    /// - [`SessionError::Superseded`] if another `configure` or a
    ///   `cleanup` ran before this one finished.
    /// - [`SessionError::Transport`] if the platform refused the join; the
    ///   session is cleaned up again in that case.
    pub async fn configure(&self, session: S) -> Result<(), SessionError> {
        self.cleanup().await;

        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let local = session.local_participant();
        self.inner.state.send_replace(SessionState::Joining);
        tracing::info!(%local, epoch, "configuring session");

        if !self.inner.config.join_delay.is_zero() {
            tokio::time::sleep(self.inner.config.join_delay).await;
        }

        let session = Arc::new(session);
        {
            let mut active = self.inner.active.lock().await;
            if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                tracing::debug!(%local, epoch, "session replaced before joining");
                return Err(SessionError::Superseded);
            }

            let reliable = Arc::new(session.messenger(DeliveryMode::Reliable));
            let unreliable = Arc::new(session.messenger(DeliveryMode::Unreliable));
            let incoming = stream::select(reliable.incoming(), unreliable.incoming());

            let tasks = vec![
                tokio::spawn(envelope_loop(self.inner.context.clone(), incoming)),
                tokio::spawn(membership_loop(
                    Arc::downgrade(&self.inner),
                    self.inner.roster.clone(),
                    local,
                    session.participant_updates(),
                    epoch,
                )),
            ];

            *active = Some(ActiveSession {
                epoch,
                session: Arc::clone(&session),
                reliable,
                unreliable,
                tasks,
            });
        }

        if let Err(e) = session.join().await {
            tracing::warn!(%local, error = %e, "join failed");
            self.cleanup_epoch(epoch).await;
            return Err(e.into());
        }

        let active = self.inner.active.lock().await;
        match active.as_ref() {
            Some(current) if current.epoch == epoch => {
                self.inner.state.send_replace(SessionState::Active);
                tracing::info!(%local, epoch, "session active");
                Ok(())
            }
            _ => Err(SessionError::Superseded),
        }
    }

    /// Leaves and forgets the current session.
    ///
    /// Safe to call in any state and any number of times. When it returns
    /// the state is [`SessionState::Idle`], both loops have stopped and
    /// the roster is empty.
    pub async fn cleanup(&self) {
        let taken = {
            let mut active = self.inner.active.lock().await;
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            self.inner.state.send_replace(SessionState::Idle);
            active.take()
        };
        self.teardown(taken).await;
    }

    /// Cleans up only if `epoch` is still the active session.
    async fn cleanup_epoch(&self, epoch: u64) {
        let taken = {
            let mut active = self.inner.active.lock().await;
            if !active.as_ref().is_some_and(|a| a.epoch == epoch) {
                return;
            }
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            self.inner.state.send_replace(SessionState::Idle);
            active.take()
        };
        self.teardown(taken).await;
    }

    async fn teardown(&self, active: Option<ActiveSession<S>>) {
        let Some(active) = active else {
            tracing::debug!("cleanup with no active session");
            return;
        };
        let epoch = active.epoch;
        let roster = self.inner.roster.clone();

        // On its own task: a handler that calls cleanup from inside the
        // envelope loop aborts its own task here.
        let teardown = tokio::spawn(async move {
            active.session.leave();
            for task in &active.tasks {
                task.abort();
            }
            for task in active.tasks {
                let _ = task.await;
            }
            if let Some(roster) = roster {
                if let Err(e) = roster.clear().await {
                    tracing::warn!(error = %e, "roster not cleared");
                }
            }
        });
        if let Err(e) = teardown.await {
            tracing::warn!(epoch, error = %e, "session teardown did not complete");
        }

        tracing::info!(epoch, "session cleaned up");
    }

    // -----------------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------------

    /// Sends `message` on the reliable channel.
    ///
    /// With `handle_locally`, the message is first dispatched to this
    /// device's own handlers (sender = [`local_participant`]) whether or
    /// not a session is active. Without an active session nothing is
    /// transmitted. Transmission errors go to the failure hook and the
    /// log.
    ///
    /// # Errors
    /// Only [`SessionError::Protocol`], when the message can't be encoded.
    /// Nothing is dispatched or transmitted then.
    ///
    /// [`local_participant`]: Self::local_participant
    pub async fn send<M: GroupMessage>(
        &self,
        message: &M,
        to: Recipient,
        handle_locally: bool,
    ) -> Result<(), SessionError> {
        self.transmit(message, to, handle_locally, DeliveryMode::Reliable)
            .await
    }

    /// Like [`send`](Self::send), on the unreliable channel.
    pub async fn send_unreliable<M: GroupMessage>(
        &self,
        message: &M,
        to: Recipient,
        handle_locally: bool,
    ) -> Result<(), SessionError> {
        self.transmit(message, to, handle_locally, DeliveryMode::Unreliable)
            .await
    }

    async fn transmit<M: GroupMessage>(
        &self,
        message: &M,
        to: Recipient,
        handle_locally: bool,
        mode: DeliveryMode,
    ) -> Result<(), SessionError> {
        let message_type = std::any::type_name::<M>();
        let bytes = self.inner.context.encode(message).inspect_err(|e| {
            tracing::warn!(message_type, error = %e, "message not sent");
        })?;

        if handle_locally {
            let local = self.local_participant().await;
            tracing::trace!(message_type, %local, "local echo");
            self.inner.context.dispatch(Box::new(message.clone()), local).await;
        }

        let route = {
            let active = self.inner.active.lock().await;
            active.as_ref().map(|a| {
                let messenger = match mode {
                    DeliveryMode::Reliable => Arc::clone(&a.reliable),
                    DeliveryMode::Unreliable => Arc::clone(&a.unreliable),
                };
                let recipients =
                    to.resolve(a.session.local_participant(), &a.session.active_participants());
                (messenger, recipients)
            })
        };

        let Some((messenger, recipients)) = route else {
            tracing::trace!(message_type, "no active session, nothing transmitted");
            return Ok(());
        };
        if recipients.is_empty() {
            tracing::trace!(message_type, "no recipients, nothing transmitted");
            return Ok(());
        }

        tracing::trace!(
            message_type,
            %mode,
            recipients = recipients.len(),
            bytes = bytes.len(),
            "sending envelope"
        );
        let result = messenger.send(bytes, &recipients).await;
        if let Err(error) = result {
            tracing::warn!(message_type, %mode, error = %error, "transmission failed");
            self.report_failure(SendFailure {
                message_type,
                mode,
                recipients,
                error,
            });
        }
        Ok(())
    }

    fn report_failure(&self, failure: SendFailure) {
        let hook = self
            .inner
            .on_send_failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook(&failure);
        }
    }
}

impl<S: GroupSession, C: Codec> std::fmt::Debug for SessionCoordinator<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("state", &self.state())
            .field("epoch", &self.inner.epoch.load(Ordering::SeqCst))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription loops
// ---------------------------------------------------------------------------

/// Decodes and dispatches every inbound frame. One bad envelope is logged
/// and dropped; the loop keeps going until the messengers close.
async fn envelope_loop<C: Codec>(
    context: GroupContext<C>,
    mut incoming: impl Stream<Item = Incoming> + Unpin,
) {
    while let Some(frame) = incoming.next().await {
        match context.decode(&frame.data) {
            Ok(message) => {
                tracing::trace!(
                    sender = %frame.sender,
                    message_type = message.type_name(),
                    "envelope received"
                );
                context.dispatch(message, frame.sender).await;
            }
            Err(e) => {
                tracing::warn!(sender = %frame.sender, error = %e, "inbound envelope dropped");
            }
        }
    }
    tracing::debug!("envelope stream ended");
}

/// Feeds membership snapshots to the roster. When the stream ends the
/// platform has invalidated the session, so it is cleaned up, provided it
/// is still the current one.
async fn membership_loop<S: GroupSession, C: Codec>(
    inner: Weak<Inner<S, C>>,
    roster: Option<RosterHandle>,
    local: ParticipantId,
    mut updates: BoxStream<'static, Vec<ParticipantId>>,
    epoch: u64,
) {
    while let Some(participants) = updates.next().await {
        tracing::debug!(%local, participants = participants.len(), "membership changed");
        if let Some(roster) = &roster {
            let snapshot = MembershipSnapshot {
                local,
                participants,
            };
            if let Err(e) = roster.apply_snapshot(snapshot).await {
                tracing::warn!(error = %e, "membership snapshot dropped");
            }
        }
    }

    tracing::info!(%local, epoch, "membership stream ended");
    if let Some(inner) = inner.upgrade() {
        SessionCoordinator { inner }.cleanup_epoch(epoch).await;
    }
}
