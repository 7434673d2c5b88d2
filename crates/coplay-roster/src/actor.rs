//! Roster actor: a Tokio task that owns the [`Roster`].
//!
//! Player messages arrive from the handler registry and membership
//! snapshots from the session's subscription loop, on different tasks.
//! Routing both through one command channel makes the actor the single
//! writer; every change is then published on a `watch` channel for
//! observers.

use coplay_protocol::messages::Player;
use tokio::sync::{mpsc, oneshot, watch};

use crate::{MembershipSnapshot, Roster, RosterConfig, RosterError, RosterView};

/// Commands sent to the roster actor.
enum RosterCommand {
    ApplyPlayer {
        player: Player,
        reply: oneshot::Sender<()>,
    },
    ApplySnapshot {
        snapshot: MembershipSnapshot,
        reply: oneshot::Sender<()>,
    },
    SetLocal {
        player: Player,
        reply: oneshot::Sender<()>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Handle to a running roster actor.
///
/// Cheap to clone. Every mutating call waits until the actor has applied
/// the change, so a caller that awaits it can read [`view`](Self::view)
/// and see its own update.
#[derive(Clone)]
pub struct RosterHandle {
    sender: mpsc::Sender<RosterCommand>,
    view: watch::Receiver<RosterView>,
}

impl RosterHandle {
    /// Spawns a roster actor on the current Tokio runtime.
    pub fn spawn(config: RosterConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_size.max(1));
        let (view_tx, view_rx) = watch::channel(RosterView::default());

        let actor = RosterActor {
            roster: Roster::new(),
            config,
            receiver: rx,
            view: view_tx,
        };
        tokio::spawn(actor.run());

        Self {
            sender: tx,
            view: view_rx,
        }
    }

    /// Upserts a player record.
    pub async fn apply_player(&self, player: Player) -> Result<(), RosterError> {
        self.request(|reply| RosterCommand::ApplyPlayer { player, reply })
            .await
    }

    /// Re-seats from a membership snapshot.
    pub async fn apply_snapshot(&self, snapshot: MembershipSnapshot) -> Result<(), RosterError> {
        self.request(|reply| RosterCommand::ApplySnapshot { snapshot, reply })
            .await
    }

    /// Replaces the local player record.
    pub async fn set_local(&self, player: Player) -> Result<(), RosterError> {
        self.request(|reply| RosterCommand::SetLocal { player, reply })
            .await
    }

    /// Empties the roster.
    pub async fn clear(&self) -> Result<(), RosterError> {
        self.request(|reply| RosterCommand::Clear { reply }).await
    }

    /// Stops the actor. Later calls return [`RosterError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), RosterError> {
        self.sender
            .send(RosterCommand::Shutdown)
            .await
            .map_err(|_| RosterError::Unavailable)
    }

    /// The latest published roster.
    pub fn view(&self) -> RosterView {
        self.view.borrow().clone()
    }

    /// A receiver that is notified after every roster change.
    pub fn subscribe(&self) -> watch::Receiver<RosterView> {
        self.view.clone()
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<()>) -> RosterCommand,
    ) -> Result<(), RosterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RosterError::Unavailable)?;
        reply_rx.await.map_err(|_| RosterError::Unavailable)
    }
}

impl std::fmt::Debug for RosterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterHandle")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

struct RosterActor {
    roster: Roster,
    config: RosterConfig,
    receiver: mpsc::Receiver<RosterCommand>,
    view: watch::Sender<RosterView>,
}

impl RosterActor {
    async fn run(mut self) {
        tracing::info!("roster actor started");

        while let Some(cmd) = self.receiver.recv().await {
            let reply = match cmd {
                RosterCommand::ApplyPlayer { player, reply } => {
                    tracing::debug!(player = %player.id, name = %player.name, "player update");
                    self.roster.apply_player(player);
                    reply
                }
                RosterCommand::ApplySnapshot { snapshot, reply } => {
                    self.roster.apply_snapshot(&snapshot, &self.config);
                    tracing::debug!(
                        local = %snapshot.local,
                        participants = snapshot.participants.len(),
                        total_seats = self.roster.seats().total_seats,
                        "membership snapshot applied"
                    );
                    reply
                }
                RosterCommand::SetLocal { player, reply } => {
                    self.roster.set_local(player);
                    reply
                }
                RosterCommand::Clear { reply } => {
                    self.roster.clear();
                    tracing::debug!("roster cleared");
                    reply
                }
                RosterCommand::Shutdown => break,
            };

            // Publish before acknowledging so the caller sees its change.
            self.view.send_replace(self.roster.view());
            let _ = reply.send(());
        }

        tracing::info!("roster actor stopped");
    }
}
