//! Local player operations.
//!
//! Every change to the local player is broadcast with local echo, so the
//! local roster is updated through the same `Player` handler as updates
//! from peers.

use coplay_protocol::messages::{GameStartMessage, Player};
use coplay_roster::{RosterError, RosterHandle};
use coplay_session::{Recipient, SessionCoordinator};
use coplay_transport::GroupSession;

use crate::CoplayError;

/// Game mode sent by [`PlayerManager::start_game`].
pub const DEFAULT_GAME_MODE: &str = "default";

/// Updates and broadcasts the local player.
///
/// Obtained from [`Group::players`](crate::Group::players); cheap to clone.
pub struct PlayerManager<S: GroupSession> {
    coordinator: SessionCoordinator<S>,
    roster: RosterHandle,
}

impl<S: GroupSession> Clone for PlayerManager<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            roster: self.roster.clone(),
        }
    }
}

impl<S: GroupSession> PlayerManager<S> {
    /// Operates on `roster` and sends through `coordinator`.
    pub fn new(coordinator: SessionCoordinator<S>, roster: RosterHandle) -> Self {
        Self {
            coordinator,
            roster,
        }
    }

    /// The local player as the roster currently sees it.
    pub fn local_player(&self) -> Option<Player> {
        self.roster.view().local_player
    }

    /// Renames the local player and broadcasts it.
    ///
    /// Creates the local player first if there is none yet: local identity,
    /// score 0, inactive, ready, seat 0.
    ///
    /// # Errors
    /// [`RosterError::EmptyName`] for a blank name; nothing is sent then.
    pub async fn update_local_player(&self, name: impl Into<String>) -> Result<Player, CoplayError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RosterError::EmptyName.into());
        }

        let player = match self.local_player() {
            Some(mut current) => {
                current.name = name;
                current.renewed()
            }
            None => {
                let mut player = Player::new(name, self.coordinator.local_participant().await);
                player.is_ready = true;
                player.is_local_device = true;
                player
            }
        };
        tracing::debug!(player = %player.id, name = %player.name, "updating local player");

        self.roster.set_local(player.clone()).await?;
        self.coordinator
            .send(&player, Recipient::Others, true)
            .await?;
        Ok(player)
    }

    /// Sets the local player's ready flag and broadcasts it.
    ///
    /// Returns `None` without sending anything when there is no local
    /// player yet.
    pub async fn set_local_player_ready(&self, ready: bool) -> Result<Option<Player>, CoplayError> {
        let Some(mut player) = self.local_player() else {
            tracing::debug!(ready, "no local player to mark ready");
            return Ok(None);
        };
        player.is_ready = ready;
        let player = player.renewed();

        self.coordinator
            .send(&player, Recipient::Others, true)
            .await?;
        Ok(Some(player))
    }

    /// Tells the other participants to start a game in `game_mode`.
    ///
    /// Not handled locally: the caller starts its own game directly.
    pub async fn send_start_game(
        &self,
        game_mode: impl Into<String>,
    ) -> Result<GameStartMessage, CoplayError> {
        let message = GameStartMessage::new(game_mode);
        tracing::info!(game = message.id, mode = %message.game_mode, "starting game");
        self.coordinator
            .send(&message, Recipient::Others, false)
            .await?;
        Ok(message)
    }

    /// [`send_start_game`](Self::send_start_game) with [`DEFAULT_GAME_MODE`].
    pub async fn start_game(&self) -> Result<GameStartMessage, CoplayError> {
        self.send_start_game(DEFAULT_GAME_MODE).await
    }
}

impl<S: GroupSession> std::fmt::Debug for PlayerManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerManager")
            .field("local_player", &self.local_player().map(|p| p.name))
            .finish()
    }
}
