//! Bridges the handler registry to the roster actor.

use coplay_protocol::MessageHandler;
use coplay_protocol::messages::Player;
use coplay_transport::ParticipantId;

use crate::RosterHandle;

/// Forwards every dispatched [`Player`] message to a roster.
///
/// Register it with the context's handler registry so local echoes and
/// remote updates take the same path into the roster.
#[derive(Debug, Clone)]
pub struct PlayerMessageHandler {
    roster: RosterHandle,
}

impl PlayerMessageHandler {
    /// Forwards to `roster`.
    pub fn new(roster: RosterHandle) -> Self {
        Self { roster }
    }
}

impl MessageHandler for PlayerMessageHandler {
    type Message = Player;

    async fn handle(&self, message: Player, sender: ParticipantId) {
        if let Err(e) = self.roster.apply_player(message).await {
            tracing::warn!(%sender, error = %e, "player update dropped");
        }
    }
}
