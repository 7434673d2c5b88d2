//! Player state and readiness messages.

use coplay_transport::ParticipantId;
use serde::{Deserialize, Serialize};

use crate::message::{GroupMessage, new_message_id};

/// The full state of one player, broadcast whenever it changes.
///
/// Equality is identity-based: two `Player` values with the same `id` and
/// `name` are equal even if their score, flags or seat differ. The roster
/// keys on `id` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default)]
    pub window_id: String,
    #[serde(default = "new_message_id")]
    pub message_id: String,
    pub name: String,
    pub id: ParticipantId,
    pub score: i64,
    pub is_active: bool,
    pub is_ready: bool,
    pub player_seat: u32,
    /// Set on the record that describes the device it lives on.
    pub is_local_device: bool,
}

impl Player {
    /// Creates a player with zero score, no seat and all flags cleared.
    pub fn new(name: impl Into<String>, id: ParticipantId) -> Self {
        Self {
            window_id: String::new(),
            message_id: new_message_id(),
            name: name.into(),
            id,
            score: 0,
            is_active: false,
            is_ready: false,
            player_seat: 0,
            is_local_device: false,
        }
    }

    /// Returns a copy with a fresh `message_id`, for re-broadcasting an
    /// updated record as a new message.
    pub fn renewed(&self) -> Self {
        Self {
            message_id: new_message_id(),
            ..self.clone()
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.id == other.id
    }
}

impl Eq for Player {}

impl GroupMessage for Player {
    fn window_id(&self) -> &str {
        &self.window_id
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}

/// Announces that a player is ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerReadyMessage {
    #[serde(default)]
    pub window_id: String,
    #[serde(default = "new_message_id")]
    pub message_id: String,
    pub id: ParticipantId,
}

impl PlayerReadyMessage {
    pub fn new(id: ParticipantId) -> Self {
        Self {
            window_id: String::new(),
            message_id: new_message_id(),
            id,
        }
    }
}

impl PartialEq for PlayerReadyMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlayerReadyMessage {}

impl GroupMessage for PlayerReadyMessage {
    fn window_id(&self) -> &str {
        &self.window_id
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}
