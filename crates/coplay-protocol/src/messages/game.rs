//! Game lifecycle and gameplay event messages.

use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};

use crate::message::{GroupMessage, new_message_id};

/// Tells every participant that a game is starting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartMessage {
    #[serde(default)]
    pub window_id: String,
    #[serde(default = "new_message_id")]
    pub message_id: String,
    pub id: u64,
    pub game_mode: String,
}

impl GameStartMessage {
    /// Creates a start message with a random game id.
    pub fn new(game_mode: impl Into<String>) -> Self {
        Self {
            window_id: String::new(),
            message_id: new_message_id(),
            id: rand::random(),
            game_mode: game_mode.into(),
        }
    }
}

impl PartialEq for GameStartMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl GroupMessage for GameStartMessage {
    fn window_id(&self) -> &str {
        &self.window_id
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}

/// A numeric gameplay event attributed to a seat (a hit, a score change,
/// a power level).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEventMessage {
    #[serde(default)]
    pub window_id: String,
    #[serde(default = "new_message_id")]
    pub message_id: String,
    pub id: u64,
    pub player_seat: u32,
    /// Must be finite; NaN and infinities fail to encode.
    #[serde(serialize_with = "finite_value")]
    pub value: f64,
}

impl GameEventMessage {
    pub fn new(player_seat: u32, value: f64) -> Self {
        Self {
            window_id: String::new(),
            message_id: new_message_id(),
            id: rand::random(),
            player_seat,
            value,
        }
    }
}

fn finite_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !value.is_finite() {
        return Err(ser::Error::custom(format!("non-finite event value {value}")));
    }
    serializer.serialize_f64(*value)
}

impl PartialEq for GameEventMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl GroupMessage for GameEventMessage {
    fn window_id(&self) -> &str {
        &self.window_id
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}
