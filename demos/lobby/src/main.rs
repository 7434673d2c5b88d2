//! Two participants in one in-memory session: they name themselves, get
//! ready, chat with a custom message type and start a game.
//!
//! Run with `RUST_LOG=debug` to see envelope routing.

use std::time::Duration;

use coplay::logging::{self, LogConfig};
use coplay::prelude::*;
use coplay::protocol::new_message_id;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// A game-specific message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatLine {
    #[serde(default)]
    window_id: String,
    #[serde(default = "new_message_id")]
    message_id: String,
    text: String,
}

impl ChatLine {
    fn new(text: impl Into<String>) -> Self {
        Self {
            window_id: String::new(),
            message_id: new_message_id(),
            text: text.into(),
        }
    }
}

impl GroupMessage for ChatLine {
    fn window_id(&self) -> &str {
        &self.window_id
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn participant(label: &'static str) -> Group<MemorySession> {
    let context = GroupContext::new();
    context.types().register::<ChatLine>("chatLineMessage");

    context.handlers().on(move |line: ChatLine, sender| async move {
        tracing::info!(at = label, %sender, text = %line.text, "chat");
    });
    context.handlers().on(move |start: GameStartMessage, sender| async move {
        tracing::info!(at = label, %sender, mode = %start.game_mode, "game starting");
    });
    context.handlers().on(move |t: EntityTransformMessage, _sender| async move {
        tracing::debug!(at = label, entity = %t.entity_id, x = t.position.x, "entity moved");
    });

    GroupBuilder::new()
        .context(context)
        .session_config(SessionConfig {
            join_delay: Duration::from_millis(100),
            local_participant: None,
        })
        .build()
}

fn print_roster(label: &str, view: &RosterView) {
    for player in &view.players {
        let seat = view.seats.seat_of(player.id).unwrap_or(player.player_seat);
        tracing::info!(
            at = label,
            name = %player.name,
            id = %player.id,
            seat,
            color = %SeatColor::for_seat(seat),
            ready = player.is_ready,
            "roster entry"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&LogConfig::default())?;

    let hub = MemoryHub::new();
    let ada = participant("ada");
    let linus = participant("linus");

    ada.configure(hub.create_session()).await?;
    linus.configure(hub.create_session()).await?;

    ada.players().update_local_player("Ada").await?;
    linus.players().update_local_player("Linus").await?;
    ada.players().set_local_player_ready(true).await?;
    linus.players().set_local_player_ready(true).await?;

    ada.coordinator()
        .send(&ChatLine::new("ready when you are"), Recipient::Others, true)
        .await?;
    ada.coordinator()
        .send_unreliable(
            &EntityTransformMessage::new("ball", Vec3::new(0.5, 1.0, 0.0), Quat::IDENTITY, Vec3::ONE),
            Recipient::Others,
            false,
        )
        .await?;
    linus.players().start_game().await?;

    // Let the last envelopes land before printing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    print_roster("ada", &ada.roster().view());
    print_roster("linus", &linus.roster().view());

    ada.cleanup().await;
    linus.cleanup().await;
    Ok(())
}
