//! # Coplay
//!
//! Typed messaging for shared group sessions.
//!
//! Participants of a platform group session exchange strongly typed
//! messages. Coplay wraps each one in a self-describing envelope, routes
//! inbound envelopes to the handler registered for the concrete type, and
//! keeps a seat-numbered player roster in sync with session membership.
//!
//! ## Layers
//!
//! | Crate | Role |
//! |---|---|
//! | [`transport`] | the platform boundary (`GroupSession`, `Messenger`) and an in-memory hub |
//! | [`protocol`] | message types, type registry, envelopes, handler registry |
//! | [`roster`] | seat assignment and the player list |
//! | [`session`] | the session coordinator |
//!
//! This crate ties them together with [`Group`] and [`PlayerManager`],
//! and provides [`logging::init`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coplay::prelude::*;
//!
//! # async fn demo() -> Result<(), CoplayError> {
//! let hub = MemoryHub::new();
//! let group: Group<MemorySession> = GroupBuilder::new().build();
//!
//! group.context().handlers().on(|start: GameStartMessage, sender| async move {
//!     println!("{sender} started a {} game", start.game_mode);
//! });
//!
//! group.configure(hub.create_session()).await?;
//! group.players().update_local_player("Ada").await?;
//! group.players().start_game().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod group;
pub mod logging;
mod players;

pub use error::{CoplayError, LogInitError};
pub use group::{Group, GroupBuilder};
pub use players::{DEFAULT_GAME_MODE, PlayerManager};

pub use coplay_protocol as protocol;
pub use coplay_roster as roster;
pub use coplay_session as session;
pub use coplay_transport as transport;

/// Everything most applications need.
pub mod prelude {
    pub use crate::logging::LogConfig;
    pub use crate::{CoplayError, Group, GroupBuilder, PlayerManager};

    pub use coplay_protocol::messages::{
        EntityStateMessage, EntityTransformMessage, GameEventMessage, GameStartMessage, Player,
        PlayerReadyMessage, Quat, Vec3,
    };
    pub use coplay_protocol::{GroupContext, GroupMessage, MessageHandler};
    pub use coplay_roster::{RosterConfig, RosterView, SeatColor};
    pub use coplay_session::{Recipient, SessionConfig, SessionState};
    pub use coplay_transport::{DeliveryMode, GroupSession, ParticipantId};

    #[cfg(feature = "memory")]
    pub use coplay_transport::{MemoryHub, MemorySession};
}
