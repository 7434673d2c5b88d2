//! Built-in message variants.
//!
//! Every [`TypeRegistry`](crate::TypeRegistry) created with
//! [`TypeRegistry::new`](crate::TypeRegistry::new) or
//! [`TypeRegistry::with_codec`](crate::TypeRegistry::with_codec) knows
//! these under the identifiers in [`identifiers`].

mod entity;
mod game;
mod player;

pub use entity::{EntityStateMessage, EntityTransformMessage, Quat, Vec3};
pub use game::{GameEventMessage, GameStartMessage};
pub use player::{Player, PlayerReadyMessage};

use crate::{Codec, TypeRegistry};

/// Wire identifiers of the built-in variants.
pub mod identifiers {
    pub const PLAYER: &str = "playerMessage";
    pub const PLAYER_READY: &str = "playerReadyMessage";
    pub const GAME_START: &str = "game_StartMessage";
    pub const GAME_EVENT: &str = "gameEventMessage";
    pub const ENTITY_TRANSFORM: &str = "entityTransformMessage";
    pub const ENTITY_STATE: &str = "entityStateMessage";
}

pub(crate) fn register_builtins<C: Codec>(registry: &TypeRegistry<C>) {
    registry.register::<Player>(identifiers::PLAYER);
    registry.register::<PlayerReadyMessage>(identifiers::PLAYER_READY);
    registry.register::<GameStartMessage>(identifiers::GAME_START);
    registry.register::<GameEventMessage>(identifiers::GAME_EVENT);
    registry.register::<EntityTransformMessage>(identifiers::ENTITY_TRANSFORM);
    registry.register::<EntityStateMessage>(identifiers::ENTITY_STATE);
}
