//! The registry context object.
//!
//! Instead of process-wide singletons, the type registry and the handler
//! registry are bundled into a [`GroupContext`] that is built once and
//! cloned into every component that needs it (the session coordinator,
//! the roster, application code registering handlers). Clones share the
//! same registries.

use std::sync::Arc;

use coplay_transport::ParticipantId;

use crate::codec::JsonCodec;
use crate::message::{AnyMessage, GroupMessage};
use crate::{Codec, HandlerRegistry, ProtocolError, TypeRegistry, envelope};

/// Shared type and handler registries.
pub struct GroupContext<C: Codec = JsonCodec> {
    types: Arc<TypeRegistry<C>>,
    handlers: Arc<HandlerRegistry>,
}

impl GroupContext<JsonCodec> {
    /// A JSON context with the built-in message types and no handlers.
    pub fn new() -> Self {
        Self::from_parts(Arc::new(TypeRegistry::new()), Arc::new(HandlerRegistry::new()))
    }
}

impl Default for GroupContext<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> GroupContext<C> {
    /// A context over `codec` with the built-in message types.
    pub fn with_codec(codec: C) -> Self {
        Self::from_parts(
            Arc::new(TypeRegistry::with_codec(codec)),
            Arc::new(HandlerRegistry::new()),
        )
    }

    /// Assembles a context from existing registries.
    pub fn from_parts(types: Arc<TypeRegistry<C>>, handlers: Arc<HandlerRegistry>) -> Self {
        Self { types, handlers }
    }

    /// The type registry envelopes are encoded and decoded with.
    pub fn types(&self) -> &TypeRegistry<C> {
        &self.types
    }

    /// The handler registry decoded messages are dispatched to.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Encodes `message` into envelope bytes.
    pub fn encode<M: GroupMessage>(&self, message: &M) -> Result<Vec<u8>, ProtocolError> {
        envelope::encode(&self.types, message)
    }

    /// Decodes envelope bytes into the concrete message they carry.
    pub fn decode(&self, data: &[u8]) -> Result<Box<dyn AnyMessage>, ProtocolError> {
        envelope::decode(&self.types, data)
    }

    /// Hands a decoded message to its handler, if any.
    pub async fn dispatch(&self, message: Box<dyn AnyMessage>, sender: ParticipantId) {
        self.handlers.dispatch(message, sender).await;
    }
}

impl<C: Codec> Clone for GroupContext<C> {
    fn clone(&self) -> Self {
        Self {
            types: Arc::clone(&self.types),
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<C: Codec> std::fmt::Debug for GroupContext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupContext")
            .field("types", &self.types)
            .field("handlers", &self.handlers)
            .finish()
    }
}
