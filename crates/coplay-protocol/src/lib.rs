//! Message protocol for Coplay.
//!
//! This crate is the polymorphic core: it turns an open-ended set of
//! typed messages into one wire format and back, and routes decoded
//! messages to the handler registered for their type.
//!
//! - **Messages** ([`GroupMessage`], [`AnyMessage`], [`messages`]): the
//!   payloads and their type-erased form.
//! - **Type registry** ([`TypeRegistry`]): identifier ↔ type, both ways.
//! - **Envelope** ([`Envelope`], [`encode`], [`decode`]): `type` + `base`
//!   on the wire.
//! - **Handlers** ([`HandlerRegistry`], [`MessageHandler`]): one handler
//!   per type, looked up by runtime type identity.
//! - **Context** ([`GroupContext`]): both registries, shared.
//!
//! ```text
//! Player ─encode─► Envelope bytes ─transport─► decode ─► Box<dyn AnyMessage> ─dispatch─► handler
//! ```

mod codec;
mod context;
mod envelope;
mod error;
mod handler;
mod message;
pub mod messages;
mod registry;

pub use codec::{Codec, JsonCodec};
pub use context::GroupContext;
pub use envelope::{Envelope, decode, encode};
pub use error::ProtocolError;
pub use handler::{HandlerRegistry, MessageHandler};
pub use message::{AnyMessage, GroupMessage, new_message_id};
pub use registry::{MessageDescriptor, TypeRegistry};
