//! The envelope: the only thing that crosses the wire.
//!
//! An envelope has two parts that can be read independently:
//!
//! ```json
//! { "type": "playerMessage", "base": [123, 34, 110, ...] }
//! ```
//!
//! - `type`: the registry identifier of the payload.
//! - `base`: the payload serialized on its own.
//!
//! The receiver reads `type` first, asks the [`TypeRegistry`] how to
//! build that type, and only then looks at `base`. Nothing here has to
//! change when a new message variant is registered.

use serde::{Deserialize, Serialize};

use crate::message::{AnyMessage, GroupMessage};
use crate::{Codec, ProtocolError, TypeRegistry};

/// A sealed message: type identifier plus serialized payload bytes.
///
/// Owns its bytes; it never borrows the message it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Registry identifier of the payload type.
    #[serde(rename = "type")]
    pub kind: String,

    /// The serialized payload.
    pub base: Vec<u8>,
}

impl Envelope {
    /// Wraps `message` using the identifier `registry` has for its type.
    ///
    /// # Errors
    /// [`ProtocolError::UnregisteredType`] if `M` was never registered.
    pub fn seal<M: GroupMessage, C: Codec>(
        registry: &TypeRegistry<C>,
        message: &M,
    ) -> Result<Self, ProtocolError> {
        let (kind, base) = registry.encode_body(message)?;
        Ok(Self { kind, base })
    }

    /// Rebuilds the concrete message this envelope carries.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownMessageType`] if `kind` isn't registered,
    /// [`ProtocolError::MalformedPayload`] if `base` doesn't fit the type.
    pub fn open<C: Codec>(
        &self,
        registry: &TypeRegistry<C>,
    ) -> Result<Box<dyn AnyMessage>, ProtocolError> {
        registry.decode_body(&self.kind, &self.base)
    }
}

/// Seals `message` and serializes the envelope in one step.
pub fn encode<M: GroupMessage, C: Codec>(
    registry: &TypeRegistry<C>,
    message: &M,
) -> Result<Vec<u8>, ProtocolError> {
    let envelope = Envelope::seal(registry, message)?;
    registry.codec().encode(&envelope)
}

/// Parses an envelope from bytes and opens it.
///
/// # Errors
/// [`ProtocolError::Decode`] if the bytes aren't an envelope at all, plus
/// everything [`Envelope::open`] can return.
pub fn decode<C: Codec>(
    registry: &TypeRegistry<C>,
    data: &[u8],
) -> Result<Box<dyn AnyMessage>, ProtocolError> {
    let envelope: Envelope = registry.codec().decode(data)?;
    tracing::trace!(identifier = %envelope.kind, bytes = data.len(), "envelope decoded");
    envelope.open(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonCodec;
    use crate::messages::{EntityTransformMessage, Player, Quat, Vec3};
    use coplay_transport::ParticipantId;

    #[test]
    fn test_envelope_json_has_type_and_base() {
        let registry = TypeRegistry::new();
        let player = Player::new("Ada", ParticipantId::new(1));

        let bytes = encode(&registry, &player).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["type"], "playerMessage");
        assert!(json["base"].is_array());
    }

    #[test]
    fn test_base_decodes_independently_of_header() {
        let registry = TypeRegistry::new();
        let player = Player::new("Ada", ParticipantId::new(1));

        let envelope = Envelope::seal(&registry, &player).unwrap();
        let body: Player = JsonCodec.decode(&envelope.base).unwrap();

        assert_eq!(body, player);
    }

    #[test]
    fn test_decode_not_an_envelope_returns_decode_error() {
        let registry = TypeRegistry::new();
        let result = decode(&registry, br#"{"kind":"x"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_open_returns_concrete_type() {
        let registry = TypeRegistry::new();
        let msg = EntityTransformMessage::new("ball", Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);

        let envelope = Envelope::seal(&registry, &msg).unwrap();
        let opened = envelope.open(&registry).unwrap();

        assert_eq!(opened.downcast_ref::<EntityTransformMessage>(), Some(&msg));
    }
}
