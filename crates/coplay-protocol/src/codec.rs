//! Codec trait and the JSON implementation.
//!
//! A codec turns values into bytes and back. The envelope uses it twice:
//! once for the payload (the `base` bytes) and once for the envelope
//! itself. Swapping the codec changes the wire format of both without
//! touching the registry or the handlers.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec lives inside the shared
/// [`TypeRegistry`](crate::TypeRegistry), which is read from every task
/// that sends or receives.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// JSON keeps envelopes readable in logs, and its byte arrays are plain
/// lists of numbers, so the `base` field survives any JSON-speaking peer.
///
/// ```rust
/// use coplay_protocol::{Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&[1.0_f32, 2.0, 3.0]).unwrap();
/// let back: Vec<f32> = codec.decode(&bytes).unwrap();
/// assert_eq!(back, vec![1.0, 2.0, 3.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
