//! Error types for the protocol layer.
//!
//! Everything that can go wrong between a typed message and the bytes
//! that cross the wire ends up here. Encode-side errors belong to the
//! sender; decode-side errors belong to one inbound envelope and never
//! outlive it.

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of a payload or envelope failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The outer envelope could not be read (not an envelope at all,
    /// missing `type` or `base`).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload's runtime type was never registered, so there is no
    /// identifier to put in the envelope header.
    ///
    /// Carries the Rust type name for diagnostics.
    #[error("unregistered message type: {0}")]
    UnregisteredType(&'static str),

    /// The envelope header names an identifier the registry doesn't know.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// The envelope body doesn't have the shape the resolved type expects
    /// (missing fields, wrong vector arity, wrong scalar types).
    #[error("malformed {identifier} payload: {reason}")]
    MalformedPayload {
        /// The identifier from the envelope header.
        identifier: String,
        /// What the body decoder rejected.
        reason: String,
    },
}
