//! Transport boundary for Coplay.
//!
//! Coplay does not own the platform's group session or its network
//! delivery. This crate describes what it needs from them:
//!
//! - [`GroupSession`]: one joined group session. Knows who is local, who is
//!   active, membership snapshots over time, join/leave, and a
//!   [`Messenger`] per [`DeliveryMode`].
//! - [`Messenger`]: an opaque byte channel scoped to a set of
//!   [`ParticipantId`]s.
//!
//! # Feature Flags
//!
//! - `memory` (default): [`MemoryHub`], an in-process implementation
//!   used by tests and demos.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{MemoryHub, MemoryHubConfig, MemoryMessenger, MemorySession};

use std::fmt;
use std::future::Future;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Opaque identifier for a participant of a group session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(u64);

impl ParticipantId {
    /// Creates a new `ParticipantId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pt-{}", self.0)
    }
}

/// The delivery guarantee of a messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryMode {
    /// Delivered in order per sender, no loss.
    #[default]
    Reliable,

    /// May be lost. Used for high-frequency updates where the latest
    /// value matters more than every value.
    Unreliable,
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reliable => f.write_str("reliable"),
            Self::Unreliable => f.write_str("unreliable"),
        }
    }
}

/// One frame received from another participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    /// The raw bytes as sent.
    pub data: Vec<u8>,
    /// Who sent them.
    pub sender: ParticipantId,
}

/// A byte channel bound to one session.
pub trait Messenger: Send + Sync + 'static {
    /// Sends `data` to every participant in `to`.
    ///
    /// An empty `to` is a no-op.
    fn send(
        &self,
        data: Vec<u8>,
        to: &[ParticipantId],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the stream of frames addressed to the local participant.
    ///
    /// The stream ends when the session is left or invalidated.
    fn incoming(&self) -> BoxStream<'static, Incoming>;

    /// The delivery guarantee of this messenger.
    fn delivery_mode(&self) -> DeliveryMode;
}

/// A platform group session.
pub trait GroupSession: Send + Sync + 'static {
    /// The messenger type produced by this session.
    type Messenger: Messenger;

    /// The identity of this device within the session.
    fn local_participant(&self) -> ParticipantId;

    /// The currently active participants, local one included.
    fn active_participants(&self) -> Vec<ParticipantId>;

    /// Membership snapshots: the current set first, then one per change.
    ///
    /// The stream ends when the session is invalidated.
    fn participant_updates(&self) -> BoxStream<'static, Vec<ParticipantId>>;

    /// Creates a messenger bound to this session.
    fn messenger(&self, mode: DeliveryMode) -> Self::Messenger;

    /// Joins the session. Completes once the platform handshake is done.
    fn join(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Leaves the session. Safe to call more than once.
    fn leave(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_new_and_into_inner() {
        let id = ParticipantId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_participant_id_display() {
        assert_eq!(ParticipantId::new(7).to_string(), "pt-7");
    }

    #[test]
    fn test_participant_id_orders_by_value() {
        let mut ids = vec![
            ParticipantId::new(3),
            ParticipantId::new(1),
            ParticipantId::new(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ParticipantId::new(1),
                ParticipantId::new(2),
                ParticipantId::new(3)
            ]
        );
    }

    #[test]
    fn test_delivery_mode_default_is_reliable() {
        assert_eq!(DeliveryMode::default(), DeliveryMode::Reliable);
    }
}
