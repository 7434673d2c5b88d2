//! Unified error type for Coplay.

use coplay_protocol::ProtocolError;
use coplay_roster::RosterError;
use coplay_session::SessionError;
use coplay_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// When using the `coplay` crate you deal with this single type instead
/// of importing errors from each layer; `?` converts them automatically.
#[derive(Debug, thiserror::Error)]
pub enum CoplayError {
    /// Platform session or messenger failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding, decoding or registry failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invalid player data, or the roster actor is gone.
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// Session lifecycle failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Error returned when installing the global log subscriber fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to install log subscriber: {0}")]
pub struct LogInitError(String);

impl LogInitError {
    pub(crate) fn new(reason: impl std::fmt::Display) -> Self {
        Self(reason.to_string())
    }
}
