//! Error types for the session layer.

use coplay_protocol::ProtocolError;
use coplay_transport::TransportError;

/// Errors returned by [`SessionCoordinator`](crate::SessionCoordinator).
///
/// Transmission failures are not in here: `send` reports them to the
/// failure hook and the log instead of returning them.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The message couldn't be encoded (usually an unregistered type).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The platform session refused to join.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A newer `configure` or a `cleanup` replaced this session before it
    /// finished joining.
    #[error("session was replaced while joining")]
    Superseded,
}
