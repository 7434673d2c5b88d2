use crate::ParticipantId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The local participant has not joined the session yet (or has left).
    #[error("participant has not joined the session")]
    NotJoined,

    /// A recipient is not an active participant of the session.
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    /// The platform reported a failure while delivering a frame.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The session was invalidated by the platform.
    #[error("session invalidated")]
    Invalidated,
}
