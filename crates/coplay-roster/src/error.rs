//! Error types for the roster layer.

/// Errors that can occur during roster operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// A player name was empty or only whitespace.
    #[error("player name must not be blank")]
    EmptyName,

    /// The roster actor has stopped (its task ended or was shut down).
    #[error("roster is unavailable")]
    Unavailable,
}
