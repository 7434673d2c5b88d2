//! Coordinator configuration, lifecycle state and recipients.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use coplay_transport::ParticipantId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`SessionCoordinator`](crate::SessionCoordinator).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long `configure` waits after tearing down the previous session
    /// before joining the new one.
    ///
    /// Default: 1 second.
    pub join_delay: Duration,

    /// Identity used as the sender of local echoes while no session is
    /// active. A random id is picked when `None`.
    pub local_participant: Option<ParticipantId>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            join_delay: Duration::from_secs(1),
            local_participant: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of the coordinator's session.
///
/// ```text
///  Idle ──configure──► Joining ──join + loops running──► Active
///   ▲                     │                                │
///   └──────cleanup / invalidation──────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session.
    #[default]
    Idle,
    /// A session was handed to `configure` and is being joined.
    Joining,
    /// Joined, with both subscription loops running.
    Active,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Joining => f.write_str("joining"),
            Self::Active => f.write_str("active"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who a sent message goes to over the network.
///
/// The local participant is never a network recipient; use local echo
/// for that.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Recipient {
    /// Every active participant except the local one.
    #[default]
    Others,

    /// Only these participants, as far as they are active.
    Only(BTreeSet<ParticipantId>),
}

impl Recipient {
    /// Shorthand for [`Recipient::Only`].
    pub fn only(participants: impl IntoIterator<Item = ParticipantId>) -> Self {
        Self::Only(participants.into_iter().collect())
    }

    /// The participants a message actually goes to, given who is active.
    pub fn resolve(&self, local: ParticipantId, active: &[ParticipantId]) -> Vec<ParticipantId> {
        active
            .iter()
            .copied()
            .filter(|p| *p != local)
            .filter(|p| match self {
                Self::Others => true,
                Self::Only(set) => set.contains(p),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u64) -> ParticipantId {
        ParticipantId::new(n)
    }

    #[test]
    fn test_session_config_default_join_delay_is_one_second() {
        assert_eq!(SessionConfig::default().join_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_recipient_others_excludes_local() {
        let resolved = Recipient::Others.resolve(pid(1), &[pid(1), pid(2), pid(3)]);
        assert_eq!(resolved, vec![pid(2), pid(3)]);
    }

    #[test]
    fn test_recipient_only_restricts_to_active_non_local() {
        let to = Recipient::only([pid(1), pid(3), pid(9)]);
        let resolved = to.resolve(pid(1), &[pid(1), pid(2), pid(3)]);
        assert_eq!(resolved, vec![pid(3)]);
    }

    #[test]
    fn test_recipient_alone_resolves_empty() {
        assert!(Recipient::Others.resolve(pid(1), &[pid(1)]).is_empty());
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Joining.to_string(), "joining");
    }
}
