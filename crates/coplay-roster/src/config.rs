//! Roster configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SeatOrder
// ---------------------------------------------------------------------------

/// How non-local participants are ordered before seats are numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeatOrder {
    /// Sort by participant id. A participant keeps its seat across
    /// repeated snapshots as long as nobody with a smaller id joins.
    #[default]
    ParticipantId,

    /// Number participants in the order the snapshot lists them. Seats
    /// may move between snapshots if the platform reorders them.
    Snapshot,
}

// ---------------------------------------------------------------------------
// RosterConfig
// ---------------------------------------------------------------------------

/// Configuration for the roster reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// The seat of the local device. Remote seats follow it.
    pub local_seat: u32,

    /// Count a lone participant as two, reserving a seat for the peer
    /// that is expected to join.
    pub reserve_second_seat: bool,

    /// Ordering of remote participants for seat numbering.
    pub seat_order: SeatOrder,

    /// Remove roster records whose participant left the session. Off by
    /// default: players stay listed after they leave.
    pub prune_departed: bool,

    /// Capacity of the actor's command channel.
    pub channel_size: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            local_seat: 1,
            reserve_second_seat: true,
            seat_order: SeatOrder::default(),
            prune_departed: false,
            channel_size: 64,
        }
    }
}
