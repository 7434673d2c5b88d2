//! Seat assignment from membership snapshots.
//!
//! Pure functions only: given who is in the session and who we are,
//! decide how many seats there are and who sits where.

use std::collections::BTreeMap;
use std::fmt;

use coplay_transport::ParticipantId;

use crate::{RosterConfig, SeatOrder};

/// One membership snapshot as delivered by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSnapshot {
    /// This device's participant id.
    pub local: ParticipantId,
    /// Every active participant, local included, in platform order.
    pub participants: Vec<ParticipantId>,
}

/// The outcome of seating one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeatAssignment {
    /// Participant count used for seating. A lone participant counts as
    /// two when a second seat is reserved.
    pub total_seats: usize,
    /// The local device's seat.
    pub local_seat: u32,
    /// Seat of every participant in the snapshot.
    pub seats: BTreeMap<ParticipantId, u32>,
}

impl SeatAssignment {
    /// The seat of `participant`, if it was in the snapshot.
    pub fn seat_of(&self, participant: ParticipantId) -> Option<u32> {
        self.seats.get(&participant).copied()
    }
}

/// Seats everyone in `snapshot`.
///
/// The local participant always gets `config.local_seat`. Everyone else
/// is ordered by `config.seat_order` and numbered from `local_seat + 1`
/// upwards without gaps. Participants past `u32::MAX` get no seat.
pub fn assign_seats(snapshot: &MembershipSnapshot, config: &RosterConfig) -> SeatAssignment {
    let mut total_seats = snapshot.participants.len();
    if total_seats == 1 && config.reserve_second_seat {
        total_seats = 2;
    }

    let mut remote: Vec<ParticipantId> = Vec::with_capacity(snapshot.participants.len());
    for participant in &snapshot.participants {
        if *participant != snapshot.local && !remote.contains(participant) {
            remote.push(*participant);
        }
    }
    if config.seat_order == SeatOrder::ParticipantId {
        remote.sort();
    }

    let mut seats = BTreeMap::new();
    seats.insert(snapshot.local, config.local_seat);
    let mut next = config.local_seat.checked_add(1);
    for participant in remote {
        let Some(seat) = next else {
            tracing::warn!(%participant, "seat numbers exhausted, participant left unseated");
            continue;
        };
        seats.insert(participant, seat);
        next = seat.checked_add(1);
    }

    SeatAssignment {
        total_seats,
        local_seat: config.local_seat,
        seats,
    }
}

// ---------------------------------------------------------------------------
// SeatColor
// ---------------------------------------------------------------------------

/// The colour a seat is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatColor {
    Red,
    Blue,
    Purple,
    Yellow,
    Black,
}

impl SeatColor {
    /// Seats 1 to 4 have their own colour; everything else is black.
    pub fn for_seat(seat: u32) -> Self {
        match seat {
            1 => Self::Red,
            2 => Self::Blue,
            3 => Self::Purple,
            4 => Self::Yellow,
            _ => Self::Black,
        }
    }
}

impl fmt::Display for SeatColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Yellow => "yellow",
            Self::Black => "black",
        };
        f.write_str(name)
    }
}
