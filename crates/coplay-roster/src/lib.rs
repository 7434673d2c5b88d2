//! Roster reconciliation for Coplay.
//!
//! Keeps an ordered, deduplicated list of players and a designated local
//! player consistent while two kinds of input arrive concurrently:
//!
//! - [`Player`](coplay_protocol::messages::Player) messages, delivered
//!   through the handler registry ([`PlayerMessageHandler`]).
//! - Membership snapshots from the session ([`MembershipSnapshot`]),
//!   which drive seat assignment ([`assign_seats`]).
//!
//! # Key types
//!
//! - [`Roster`]: the state and its update rules, as plain data
//! - [`RosterHandle`]: a running actor that owns a `Roster`
//! - [`RosterView`]: what observers see after each change
//! - [`RosterConfig`]: seat numbering and pruning options

mod actor;
mod config;
mod error;
mod handler;
mod roster;
mod seats;

pub use actor::RosterHandle;
pub use config::{RosterConfig, SeatOrder};
pub use error::RosterError;
pub use handler::PlayerMessageHandler;
pub use roster::{Roster, RosterView};
pub use seats::{MembershipSnapshot, SeatAssignment, SeatColor, assign_seats};
