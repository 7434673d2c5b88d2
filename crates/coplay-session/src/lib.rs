//! Group session coordination for Coplay.
//!
//! A [`SessionCoordinator`] owns at most one platform session at a time:
//!
//! 1. **Configure**: tear down the previous session, join the new one and
//!    start listening for envelopes and membership changes.
//! 2. **Send**: encode a message once, optionally handle it locally, and
//!    hand the bytes to the reliable or unreliable messenger.
//! 3. **Cleanup**: leave, stop listening and clear the roster; also runs
//!    on its own when the platform invalidates the session.
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (above)        ← player operations, logging setup
//!     ↕
//! Session (this crate)  ← lifecycle, send pipeline, subscription loops
//!     ↕
//! Protocol / Roster     ← envelopes + handlers / seats + players
//!     ↕
//! Transport (below)     ← GroupSession, Messenger
//! ```

mod config;
mod coordinator;
mod error;

pub use config::{Recipient, SessionConfig, SessionState};
pub use coordinator::{SendFailure, SessionCoordinator};
pub use error::SessionError;
