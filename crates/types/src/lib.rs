//! Shared types module - identifiers and protocol constants
//!
//! This crate defines the small vocabulary shared by the server authority and
//! the client reconciler. It has no external dependencies so that both sides
//! (and any view adapter) can agree on the same numbers.
//!
//! # Seats and spectators
//!
//! A room has a fixed number of seats. Seat ids are the integers
//! `0..MAX_SEATS`. Any id at or above [`OVERFLOW_INDEX`] denotes a spectator:
//! a connected participant that holds no seat and waits for one to free.
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `MAX_SEATS` | 12 | Hard seat capacity of a room |
//! | `OVERFLOW_INDEX` | 100 | First spectator id |
//! | `REVEAL_QUORUM` | 5 | Seats inspected by the reveal advisory check |
//!
//! # Timing defaults
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `PING_INTERVAL_MS` | 5000 | Server heartbeat period |
//! | `PONG_TIMEOUT_MS` | 15000 | Silence after which a connection is dropped |
//! | `NAME_DEBOUNCE_MS` | 250 | Coalescing window for name typing |
//! | `VALUE_DEBOUNCE_MS` | 0 | Value selection is a discrete action |
//!
//! Lines longer than [`MAX_LINE_BYTES`] are dropped as malformed.
//!
//! # Examples
//!
//! ```
//! use planning_poker_types::{Occupancy, OVERFLOW_INDEX, is_spectator_id};
//!
//! let seat = Occupancy::Seat(3);
//! assert_eq!(seat.player_id(), 3);
//! assert!(!seat.is_spectator());
//!
//! let waiting = Occupancy::Spectator(OVERFLOW_INDEX + 1);
//! assert!(waiting.is_spectator());
//! assert!(is_spectator_id(waiting.player_id()));
//! ```

use std::fmt;

/// Hard seat capacity of a room.
pub const MAX_SEATS: usize = 12;

/// First id handed to spectators. Ids at or above this never name a seat.
pub const OVERFLOW_INDEX: usize = 100;

/// Number of seats (lowest ids first) inspected before a reveal.
pub const REVEAL_QUORUM: usize = 5;

/// Display name given to a participant before they choose one.
pub const DEFAULT_DISPLAY_NAME: &str = "Delegate Unknown";

/// Default heartbeat period.
pub const PING_INTERVAL_MS: u64 = 5_000;

/// Default silence window after which a connection counts as dead.
pub const PONG_TIMEOUT_MS: u64 = 15_000;

/// Default debounce for free-text name entry.
pub const NAME_DEBOUNCE_MS: u64 = 250;

/// Default debounce for value selection (sent immediately).
pub const VALUE_DEBOUNCE_MS: u64 = 0;

/// Default TCP port of the poker server.
pub const DEFAULT_PORT: u16 = 3000;

/// Longest protocol line accepted from a peer, excluding the newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Wire-level participant id: a seat index or a spectator id.
pub type PlayerId = usize;

/// Returns true when `id` denotes a spectator rather than a seat.
pub fn is_spectator_id(id: PlayerId) -> bool {
    id >= OVERFLOW_INDEX
}

/// Server-internal identifier of one transport connection.
///
/// Connection ids are handed out in accept order and never reused, which makes
/// them a deterministic tie-break for "who connected first".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What a connection currently holds in its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupancy {
    /// A real seat in `0..MAX_SEATS`.
    Seat(usize),
    /// No seat; the id is `>= OVERFLOW_INDEX` and unique within the room.
    Spectator(PlayerId),
}

impl Occupancy {
    /// The id announced to the client for this occupancy.
    pub fn player_id(self) -> PlayerId {
        match self {
            Occupancy::Seat(seat) => seat,
            Occupancy::Spectator(id) => id,
        }
    }

    pub fn is_spectator(self) -> bool {
        matches!(self, Occupancy::Spectator(_))
    }

    pub fn seat(self) -> Option<usize> {
        match self {
            Occupancy::Seat(seat) => Some(seat),
            Occupancy::Spectator(_) => None,
        }
    }
}
