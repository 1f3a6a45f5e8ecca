//! Core session logic - pure, deterministic, and testable
//!
//! This crate owns the authoritative state of a planning poker room. It has
//! **no dependencies** on networking or I/O: the room authority in the adapter
//! crate feeds it connection events and turns the returned effects into
//! broadcasts.
//!
//! # Module Structure
//!
//! - [`allocator`]: lowest-free-seat allocation and FIFO spectator promotion
//! - [`session`]: participant records, estimates, reveal flag, reassignment notice
//! - [`snapshot`]: value types copied out of the session for broadcasting
//! - [`error`]: rejected requests
//!
//! # Rules
//!
//! - A room holds at most `capacity` (≤ [`MAX_SEATS`](planning_poker_types::MAX_SEATS))
//!   participants with unique seat ids.
//! - A connection beyond capacity is a spectator. When a seat frees, the
//!   longest-waiting spectator takes it and the next snapshot carries a
//!   reassignment notice `{current_id, new_id}`.
//! - `all_revealed` changes only through [`Session::set_revealed`]; hiding
//!   estimates never erases them.
//! - Negative estimates are rejected, leaving the previous value in place.
//!
//! # Example
//!
//! ```
//! use planning_poker_core::Session;
//! use planning_poker_types::{ConnectionId, Occupancy};
//!
//! let mut session = Session::new(2).unwrap();
//! assert_eq!(session.join(ConnectionId(1)), Occupancy::Seat(0));
//! assert_eq!(session.join(ConnectionId(2)), Occupancy::Seat(1));
//! let spectator = session.join(ConnectionId(3));
//! assert!(spectator.is_spectator());
//!
//! session.leave(ConnectionId(1));
//! let notice = session.snapshot().pending_reassignment.unwrap();
//! assert_eq!(notice.current_id, spectator.player_id());
//! assert_eq!(notice.new_id, 0);
//! ```

pub mod allocator;
pub mod error;
pub mod session;
pub mod snapshot;

pub use planning_poker_types as types;

pub use allocator::{Promotion, SeatAllocator, Vacancy};
pub use error::SessionError;
pub use session::{Effect, Session};
pub use snapshot::{Participant, Reassignment, SessionSnapshot};
