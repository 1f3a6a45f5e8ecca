//! Errors raised by the session authority.

use planning_poker_types::{ConnectionId, MAX_SEATS};
use thiserror::Error;

/// A request the session refused. State is left untouched whenever one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("estimate must be a non-negative integer (got {value})")]
    NegativeEstimate { value: i64 },
    #[error("estimate {value} exceeds the supported range")]
    EstimateOutOfRange { value: i64 },
    #[error("{connection} holds no seat and cannot vote")]
    NotSeated { connection: ConnectionId },
    #[error("{connection} is not part of this session")]
    UnknownConnection { connection: ConnectionId },
    #[error("seat capacity must be within 1..={max} (got {requested})", max = MAX_SEATS)]
    InvalidCapacity { requested: usize },
}
