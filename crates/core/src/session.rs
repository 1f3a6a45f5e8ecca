//! Authoritative session state for one room.
//!
//! The session is the single writer of participant records. Every mutating
//! call reports an [`Effect`] telling the caller whether a fresh snapshot must
//! be broadcast; rejected requests return a [`SessionError`] and leave the
//! state exactly as it was.

use std::collections::HashMap;

use arrayvec::ArrayVec;
use tracing::debug;

use planning_poker_types::{ConnectionId, Occupancy, DEFAULT_DISPLAY_NAME, MAX_SEATS};

use crate::allocator::{SeatAllocator, Vacancy};
use crate::error::SessionError;
use crate::snapshot::{Participant, Reassignment, SessionSnapshot};

/// Whether a state change must reach every client of the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Broadcast,
    Quiet,
}

impl Effect {
    pub fn needs_broadcast(self) -> bool {
        matches!(self, Effect::Broadcast)
    }
}

impl Vacancy {
    /// Only seat vacancies change the broadcast state.
    pub fn effect(&self) -> Effect {
        match self.released {
            Occupancy::Seat(_) => Effect::Broadcast,
            Occupancy::Spectator(_) => Effect::Quiet,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    allocator: SeatAllocator,
    participants: ArrayVec<Participant, MAX_SEATS>,
    /// Names chosen by spectators while they wait for a seat.
    waiting_names: HashMap<ConnectionId, String>,
    all_revealed: bool,
    pending_reassignment: Option<Reassignment>,
}

impl Session {
    pub fn new(capacity: usize) -> Result<Self, SessionError> {
        Ok(Self {
            allocator: SeatAllocator::new(capacity)?,
            participants: ArrayVec::new(),
            waiting_names: HashMap::new(),
            all_revealed: false,
            pending_reassignment: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.allocator.capacity()
    }

    /// Admit a connection: lowest free seat, otherwise spectator.
    pub fn join(&mut self, connection: ConnectionId) -> Occupancy {
        if let Some(existing) = self.allocator.occupancy(connection) {
            return existing;
        }

        let occupancy = self.allocator.allocate(connection);
        match occupancy {
            Occupancy::Seat(seat) => {
                self.participants
                    .push(Participant::new(seat, DEFAULT_DISPLAY_NAME));
            }
            Occupancy::Spectator(_) => {
                self.waiting_names
                    .insert(connection, DEFAULT_DISPLAY_NAME.to_string());
            }
        }
        debug!(%connection, ?occupancy, "joined session");
        occupancy
    }

    /// Remove a connection and hand its seat to the longest-waiting spectator.
    ///
    /// Returns `None` for unknown or already departed connections.
    pub fn leave(&mut self, connection: ConnectionId) -> Option<Vacancy> {
        let vacancy = self.allocator.release(connection)?;

        match vacancy.released {
            Occupancy::Seat(seat) => {
                self.participants.retain(|p| p.seat_id != seat);

                match vacancy.promotion {
                    Some(promotion) => {
                        let name = self
                            .waiting_names
                            .remove(&promotion.connection)
                            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
                        self.participants.push(Participant::new(seat, name));
                        self.pending_reassignment = Some(Reassignment {
                            current_id: promotion.from,
                            new_id: seat,
                        });
                        debug!(
                            from = promotion.from,
                            seat, "spectator promoted into vacated seat"
                        );
                    }
                    None => {
                        self.pending_reassignment = None;
                    }
                }
            }
            Occupancy::Spectator(_) => {
                self.waiting_names.remove(&connection);
            }
        }

        Some(vacancy)
    }

    pub fn change_name(
        &mut self,
        connection: ConnectionId,
        name: &str,
    ) -> Result<Effect, SessionError> {
        match self.occupancy_of(connection)? {
            Occupancy::Seat(seat) => {
                let participant = self.participant_mut(connection, seat)?;
                participant.display_name = name.to_string();
                Ok(Effect::Broadcast)
            }
            Occupancy::Spectator(_) => {
                self.waiting_names.insert(connection, name.to_string());
                Ok(Effect::Quiet)
            }
        }
    }

    /// Record a seated participant's estimate.
    ///
    /// Negative or out-of-range values are rejected and the previous estimate
    /// is kept.
    pub fn change_estimate(
        &mut self,
        connection: ConnectionId,
        value: i64,
    ) -> Result<Effect, SessionError> {
        if value < 0 {
            return Err(SessionError::NegativeEstimate { value });
        }
        let estimate =
            u32::try_from(value).map_err(|_| SessionError::EstimateOutOfRange { value })?;

        let seat = self
            .occupancy_of(connection)?
            .seat()
            .ok_or(SessionError::NotSeated { connection })?;
        let participant = self.participant_mut(connection, seat)?;
        participant.estimate = estimate;
        Ok(Effect::Broadcast)
    }

    /// Show or hide every estimate. Hiding never erases stored values.
    pub fn set_revealed(&mut self, revealed: bool) -> Effect {
        self.all_revealed = revealed;
        Effect::Broadcast
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            participants: self.participants.to_vec(),
            all_revealed: self.all_revealed,
            pending_reassignment: self.pending_reassignment,
        }
    }

    pub fn occupancy(&self, connection: ConnectionId) -> Option<Occupancy> {
        self.allocator.occupancy(connection)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn all_revealed(&self) -> bool {
        self.all_revealed
    }

    pub fn pending_reassignment(&self) -> Option<Reassignment> {
        self.pending_reassignment
    }

    pub fn waiting(&self) -> usize {
        self.allocator.waiting()
    }

    pub fn is_empty(&self) -> bool {
        self.allocator.is_empty()
    }

    fn occupancy_of(&self, connection: ConnectionId) -> Result<Occupancy, SessionError> {
        self.allocator
            .occupancy(connection)
            .ok_or(SessionError::UnknownConnection { connection })
    }

    fn participant_mut(
        &mut self,
        connection: ConnectionId,
        seat: usize,
    ) -> Result<&mut Participant, SessionError> {
        // Allocator and participant list move together; a seated connection
        // always has a record.
        self.participants
            .iter_mut()
            .find(|p| p.seat_id == seat)
            .ok_or(SessionError::UnknownConnection { connection })
    }
}
