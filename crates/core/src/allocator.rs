//! Seat allocation and spectator promotion.
//!
//! Seats are handed out lowest-index-first. When every seat is taken the
//! connection becomes a spectator with a fresh id at or above
//! [`OVERFLOW_INDEX`]. Spectator ids are never reused within one allocator,
//! so a stale reassignment notice can never match a later spectator.
//!
//! Waiting spectators form a FIFO queue in connection order. When a seat frees
//! the front of the queue (the longest-waiting spectator) takes it.

use std::collections::{HashMap, VecDeque};

use planning_poker_types::{ConnectionId, Occupancy, PlayerId, MAX_SEATS, OVERFLOW_INDEX};

use crate::error::SessionError;

/// A spectator moved into a freed seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Promotion {
    pub connection: ConnectionId,
    /// Spectator id the connection held before the move.
    pub from: PlayerId,
    pub seat: usize,
}

/// Result of releasing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vacancy {
    pub released: Occupancy,
    pub promotion: Option<Promotion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Waiting {
    connection: ConnectionId,
    spectator_id: PlayerId,
}

#[derive(Debug, Clone)]
pub struct SeatAllocator {
    capacity: usize,
    seats: [Option<ConnectionId>; MAX_SEATS],
    waiting: VecDeque<Waiting>,
    holders: HashMap<ConnectionId, Occupancy>,
    next_spectator_id: PlayerId,
}

impl SeatAllocator {
    pub fn new(capacity: usize) -> Result<Self, SessionError> {
        if capacity == 0 || capacity > MAX_SEATS {
            return Err(SessionError::InvalidCapacity {
                requested: capacity,
            });
        }
        Ok(Self {
            capacity,
            seats: [None; MAX_SEATS],
            waiting: VecDeque::new(),
            holders: HashMap::new(),
            next_spectator_id: OVERFLOW_INDEX,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Give `connection` the lowest free seat, or queue it as a spectator.
    ///
    /// Allocating an already known connection returns its current occupancy.
    pub fn allocate(&mut self, connection: ConnectionId) -> Occupancy {
        if let Some(existing) = self.holders.get(&connection) {
            return *existing;
        }

        let free = self.seats[..self.capacity]
            .iter()
            .position(|holder| holder.is_none());

        let occupancy = match free {
            Some(seat) => {
                self.seats[seat] = Some(connection);
                Occupancy::Seat(seat)
            }
            None => {
                let spectator_id = self.next_spectator_id;
                self.next_spectator_id += 1;
                self.waiting.push_back(Waiting {
                    connection,
                    spectator_id,
                });
                Occupancy::Spectator(spectator_id)
            }
        };

        self.holders.insert(connection, occupancy);
        occupancy
    }

    /// Free whatever `connection` holds.
    ///
    /// Returns `None` when the connection is unknown, so a duplicate close is a
    /// no-op. A freed seat goes to the longest-waiting spectator, if any.
    pub fn release(&mut self, connection: ConnectionId) -> Option<Vacancy> {
        let released = self.holders.remove(&connection)?;

        let promotion = match released {
            Occupancy::Seat(seat) => {
                self.seats[seat] = None;
                self.promote_into(seat)
            }
            Occupancy::Spectator(_) => {
                self.waiting.retain(|w| w.connection != connection);
                None
            }
        };

        Some(Vacancy {
            released,
            promotion,
        })
    }

    fn promote_into(&mut self, seat: usize) -> Option<Promotion> {
        let next = self.waiting.pop_front()?;
        self.seats[seat] = Some(next.connection);
        self.holders.insert(next.connection, Occupancy::Seat(seat));
        Some(Promotion {
            connection: next.connection,
            from: next.spectator_id,
            seat,
        })
    }

    pub fn occupancy(&self, connection: ConnectionId) -> Option<Occupancy> {
        self.holders.get(&connection).copied()
    }

    pub fn seated(&self) -> usize {
        self.seats[..self.capacity]
            .iter()
            .filter(|holder| holder.is_some())
            .count()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId(id)
    }

    #[test]
    fn test_rejects_invalid_capacity() {
        assert!(SeatAllocator::new(0).is_err());
        assert!(SeatAllocator::new(MAX_SEATS + 1).is_err());
        assert!(SeatAllocator::new(MAX_SEATS).is_ok());
    }

    #[test]
    fn test_allocates_lowest_free_seat() {
        let mut alloc = SeatAllocator::new(3).unwrap();
        assert_eq!(alloc.allocate(conn(1)), Occupancy::Seat(0));
        assert_eq!(alloc.allocate(conn(2)), Occupancy::Seat(1));
        assert_eq!(alloc.allocate(conn(3)), Occupancy::Seat(2));

        alloc.release(conn(2));
        assert_eq!(alloc.allocate(conn(4)), Occupancy::Seat(1));
    }

    #[test]
    fn test_overflow_becomes_spectator_with_distinct_ids() {
        let mut alloc = SeatAllocator::new(1).unwrap();
        assert_eq!(alloc.allocate(conn(1)), Occupancy::Seat(0));
        assert_eq!(alloc.allocate(conn(2)), Occupancy::Spectator(OVERFLOW_INDEX));
        assert_eq!(
            alloc.allocate(conn(3)),
            Occupancy::Spectator(OVERFLOW_INDEX + 1)
        );
        assert_eq!(alloc.waiting(), 2);
    }

    #[test]
    fn test_allocate_is_idempotent_per_connection() {
        let mut alloc = SeatAllocator::new(2).unwrap();
        assert_eq!(alloc.allocate(conn(1)), Occupancy::Seat(0));
        assert_eq!(alloc.allocate(conn(1)), Occupancy::Seat(0));
        assert_eq!(alloc.seated(), 1);
    }

    #[test]
    fn test_release_promotes_longest_waiting_spectator() {
        let mut alloc = SeatAllocator::new(1).unwrap();
        alloc.allocate(conn(1));
        alloc.allocate(conn(2));
        alloc.allocate(conn(3));

        let vacancy = alloc.release(conn(1)).unwrap();
        assert_eq!(vacancy.released, Occupancy::Seat(0));
        assert_eq!(
            vacancy.promotion,
            Some(Promotion {
                connection: conn(2),
                from: OVERFLOW_INDEX,
                seat: 0,
            })
        );
        assert_eq!(alloc.occupancy(conn(2)), Some(Occupancy::Seat(0)));
        assert_eq!(
            alloc.occupancy(conn(3)),
            Some(Occupancy::Spectator(OVERFLOW_INDEX + 1))
        );
    }

    #[test]
    fn test_departed_spectator_leaves_the_queue() {
        let mut alloc = SeatAllocator::new(1).unwrap();
        alloc.allocate(conn(1));
        alloc.allocate(conn(2));
        alloc.allocate(conn(3));

        let vacancy = alloc.release(conn(2)).unwrap();
        assert_eq!(vacancy.released, Occupancy::Spectator(OVERFLOW_INDEX));
        assert_eq!(vacancy.promotion, None);

        let vacancy = alloc.release(conn(1)).unwrap();
        assert_eq!(vacancy.promotion.map(|p| p.connection), Some(conn(3)));
    }

    #[test]
    fn test_duplicate_release_is_noop() {
        let mut alloc = SeatAllocator::new(1).unwrap();
        alloc.allocate(conn(1));
        alloc.allocate(conn(2));

        assert!(alloc.release(conn(1)).is_some());
        assert!(alloc.release(conn(1)).is_none());
        // The promoted spectator keeps the seat.
        assert_eq!(alloc.occupancy(conn(2)), Some(Occupancy::Seat(0)));
        assert_eq!(alloc.seated(), 1);
    }

    #[test]
    fn test_spectator_ids_are_never_reused() {
        let mut alloc = SeatAllocator::new(1).unwrap();
        alloc.allocate(conn(1));
        let first = alloc.allocate(conn(2));
        alloc.release(conn(2));
        let second = alloc.allocate(conn(3));
        assert_ne!(first, second);
    }
}
