//! Room authority.
//!
//! One task owns every room's [`Session`] and is the only writer of session
//! state. Connection tasks talk to it through [`InboundEvent`]s and receive
//! [`ServerMessage`]s on their own outbound channel. Every state-affecting
//! event is followed by a full snapshot sent to all members of the room.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::{Session, SessionError, SessionSnapshot};
use crate::protocol::{create_error, ClientMessage, IdentityPayload, ServerMessage, StateSnapshot};
use crate::types::{ConnectionId, Occupancy};

/// Event delivered to the authority by a connection task.
#[derive(Debug)]
pub struct InboundEvent {
    pub connection: ConnectionId,
    pub payload: InboundPayload,
}

#[derive(Debug)]
pub enum InboundPayload {
    Join {
        room: String,
        tx: mpsc::UnboundedSender<ServerMessage>,
    },
    Request(RoomRequest),
    Leave,
}

/// Client messages that act on room state. Heartbeat traffic stays with the
/// connection task and never reaches the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRequest {
    ChangeName(IdentityPayload),
    ChangeValue(IdentityPayload),
    RevealNumbers { value: bool },
}

impl RoomRequest {
    /// `None` for `Pong`.
    pub fn from_client(msg: ClientMessage) -> Option<Self> {
        match msg {
            ClientMessage::ChangeName(payload) => Some(RoomRequest::ChangeName(payload)),
            ClientMessage::ChangeValue(payload) => Some(RoomRequest::ChangeValue(payload)),
            ClientMessage::RevealNumbers { value } => Some(RoomRequest::RevealNumbers { value }),
            ClientMessage::Pong { .. } => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RoomRequest::ChangeName(_) => "ChangeName",
            RoomRequest::ChangeValue(_) => "ChangeValue",
            RoomRequest::RevealNumbers { .. } => "RevealNumbers",
        }
    }
}

struct Room {
    session: Session,
    members: BTreeMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>,
}

pub struct Authority {
    capacity: usize,
    rooms: HashMap<String, Room>,
    memberships: HashMap<ConnectionId, String>,
}

impl Authority {
    pub fn new(capacity: usize) -> Result<Self, SessionError> {
        // Validate once up front so room creation cannot fail later.
        Session::new(capacity)?;
        Ok(Self {
            capacity,
            rooms: HashMap::new(),
            memberships: HashMap::new(),
        })
    }

    pub fn handle(&mut self, event: InboundEvent) {
        let InboundEvent {
            connection,
            payload,
        } = event;
        match payload {
            InboundPayload::Join { room, tx } => self.join(connection, room, tx),
            InboundPayload::Request(request) => self.request(connection, request),
            InboundPayload::Leave => self.leave(connection),
        }
    }

    fn join(
        &mut self,
        connection: ConnectionId,
        room_name: String,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) {
        if self.memberships.contains_key(&connection) {
            warn!(%connection, "duplicate join ignored");
            return;
        }

        if !self.rooms.contains_key(&room_name) {
            let session = match Session::new(self.capacity) {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "cannot open room");
                    return;
                }
            };
            info!(room = %room_name, "room opened");
            self.rooms.insert(
                room_name.clone(),
                Room {
                    session,
                    members: BTreeMap::new(),
                },
            );
        }
        let Some(room) = self.rooms.get_mut(&room_name) else {
            return;
        };

        let occupancy = room.session.join(connection);
        let _ = tx.send(ServerMessage::PlayerAssigned {
            player_id: occupancy.player_id(),
        });
        room.members.insert(connection, tx);
        self.memberships.insert(connection, room_name.clone());

        match occupancy {
            Occupancy::Seat(seat) => info!(room = %room_name, %connection, seat, "participant seated"),
            Occupancy::Spectator(id) => {
                info!(room = %room_name, %connection, spectator_id = id, "room full, spectating")
            }
        }

        broadcast(room);
    }

    fn leave(&mut self, connection: ConnectionId) {
        let Some(room_name) = self.memberships.remove(&connection) else {
            debug!(%connection, "leave for unknown connection ignored");
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_name) else {
            return;
        };

        room.members.remove(&connection);
        if let Some(vacancy) = room.session.leave(connection) {
            info!(room = %room_name, %connection, released = ?vacancy.released, "participant left");
            if let Some(promotion) = vacancy.promotion {
                info!(
                    room = %room_name,
                    connection = %promotion.connection,
                    from = promotion.from,
                    seat = promotion.seat,
                    "spectator promoted"
                );
            }
            if vacancy.effect().needs_broadcast() {
                broadcast(room);
            }
        }

        if room.session.is_empty() {
            self.rooms.remove(&room_name);
            info!(room = %room_name, "room closed");
        }
    }

    fn request(&mut self, connection: ConnectionId, request: RoomRequest) {
        let Some(room) = self
            .memberships
            .get(&connection)
            .and_then(|name| self.rooms.get_mut(name))
        else {
            debug!(%connection, kind = request.type_name(), "request before join dropped");
            return;
        };

        let result = match request {
            RoomRequest::ChangeName(payload) => {
                note_stale_id(&room.session, connection, payload.player_id);
                room.session.change_name(connection, &payload.name)
            }
            RoomRequest::ChangeValue(payload) => {
                note_stale_id(&room.session, connection, payload.player_id);
                room.session.change_estimate(connection, payload.value)
            }
            RoomRequest::RevealNumbers { value } => Ok(room.session.set_revealed(value)),
        };

        match result {
            Ok(effect) => {
                if effect.needs_broadcast() {
                    broadcast(room);
                }
            }
            Err(e) => {
                warn!(%connection, error = %e, "request rejected");
                if let Some(tx) = room.members.get(&connection) {
                    let _ = tx.send(create_error(&e.to_string()));
                }
            }
        }
    }

    pub fn room_snapshot(&self, room: &str) -> Option<SessionSnapshot> {
        self.rooms.get(room).map(|r| r.session.snapshot())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Requests are applied to the sender's own record; an outdated `player_id`
/// (e.g. sent just before a reassignment arrived) only gets logged.
fn note_stale_id(session: &Session, connection: ConnectionId, claimed: usize) {
    if let Some(occupancy) = session.occupancy(connection) {
        if occupancy.player_id() != claimed {
            debug!(%connection, claimed, actual = occupancy.player_id(), "stale player id");
        }
    }
}

fn broadcast(room: &Room) {
    let snapshot = StateSnapshot::from(&room.session.snapshot());
    for tx in room.members.values() {
        let _ = tx.send(ServerMessage::UpdateState(snapshot.clone()));
    }
}

/// Drive the authority until every sender is dropped.
pub async fn run_authority(mut authority: Authority, mut rx: mpsc::Receiver<InboundEvent>) {
    while let Some(event) = rx.recv().await {
        authority.handle(event);
    }
    debug!("authority stopped");
}
