//! Client-side mirror of a room.
//!
//! The reconciler owns the client's local identity and a read-only copy of the
//! last snapshot. It never patches the copy: every `UpdateState` replaces it.
//! The one piece of extra state it keeps is the last reassignment it applied,
//! so that a notice repeated by later snapshots does not move the client (or
//! re-announce its name) twice.

use tracing::{debug, info};

use crate::protocol::{ClientMessage, IdentityPayload, NotifyChange, ServerMessage, StateSnapshot};
use crate::types::{is_spectator_id, PlayerId, DEFAULT_DISPLAY_NAME, OVERFLOW_INDEX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    /// Connected, no `PlayerAssigned` seen yet.
    Connecting,
    /// Has an id but no snapshot.
    Identified,
    /// Holds a snapshot.
    Synced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub seat_id: PlayerId,
    pub display_name: String,
    pub estimate: u32,
}

/// What the driver should do after a server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Nothing to send.
    Ignored,
    /// Heartbeat answer; send immediately.
    Pong(ClientMessage),
    Assigned(PlayerId),
    Synced,
    /// This client was moved; `announce` re-sends the name under the new id.
    Reassigned {
        notice: NotifyChange,
        announce: ClientMessage,
    },
    Rejected(String),
}

impl Reaction {
    /// The message the driver must send, if any.
    pub fn outbound(&self) -> Option<&ClientMessage> {
        match self {
            Reaction::Pong(msg) => Some(msg),
            Reaction::Reassigned { announce, .. } => Some(announce),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    state: ReconcilerState,
    seat_id: Option<PlayerId>,
    display_name: String,
    estimate: u32,
    mirror: Option<StateSnapshot>,
    last_applied: Option<NotifyChange>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            state: ReconcilerState::Connecting,
            seat_id: None,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            estimate: 0,
            mirror: None,
            last_applied: None,
        }
    }

    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    pub fn seat_id(&self) -> Option<PlayerId> {
        self.seat_id
    }

    /// Identity once the server has assigned an id.
    pub fn identity(&self) -> Option<LocalIdentity> {
        self.seat_id.map(|seat_id| LocalIdentity {
            seat_id,
            display_name: self.display_name.clone(),
            estimate: self.estimate,
        })
    }

    /// True until this client holds a real seat.
    pub fn is_spectator(&self) -> bool {
        self.seat_id.map_or(true, is_spectator_id)
    }

    pub fn mirror(&self) -> Option<&StateSnapshot> {
        self.mirror.as_ref()
    }

    pub fn last_applied(&self) -> Option<NotifyChange> {
        self.last_applied
    }

    pub fn set_display_name(&mut self, name: &str) {
        self.display_name = name.to_string();
    }

    pub fn set_estimate(&mut self, estimate: u32) {
        self.estimate = estimate;
    }

    pub fn handle(&mut self, msg: ServerMessage) -> Reaction {
        match msg {
            ServerMessage::Ping => Reaction::Pong(ClientMessage::Pong {
                player_id: self.seat_id.unwrap_or(OVERFLOW_INDEX),
            }),
            ServerMessage::PlayerAssigned { player_id } => {
                self.seat_id = Some(player_id);
                if self.state == ReconcilerState::Connecting {
                    self.state = ReconcilerState::Identified;
                }
                debug!(player_id, "assigned");
                Reaction::Assigned(player_id)
            }
            ServerMessage::UpdateState(snapshot) => self.apply_snapshot(snapshot),
            ServerMessage::ErrorMessage { message } => Reaction::Rejected(message),
        }
    }

    fn apply_snapshot(&mut self, snapshot: StateSnapshot) -> Reaction {
        let Some(seat_id) = self.seat_id else {
            debug!("snapshot before assignment dropped");
            return Reaction::Ignored;
        };

        let notice = snapshot.notify_change;
        self.mirror = Some(snapshot);
        self.state = ReconcilerState::Synced;

        if !notice.is_reassignment()
            || notice.current_id != seat_id
            || self.last_applied == Some(notice)
        {
            return Reaction::Synced;
        }

        self.seat_id = Some(notice.new_id);
        self.last_applied = Some(notice);
        info!(from = notice.current_id, to = notice.new_id, "reassigned");

        Reaction::Reassigned {
            notice,
            announce: self.change_name_message(notice.new_id),
        }
    }

    fn payload(&self, player_id: PlayerId) -> IdentityPayload {
        IdentityPayload {
            player_id,
            name: self.display_name.clone(),
            value: i64::from(self.estimate),
        }
    }

    fn change_name_message(&self, player_id: PlayerId) -> ClientMessage {
        ClientMessage::ChangeName(self.payload(player_id))
    }

    /// `ChangeName` carrying the whole local identity.
    pub fn change_name(&self) -> Option<ClientMessage> {
        self.seat_id.map(|id| self.change_name_message(id))
    }

    /// `ChangeValue` carrying the whole local identity.
    pub fn change_value(&self) -> Option<ClientMessage> {
        self.seat_id
            .map(|id| ClientMessage::ChangeValue(self.payload(id)))
    }
}
