use planning_poker_types::PlayerId;

/// One seated participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Participant {
    pub seat_id: usize,
    pub display_name: String,
    /// 0 means no estimate yet.
    pub estimate: u32,
    pub is_connected: bool,
}

impl Participant {
    pub fn new(seat_id: usize, display_name: impl Into<String>) -> Self {
        Self {
            seat_id,
            display_name: display_name.into(),
            estimate: 0,
            is_connected: true,
        }
    }

    pub fn has_estimate(&self) -> bool {
        self.estimate > 0
    }
}

/// A spectator promoted into a freed seat, as announced to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reassignment {
    pub current_id: PlayerId,
    pub new_id: PlayerId,
}

/// Complete session state at one instant.
///
/// Snapshots are values: each broadcast carries a fresh one and receivers
/// replace whatever they held before.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub participants: Vec<Participant>,
    pub all_revealed: bool,
    pub pending_reassignment: Option<Reassignment>,
}

impl SessionSnapshot {
    pub fn participant(&self, seat_id: usize) -> Option<&Participant> {
        self.participants.iter().find(|p| p.seat_id == seat_id)
    }
}
