use std::fmt;

use arrayvec::ArrayVec;

use crate::protocol::StateSnapshot;
use crate::types::{is_spectator_id, PlayerId, MAX_SEATS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub name: String,
    /// `?` while hidden and voted, the value once revealed, `-` without a vote.
    pub shown: String,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatRow {
    pub seat_id: PlayerId,
    pub occupant: Option<Occupant>,
    pub is_local: bool,
}

/// View-independent summary of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub rows: ArrayVec<SeatRow, MAX_SEATS>,
    pub all_revealed: bool,
    pub spectating: bool,
}

impl TableView {
    pub fn build(snapshot: &StateSnapshot, seats: usize, local: Option<PlayerId>) -> Self {
        let mut rows = ArrayVec::new();
        for seat_id in 0..seats.min(MAX_SEATS) {
            let occupant = snapshot.player(seat_id).map(|p| {
                let ready = p.value > 0;
                let shown = match (ready, snapshot.all_revealed) {
                    (false, _) => "-".to_string(),
                    (true, false) => "?".to_string(),
                    (true, true) => p.value.to_string(),
                };
                Occupant {
                    name: p.player_name.clone(),
                    shown,
                    ready,
                }
            });
            rows.push(SeatRow {
                seat_id,
                occupant,
                is_local: local == Some(seat_id),
            });
        }

        let spectating = local.map_or(true, is_spectator_id);
        Self {
            rows,
            all_revealed: snapshot.all_revealed,
            spectating,
        }
    }

    pub fn button_label(&self) -> &'static str {
        if self.all_revealed {
            "Reset"
        } else {
            "Reveal"
        }
    }

    pub fn ready_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.occupant.as_ref().is_some_and(|o| o.ready))
            .count()
    }
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            let marker = if row.is_local { '*' } else { ' ' };
            match &row.occupant {
                Some(o) => writeln!(f, "{marker}{:>3}  {:<24} {}", row.seat_id, o.name, o.shown)?,
                None => writeln!(f, "{marker}{:>3}  (vacant)", row.seat_id)?,
            }
        }
        if self.spectating {
            writeln!(f, "spectating: waiting for a free seat")?;
        }
        write!(f, "[{}]", self.button_label())
    }
}
