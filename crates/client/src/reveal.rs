//! Reveal/reset gate.
//!
//! Revealing while some of the lowest seats have not voted asks for
//! confirmation first. The check is advisory: the server honours any reveal it
//! receives, and a confirmed request is always sent.

use crate::protocol::{ClientMessage, StateSnapshot};
use crate::types::{is_spectator_id, PlayerId, REVEAL_QUORUM};

pub const CONFIRM_PROMPT: &str = "Some delegates are missing votes. Are you sure you want to reveal?";

/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Seats among the first `REVEAL_QUORUM` (by ascending id) without an estimate.
pub fn seats_missing_votes(snapshot: &StateSnapshot) -> Vec<PlayerId> {
    let mut seated: Vec<_> = snapshot
        .players
        .iter()
        .filter(|p| !is_spectator_id(p.player_id))
        .collect();
    seated.sort_by_key(|p| p.player_id);
    seated
        .into_iter()
        .take(REVEAL_QUORUM)
        .filter(|p| p.value < 1)
        .map(|p| p.player_id)
        .collect()
}

pub fn needs_confirmation(snapshot: &StateSnapshot) -> bool {
    !seats_missing_votes(snapshot).is_empty()
}

/// Build the message toggling the reveal flag of `snapshot`.
///
/// Returns `None` when a reveal needed confirmation and the user declined.
/// Resetting never asks.
pub fn request_reveal<C: Confirm>(snapshot: &StateSnapshot, confirm: &mut C) -> Option<ClientMessage> {
    let value = !snapshot.all_revealed;
    if value && needs_confirmation(snapshot) && !confirm.confirm(CONFIRM_PROMPT) {
        return None;
    }
    Some(ClientMessage::RevealNumbers { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{NotifyChange, PlayerState};

    fn table(values: &[(PlayerId, u32)], all_revealed: bool) -> StateSnapshot {
        StateSnapshot {
            players: values
                .iter()
                .map(|&(player_id, value)| PlayerState {
                    player_id,
                    player_name: format!("p{player_id}"),
                    value,
                    is_connected: true,
                })
                .collect(),
            all_revealed,
            notify_change: NotifyChange::default(),
        }
    }

    fn never(_: &str) -> bool {
        panic!("confirmation should not be requested")
    }

    #[test]
    fn test_all_voted_reveals_without_prompt() {
        let snapshot = table(&[(0, 3), (1, 5)], false);
        let mut confirm = never;
        assert_eq!(
            request_reveal(&snapshot, &mut confirm),
            Some(ClientMessage::RevealNumbers { value: true })
        );
    }

    #[test]
    fn test_missing_vote_declined_sends_nothing() {
        let snapshot = table(&[(0, 0)], false);
        let mut asked = Vec::new();
        let mut confirm = |prompt: &str| {
            asked.push(prompt.to_string());
            false
        };
        assert_eq!(request_reveal(&snapshot, &mut confirm), None);
        assert_eq!(asked, vec![CONFIRM_PROMPT.to_string()]);
    }

    #[test]
    fn test_missing_vote_confirmed_still_reveals() {
        let snapshot = table(&[(0, 0), (1, 2)], false);
        let mut confirm = |_: &str| true;
        assert_eq!(
            request_reveal(&snapshot, &mut confirm),
            Some(ClientMessage::RevealNumbers { value: true })
        );
    }

    #[test]
    fn test_only_first_five_seats_are_checked() {
        // Out of insertion order on purpose; seat 6 has no vote but is sixth.
        let snapshot = table(&[(6, 0), (4, 1), (0, 2), (3, 8), (1, 1), (2, 5)], false);
        assert!(seats_missing_votes(&snapshot).is_empty());

        let snapshot = table(&[(6, 1), (4, 0), (0, 2), (3, 8), (1, 1), (2, 5)], false);
        assert_eq!(seats_missing_votes(&snapshot), vec![4]);
    }

    #[test]
    fn test_reset_never_prompts() {
        let snapshot = table(&[(0, 0)], true);
        let mut confirm = never;
        assert_eq!(
            request_reveal(&snapshot, &mut confirm),
            Some(ClientMessage::RevealNumbers { value: false })
        );
    }
}
