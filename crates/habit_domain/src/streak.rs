use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::is_yesterday;

/// The streak-relevant slice of a habit record. The engine is pure; the
/// service copies these fields out, applies the transition, and writes the
/// result back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakState {
    pub streak: u32,
    pub completed_today: bool,
    pub last_completed_date: Option<NaiveDate>,
}

/// Mark the habit complete for `today`.
///
/// Same-day toggles are two-state, not an accumulator: undoing and redoing a
/// completion lands back on the identical post-completion streak. The redo
/// case is recognizable because the undo leaves `last_completed_date` at
/// today while clearing the flag.
pub fn complete(state: StreakState, today: NaiveDate) -> StreakState {
    if state.completed_today {
        return state;
    }
    let streak = match state.last_completed_date {
        Some(last) if last == today => state.streak + 1,
        Some(last) if is_yesterday(last, today) => state.streak + 1,
        // No prior completion, or a gap of more than one day: fresh start.
        _ => 1,
    };
    StreakState {
        streak,
        completed_today: true,
        last_completed_date: Some(today),
    }
}

/// Undo a same-day completion. Only the most recent increment is unwound;
/// history is not replayed.
pub fn uncomplete(state: StreakState, _today: NaiveDate) -> StreakState {
    if !state.completed_today {
        return state;
    }
    StreakState {
        streak: state.streak.saturating_sub(1),
        completed_today: false,
        last_completed_date: state.last_completed_date,
    }
}
