use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::is_yesterday;
use crate::habit::{Habit, HabitId};

/// The field updates a day rollover applies to one habit. `completed_today`
/// is always cleared by a rollover, so only the surviving streak and the new
/// stamp are carried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetPatch {
    pub streak: u32,
    pub last_reset_date: NaiveDate,
}

impl ResetPatch {
    pub fn apply(self, habit: &mut Habit) {
        habit.streak = self.streak;
        habit.completed_today = false;
        habit.last_reset_date = Some(self.last_reset_date);
    }
}

/// Plan the rollover for one habit. Returns `None` when the record is
/// already stamped for `today`, which is what makes re-running the pass on
/// the same day a no-op.
pub fn plan_rollover(habit: &Habit, today: NaiveDate) -> Option<ResetPatch> {
    if !habit.needs_reset(today) {
        return None;
    }
    // The streak survives only if the most recent completion was yesterday
    // or today; anything older means at least one full day was missed.
    let unbroken = habit
        .last_completed_date
        .map(|last| last == today || is_yesterday(last, today))
        .unwrap_or(false);
    Some(ResetPatch {
        streak: if unbroken { habit.streak } else { 0 },
        last_reset_date: today,
    })
}

/// Plan a rollover batch for every stale habit, preserving input order so
/// the patches can be persisted in a single store call.
pub fn plan_batch<'a>(
    habits: impl IntoIterator<Item = &'a Habit>,
    today: NaiveDate,
) -> Vec<(HabitId, ResetPatch)> {
    habits
        .into_iter()
        .filter_map(|habit| plan_rollover(habit, today).map(|patch| (habit.id, patch)))
        .collect()
}
