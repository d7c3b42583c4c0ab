use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::habit::HabitId;

/// One guard entry: whether coins are currently applied for a
/// (habit, day) pair, and the magnitude that was applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoinEntry {
    pub applied: bool,
    pub amount: u32,
}

/// Per-habit-per-day idempotency guard for coin awards. Advisory and
/// client-owned: it prevents double-rewarding across repeated toggles in one
/// session, it is not a server-side ledger invariant.
///
/// Entries are keyed `"{habit_id}:{YYYY-MM-DD}"` so the map serializes as a
/// plain JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoinLedgerGuard {
    entries: HashMap<String, CoinEntry>,
}

impl CoinLedgerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(habit_id: HabitId, day: NaiveDate) -> String {
        format!("{habit_id}:{}", day.format("%Y-%m-%d"))
    }

    /// Consult the guard for a completion toggle. Returns the coin delta to
    /// apply: the base award on first completion of the day, the previously
    /// recorded amount on a re-completion (so a changed award cannot be
    /// farmed by toggling), and zero when coins are already applied.
    pub fn on_complete(&mut self, habit_id: HabitId, day: NaiveDate, base_award: u32) -> i64 {
        let entry = self
            .entries
            .entry(Self::key(habit_id, day))
            .or_insert(CoinEntry {
                applied: false,
                amount: base_award,
            });
        if entry.applied {
            return 0;
        }
        entry.applied = true;
        i64::from(entry.amount)
    }

    /// Consult the guard for an un-completion toggle. Reverses exactly the
    /// recorded amount, or nothing if no award is currently applied.
    pub fn on_uncomplete(&mut self, habit_id: HabitId, day: NaiveDate) -> i64 {
        match self.entries.get_mut(&Self::key(habit_id, day)) {
            Some(entry) if entry.applied => {
                entry.applied = false;
                -i64::from(entry.amount)
            }
            _ => 0,
        }
    }

    pub fn entry(&self, habit_id: HabitId, day: NaiveDate) -> Option<CoinEntry> {
        self.entries.get(&Self::key(habit_id, day)).copied()
    }

    /// Put back an entry captured with [`entry`](Self::entry) before a
    /// toggle, removing the slot when the capture was `None`. Unwinds the
    /// guard after a backend write failure without guessing at the inverse
    /// operation.
    pub fn restore(&mut self, habit_id: HabitId, day: NaiveDate, entry: Option<CoinEntry>) {
        let key = Self::key(habit_id, day);
        match entry {
            Some(entry) => {
                self.entries.insert(key, entry);
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    /// Drop entries for days before `today`. Past-day records can never be
    /// toggled again, so they are discardable on load.
    pub fn prune_before(&mut self, today: NaiveDate) {
        let cutoff = today.format("%Y-%m-%d").to_string();
        self.entries
            .retain(|key, _| key.rsplit_once(':').is_some_and(|(_, day)| *day >= *cutoff));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn net_delta_over_any_toggle_sequence_is_one_award_or_zero() {
        let mut guard = CoinLedgerGuard::new();
        let habit = Uuid::new_v4();
        let today = date(2025, 10, 23);

        let mut net = 0i64;
        for _ in 0..3 {
            net += guard.on_complete(habit, today, 10);
            net += guard.on_uncomplete(habit, today);
        }
        assert_eq!(net, 0);

        net += guard.on_complete(habit, today, 10);
        assert_eq!(net, 10);

        // Re-completing without an undo awards nothing further.
        net += guard.on_complete(habit, today, 10);
        assert_eq!(net, 10);
    }

    #[test]
    fn reapplies_the_recorded_amount_not_a_fresh_one() {
        let mut guard = CoinLedgerGuard::new();
        let habit = Uuid::new_v4();
        let today = date(2025, 10, 23);

        assert_eq!(guard.on_complete(habit, today, 10), 10);
        assert_eq!(guard.on_uncomplete(habit, today), -10);
        // The base award changed between toggles; the guard sticks with the
        // amount it reversed.
        assert_eq!(guard.on_complete(habit, today, 50), 10);
    }

    #[test]
    fn uncomplete_without_a_record_is_a_no_op() {
        let mut guard = CoinLedgerGuard::new();
        assert_eq!(guard.on_uncomplete(Uuid::new_v4(), date(2025, 10, 23)), 0);
        assert!(guard.is_empty());
    }

    #[test]
    fn restore_puts_back_the_captured_entry() {
        let mut guard = CoinLedgerGuard::new();
        let habit = Uuid::new_v4();
        let today = date(2025, 10, 23);

        // A capture taken before the first award rolls the slot away again.
        let before = guard.entry(habit, today);
        assert_eq!(guard.on_complete(habit, today, 10), 10);
        guard.restore(habit, today, before);
        assert!(guard.is_empty());

        // An applied capture survives an intervening reversal.
        guard.on_complete(habit, today, 10);
        let applied = guard.entry(habit, today);
        guard.on_uncomplete(habit, today);
        guard.restore(habit, today, applied);
        assert_eq!(guard.on_complete(habit, today, 10), 0);
    }

    #[test]
    fn habits_and_days_are_tracked_independently() {
        let mut guard = CoinLedgerGuard::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let today = date(2025, 10, 23);

        assert_eq!(guard.on_complete(a, today, 5), 5);
        assert_eq!(guard.on_complete(b, today, 5), 5);
        assert_eq!(guard.on_complete(a, date(2025, 10, 24), 5), 5);
        assert_eq!(guard.len(), 3);
    }

    #[test]
    fn prune_discards_only_past_days() {
        let mut guard = CoinLedgerGuard::new();
        let habit = Uuid::new_v4();
        guard.on_complete(habit, date(2025, 9, 30), 10);
        guard.on_complete(habit, date(2025, 10, 22), 10);
        guard.on_complete(habit, date(2025, 10, 23), 10);

        guard.prune_before(date(2025, 10, 23));
        assert_eq!(guard.len(), 1);
        assert!(guard.entry(habit, date(2025, 10, 23)).is_some());
    }

    #[test]
    fn guard_round_trips_through_json() {
        let mut guard = CoinLedgerGuard::new();
        let habit = Uuid::new_v4();
        guard.on_complete(habit, date(2025, 10, 23), 10);

        let json = serde_json::to_string(&guard).unwrap();
        let restored: CoinLedgerGuard = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, guard);
    }
}
