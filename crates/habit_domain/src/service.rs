use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::coins::CoinLedgerGuard;
use crate::habit::{CompletionEvent, Habit, HabitCategory, HabitId};
use crate::intention::{self, IntentionDuration, IntentionResolution, IntentionStatus};
use crate::notifications::{NotificationRequest, NotificationSink};
use crate::reset;
use crate::store::HabitStore;
use crate::streak::{self, StreakState};

pub const DEFAULT_BASE_AWARD: u32 = 10;

/// Fields the user can edit after creation.
#[derive(Debug, Clone)]
pub struct HabitDetails {
    pub name: String,
    pub category: HabitCategory,
    pub notes: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Result of a completion toggle: the updated record plus the net coin
/// change the ledger guard allowed for it.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    pub habit: Habit,
    pub coin_delta: i64,
}

pub struct HabitServiceBuilder {
    store: Option<Box<dyn HabitStore>>,
    user_id: Option<Uuid>,
    base_award: u32,
    coin_guard: CoinLedgerGuard,
    notification_sink: Option<Box<dyn NotificationSink>>,
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            user_id: None,
            base_award: DEFAULT_BASE_AWARD,
            coin_guard: CoinLedgerGuard::new(),
            notification_sink: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn HabitStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn base_award(mut self, amount: u32) -> Self {
        self.base_award = amount;
        self
    }

    /// Seed the guard from a persisted snapshot so a restarted session does
    /// not re-award coins for habits already rewarded today.
    pub fn with_coin_guard(mut self, guard: CoinLedgerGuard) -> Self {
        self.coin_guard = guard;
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    /// Fetch the user's habits, run the day-rollover pass, and prune stale
    /// guard entries. The returned service holds the optimistic cache.
    pub fn build(self, today: NaiveDate) -> Result<HabitService> {
        let store = self.store.ok_or_else(|| anyhow!("habit store not configured"))?;
        let user_id = self.user_id.ok_or_else(|| anyhow!("user not configured"))?;

        let habits = store
            .fetch_habits(user_id)
            .context("failed to load habits")?;
        info!(count = habits.len(), "loaded habit records");

        let mut guard = self.coin_guard;
        guard.prune_before(today);

        let service = HabitService {
            store,
            user_id,
            habits: RwLock::new(habits.into_iter().map(|habit| (habit.id, habit)).collect()),
            coin_guard: RwLock::new(guard),
            session_coins: RwLock::new(0),
            base_award: self.base_award,
            notification_sink: self.notification_sink,
        };
        service.run_daily_reset(today)?;
        Ok(service)
    }
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HabitService {
    store: Box<dyn HabitStore>,
    user_id: Uuid,
    habits: RwLock<HashMap<HabitId, Habit>>,
    coin_guard: RwLock<CoinLedgerGuard>,
    session_coins: RwLock<i64>,
    base_award: u32,
    notification_sink: Option<Box<dyn NotificationSink>>,
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Habits shown in active views: archived records are excluded but kept
    /// in the cache for history.
    pub fn active_habits(&self) -> Vec<Habit> {
        let habits = self.habits.read();
        let mut active: Vec<Habit> = habits
            .values()
            .filter(|habit| !habit.archived)
            .cloned()
            .collect();
        active.sort_by_key(|habit| (habit.created_at, habit.id));
        active
    }

    pub fn habit(&self, habit_id: HabitId) -> Result<Habit> {
        self.habits
            .read()
            .get(&habit_id)
            .cloned()
            .ok_or_else(|| anyhow!("habit not loaded"))
    }

    pub fn create_habit(
        &self,
        details: HabitDetails,
        intention: Option<(IntentionDuration, NaiveDate)>,
    ) -> Result<Habit> {
        let mut habit = Habit::new(self.user_id, details.name, details.category);
        habit.notes = details.notes;
        habit.color = details.color;
        habit.icon = details.icon;
        if let Some((duration, start)) = intention {
            habit.intention_duration = Some(duration);
            habit.intention_start_date = Some(start);
        }

        self.habits.write().insert(habit.id, habit.clone());
        if let Err(err) = self.store.insert_habit(&habit) {
            self.habits.write().remove(&habit.id);
            return Err(err).context("failed to create habit");
        }
        info!(habit_id = %habit.id, "habit created");
        Ok(habit)
    }

    pub fn update_details(&self, habit_id: HabitId, details: HabitDetails) -> Result<Habit> {
        self.mutate_habit(habit_id, |habit| {
            habit.name = details.name.clone();
            habit.category = details.category;
            habit.notes = details.notes.clone();
            habit.color = details.color.clone();
            habit.icon = details.icon.clone();
        })
    }

    /// The completion toggle: pure streak computation, optimistic cache
    /// update, coin-guard consult, then the two backend writes. Any write
    /// failure restores the prior snapshot and reverses the coin delta.
    pub fn toggle_completion(&self, habit_id: HabitId, today: NaiveDate) -> Result<ToggleOutcome> {
        let snapshot = {
            let mut habits = self.habits.write();
            let habit = habits
                .get_mut(&habit_id)
                .ok_or_else(|| anyhow!("habit not loaded"))?;
            let snapshot = habit.clone();

            // A stale record reflects an earlier day; roll it over before
            // trusting or flipping its completion flag.
            if let Some(patch) = reset::plan_rollover(habit, today) {
                debug!(habit_id = %habit_id, "rolling over stale record before toggle");
                patch.apply(habit);
            }

            let state = StreakState {
                streak: habit.streak,
                completed_today: habit.completed_today,
                last_completed_date: habit.last_completed_date,
            };
            let next = if state.completed_today {
                streak::uncomplete(state, today)
            } else {
                streak::complete(state, today)
            };
            habit.streak = next.streak;
            habit.completed_today = next.completed_today;
            habit.last_completed_date = next.last_completed_date;
            snapshot
        };

        let updated = self.habit(habit_id)?;
        let completing = updated.completed_today;

        let (coin_delta, prior_entry) = {
            let mut guard = self.coin_guard.write();
            let prior_entry = guard.entry(habit_id, today);
            let delta = if completing {
                guard.on_complete(habit_id, today, self.base_award)
            } else {
                guard.on_uncomplete(habit_id, today)
            };
            (delta, prior_entry)
        };
        *self.session_coins.write() += coin_delta;

        let persisted = self.store.update_habit(&updated).and_then(|()| {
            if completing {
                self.store.insert_completion(&CompletionEvent {
                    habit_id,
                    user_id: self.user_id,
                    completed_at: today,
                    completed: true,
                })
            } else {
                self.store.delete_completion(habit_id, today)
            }
        });

        if let Err(err) = persisted {
            warn!(habit_id = %habit_id, %err, "toggle write failed, rolling back");
            self.habits.write().insert(habit_id, snapshot);
            // Restore the captured entry rather than running the inverse
            // operation: on a zero-delta toggle the inverse is not a no-op
            // and would flip the applied flag.
            self.coin_guard
                .write()
                .restore(habit_id, today, prior_entry);
            *self.session_coins.write() -= coin_delta;
            return Err(err).context("failed to persist completion toggle");
        }

        debug!(habit_id = %habit_id, streak = updated.streak, coin_delta, "toggle persisted");
        Ok(ToggleOutcome {
            habit: updated,
            coin_delta,
        })
    }

    /// Day-rollover pass. Idempotent within a day: records already stamped
    /// for `today` are skipped. A persistence failure keeps the in-memory
    /// reset and the next load repeats the same pass.
    pub fn run_daily_reset(&self, today: NaiveDate) -> Result<usize> {
        let patches = {
            let mut habits = self.habits.write();
            let patches = reset::plan_batch(habits.values(), today);
            for (habit_id, patch) in &patches {
                if let Some(habit) = habits.get_mut(habit_id) {
                    patch.apply(habit);
                }
            }
            patches
        };
        if patches.is_empty() {
            return Ok(0);
        }
        info!(count = patches.len(), "applying day rollover");
        if let Err(err) = self.store.apply_resets(&patches) {
            warn!(%err, "persisting rollover failed; pass repeats on next load");
        }
        Ok(patches.len())
    }

    pub fn intention_status(&self, habit_id: HabitId, today: NaiveDate) -> Result<IntentionStatus> {
        let habit = self.habit(habit_id)?;
        Ok(intention::evaluate(
            habit.intention_duration,
            habit.intention_start_date,
            habit.intention_ended,
            today,
        ))
    }

    /// Habits whose declared period has elapsed without a user decision.
    pub fn habits_needing_acknowledgment(&self, today: NaiveDate) -> Vec<Habit> {
        self.active_habits()
            .into_iter()
            .filter(|habit| {
                intention::evaluate(
                    habit.intention_duration,
                    habit.intention_start_date,
                    habit.intention_ended,
                    today,
                ) == IntentionStatus::NeedsAcknowledgment
            })
            .collect()
    }

    pub fn resolve_intention(
        &self,
        habit_id: HabitId,
        resolution: IntentionResolution,
    ) -> Result<Habit> {
        let updated = self.mutate_habit(habit_id, |habit| {
            habit.intention_ended = true;
            match resolution {
                IntentionResolution::ContinueIndefinitely => {
                    habit.intention_duration = None;
                    habit.intention_start_date = None;
                }
                IntentionResolution::Pause => {}
                IntentionResolution::Archive => habit.archived = true,
            }
        })?;
        if updated.archived {
            if let Some(sink) = &self.notification_sink {
                sink.clear_for_habit(&updated);
            }
        }
        Ok(updated)
    }

    /// Start a fresh intention window; re-flagging resumes once this runs.
    pub fn restart_intention(
        &self,
        habit_id: HabitId,
        duration: IntentionDuration,
        today: NaiveDate,
    ) -> Result<Habit> {
        self.mutate_habit(habit_id, |habit| {
            habit.intention_duration = Some(duration);
            habit.intention_start_date = Some(today);
            habit.intention_ended = false;
        })
    }

    /// Soft delete: the record leaves active views but history is retained.
    pub fn archive_habit(&self, habit_id: HabitId) -> Result<Habit> {
        let archived = self.mutate_habit(habit_id, |habit| habit.archived = true)?;
        if let Some(sink) = &self.notification_sink {
            sink.clear_for_habit(&archived);
        }
        Ok(archived)
    }

    /// Hard delete: the record and its completion history are purged.
    pub fn delete_habit(&self, habit_id: HabitId) -> Result<()> {
        let removed = self
            .habits
            .write()
            .remove(&habit_id)
            .ok_or_else(|| anyhow!("habit not loaded"))?;

        let result = self
            .store
            .delete_completions_for(habit_id)
            .and_then(|()| self.store.delete_habit(habit_id));
        if let Err(err) = result {
            self.habits.write().insert(habit_id, removed);
            return Err(err).context("failed to delete habit");
        }
        if let Some(sink) = &self.notification_sink {
            sink.clear_for_habit(&removed);
        }
        info!(habit_id = %habit_id, "habit deleted");
        Ok(())
    }

    /// Net coin change accumulated by this session's toggles.
    pub fn session_coin_balance(&self) -> i64 {
        *self.session_coins.read()
    }

    /// Coins currently applied for one habit today, per the guard.
    pub fn coin_delta_today(&self, habit_id: HabitId, today: NaiveDate) -> i64 {
        self.coin_guard
            .read()
            .entry(habit_id, today)
            .filter(|entry| entry.applied)
            .map(|entry| i64::from(entry.amount))
            .unwrap_or(0)
    }

    /// Snapshot for the local-state layer to persist between sessions.
    pub fn coin_guard_snapshot(&self) -> CoinLedgerGuard {
        self.coin_guard.read().clone()
    }

    /// Schedule a reminder for every active habit not yet completed today.
    /// Without an installed sink this is a silent no-op.
    pub fn schedule_daily_reminders(&self, today: NaiveDate, remind_at: NaiveTime) {
        let Some(sink) = &self.notification_sink else {
            return;
        };
        for habit in self.active_habits() {
            if habit.completed_today {
                continue;
            }
            let when = Utc.from_utc_datetime(&today.and_time(remind_at));
            sink.schedule(NotificationRequest {
                title: format!("Habit: {}", habit.name),
                body: format!("Keep your {} day streak going", habit.streak),
                scheduled_for: when,
            });
        }
    }

    fn mutate_habit(&self, habit_id: HabitId, apply: impl FnOnce(&mut Habit)) -> Result<Habit> {
        let (snapshot, updated) = {
            let mut habits = self.habits.write();
            let habit = habits
                .get_mut(&habit_id)
                .ok_or_else(|| anyhow!("habit not loaded"))?;
            let snapshot = habit.clone();
            apply(habit);
            (snapshot, habit.clone())
        };
        if let Err(err) = self.store.update_habit(&updated) {
            self.habits.write().insert(habit_id, snapshot);
            return Err(err).context("failed to persist habit update");
        }
        Ok(updated)
    }
}
