use std::collections::HashMap;

use chrono::NaiveDate;
use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::habit::{CompletionEvent, Habit, HabitId};
use crate::reset::ResetPatch;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached. The caller reverts its optimistic
    /// mutation and surfaces a transient notice; there is no retry policy.
    #[error("backend unreachable: {0}")]
    Unavailable(String),
    #[error("backend rejected the write: {0}")]
    Rejected(String),
    #[error("habit {0} not found")]
    NotFound(HabitId),
}

/// Remote persistence boundary. The hosted backend SDK adapter implements
/// this trait outside this repository; `InMemoryStore` below serves tests
/// and offline sessions. Calls are request/response with no client-side
/// timeout on top of the SDK's own defaults.
pub trait HabitStore: Send + Sync {
    fn fetch_habits(&self, user_id: Uuid) -> Result<Vec<Habit>, StoreError>;
    fn insert_habit(&self, habit: &Habit) -> Result<(), StoreError>;
    fn update_habit(&self, habit: &Habit) -> Result<(), StoreError>;
    /// Persist a rollover batch in one call where the backend allows it.
    fn apply_resets(&self, patches: &[(HabitId, ResetPatch)]) -> Result<(), StoreError>;
    fn delete_habit(&self, habit_id: HabitId) -> Result<(), StoreError>;
    fn insert_completion(&self, event: &CompletionEvent) -> Result<(), StoreError>;
    fn delete_completion(&self, habit_id: HabitId, day: NaiveDate) -> Result<(), StoreError>;
    fn delete_completions_for(&self, habit_id: HabitId) -> Result<(), StoreError>;
}

impl<S: HabitStore + ?Sized> HabitStore for std::sync::Arc<S> {
    fn fetch_habits(&self, user_id: Uuid) -> Result<Vec<Habit>, StoreError> {
        (**self).fetch_habits(user_id)
    }
    fn insert_habit(&self, habit: &Habit) -> Result<(), StoreError> {
        (**self).insert_habit(habit)
    }
    fn update_habit(&self, habit: &Habit) -> Result<(), StoreError> {
        (**self).update_habit(habit)
    }
    fn apply_resets(&self, patches: &[(HabitId, ResetPatch)]) -> Result<(), StoreError> {
        (**self).apply_resets(patches)
    }
    fn delete_habit(&self, habit_id: HabitId) -> Result<(), StoreError> {
        (**self).delete_habit(habit_id)
    }
    fn insert_completion(&self, event: &CompletionEvent) -> Result<(), StoreError> {
        (**self).insert_completion(event)
    }
    fn delete_completion(&self, habit_id: HabitId, day: NaiveDate) -> Result<(), StoreError> {
        (**self).delete_completion(habit_id, day)
    }
    fn delete_completions_for(&self, habit_id: HabitId) -> Result<(), StoreError> {
        (**self).delete_completions_for(habit_id)
    }
}

#[derive(Default)]
struct InMemoryState {
    habits: HashMap<HabitId, Habit>,
    completions: Vec<CompletionEvent>,
    fail_next_write: Option<String>,
}

/// Table-shaped in-memory store. Tests use `fail_next_write` to exercise the
/// rollback path.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_habits(habits: impl IntoIterator<Item = Habit>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for habit in habits {
                state.habits.insert(habit.id, habit);
            }
        }
        store
    }

    /// Make the next write call fail with `Unavailable(reason)`.
    pub fn fail_next_write(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_write = Some(reason.into());
    }

    pub fn completions(&self) -> Vec<CompletionEvent> {
        self.state.lock().completions.clone()
    }

    pub fn habit(&self, habit_id: HabitId) -> Option<Habit> {
        self.state.lock().habits.get(&habit_id).cloned()
    }

    fn write_gate(state: &mut InMemoryState) -> Result<(), StoreError> {
        match state.fail_next_write.take() {
            Some(reason) => Err(StoreError::Unavailable(reason)),
            None => Ok(()),
        }
    }
}

impl HabitStore for InMemoryStore {
    fn fetch_habits(&self, user_id: Uuid) -> Result<Vec<Habit>, StoreError> {
        let state = self.state.lock();
        let mut habits: Vec<Habit> = state
            .habits
            .values()
            .filter(|habit| habit.user_id == user_id)
            .cloned()
            .collect();
        habits.sort_by_key(|habit| (habit.created_at, habit.id));
        Ok(habits)
    }

    fn insert_habit(&self, habit: &Habit) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::write_gate(&mut state)?;
        state.habits.insert(habit.id, habit.clone());
        Ok(())
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::write_gate(&mut state)?;
        if !state.habits.contains_key(&habit.id) {
            return Err(StoreError::NotFound(habit.id));
        }
        state.habits.insert(habit.id, habit.clone());
        Ok(())
    }

    fn apply_resets(&self, patches: &[(HabitId, ResetPatch)]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::write_gate(&mut state)?;
        for (habit_id, patch) in patches {
            let habit = state
                .habits
                .get_mut(habit_id)
                .ok_or(StoreError::NotFound(*habit_id))?;
            patch.apply(habit);
        }
        Ok(())
    }

    fn delete_habit(&self, habit_id: HabitId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::write_gate(&mut state)?;
        state
            .habits
            .remove(&habit_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(habit_id))
    }

    fn insert_completion(&self, event: &CompletionEvent) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::write_gate(&mut state)?;
        // One row per habit per day; a re-completion after an undo replaces
        // the prior row instead of appending a duplicate.
        state
            .completions
            .retain(|row| !(row.habit_id == event.habit_id && row.completed_at == event.completed_at));
        state.completions.push(event.clone());
        Ok(())
    }

    fn delete_completion(&self, habit_id: HabitId, day: NaiveDate) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::write_gate(&mut state)?;
        state
            .completions
            .retain(|row| !(row.habit_id == habit_id && row.completed_at == day));
        Ok(())
    }

    fn delete_completions_for(&self, habit_id: HabitId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::write_gate(&mut state)?;
        state.completions.retain(|row| row.habit_id != habit_id);
        Ok(())
    }
}
