use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::intention::IntentionDuration;

pub type HabitId = Uuid;

/// Category tags shown in the habit list. Unknown tags coming back from the
/// backend fall through to `Other` instead of failing the whole fetch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HabitCategory {
    Health,
    Fitness,
    Mindfulness,
    Productivity,
    Learning,
    Social,
    Creative,
    #[serde(other)]
    #[default]
    Other,
}

/// One habit record as exchanged with the backend. The backend owns the
/// authoritative copy; the client holds an optimistically mutated cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub category: HabitCategory,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub completed_today: bool,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub last_completed_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_reset_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_duration")]
    pub intention_duration: Option<IntentionDuration>,
    #[serde(default)]
    pub intention_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub intention_ended: bool,
    #[serde(default)]
    pub archived: bool,
}

impl Habit {
    pub fn new(user_id: Uuid, name: impl Into<String>, category: HabitCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            category,
            notes: String::new(),
            color: None,
            icon: None,
            completed_today: false,
            streak: 0,
            last_completed_date: None,
            last_reset_date: None,
            created_at: Utc::now(),
            intention_duration: None,
            intention_start_date: None,
            intention_ended: false,
            archived: false,
        }
    }

    /// A record is stale when no reset pass has stamped it for `today` yet.
    /// Stale records must be rolled over before their completion flag is
    /// trusted or toggled.
    pub fn needs_reset(&self, today: NaiveDate) -> bool {
        self.last_reset_date != Some(today)
    }
}

/// One row per habit per day in the completion ledger, independent of the
/// denormalized `completed_today` flag. The client writes both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionEvent {
    pub habit_id: HabitId,
    pub user_id: Uuid,
    pub completed_at: NaiveDate,
    pub completed: bool,
}

/// An invalid stored duration tag is coerced to absent (unbounded) rather
/// than surfaced as a deserialization error.
fn lenient_duration<'de, D>(deserializer: D) -> Result<Option<IntentionDuration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(IntentionDuration::from_tag))
}
