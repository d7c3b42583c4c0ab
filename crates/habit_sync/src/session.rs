use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use habit_domain::coins::CoinLedgerGuard;
use habit_domain::habit::{Habit, HabitId};
use habit_domain::intention::{IntentionDuration, IntentionResolution};
use habit_domain::notifications::NotificationSink;
use habit_domain::service::{HabitDetails, ToggleOutcome};
use habit_domain::store::HabitStore;
use habit_domain::HabitService;

use crate::analytics::AnalyticsQueue;
use crate::backend::{build_store, StorageBackend};
use crate::local::{AmbientPrefs, LocalStore, NotificationPrefs, StorageKey};

const COIN_GUARD_KEY: &str = "coin_guard";

pub struct ClientSessionBuilder {
    backend: StorageBackend,
    state_dir: Option<PathBuf>,
    user_id: Option<Uuid>,
    store_override: Option<Box<dyn HabitStore>>,
    notification_sink: Option<Box<dyn NotificationSink>>,
}

impl ClientSessionBuilder {
    pub fn new() -> Self {
        Self {
            backend: StorageBackend::InMemory,
            state_dir: None,
            user_id: None,
            store_override: None,
            notification_sink: None,
        }
    }

    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Supply the store directly. Required for `Hosted` backends, whose
    /// SDK adapter lives with the embedding application.
    pub fn with_store(mut self, store: Box<dyn HabitStore>) -> Self {
        self.store_override = Some(store);
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    /// Assemble local state, analytics, and the habit service for one
    /// signed-in user. Runs the day-rollover pass as part of the load.
    #[instrument(skip(self), fields(today = %today))]
    pub fn build(self, today: NaiveDate) -> Result<ClientSession> {
        let user_id = self.user_id.ok_or_else(|| anyhow!("user not configured"))?;
        let state_dir = self
            .state_dir
            .ok_or_else(|| anyhow!("state directory not configured"))?;
        let local = LocalStore::open(&state_dir)?;

        let store = match self.store_override {
            Some(store) => store,
            None => build_store(&self.backend)?
                .ok_or_else(|| anyhow!("backend requires an SDK adapter store"))?,
        };

        let guard_key = StorageKey::scoped(COIN_GUARD_KEY, user_id);
        let guard: CoinLedgerGuard = local.get(&guard_key).unwrap_or_default();

        let mut builder = HabitService::builder()
            .with_store(store)
            .for_user(user_id)
            .with_coin_guard(guard);
        if let Some(sink) = self.notification_sink {
            builder = builder.with_notification_sink(sink);
        }
        let service = builder.build(today).context("failed to start habit session")?;

        // Pruning happened during the service build; write the trimmed
        // guard back so stale entries do not outlive this load.
        local.put(&guard_key, &service.coin_guard_snapshot())?;

        let mut analytics = AnalyticsQueue::load(&local, user_id);
        analytics.record("session_started", json!({ "habits": service.active_habits().len() }));

        let notification_prefs = local
            .get(&StorageKey::scoped("notifications", user_id))
            .unwrap_or_default();
        let ambient_prefs = local
            .get(&StorageKey::scoped("ambient", user_id))
            .unwrap_or_default();

        info!(user = %user_id, "client session ready");
        Ok(ClientSession {
            service,
            local,
            analytics,
            notification_prefs,
            ambient_prefs,
            user_id,
        })
    }
}

impl Default for ClientSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one signed-in user's client holds: the optimistic habit
/// cache, client-only local state, and the analytics queue.
pub struct ClientSession {
    service: HabitService,
    local: LocalStore,
    analytics: AnalyticsQueue,
    notification_prefs: NotificationPrefs,
    ambient_prefs: AmbientPrefs,
    user_id: Uuid,
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl ClientSession {
    pub fn builder() -> ClientSessionBuilder {
        ClientSessionBuilder::new()
    }

    pub fn service(&self) -> &HabitService {
        &self.service
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.service.active_habits()
    }

    /// Completion toggle plus the session bookkeeping around it: the coin
    /// guard snapshot is persisted and an analytics event is queued.
    pub fn toggle_habit(&mut self, habit_id: HabitId, today: NaiveDate) -> Result<ToggleOutcome> {
        let outcome = self.service.toggle_completion(habit_id, today)?;
        self.persist_coin_guard()?;
        let event = if outcome.habit.completed_today {
            "habit_completed"
        } else {
            "habit_uncompleted"
        };
        self.analytics.record(
            event,
            json!({
                "habit_id": outcome.habit.id,
                "streak": outcome.habit.streak,
                "coin_delta": outcome.coin_delta,
            }),
        );
        Ok(outcome)
    }

    pub fn create_habit(
        &mut self,
        details: HabitDetails,
        intention: Option<(IntentionDuration, NaiveDate)>,
    ) -> Result<Habit> {
        let habit = self.service.create_habit(details, intention)?;
        self.analytics
            .record("habit_created", json!({ "habit_id": habit.id }));
        Ok(habit)
    }

    pub fn resolve_intention(
        &mut self,
        habit_id: HabitId,
        resolution: IntentionResolution,
    ) -> Result<Habit> {
        let habit = self.service.resolve_intention(habit_id, resolution)?;
        self.analytics.record(
            "intention_resolved",
            json!({ "habit_id": habit_id, "resolution": resolution }),
        );
        Ok(habit)
    }

    pub fn notification_prefs(&self) -> &NotificationPrefs {
        &self.notification_prefs
    }

    pub fn set_notification_prefs(&mut self, prefs: NotificationPrefs, today: NaiveDate) -> Result<()> {
        self.local
            .put(&StorageKey::scoped("notifications", self.user_id), &prefs)?;
        if prefs.enabled {
            self.service.schedule_daily_reminders(today, prefs.remind_at);
        }
        self.notification_prefs = prefs;
        Ok(())
    }

    pub fn ambient_prefs(&self) -> &AmbientPrefs {
        &self.ambient_prefs
    }

    pub fn set_ambient_prefs(&mut self, prefs: AmbientPrefs) -> Result<()> {
        self.local
            .put(&StorageKey::scoped("ambient", self.user_id), &prefs)?;
        self.ambient_prefs = prefs;
        Ok(())
    }

    /// Queued analytics events, for the embedding app's collector.
    pub fn drain_analytics(&mut self) -> Vec<crate::analytics::AnalyticsEvent> {
        self.analytics.drain()
    }

    /// Persist everything client-owned. Call on suspend/shutdown.
    pub fn flush(&self) -> Result<()> {
        self.persist_coin_guard()?;
        self.analytics.flush(&self.local)
    }

    fn persist_coin_guard(&self) -> Result<()> {
        self.local.put(
            &StorageKey::scoped(COIN_GUARD_KEY, self.user_id),
            &self.service.coin_guard_snapshot(),
        )
    }
}
