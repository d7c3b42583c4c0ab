use std::collections::VecDeque;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::local::{LocalStore, StorageKey};

const QUEUE_KEY: &str = "analytics_queue";
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyticsEvent {
    pub name: String,
    #[serde(default)]
    pub props: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Explicitly constructed, injectable event queue. Events accumulate while
/// offline and the embedding application drains them towards its collector;
/// the oldest events are dropped once the bounded capacity is reached.
#[derive(Debug)]
pub struct AnalyticsQueue {
    user_id: Uuid,
    events: VecDeque<AnalyticsEvent>,
    capacity: usize,
}

impl AnalyticsQueue {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            events: VecDeque::new(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Restore the queue persisted by a previous session. A stored queue
    /// longer than the capacity keeps only the newest events.
    pub fn load(store: &LocalStore, user_id: Uuid) -> Self {
        let key = StorageKey::scoped(QUEUE_KEY, user_id);
        let mut events: VecDeque<AnalyticsEvent> = store.get(&key).unwrap_or_default();
        if events.len() > DEFAULT_CAPACITY {
            events.drain(..events.len() - DEFAULT_CAPACITY);
        }
        debug!(count = events.len(), "restored analytics queue");
        Self {
            user_id,
            events,
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn record(&mut self, name: impl Into<String>, props: serde_json::Value) {
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(AnalyticsEvent {
            name: name.into(),
            props,
            recorded_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hand every queued event to the caller, emptying the queue.
    pub fn drain(&mut self) -> Vec<AnalyticsEvent> {
        self.events.drain(..).collect()
    }

    /// Persist the queue so an interrupted session loses nothing.
    pub fn flush(&self, store: &LocalStore) -> Result<()> {
        store.put(&StorageKey::scoped(QUEUE_KEY, self.user_id), &self.events)
    }
}
