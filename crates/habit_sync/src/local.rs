use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

const NAMESPACE: &str = "cozy";

/// A namespaced storage key, `cozy.<name>` or `cozy.<name>.<user_id>` for
/// user-scoped entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn global(name: &str) -> Self {
        Self(format!("{NAMESPACE}.{name}"))
    }

    pub fn scoped(name: &str, user_id: Uuid) -> Self {
        Self(format!("{NAMESPACE}.{name}.{user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Client-only persisted state: one JSON file per key under a state
/// directory. Advisory data only; nothing here is a backend source of
/// truth, so a malformed file is treated as absent, never as an error.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create state dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &StorageKey) -> Option<T> {
        let path = self.path_for(key);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = key.as_str(), %err, "discarding malformed local state");
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &StorageKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(self.path_for(key), raw)
            .with_context(|| format!("failed to persist `{}`", key.as_str()))
    }

    pub fn remove(&self, key: &StorageKey) {
        let _ = fs::remove_file(self.path_for(key));
    }
}

/// Push-reminder preferences, user-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationPrefs {
    pub enabled: bool,
    pub remind_at: NaiveTime,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            enabled: false,
            remind_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }
}

/// Ambient/theme preferences, user-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AmbientPrefs {
    pub theme: String,
    pub sound_enabled: bool,
    pub volume: f32,
}

impl Default for AmbientPrefs {
    fn default() -> Self {
        Self {
            theme: "cozy".to_string(),
            sound_enabled: true,
            volume: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_typed_values() {
        let temp = tempdir().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();
        let key = StorageKey::scoped("notifications", Uuid::new_v4());

        assert_eq!(store.get::<NotificationPrefs>(&key), None);

        let prefs = NotificationPrefs {
            enabled: true,
            remind_at: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        };
        store.put(&key, &prefs).unwrap();
        assert_eq!(store.get::<NotificationPrefs>(&key), Some(prefs));

        store.remove(&key);
        assert_eq!(store.get::<NotificationPrefs>(&key), None);
    }

    #[test]
    fn malformed_state_reads_as_absent() {
        let temp = tempdir().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();
        let key = StorageKey::global("ambient");

        fs::write(temp.path().join("cozy.ambient.json"), "{not json").unwrap();
        assert_eq!(store.get::<AmbientPrefs>(&key), None);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let temp = tempdir().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();
        let key = StorageKey::global("ambient");

        fs::write(temp.path().join("cozy.ambient.json"), r#"{"theme":"night"}"#).unwrap();
        let prefs: AmbientPrefs = store.get(&key).unwrap();
        assert_eq!(prefs.theme, "night");
        assert!(prefs.sound_enabled);
    }

    #[test]
    fn keys_are_namespaced_and_user_scoped() {
        let user = Uuid::new_v4();
        assert_eq!(StorageKey::global("ambient").as_str(), "cozy.ambient");
        assert_eq!(
            StorageKey::scoped("coin_guard", user).as_str(),
            format!("cozy.coin_guard.{user}")
        );
    }
}
