use anyhow::Result;
use serde::{Deserialize, Serialize};

use habit_domain::store::{HabitStore, InMemoryStore};

/// Where a session's habit records live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StorageBackend {
    /// Purely local session, nothing leaves the device. Also what tests use.
    InMemory,
    /// A hosted backend-as-a-service project.
    Hosted(HostedBinding),
}

/// Credentials and project metadata for the hosted backend. The SDK adapter
/// that turns this into a live `HabitStore` lives with the embedding
/// application, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostedBinding {
    pub project_url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
    pub refresh_token: String,
    pub token_expiry_seconds: Option<i64>,
}

/// Build the store for a backend, or return `None` when the backend needs
/// an externally supplied adapter (the session builder accepts one via
/// `with_store`).
pub fn build_store(backend: &StorageBackend) -> Result<Option<Box<dyn HabitStore>>> {
    match backend {
        StorageBackend::InMemory => Ok(Some(Box::new(InMemoryStore::new()))),
        StorageBackend::Hosted(binding) => {
            tracing::debug!(project = %binding.project_url, "hosted backend requires an SDK adapter");
            Ok(None)
        }
    }
}
