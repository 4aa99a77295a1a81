//! Typed persistence over string-keyed JSON slots
//!
//! Every persisted collection lives under one of the centrally enumerated
//! `StorageKey`s. Reads never fail: an absent or undecodable slot yields the
//! caller's default. Writes report failures, which are also logged and
//! recorded in the shared `WarningLog`.

mod backend;
mod warnings;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use warnings::{Warning, WarningLog, WarningSource};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Storage slots, stable across restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Tasks,
    Sessions,
    Goals,
    TimerState,
    OfflineActions,
}

impl StorageKey {
    pub const ALL: [StorageKey; 5] = [
        StorageKey::Tasks,
        StorageKey::Sessions,
        StorageKey::Goals,
        StorageKey::TimerState,
        StorageKey::OfflineActions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Tasks => "memphis_tasks",
            StorageKey::Sessions => "memphis_sessions",
            StorageKey::Goals => "memphis_goals",
            StorageKey::TimerState => "memphis_timer_state",
            StorageKey::OfflineActions => "memphis_offline_actions",
        }
    }
}

/// Cheaply cloneable handle to the persistent store
#[derive(Debug, Clone)]
pub struct PersistentStore {
    backend: Arc<dyn StorageBackend>,
    warnings: WarningLog,
}

impl PersistentStore {
    pub fn new(backend: Arc<dyn StorageBackend>, warnings: WarningLog) -> Self {
        Self { backend, warnings }
    }

    /// Store backed by memory only, for tests and ephemeral runs
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), WarningLog::default())
    }

    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }

    /// Decode a slot, `None` if it is empty or undecodable
    pub fn get_opt<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let raw = match self.backend.read(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read {}: {}, using default", key.as_str(), e);
                self.warnings
                    .push(WarningSource::StorageRead, key.as_str(), e.to_string());
                return None;
            }
        };

        if raw.trim().is_empty() {
            return None;
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Corrupt value under {}: {}, using default", key.as_str(), e);
                self.backend.quarantine(key.as_str());
                None
            }
        }
    }

    /// Decode a slot or fall back to `default`
    pub fn get<T: DeserializeOwned>(&self, key: StorageKey, default: T) -> T {
        self.get_opt(key).unwrap_or(default)
    }

    /// Decode a slot or fall back to `T::default()`
    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: StorageKey) -> T {
        self.get_opt(key).unwrap_or_default()
    }

    /// Encode and write a value synchronously
    pub fn set<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<(), StoreError> {
        let result = serde_json::to_string(value)
            .map_err(|source| StoreError::Serialize {
                key: key.as_str().to_string(),
                source,
            })
            .and_then(|encoded| self.backend.write(key.as_str(), &encoded));

        match &result {
            Ok(()) => debug!("Persisted {}", key.as_str()),
            Err(e) => self.record_write_failure(key, e),
        }
        result
    }

    /// Empty a slot
    pub fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        let result = self.backend.remove(key.as_str());
        if let Err(e) = &result {
            self.record_write_failure(key, e);
        }
        result
    }

    fn record_write_failure(&self, key: StorageKey, e: &StoreError) {
        warn!(
            "Failed to persist {} ({}): {}",
            key.as_str(),
            e.disk_kind().user_message(),
            e
        );
        self.warnings.push(
            WarningSource::StorageWrite,
            key.as_str(),
            format!("{}: {}", e.disk_kind().user_message(), e),
        );
    }
}
