//! Raw string storage backends
//!
//! A backend only moves strings in and out of named slots. Encoding and
//! corruption recovery live in `PersistentStore`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StoreError;

/// String-keyed slot storage
pub trait StorageBackend: Send + Sync + Debug {
    /// Read the raw value of a slot, `None` when the slot is empty
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value of a slot
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Empty a slot; removing an empty slot is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Move an unparsable value out of the way so the slot starts fresh
    fn quarantine(&self, _key: &str) {}
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn io_error(key: &str, source: std::io::Error) -> StoreError {
        StoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.slot_path(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, e))?;

        // Write-then-rename so a crash mid-write never leaves a torn slot
        let path = self.slot_path(key);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value).map_err(|e| Self::io_error(key, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| Self::io_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn quarantine(&self, key: &str) {
        let path = self.slot_path(key);
        let backup_path = path.with_extension("json.backup");
        if let Err(e) = std::fs::rename(&path, &backup_path) {
            tracing::warn!(
                "Failed to backup corrupted slot {} to {}: {}",
                path.display(),
                backup_path.display(),
                e
            );
        } else {
            tracing::info!("Corrupted slot {} backed up to {}", key, backup_path.display());
        }
    }
}

/// In-process slots with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of all stored values
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of non-empty slots
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .slots
            .lock()
            .ok()
            .and_then(|slots| slots.get(key).cloned()))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(quota) = self.quota_bytes {
            let used: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let available = quota.saturating_sub(used);
            if value.len() > available {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed: value.len(),
                    available,
                });
            }
        }

        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if let Ok(mut slots) = self.slots.lock() {
            slots.remove(key);
        }
        Ok(())
    }

    fn quarantine(&self, key: &str) {
        let _ = self.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_backend_empty_slot() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());
        assert_eq!(backend.read("memphis_tasks").unwrap(), None);
    }

    #[test]
    fn test_file_backend_write_read_remove() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("nested"));

        backend.write("memphis_goals", "[]").unwrap();
        assert_eq!(backend.read("memphis_goals").unwrap().as_deref(), Some("[]"));
        assert!(!temp_dir.path().join("nested/memphis_goals.json.tmp").exists());

        backend.remove("memphis_goals").unwrap();
        assert_eq!(backend.read("memphis_goals").unwrap(), None);
        // Removing twice is fine
        backend.remove("memphis_goals").unwrap();
    }

    #[test]
    fn test_file_backend_quarantine() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        backend.write("memphis_sessions", "{not json").unwrap();
        backend.quarantine("memphis_sessions");

        assert_eq!(backend.read("memphis_sessions").unwrap(), None);
        assert!(temp_dir.path().join("memphis_sessions.json.backup").exists());
    }

    #[test]
    fn test_memory_backend_quota() {
        let backend = MemoryBackend::with_quota(10);
        backend.write("a", "12345").unwrap();
        // Overwriting a slot does not count its old value
        backend.write("a", "1234567890").unwrap();

        let err = backend.write("b", "x").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { available: 0, .. }));
        assert_eq!(backend.len(), 1);
    }
}
