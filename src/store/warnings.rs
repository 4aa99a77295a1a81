//! Ring buffer of non-fatal warnings
//!
//! Storage write failures and sync registration failures never interrupt the
//! caller. They land here so a health surface can show them.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which subsystem produced a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningSource {
    StorageWrite,
    StorageRead,
    SyncRegistration,
}

/// A single recorded warning
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub timestamp: DateTime<Utc>,
    pub source: WarningSource,
    /// Storage key or sync tag the warning concerns
    pub subject: String,
    pub message: String,
}

/// Shared, bounded warning log
#[derive(Debug, Clone)]
pub struct WarningLog {
    entries: Arc<RwLock<VecDeque<Warning>>>,
    capacity: usize,
}

impl WarningLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Record a warning, evicting the oldest one when full
    pub fn push(&self, source: WarningSource, subject: impl Into<String>, message: impl Into<String>) {
        let warning = Warning {
            timestamp: Utc::now(),
            source,
            subject: subject.into(),
            message: message.into(),
        };
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(warning);
        }
    }

    /// All retained warnings, oldest first
    pub fn all(&self) -> Vec<Warning> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all warnings (after they have been shown)
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for WarningLog {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_log_capacity() {
        let log = WarningLog::new(2);
        for i in 0..3 {
            log.push(WarningSource::StorageWrite, "memphis_tasks", format!("failure {}", i));
        }

        let all = log.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "failure 1");
        assert_eq!(all[1].message, "failure 2");
    }

    #[test]
    fn test_clones_share_entries() {
        let log = WarningLog::new(10);
        let other = log.clone();
        other.push(WarningSource::SyncRegistration, "sync-tasks", "channel full");
        assert_eq!(log.len(), 1);

        log.clear();
        assert!(other.is_empty());
    }
}
