//! Error types shared across the focus hub
//!
//! `ValidationError` is the only error a caller ever sees from a mutation.
//! Storage and sync failures are degraded paths: they are logged and recorded
//! as warnings, never propagated into code that does not expect them.

use thiserror::Error;

use crate::config::{categorize_io_error, DiskErrorKind};

/// Input rejected by the data layer or the timer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task title is required")]
    EmptyTitle,
    #[error("Task title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("Task description must be at most {max} characters")]
    DescriptionTooLong { max: usize },
    #[error("Target minutes must be greater than 0")]
    NonPositiveGoal,
    #[error("Goal date must be a YYYY-MM-DD day key, got '{0}'")]
    InvalidDate(String),
    #[error("Timer duration must be between {min} and {max} minutes, got {got}")]
    DurationOutOfRange { min: u64, max: u64, got: u64 },
    #[error("Timer duration cannot change while a run is in progress")]
    TimerBusy,
}

/// Failure writing to or reading from a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage quota exceeded writing '{key}' ({needed} bytes, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },
}

impl StoreError {
    /// Classify the failure for a user-facing message
    pub fn disk_kind(&self) -> DiskErrorKind {
        match self {
            StoreError::Io { source, .. } => categorize_io_error(source),
            StoreError::QuotaExceeded { .. } => DiskErrorKind::DiskFull,
            StoreError::Serialize { .. } => DiskErrorKind::Other,
        }
    }
}

/// Failure registering a background replay with the sync facility
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("sync channel full, dropped tag '{0}'")]
    ChannelFull(String),
    #[error("sync worker is gone, dropped tag '{0}'")]
    Closed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::EmptyTitle.to_string(), "Task title is required");
        let err = ValidationError::DurationOutOfRange {
            min: 1,
            max: 60,
            got: 90,
        };
        assert_eq!(
            err.to_string(),
            "Timer duration must be between 1 and 60 minutes, got 90"
        );
    }

    #[test]
    fn test_quota_is_disk_full() {
        let err = StoreError::QuotaExceeded {
            key: "memphis_tasks".to_string(),
            needed: 10,
            available: 2,
        };
        assert_eq!(err.disk_kind(), DiskErrorKind::DiskFull);
    }

    #[test]
    fn test_permission_denied_io() {
        let err = StoreError::Io {
            key: "memphis_goals".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.disk_kind(), DiskErrorKind::PermissionDenied);
    }
}
