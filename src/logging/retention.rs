//! Log file retention management

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Result;

use super::file_writer::LOG_FILE_PREFIX;

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Clean up log files older than the default retention period
///
/// Returns the number of files deleted.
pub fn cleanup_old_logs(logs_dir: &Path) -> Result<usize> {
    cleanup_old_logs_with_retention(logs_dir, DEFAULT_RETENTION_DAYS)
}

/// Clean up log files older than the specified number of days
///
/// Returns the number of files deleted.
pub fn cleanup_old_logs_with_retention(logs_dir: &Path, retention_days: u64) -> Result<usize> {
    if !logs_dir.exists() {
        return Ok(0);
    }

    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted_count = 0;

    for entry in fs::read_dir(logs_dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_log_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log"));
        if !is_log_file {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        if let Ok(modified) = modified {
            if modified < cutoff && fs::remove_file(&path).is_ok() {
                deleted_count += 1;
            }
        }
    }

    Ok(deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_log(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap().write_all(b"test").unwrap();
        path
    }

    #[test]
    fn test_cleanup_nonexistent_dir() {
        let count = cleanup_old_logs(Path::new("/nonexistent/path/for/testing")).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_cleanup_keeps_recent_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let recent = write_log(temp_dir.path(), "memphis-2026-03-01_09-00-00.log");
        let other = write_log(temp_dir.path(), "other-2026-01-01_00-00-00.log");

        assert_eq!(cleanup_old_logs(temp_dir.path()).unwrap(), 0);
        assert!(recent.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_cleanup_removes_expired_logs() {
        let temp_dir = TempDir::new().unwrap();
        let old = write_log(temp_dir.path(), "memphis-2026-01-01_09-00-00.log");
        let ten_days_ago = SystemTime::now() - Duration::from_secs(10 * 24 * 60 * 60);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(ten_days_ago)
            .unwrap();

        assert_eq!(cleanup_old_logs_with_retention(temp_dir.path(), 30).unwrap(), 0);
        assert_eq!(cleanup_old_logs(temp_dir.path()).unwrap(), 1);
        assert!(!old.exists());
    }
}
