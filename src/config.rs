//! Configuration management for the focus hub

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "Storage full - the change is kept in memory only",
            DiskErrorKind::PermissionDenied => "Permission denied writing to ~/.memphis/",
            DiskErrorKind::NotFound => "Storage directory not found",
            DiskErrorKind::Other => "Failed to save data",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::StorageFull | ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28; EDQUOT = 122 (Linux) / 69 (macOS)
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    if os_error == 13 {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port for the local HTTP API used by UI collaborators
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding one JSON file per storage key
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Planned duration of a fresh timer in minutes (default: 25)
    #[serde(default = "default_timer_minutes")]
    pub default_timer_minutes: u64,

    /// Shortest accepted timer duration in minutes
    #[serde(default = "default_min_timer_minutes")]
    pub min_timer_minutes: u64,

    /// Longest accepted timer duration in minutes
    #[serde(default = "default_max_timer_minutes")]
    pub max_timer_minutes: u64,

    /// Daily goal shown when no goal was set for today (default: 60)
    #[serde(default = "default_daily_goal_minutes")]
    pub default_daily_goal_minutes: u32,

    /// Ticker period in milliseconds while the timer runs
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Pending background-sync tags before registration starts failing
    #[serde(default = "default_sync_channel_buffer")]
    pub sync_channel_buffer: usize,

    /// Number of storage/sync warnings retained for the health endpoint
    #[serde(default = "default_warning_capacity")]
    pub warning_capacity: usize,

    /// Log file retention in days
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,
}

fn default_api_port() -> u16 {
    7878
}

fn default_storage_dir() -> PathBuf {
    data_dir()
}

fn default_timer_minutes() -> u64 {
    25 // Pomodoro-style default
}

fn default_min_timer_minutes() -> u64 {
    1
}

fn default_max_timer_minutes() -> u64 {
    60
}

fn default_daily_goal_minutes() -> u32 {
    60
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_sync_channel_buffer() -> usize {
    64
}

fn default_warning_capacity() -> usize {
    100
}

fn default_log_retention_days() -> u64 {
    7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            storage_dir: default_storage_dir(),
            default_timer_minutes: default_timer_minutes(),
            min_timer_minutes: default_min_timer_minutes(),
            max_timer_minutes: default_max_timer_minutes(),
            default_daily_goal_minutes: default_daily_goal_minutes(),
            tick_interval_ms: default_tick_interval_ms(),
            sync_channel_buffer: default_sync_channel_buffer(),
            warning_capacity: default_warning_capacity(),
            log_retention_days: default_log_retention_days(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Planned duration of a fresh timer in seconds
    pub fn default_timer_seconds(&self) -> u64 {
        self.default_timer_minutes * 60
    }
}

/// Get the base configuration directory (~/.memphis)
/// Falls back to ./.memphis if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".memphis")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".memphis"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default directory for persisted collections
pub fn data_dir() -> PathBuf {
    config_dir().join("data")
}

/// Get the path to the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Ensure all required directories exist
pub fn ensure_directories(config: &Config) -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;

    std::fs::create_dir_all(&config.storage_dir)
        .context("Failed to create storage directory")?;

    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_port, 7878);
        assert_eq!(config.default_timer_minutes, 25);
        assert_eq!(config.default_timer_seconds(), 25 * 60);
        assert_eq!(config.default_daily_goal_minutes, 60);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.api_port, parsed.api_port);
        assert_eq!(config.storage_dir, parsed.storage_dir);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("default_timer_minutes = 50\n").unwrap();
        assert_eq!(parsed.default_timer_minutes, 50);
        assert_eq!(parsed.max_timer_minutes, 60);
        assert_eq!(parsed.tick_interval_ms, 1000);
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config.api_port, 7878);
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let config = Config {
            api_port: 9000,
            default_daily_goal_minutes: 90,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_port, 9000);
        assert_eq!(loaded.default_daily_goal_minutes, 90);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "api_port = \"not a port\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".memphis"));
    }

    #[test]
    fn test_categorize_io_error() {
        use std::io::{Error, ErrorKind};

        assert_eq!(
            categorize_io_error(&Error::from(ErrorKind::PermissionDenied)),
            DiskErrorKind::PermissionDenied
        );
        assert_eq!(
            categorize_io_error(&Error::from(ErrorKind::NotFound)),
            DiskErrorKind::NotFound
        );
        assert_eq!(
            categorize_io_error(&Error::from(ErrorKind::WriteZero)),
            DiskErrorKind::DiskFull
        );
    }
}
