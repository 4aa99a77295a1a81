//! Logging for the focus hub
//!
//! Logs go to a timestamped file under the config directory; old files are
//! pruned at start-up.

mod file_writer;
mod retention;

pub use file_writer::{init_file_logging, LogFileInfo, LoggingGuard};
pub use retention::{cleanup_old_logs, cleanup_old_logs_with_retention};
