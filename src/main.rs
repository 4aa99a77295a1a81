use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use memphis::api;
use memphis::clock::SystemClock;
use memphis::config::{self, Config};
use memphis::hub::{spawn_sync_worker, FocusHub, HubHandle, HubSettings};
use memphis::logging;
use memphis::offline::{self, ChannelSyncRegistrar};
use memphis::store::{FileBackend, PersistentStore, WarningLog};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Ensure config, data and log directories exist
    config::ensure_directories(&config)?;
    if !config::config_file_path().exists() {
        config.save()?;
    }

    // Initialize file logging BEFORE any tracing calls
    let (log_file_info, _guard) = logging::init_file_logging(&config::logs_dir())?;

    if let Ok(count) =
        logging::cleanup_old_logs_with_retention(&config::logs_dir(), config.log_retention_days)
    {
        if count > 0 {
            tracing::info!("Cleaned up {} old log files", count);
        }
    }

    tracing::info!("Logging to: {}", log_file_info.path.display());
    tracing::info!("Storing data in: {}", config.storage_dir.display());

    let store = PersistentStore::new(
        Arc::new(FileBackend::new(&config.storage_dir)),
        WarningLog::new(config.warning_capacity),
    );

    let (sync_tx, sync_rx) = offline::create_channel(config.sync_channel_buffer);
    let hub = FocusHub::open(
        store,
        Arc::new(SystemClock),
        Arc::new(ChannelSyncRegistrar::new(sync_tx)),
        HubSettings::from_config(&config),
    );
    let handle = HubHandle::new(hub, Duration::from_millis(config.tick_interval_ms));
    let sync_worker = spawn_sync_worker(handle.clone(), sync_rx);

    let server = api::start(config.api_port, handle.clone()).await?;
    println!("Memphis focus hub listening on http://{}", server.addr());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down");
    server.shutdown()?;
    handle.stop();
    sync_worker.abort();
    Ok(())
}
