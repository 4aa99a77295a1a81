//! API server lifecycle

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tracing::info;

use crate::hub::HubHandle;

use super::router;

/// Handle to control the running server
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    addr: SocketAddr,
}

impl ServerHandle {
    /// Get the address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown the server gracefully
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The server task may already be gone
            let _ = tx.send(());
        }
        Ok(())
    }
}

/// Start the API server on `127.0.0.1:port`
///
/// # Arguments
/// * `port` - Port to listen on, 0 for any free port
/// * `handle` - Hub shared with the ticker and the sync worker
///
/// # Returns
/// A `ServerHandle` that can be used to shut down the server
pub async fn start(port: u16, handle: HubHandle) -> Result<ServerHandle> {
    let app = router(handle);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;
    let bound_addr = listener.local_addr()?;

    info!("API server listening on {}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                info!("API server shutting down");
            })
            .await
            .ok();
    });

    Ok(ServerHandle {
        shutdown_tx: Some(shutdown_tx),
        addr: bound_addr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::hub::{FocusHub, HubSettings};
    use crate::offline::NoopSyncRegistrar;
    use crate::store::PersistentStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_handle() -> HubHandle {
        let hub = FocusHub::open(
            PersistentStore::in_memory(),
            Arc::new(SystemClock),
            Arc::new(NoopSyncRegistrar),
            HubSettings::default(),
        );
        HubHandle::new(hub, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_server_starts_on_port() {
        // Port 0 lets the OS pick
        let handle = start(0, test_handle()).await.unwrap();

        assert!(handle.addr().port() > 0);
        handle.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let handle = start(0, test_handle()).await.unwrap();
        let addr = handle.addr();

        assert!(tokio::net::TcpStream::connect(addr).await.is_ok());

        handle.shutdown().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }
}
