//! Stream Supervisor — runs connector sessions on a dedicated task
//!
//! The connector itself never retries. The supervisor starts a new session
//! after each close when auto-reconnect is on, waiting the reconnect delay
//! first. Shutdown ends the current session and the loop.

use std::sync::Arc;
use std::time::Duration;

use fh_connector::{SessionReport, StreamConnector};
use fh_core::{FirehoseConfig, Shutdown};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinHandle;

/// Observable supervisor state
#[derive(Debug, Clone, Default, Serialize)]
pub struct SupervisorStatus {
    pub running: bool,
    pub sessions: u64,
    pub last_report: Option<SessionReport>,
}

/// Handle to the background session loop
pub struct StreamSupervisor {
    status: Arc<RwLock<SupervisorStatus>>,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl StreamSupervisor {
    /// Spawn the session loop.
    ///
    /// `shutdown` should be the same handle the connector was built with so
    /// that stopping also interrupts a live session.
    pub fn spawn(connector: Arc<StreamConnector>, config: &FirehoseConfig, shutdown: Shutdown) -> Self {
        let status = Arc::new(RwLock::new(SupervisorStatus {
            running: true,
            ..Default::default()
        }));
        let handle = tokio::spawn(Self::session_loop(
            connector,
            config.auto_reconnect,
            config.reconnect_delay(),
            shutdown.clone(),
            Arc::clone(&status),
        ));

        Self {
            status,
            shutdown,
            handle,
        }
    }

    async fn session_loop(
        connector: Arc<StreamConnector>,
        auto_reconnect: bool,
        reconnect_delay: Duration,
        shutdown: Shutdown,
        status: Arc<RwLock<SupervisorStatus>>,
    ) {
        while !shutdown.is_triggered() {
            let report = connector.run().await;
            {
                let mut status = status.write();
                status.sessions += 1;
                status.last_report = Some(report);
            }

            if !auto_reconnect {
                break;
            }
            if shutdown.sleep(reconnect_delay, "reconnect delay").await.is_err() {
                break;
            }
            log::info!("[Supervisor] Reconnecting");
        }

        status.write().running = false;
        log::info!("[Supervisor] Session loop finished");
    }

    /// Snapshot of the current status
    pub fn status(&self) -> SupervisorStatus {
        self.status.read().clone()
    }

    /// Whether the loop has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Request shutdown and wait for the loop to exit
    pub async fn stop(self) -> SupervisorStatus {
        self.shutdown.trigger();
        self.join().await
    }

    /// Wait for the loop to exit on its own
    pub async fn join(self) -> SupervisorStatus {
        let Self { status, handle, .. } = self;
        if let Err(e) = handle.await {
            log::error!("[Supervisor] Session loop panicked: {}", e);
        }
        let snapshot = status.read().clone();
        snapshot
    }
}
