// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that sweeps running workflow runs.
//!
//! Every poll interval the monitor reconciles all runs in the `running`
//! state. A failed sweep is logged and retried on the next tick; nothing is
//! retried within a tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info};

use crate::error::Result;
use crate::models::SyncAllReport;
use crate::reconciler::Reconciler;

/// Configuration for the sync monitor.
#[derive(Debug, Clone)]
pub struct SyncMonitorConfig {
    /// How often to sweep running runs.
    pub poll_interval: Duration,
}

impl Default for SyncMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
        }
    }
}

/// Background worker that periodically reconciles all running runs.
pub struct SyncMonitor {
    reconciler: Arc<Reconciler>,
    config: SyncMonitorConfig,
    shutdown: Arc<Notify>,
}

impl SyncMonitor {
    /// Create a new sync monitor.
    pub fn new(reconciler: Arc<Reconciler>, config: SyncMonitorConfig) -> Self {
        Self {
            reconciler,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the monitor loop until the shutdown signal is received.
    ///
    /// A sweep in progress is finished before the signal is observed.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            stale_threshold_secs = self.reconciler.config().stale_threshold.as_secs(),
            "Sync monitor started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Sync monitor received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "Failed to sweep running workflow runs");
                    }
                }
            }
        }

        info!("Sync monitor stopped");
    }

    /// Run a single sweep now.
    pub async fn sweep(&self) -> Result<SyncAllReport> {
        self.reconciler.reconcile_all().await
    }
}
