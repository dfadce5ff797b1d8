// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for runsync-reconciler.
//!
//! [`ReconcilerRuntime`] runs the background sync monitor and the admin API
//! inside an existing tokio application.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use runsync_engine_sdk::ExecutionsClient;
//! use runsync_reconciler::persistence;
//! use runsync_reconciler::runtime::ReconcilerRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = persistence::connect("postgres://...").await?;
//!     let engine = Arc::new(ExecutionsClient::from_env()?);
//!
//!     let runtime = ReconcilerRuntime::builder()
//!         .store(store)
//!         .engine(engine)
//!         .bind_addr("0.0.0.0:8080".parse()?)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::{self, AppState};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::engine::WorkflowEngine;
use crate::error::{Error, Result};
use crate::persistence::RunStore;
use crate::reconciler::{Reconciler, ReconcilerConfig};
use crate::sync_monitor::{SyncMonitor, SyncMonitorConfig};

/// Builder for creating a [`ReconcilerRuntime`].
pub struct ReconcilerRuntimeBuilder {
    store: Option<Arc<dyn RunStore>>,
    engine: Option<Arc<dyn WorkflowEngine>>,
    clock: Arc<dyn Clock>,
    reconciler_config: ReconcilerConfig,
    monitor_config: SyncMonitorConfig,
    sweep_enabled: bool,
    bind_addr: SocketAddr,
}

impl Default for ReconcilerRuntimeBuilder {
    fn default() -> Self {
        Self {
            store: None,
            engine: None,
            clock: Arc::new(SystemClock),
            reconciler_config: ReconcilerConfig::default(),
            monitor_config: SyncMonitorConfig::default(),
            sweep_enabled: true,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ReconcilerRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every setting carried by an environment [`Config`].
    pub fn config(mut self, config: &Config) -> Self {
        self.reconciler_config = ReconcilerConfig::from(config);
        self.monitor_config = SyncMonitorConfig {
            poll_interval: config.sweep_interval,
        };
        self.sweep_enabled = config.sweep_enabled;
        self.bind_addr = config.http_addr;
        self
    }

    /// Set the run store (required).
    pub fn store(mut self, store: Arc<dyn RunStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the workflow engine (required).
    pub fn engine(mut self, engine: Arc<dyn WorkflowEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the clock. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the reconciler tuning.
    pub fn reconciler_config(mut self, config: ReconcilerConfig) -> Self {
        self.reconciler_config = config;
        self
    }

    /// Set the sync monitor configuration.
    pub fn monitor_config(mut self, config: SyncMonitorConfig) -> Self {
        self.monitor_config = config;
        self
    }

    /// Enable or disable the background sweep. Default: enabled.
    pub fn sweep_enabled(mut self, enabled: bool) -> Self {
        self.sweep_enabled = enabled;
        self
    }

    /// Set the admin API bind address. Default: `0.0.0.0:8080`.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if the store or engine is missing.
    pub fn build(self) -> Result<ReconcilerRuntimeConfig> {
        let store = self
            .store
            .ok_or_else(|| Error::Other("store is required".to_string()))?;
        let engine = self
            .engine
            .ok_or_else(|| Error::Other("engine is required".to_string()))?;

        let reconciler = Arc::new(Reconciler::new(
            store,
            engine,
            self.clock,
            self.reconciler_config,
        ));

        Ok(ReconcilerRuntimeConfig {
            reconciler,
            monitor_config: self.monitor_config,
            sweep_enabled: self.sweep_enabled,
            bind_addr: self.bind_addr,
        })
    }
}

/// Configuration for a [`ReconcilerRuntime`].
pub struct ReconcilerRuntimeConfig {
    reconciler: Arc<Reconciler>,
    monitor_config: SyncMonitorConfig,
    sweep_enabled: bool,
    bind_addr: SocketAddr,
}

impl ReconcilerRuntimeConfig {
    /// The reconciler the runtime will serve.
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Start the runtime, spawning the admin API and, if enabled, the sync monitor.
    pub async fn start(self) -> Result<ReconcilerRuntime> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let bind_addr = listener.local_addr()?;

        let server_shutdown = Arc::new(Notify::new());
        let state = AppState::new(self.reconciler.clone());
        let server_handle = tokio::spawn(api::serve_on(
            listener,
            state,
            server_shutdown.clone(),
        ));

        let monitor = if self.sweep_enabled {
            let monitor = SyncMonitor::new(self.reconciler.clone(), self.monitor_config);
            let shutdown = monitor.shutdown_handle();
            let handle = tokio::spawn(async move {
                monitor.run().await;
            });
            Some((handle, shutdown))
        } else {
            info!("Background sweep disabled");
            None
        };

        info!(bind_addr = %bind_addr, "ReconcilerRuntime started");

        Ok(ReconcilerRuntime {
            server_handle,
            server_shutdown,
            monitor,
            reconciler: self.reconciler,
            bind_addr,
        })
    }
}

/// A running reconciler: admin API plus optional background sweep.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct ReconcilerRuntime {
    server_handle: JoinHandle<Result<()>>,
    server_shutdown: Arc<Notify>,
    monitor: Option<(JoinHandle<()>, Arc<Notify>)>,
    reconciler: Arc<Reconciler>,
    bind_addr: SocketAddr,
}

impl ReconcilerRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> ReconcilerRuntimeBuilder {
        ReconcilerRuntimeBuilder::new()
    }

    /// Address the admin API is bound to.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// The shared reconciler.
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Gracefully shut down the runtime.
    ///
    /// Signals the sync monitor and the admin API, then waits for both.
    pub async fn shutdown(self) -> Result<()> {
        info!("ReconcilerRuntime shutting down...");

        self.server_shutdown.notify_one();

        if let Some((handle, shutdown)) = self.monitor {
            shutdown.notify_one();
            if let Err(e) = handle.await {
                error!("Sync monitor task panicked: {}", e);
            }
        }

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("ReconcilerRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "Admin API error during shutdown");
                Err(e)
            }
            Err(e) => Err(Error::Other(format!("Admin API task panicked: {}", e))),
        }
    }
}
