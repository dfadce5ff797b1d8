// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runsync Reconciler - Workflow Run Status Reconciliation Server
//!
//! Keeps locally tracked workflow runs consistent with the workflow engine:
//! - Background sweep over every running run
//! - Staleness detection from the run heartbeat
//! - Admin HTTP API for status checks, per-run sync and manual overrides

use std::sync::Arc;
use tracing::{info, warn};

use runsync_engine_sdk::ExecutionsClient;
use runsync_reconciler::config::Config;
use runsync_reconciler::engine::WorkflowEngine;
use runsync_reconciler::persistence;
use runsync_reconciler::runtime::ReconcilerRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runsync_reconciler=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        stale_threshold_secs = config.stale_threshold.as_secs(),
        sweep_interval_secs = config.sweep_interval.as_secs(),
        sweep_enabled = config.sweep_enabled,
        "Starting Runsync Reconciler"
    );

    let store = persistence::connect(&config.database_url).await?;

    let engine = Arc::new(ExecutionsClient::from_env()?);
    info!(
        engine = engine.engine_type(),
        base_url = %engine.config().base_url,
        "Workflow engine client initialized"
    );

    let runtime = ReconcilerRuntime::builder()
        .config(&config)
        .store(store)
        .engine(engine)
        .build()?
        .start()
        .await?;

    info!(addr = %runtime.bind_addr(), "Reconciler ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown().await?;

    info!("Runsync Reconciler shut down");

    Ok(())
}
