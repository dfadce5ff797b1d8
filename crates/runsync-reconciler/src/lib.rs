// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runsync Reconciler - Workflow Run Status Reconciliation
//!
//! Story-generation runs are tracked locally while a managed workflow engine
//! executes them. This crate keeps the two views consistent: it compares each
//! running run against the engine, detects runs whose heartbeat has stopped,
//! and writes audited corrections.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │   Admin API (axum) / CLI     │   │   Sync monitor (interval)    │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                │  sync one / force-fail            │  sweep
//!                ▼                                   ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Reconciler                                  │
//! │   per-run locks ─► status fetcher ─► decision ─► run mutator         │
//! └──────────┬───────────────────────────────────────────┬──────────────┘
//!            │ get execution (bounded timeout)           │ status writes
//!            ▼                                           ▼
//! ┌──────────────────────────────┐   ┌──────────────────────────────────┐
//! │ Workflow engine              │   │ Run store (PostgreSQL / SQLite)  │
//! │ (runsync-engine-sdk)         │   │ workflow_runs                    │
//! └──────────────────────────────┘   └──────────────────────────────────┘
//! ```
//!
//! # Correction Policy
//!
//! | Condition (first match wins) | New status | Reason |
//! |------------------------------|------------|--------|
//! | `running` without execution handle | `failed` | `manual_sync` |
//! | `running`, no status write within the threshold | `failed` | `stale_timeout` |
//! | local status matches engine state | unchanged | - |
//! | engine `SUCCEEDED` | `completed` | `workflow_completed` |
//! | engine `FAILED` | `failed` | `workflow_failed` |
//! | engine `CANCELLED` | `cancelled` | `workflow_cancelled` |
//! | engine `ACTIVE` or `UNKNOWN` | unchanged | - |
//!
//! Operators can also force a run to `failed` with a free-text reason
//! (`manual_sync`).
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `RUNSYNC_DATABASE_URL` | Yes* | - | `postgres://...` or `sqlite:...` |
//! | `DATABASE_URL` | Yes* | - | Fallback if above not set |
//! | `RUNSYNC_HTTP_PORT` | No | `8080` | Admin API port |
//! | `RUNSYNC_STALE_THRESHOLD_SECS` | No | `21600` | Staleness threshold |
//! | `RUNSYNC_FETCH_TIMEOUT_MS` | No | `15000` | Per-fetch timeout |
//! | `RUNSYNC_SWEEP_INTERVAL_SECS` | No | `300` | Background sweep interval |
//! | `RUNSYNC_SWEEP_ENABLED` | No | `true` | Run the background sweep |
//! | `RUNSYNC_SWEEP_CONCURRENCY` | No | `4` | Runs reconciled at once per sweep |
//! | `RUNSYNC_SWEEP_BATCH_SIZE` | No | `500` | Page size when listing running runs |
//!
//! The engine client reads its own `RUNSYNC_ENGINE_*` variables, see
//! [`runsync_engine_sdk::EngineConfig`].

/// Admin HTTP API.
pub mod api;

/// Injectable time source.
pub mod clock;

/// Configuration loaded from environment variables.
pub mod config;

/// Workflow engine abstraction and test double.
pub mod engine;

/// Error types for reconciler operations.
pub mod error;

/// Remote execution status lookup.
pub mod fetcher;

/// Embedded database migrations.
pub mod migrations;

/// Run records, statuses and reconciliation outcomes.
pub mod models;

/// Durable application of status corrections.
pub mod mutator;

/// Run store trait and backends.
pub mod persistence;

/// Status reconciliation.
pub mod reconciler;

/// Per-run serialization.
pub mod run_lock;

/// Embeddable runtime with admin API and background sweep.
pub mod runtime;

/// Background worker that sweeps running runs.
pub mod sync_monitor;

pub use error::{Error, Result};
pub use models::{
    RemoteStatus, RunStatus, RunStatusCheck, SyncAllReport, SyncReason, SyncStatusSummary,
    WorkflowRun, WorkflowSyncResult,
};
pub use reconciler::{Reconciler, ReconcilerConfig};
