// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run store interfaces and backends.
//!
//! [`RunStore`] is the only path through which run status is written once a
//! run has left `queued`. Two sqlx backends implement it; [`connect`] picks
//! one from the database URL.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresRunStore;
pub use self::sqlite::SqliteRunStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{RunStatus, WorkflowRun};

/// Workflow run row as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRecord {
    /// Unique run identifier.
    pub run_id: String,
    /// Story the run generates.
    pub story_id: String,
    /// Execution handle in the workflow engine.
    pub execution_handle: Option<String>,
    /// Status string (queued, running, completed, failed, cancelled).
    pub status: String,
    /// Failure description.
    pub error_message: Option<String>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// Last status write.
    pub updated_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
}

impl TryFrom<RunRecord> for WorkflowRun {
    type Error = Error;

    fn try_from(record: RunRecord) -> Result<Self> {
        Ok(WorkflowRun {
            status: record.status.parse()?,
            run_id: record.run_id,
            story_id: record.story_id,
            execution_handle: record.execution_handle,
            error_message: record.error_message,
            created_at: record.created_at,
            updated_at: record.updated_at,
            ended_at: record.ended_at,
        })
    }
}

/// A status write for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Run to update.
    pub run_id: String,
    /// New status.
    pub status: RunStatus,
    /// Written only when `Some`; an existing message is otherwise kept.
    pub error_message: Option<String>,
    /// New heartbeat.
    pub updated_at: DateTime<Utc>,
    /// New end timestamp; `None` clears it.
    pub ended_at: Option<DateTime<Utc>>,
}

/// Keyset position in a status listing: the last run of the previous page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCursor {
    /// `updated_at` of the last run returned.
    pub updated_at: DateTime<Utc>,
    /// `run_id` of the last run returned.
    pub run_id: String,
}

impl RunCursor {
    /// Cursor positioned just after `run`.
    pub fn after(run: &WorkflowRun) -> Self {
        Self {
            updated_at: run.updated_at,
            run_id: run.run_id.clone(),
        }
    }
}

/// Durable storage for workflow runs.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Backend identifier (e.g., "postgres", "sqlite")
    fn backend(&self) -> &'static str;

    /// Insert a new run.
    async fn insert_run(&self, run: &WorkflowRun) -> Result<()>;

    /// Load one run.
    async fn get_run(&self, run_id: &str) -> Result<Option<WorkflowRun>>;

    /// One page of runs in `status`, ordered by `(updated_at, run_id)`.
    ///
    /// Returns at most `limit` runs positioned strictly after `after`, or
    /// from the start when `after` is `None`. An empty page means the
    /// listing is exhausted.
    async fn list_runs_by_status(
        &self,
        status: RunStatus,
        after: Option<&RunCursor>,
        limit: i64,
    ) -> Result<Vec<WorkflowRun>>;

    /// Apply a status write. Returns the updated run, or `None` if no run matched.
    async fn update_run_status(&self, update: &StatusUpdate) -> Result<Option<WorkflowRun>>;
}

/// Connect to the run store at `url` and run its migrations.
///
/// Accepts `postgres://`, `postgresql://` and `sqlite:` URLs.
pub async fn connect(url: &str) -> Result<Arc<dyn RunStore>> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PostgresRunStore::connect(url).await?;
        info!(backend = "postgres", "Connected to run store");
        Ok(Arc::new(store))
    } else if url.starts_with("sqlite:") {
        let store = SqliteRunStore::connect(url).await?;
        info!(backend = "sqlite", "Connected to run store");
        Ok(Arc::new(store))
    } else {
        Err(Error::Other(format!(
            "Unsupported database URL scheme: {}",
            url.split(':').next().unwrap_or_default()
        )))
    }
}
