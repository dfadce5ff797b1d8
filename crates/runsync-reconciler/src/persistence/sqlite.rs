// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed run store.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;
use crate::migrations;
use crate::models::{RunStatus, WorkflowRun};

use super::{RunCursor, RunRecord, RunStore, StatusUpdate};

const RUN_COLUMNS: &str = "run_id, story_id, execution_handle, status, error_message, \
                           created_at, updated_at, ended_at";

/// SQLite-backed run store.
#[derive(Clone)]
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Create a run store from an existing, already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and run migrations.
    ///
    /// The database file is created if missing. An in-memory database is
    /// held on a single connection that is never recycled, so every query
    /// sees the same data.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        migrations::run_sqlite(&pool).await?;
        Ok(Self { pool })
    }

    /// Open (or create) a database file, creating parent directories as needed.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        Self::connect(&format!("sqlite:{}", path.to_string_lossy())).await
    }

    /// Underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RunStore for SqliteRunStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_run(&self, run: &WorkflowRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_runs
                (run_id, story_id, execution_handle, status, error_message,
                 created_at, updated_at, ended_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.run_id)
        .bind(&run.story_id)
        .bind(&run.execution_handle)
        .bind(run.status.as_str())
        .bind(&run.error_message)
        .bind(run.created_at)
        .bind(run.updated_at)
        .bind(run.ended_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<WorkflowRun>> {
        let record = sqlx::query_as::<_, RunRecord>(&format!(
            "SELECT {RUN_COLUMNS} FROM workflow_runs WHERE run_id = ?"
        ))
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(WorkflowRun::try_from).transpose()
    }

    async fn list_runs_by_status(
        &self,
        status: RunStatus,
        after: Option<&RunCursor>,
        limit: i64,
    ) -> Result<Vec<WorkflowRun>> {
        let records = match after {
            Some(cursor) => {
                sqlx::query_as::<_, RunRecord>(&format!(
                    "SELECT {RUN_COLUMNS} FROM workflow_runs
                     WHERE status = ?
                       AND (updated_at > ? OR (updated_at = ? AND run_id > ?))
                     ORDER BY updated_at ASC, run_id ASC
                     LIMIT ?"
                ))
                .bind(status.as_str())
                .bind(cursor.updated_at)
                .bind(cursor.updated_at)
                .bind(&cursor.run_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RunRecord>(&format!(
                    "SELECT {RUN_COLUMNS} FROM workflow_runs
                     WHERE status = ?
                     ORDER BY updated_at ASC, run_id ASC
                     LIMIT ?"
                ))
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        records.into_iter().map(WorkflowRun::try_from).collect()
    }

    async fn update_run_status(&self, update: &StatusUpdate) -> Result<Option<WorkflowRun>> {
        let record = sqlx::query_as::<_, RunRecord>(&format!(
            "UPDATE workflow_runs
             SET status = ?,
                 error_message = COALESCE(?, error_message),
                 updated_at = ?,
                 ended_at = ?
             WHERE run_id = ?
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(update.status.as_str())
        .bind(&update.error_message)
        .bind(update.updated_at)
        .bind(update.ended_at)
        .bind(&update.run_id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(WorkflowRun::try_from).transpose()
    }
}
