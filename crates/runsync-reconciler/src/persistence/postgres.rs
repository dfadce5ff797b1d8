// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed run store.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::Result;
use crate::migrations;
use crate::models::{RunStatus, WorkflowRun};

use super::{RunCursor, RunRecord, RunStore, StatusUpdate};

/// PostgreSQL-backed run store.
#[derive(Clone)]
pub struct PostgresRunStore {
    pool: PgPool,
}

impl PostgresRunStore {
    /// Create a run store from an existing, already migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        migrations::run_postgres(&pool).await?;
        Ok(Self { pool })
    }

    /// Underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RunStore for PostgresRunStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert_run(&self, run: &WorkflowRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_runs
                (run_id, story_id, execution_handle, status, error_message,
                 created_at, updated_at, ended_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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
        let record = sqlx::query_as::<_, RunRecord>(
            r#"
            SELECT run_id, story_id, execution_handle, status, error_message,
                   created_at, updated_at, ended_at
            FROM workflow_runs
            WHERE run_id = $1
            "#,
        )
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
                sqlx::query_as::<_, RunRecord>(
                    r#"
                    SELECT run_id, story_id, execution_handle, status, error_message,
                           created_at, updated_at, ended_at
                    FROM workflow_runs
                    WHERE status = $1
                      AND (updated_at, run_id) > ($2, $3)
                    ORDER BY updated_at ASC, run_id ASC
                    LIMIT $4
                    "#,
                )
                .bind(status.as_str())
                .bind(cursor.updated_at)
                .bind(&cursor.run_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RunRecord>(
                    r#"
                    SELECT run_id, story_id, execution_handle, status, error_message,
                           created_at, updated_at, ended_at
                    FROM workflow_runs
                    WHERE status = $1
                    ORDER BY updated_at ASC, run_id ASC
                    LIMIT $2
                    "#,
                )
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        records.into_iter().map(WorkflowRun::try_from).collect()
    }

    async fn update_run_status(&self, update: &StatusUpdate) -> Result<Option<WorkflowRun>> {
        let record = sqlx::query_as::<_, RunRecord>(
            r#"
            UPDATE workflow_runs
            SET status = $2,
                error_message = COALESCE($3, error_message),
                updated_at = $4,
                ended_at = $5
            WHERE run_id = $1
            RETURNING run_id, story_id, execution_handle, status, error_message,
                      created_at, updated_at, ended_at
            "#,
        )
        .bind(&update.run_id)
        .bind(update.status.as_str())
        .bind(&update.error_message)
        .bind(update.updated_at)
        .bind(update.ended_at)
        .fetch_optional(&self.pool)
        .await?;

        record.map(WorkflowRun::try_from).transpose()
    }
}
