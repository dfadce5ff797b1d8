// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Durable application of status corrections.
//!
//! Every write keeps two invariants on the stored run:
//!
//! - `ended_at` is set if and only if the status is terminal. A run that was
//!   already terminal keeps its original `ended_at`.
//! - `updated_at` strictly increases, even if the clock has not moved since
//!   the previous write.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{RunStatus, SyncReason, WorkflowRun, WorkflowSyncResult};
use crate::persistence::{RunStore, StatusUpdate};

/// Writes corrections to the run store.
#[derive(Clone)]
pub struct RunMutator {
    store: Arc<dyn RunStore>,
    clock: Arc<dyn Clock>,
}

impl RunMutator {
    /// Create a mutator over `store`, stamping writes with `clock`.
    pub fn new(store: Arc<dyn RunStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Set a run's status, stamping `updated_at` and `ended_at`.
    ///
    /// `error_message` is written only when provided. Fails with
    /// [`Error::RunNotFound`] if the run does not exist.
    pub async fn apply_correction(
        &self,
        run_id: &str,
        new_status: RunStatus,
        error_message: Option<&str>,
    ) -> Result<WorkflowRun> {
        let previous = self.load(run_id).await?;
        self.write(&previous, new_status, error_message).await
    }

    /// Apply the correction `reason` calls for to a run loaded by the caller.
    pub async fn apply_reason(
        &self,
        previous: &WorkflowRun,
        reason: SyncReason,
    ) -> Result<WorkflowSyncResult> {
        let updated = self
            .write(previous, reason.target_status(), reason.error_message())
            .await?;

        info!(
            run_id = %updated.run_id,
            story_id = %updated.story_id,
            previous_status = %previous.status,
            new_status = %updated.status,
            sync_reason = %reason,
            "Corrected workflow run status"
        );

        Ok(WorkflowSyncResult::corrected(previous, reason))
    }

    /// Unconditionally mark a run failed with `reason` as its error message.
    ///
    /// A missing run is reported as [`Error::RunNotFound`] before a blank
    /// reason is rejected with [`Error::InvalidRequest`].
    pub async fn force_mark_failed(&self, run_id: &str, reason: &str) -> Result<WorkflowSyncResult> {
        let previous = self.load(run_id).await?;

        if reason.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "A reason is required to force-fail a run".to_string(),
            ));
        }

        self.apply_reason(&previous, SyncReason::manual(reason)).await
    }

    async fn load(&self, run_id: &str) -> Result<WorkflowRun> {
        self.store
            .get_run(run_id)
            .await?
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
    }

    async fn write(
        &self,
        previous: &WorkflowRun,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> Result<WorkflowRun> {
        let updated_at = next_heartbeat(self.clock.now(), previous.updated_at);
        let ended_at = match (status.is_terminal(), previous.ended_at) {
            (false, _) => None,
            (true, Some(ended)) if previous.status.is_terminal() => Some(ended),
            (true, _) => Some(updated_at),
        };

        let update = StatusUpdate {
            run_id: previous.run_id.clone(),
            status,
            error_message: error_message.map(str::to_string),
            updated_at,
            ended_at,
        };

        self.store
            .update_run_status(&update)
            .await?
            .ok_or_else(|| Error::RunNotFound(previous.run_id.clone()))
    }
}

fn next_heartbeat(now: DateTime<Utc>, previous: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::milliseconds(1);
    if now < floor { floor } else { now }
}
