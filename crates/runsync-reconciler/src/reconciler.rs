// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Status reconciliation.
//!
//! For one run the reconciler decides, in priority order:
//!
//! 1. A `running` run without an execution handle is failed with
//!    `manual_sync`. The engine is not asked.
//! 2. A `running` run whose last status write is older than the staleness
//!    threshold is failed with `stale_timeout`, whatever the engine says.
//! 3. A run whose local status matches the engine's is left alone.
//! 4. Otherwise a terminal engine state (`SUCCEEDED`, `FAILED`, `CANCELLED`)
//!    is copied onto the run.
//! 5. Anything else (`ACTIVE`, `UNKNOWN`) leaves the run unchanged.
//!
//! Corrections are written through [`RunMutator`]. Each run is processed
//! under its [`RunLocks`] entry, so a manual action and the sweep never
//! write the same run concurrently.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{Config, DEFAULT_STALE_THRESHOLD};
use crate::engine::WorkflowEngine;
use crate::error::{Error, Result};
use crate::fetcher::{DEFAULT_FETCH_TIMEOUT, ExecutionStatusFetcher};
use crate::models::{
    RemoteStatus, RunStatus, RunStatusCheck, SyncAllReport, SyncReason, SyncStatusSummary,
    WorkflowRun, WorkflowSyncResult,
};
use crate::mutator::RunMutator;
use crate::persistence::{RunCursor, RunStore};
use crate::run_lock::RunLocks;

/// Tuning for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// A running run with no status write for longer than this is stale.
    pub stale_threshold: Duration,
    /// Upper bound on one engine status fetch.
    pub fetch_timeout: Duration,
    /// Page size when listing running runs for a sweep or status check.
    pub sweep_batch_size: i64,
    /// Maximum runs processed concurrently within a sweep.
    pub sweep_concurrency: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            sweep_batch_size: 500,
            sweep_concurrency: 4,
        }
    }
}

impl From<&Config> for ReconcilerConfig {
    fn from(config: &Config) -> Self {
        Self {
            stale_threshold: config.stale_threshold,
            fetch_timeout: config.fetch_timeout,
            sweep_batch_size: config.sweep_batch_size,
            sweep_concurrency: config.sweep_concurrency,
        }
    }
}

/// What should happen to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// Leave the run as it is.
    NoChange,
    /// Move the run to `reason.target_status()`.
    Correct(SyncReason),
}

/// Decide whether `run` needs a correction.
///
/// `remote` is `None` when the engine was not asked.
pub fn decide(
    run: &WorkflowRun,
    is_stale: bool,
    remote: Option<RemoteStatus>,
    stale_threshold: Duration,
) -> SyncDecision {
    let running = run.status == RunStatus::Running;

    if running && run.handle().is_none() {
        return SyncDecision::Correct(SyncReason::missing_execution_handle());
    }
    if running && is_stale {
        return SyncDecision::Correct(SyncReason::stale_timeout(stale_threshold));
    }

    let Some(remote) = remote else {
        return SyncDecision::NoChange;
    };
    if run.status.matches_remote(remote) {
        return SyncDecision::NoChange;
    }

    match remote {
        RemoteStatus::Succeeded => SyncDecision::Correct(SyncReason::WorkflowCompleted),
        RemoteStatus::Failed => SyncDecision::Correct(SyncReason::workflow_failed()),
        RemoteStatus::Cancelled => SyncDecision::Correct(SyncReason::WorkflowCancelled),
        RemoteStatus::Active | RemoteStatus::Unknown => SyncDecision::NoChange,
    }
}

enum SweepOutcome {
    Synced(WorkflowSyncResult),
    Unchanged,
    Skipped,
    Failed,
}

/// Reconciles locally tracked runs against the workflow engine.
pub struct Reconciler {
    store: Arc<dyn RunStore>,
    fetcher: ExecutionStatusFetcher,
    mutator: RunMutator,
    clock: Arc<dyn Clock>,
    locks: RunLocks,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a reconciler.
    pub fn new(
        store: Arc<dyn RunStore>,
        engine: Arc<dyn WorkflowEngine>,
        clock: Arc<dyn Clock>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            fetcher: ExecutionStatusFetcher::new(engine, config.fetch_timeout),
            mutator: RunMutator::new(store.clone(), clock.clone()),
            store,
            clock,
            locks: RunLocks::new(),
            config,
        }
    }

    /// Reconciler configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Per-run lock registry shared by every entry point.
    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    /// True if the run's last status write is older than the staleness threshold.
    pub fn is_stale(&self, run: &WorkflowRun) -> bool {
        let age = self.clock.now() - run.updated_at;
        // A threshold too large for chrono can never be exceeded.
        chrono::Duration::from_std(self.config.stale_threshold)
            .map(|threshold| age > threshold)
            .unwrap_or(false)
    }

    /// Inspect a run against the engine without writing anything.
    pub async fn check_run(&self, run: &WorkflowRun) -> RunStatusCheck {
        let is_stale = self.is_stale(run);
        let handle = run.handle();
        let missing_execution_handle = run.status == RunStatus::Running && handle.is_none();

        let remote_status = match handle {
            Some(handle) => Some(self.fetcher.fetch_remote_status(handle).await),
            None => None,
        };
        let status_match = remote_status.is_some_and(|remote| run.status.matches_remote(remote));

        let needs_sync = if run.status == RunStatus::Running {
            is_stale || !status_match
        } else {
            decide(run, is_stale, remote_status, self.config.stale_threshold)
                != SyncDecision::NoChange
        };

        RunStatusCheck {
            run_id: run.run_id.clone(),
            story_id: run.story_id.clone(),
            local_status: run.status,
            remote_status,
            execution_handle: run.execution_handle.clone(),
            is_stale,
            status_match,
            missing_execution_handle,
            needs_sync,
            updated_at: run.updated_at,
        }
    }

    /// Reconcile one run, waiting for any other action on it to finish.
    ///
    /// Fails with [`Error::RunNotFound`] if the run does not exist.
    pub async fn reconcile_run(&self, run_id: &str) -> Result<WorkflowSyncResult> {
        let _guard = self.locks.lock(run_id).await;

        let run = self
            .store
            .get_run(run_id)
            .await?
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;

        self.reconcile_locked(&run).await
    }

    /// Manually fail a run, waiting for any other action on it to finish.
    pub async fn force_mark_failed(&self, run_id: &str, reason: &str) -> Result<WorkflowSyncResult> {
        let _guard = self.locks.lock(run_id).await;
        let result = self.mutator.force_mark_failed(run_id, reason).await?;

        warn!(
            run_id = %run_id,
            previous_status = %result.previous_status,
            reason = %reason,
            "Workflow run manually marked as failed"
        );
        Ok(result)
    }

    /// Reconcile every running run.
    ///
    /// Running runs are listed page by page and each page is processed with
    /// bounded concurrency. A run another action is already working on is
    /// skipped; a run whose reconciliation errors is logged and counted. Only
    /// failing to list runs fails the sweep.
    pub async fn reconcile_all(&self) -> Result<SyncAllReport> {
        let mut report = SyncAllReport::default();
        let mut cursor = None;

        loop {
            let page = self.next_running_page(&mut cursor).await?;
            if page.is_empty() {
                break;
            }
            report.total_running += page.len();

            let outcomes: Vec<SweepOutcome> = stream::iter(page)
                .map(|run| self.sweep_one(run))
                .buffered(self.config.sweep_concurrency.max(1))
                .collect()
                .await;

            for outcome in outcomes {
                match outcome {
                    SweepOutcome::Synced(result) => {
                        report.synced_count += 1;
                        report.results.push(result);
                    }
                    SweepOutcome::Unchanged => {}
                    SweepOutcome::Skipped => report.skipped_count += 1,
                    SweepOutcome::Failed => report.failed_count += 1,
                }
            }
        }

        self.locks.prune();

        info!(
            total_running = report.total_running,
            synced = report.synced_count,
            skipped = report.skipped_count,
            failed = report.failed_count,
            "Workflow run sweep finished"
        );

        Ok(report)
    }

    /// Inspect every running run without writing anything.
    pub async fn status_summary(&self) -> Result<SyncStatusSummary> {
        let mut checks = Vec::new();
        let mut cursor = None;

        loop {
            let page = self.next_running_page(&mut cursor).await?;
            if page.is_empty() {
                break;
            }

            let page_checks: Vec<RunStatusCheck> = stream::iter(page)
                .map(|run| async move { self.check_run(&run).await })
                .buffered(self.config.sweep_concurrency.max(1))
                .collect()
                .await;
            checks.extend(page_checks);
        }

        Ok(SyncStatusSummary::from_checks(checks, self.clock.now()))
    }

    /// Next page of running runs after `cursor`, advancing it past the page.
    ///
    /// Corrected runs leave `running` and unchanged runs keep their
    /// `updated_at`, so the keyset stays valid across writes made between pages.
    async fn next_running_page(&self, cursor: &mut Option<RunCursor>) -> Result<Vec<WorkflowRun>> {
        let page = self
            .store
            .list_runs_by_status(
                RunStatus::Running,
                cursor.as_ref(),
                self.config.sweep_batch_size.max(1),
            )
            .await?;

        if let Some(last) = page.last() {
            *cursor = Some(RunCursor::after(last));
        }
        Ok(page)
    }

    async fn sweep_one(&self, listed: WorkflowRun) -> SweepOutcome {
        let Some(_guard) = self.locks.try_lock(&listed.run_id) else {
            debug!(run_id = %listed.run_id, "Run is locked by another action, skipping");
            return SweepOutcome::Skipped;
        };

        // Reload under the lock; the run may have moved since it was listed.
        let run = match self.store.get_run(&listed.run_id).await {
            Ok(Some(run)) if run.status == RunStatus::Running => run,
            Ok(_) => return SweepOutcome::Unchanged,
            Err(e) => {
                error!(run_id = %listed.run_id, error = %e, "Failed to load workflow run");
                return SweepOutcome::Failed;
            }
        };

        match self.reconcile_locked(&run).await {
            Ok(result) if result.is_correction() => SweepOutcome::Synced(result),
            Ok(_) => SweepOutcome::Unchanged,
            Err(e) => {
                error!(
                    run_id = %run.run_id,
                    story_id = %run.story_id,
                    error = %e,
                    "Failed to reconcile workflow run"
                );
                SweepOutcome::Failed
            }
        }
    }

    async fn reconcile_locked(&self, run: &WorkflowRun) -> Result<WorkflowSyncResult> {
        let is_stale = self.is_stale(run);
        let running = run.status == RunStatus::Running;

        // Staleness on a running run wins over anything the engine reports.
        let remote = match run.handle() {
            Some(handle) if !(running && is_stale) => {
                Some(self.fetcher.fetch_remote_status(handle).await)
            }
            _ => None,
        };

        match decide(run, is_stale, remote, self.config.stale_threshold) {
            SyncDecision::NoChange => {
                debug!(
                    run_id = %run.run_id,
                    status = %run.status,
                    remote_status = ?remote,
                    "Workflow run status is consistent"
                );
                Ok(WorkflowSyncResult::unchanged(run))
            }
            SyncDecision::Correct(reason) => self.mutator.apply_reason(run, reason).await,
        }
    }
}
