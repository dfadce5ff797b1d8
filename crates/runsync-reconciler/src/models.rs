// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow run records, statuses and reconciliation outcomes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use runsync_engine_sdk::ExecutionState;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;

/// Local status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, not yet dispatched to the engine.
    Queued,
    /// Accepted by the engine; an execution handle is recorded.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before finishing.
    Cancelled,
}

impl RunStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [RunStatus; 5] = [
        RunStatus::Queued,
        RunStatus::Running,
        RunStatus::Completed,
        RunStatus::Failed,
        RunStatus::Cancelled,
    ];

    /// Stored/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    /// Whether `remote` is the engine state expected for this local status.
    ///
    /// A queued run is never expected to have remote state yet.
    pub fn matches_remote(&self, remote: RemoteStatus) -> bool {
        match self {
            RunStatus::Queued => false,
            RunStatus::Running => remote == RemoteStatus::Active,
            RunStatus::Completed => remote == RemoteStatus::Succeeded,
            RunStatus::Failed => remote == RemoteStatus::Failed,
            RunStatus::Cancelled => remote == RemoteStatus::Cancelled,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(RunStatus::Queued),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "cancelled" => Ok(RunStatus::Cancelled),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Execution status as seen from the engine, normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    /// Execution is running (or accepted and waiting to run).
    Active,
    /// Execution finished successfully.
    Succeeded,
    /// Execution finished with an error.
    Failed,
    /// Execution was cancelled.
    Cancelled,
    /// Status could not be determined.
    Unknown,
}

impl From<ExecutionState> for RemoteStatus {
    fn from(state: ExecutionState) -> Self {
        match state {
            ExecutionState::Active | ExecutionState::Queued => RemoteStatus::Active,
            ExecutionState::Succeeded => RemoteStatus::Succeeded,
            ExecutionState::Failed => RemoteStatus::Failed,
            ExecutionState::Cancelled => RemoteStatus::Cancelled,
            ExecutionState::Unavailable | ExecutionState::Unspecified => RemoteStatus::Unknown,
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteStatus::Active => "ACTIVE",
            RemoteStatus::Succeeded => "SUCCEEDED",
            RemoteStatus::Failed => "FAILED",
            RemoteStatus::Cancelled => "CANCELLED",
            RemoteStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Diagnostic recorded when a running run has no execution handle.
pub const MISSING_HANDLE_MESSAGE: &str =
    "Workflow run is marked as running but has no execution handle";

/// Diagnostic recorded when the engine reports a failed execution.
pub const REMOTE_FAILED_MESSAGE: &str = "Workflow execution failed in the workflow engine";

/// Why a run's status was corrected.
///
/// Only the variants that move a run to `failed` carry an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReason {
    /// No status write within the staleness threshold.
    StaleTimeout {
        /// Message recorded on the run.
        message: String,
    },
    /// Engine reports the execution succeeded.
    WorkflowCompleted,
    /// Engine reports the execution failed.
    WorkflowFailed {
        /// Message recorded on the run.
        message: String,
    },
    /// Engine reports the execution was cancelled.
    WorkflowCancelled,
    /// Operator override, or a running run without an execution handle.
    ManualSync {
        /// Message recorded on the run.
        message: String,
    },
}

impl SyncReason {
    /// Staleness correction for the given threshold.
    pub fn stale_timeout(threshold: Duration) -> Self {
        SyncReason::StaleTimeout {
            message: format!(
                "Workflow run exceeded the staleness threshold of {} without a status update",
                format_threshold(threshold)
            ),
        }
    }

    /// Correction for an execution the engine reports as failed.
    pub fn workflow_failed() -> Self {
        SyncReason::WorkflowFailed {
            message: REMOTE_FAILED_MESSAGE.to_string(),
        }
    }

    /// Correction for a running run that has no execution handle.
    pub fn missing_execution_handle() -> Self {
        SyncReason::ManualSync {
            message: MISSING_HANDLE_MESSAGE.to_string(),
        }
    }

    /// Operator override with a free-text reason.
    pub fn manual(reason: impl Into<String>) -> Self {
        SyncReason::ManualSync {
            message: reason.into(),
        }
    }

    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncReason::StaleTimeout { .. } => "stale_timeout",
            SyncReason::WorkflowCompleted => "workflow_completed",
            SyncReason::WorkflowFailed { .. } => "workflow_failed",
            SyncReason::WorkflowCancelled => "workflow_cancelled",
            SyncReason::ManualSync { .. } => "manual_sync",
        }
    }

    /// Status the run is moved to.
    pub fn target_status(&self) -> RunStatus {
        match self {
            SyncReason::StaleTimeout { .. }
            | SyncReason::WorkflowFailed { .. }
            | SyncReason::ManualSync { .. } => RunStatus::Failed,
            SyncReason::WorkflowCompleted => RunStatus::Completed,
            SyncReason::WorkflowCancelled => RunStatus::Cancelled,
        }
    }

    /// Error message to record on the run, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            SyncReason::StaleTimeout { message }
            | SyncReason::WorkflowFailed { message }
            | SyncReason::ManualSync { message } => Some(message),
            SyncReason::WorkflowCompleted | SyncReason::WorkflowCancelled => None,
        }
    }
}

impl fmt::Display for SyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SyncReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn format_threshold(threshold: Duration) -> String {
    let secs = threshold.as_secs();
    if secs > 0 && secs % 3600 == 0 {
        let hours = secs / 3600;
        format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else if secs > 0 && secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs)
    }
}

/// A locally tracked workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    /// Unique run identifier.
    pub run_id: String,
    /// Story the run generates.
    pub story_id: String,
    /// Execution handle in the workflow engine; absent while queued.
    pub execution_handle: Option<String>,
    /// Local status.
    pub status: RunStatus,
    /// Failure description, set when the run fails.
    pub error_message: Option<String>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// Last status write; the heartbeat for staleness.
    pub updated_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// A freshly queued run.
    pub fn new(run_id: impl Into<String>, story_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            story_id: story_id.into(),
            execution_handle: None,
            status: RunStatus::Queued,
            error_message: None,
            created_at: at,
            updated_at: at,
            ended_at: None,
        }
    }

    /// Set the execution handle.
    pub fn with_execution_handle(mut self, handle: impl Into<String>) -> Self {
        self.execution_handle = Some(handle.into());
        self
    }

    /// Set the status, keeping `ended_at` consistent with it.
    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self.ended_at = status.is_terminal().then_some(self.updated_at);
        self
    }

    /// Execution handle, treating an empty string as absent.
    pub fn handle(&self) -> Option<&str> {
        self.execution_handle
            .as_deref()
            .filter(|h| !h.trim().is_empty())
    }
}

/// Outcome of reconciling one run.
///
/// When nothing was corrected, `previous_status == new_status` and
/// `sync_reason` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSyncResult {
    pub run_id: String,
    pub story_id: String,
    pub previous_status: RunStatus,
    pub new_status: RunStatus,
    pub execution_handle: Option<String>,
    pub sync_reason: Option<SyncReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl WorkflowSyncResult {
    /// Result for a run that needed no correction.
    pub fn unchanged(run: &WorkflowRun) -> Self {
        Self {
            run_id: run.run_id.clone(),
            story_id: run.story_id.clone(),
            previous_status: run.status,
            new_status: run.status,
            execution_handle: run.execution_handle.clone(),
            sync_reason: None,
            error_message: None,
        }
    }

    /// Result for a run corrected for `reason`, given its state before the write.
    pub fn corrected(previous: &WorkflowRun, reason: SyncReason) -> Self {
        Self {
            run_id: previous.run_id.clone(),
            story_id: previous.story_id.clone(),
            previous_status: previous.status,
            new_status: reason.target_status(),
            execution_handle: previous.execution_handle.clone(),
            error_message: reason.error_message().map(str::to_string),
            sync_reason: Some(reason),
        }
    }

    /// True if a correction was written.
    pub fn is_correction(&self) -> bool {
        self.sync_reason.is_some()
    }
}

/// Inspection of one run against the engine, without any write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusCheck {
    pub run_id: String,
    pub story_id: String,
    pub local_status: RunStatus,
    /// `None` when the engine was not asked (no handle).
    pub remote_status: Option<RemoteStatus>,
    pub execution_handle: Option<String>,
    pub is_stale: bool,
    pub status_match: bool,
    pub missing_execution_handle: bool,
    pub needs_sync: bool,
    pub updated_at: DateTime<Utc>,
}

/// Response of the `status` action: how many running runs need attention.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusSummary {
    pub total_running: usize,
    pub needs_sync: usize,
    pub stale: usize,
    pub status_mismatch: usize,
    pub missing_execution_handle: usize,
    pub checked_at: DateTime<Utc>,
    pub runs: Vec<RunStatusCheck>,
}

impl SyncStatusSummary {
    /// Tally a set of checks.
    pub fn from_checks(checks: Vec<RunStatusCheck>, checked_at: DateTime<Utc>) -> Self {
        Self {
            total_running: checks.len(),
            needs_sync: checks.iter().filter(|c| c.needs_sync).count(),
            stale: checks.iter().filter(|c| c.is_stale).count(),
            status_mismatch: checks.iter().filter(|c| !c.status_match).count(),
            missing_execution_handle: checks
                .iter()
                .filter(|c| c.missing_execution_handle)
                .count(),
            checked_at,
            runs: checks,
        }
    }
}

/// Response of the `sync-all` action.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAllReport {
    /// Running runs listed for this sweep.
    pub total_running: usize,
    /// Runs whose status was corrected.
    pub synced_count: usize,
    /// Runs skipped because another reconciliation held their lock.
    pub skipped_count: usize,
    /// Runs whose reconciliation errored (details in logs only).
    pub failed_count: usize,
    /// One entry per corrected run.
    pub results: Vec<WorkflowSyncResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_round_trip_through_strings() {
        for status in RunStatus::ALL {
            assert_eq!(status.as_str().parse::<RunStatus>().unwrap(), status);
            assert_eq!(status.to_string(), status.as_str());
        }
        assert!(matches!(
            "paused".parse::<RunStatus>(),
            Err(Error::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_compatibility_table() {
        use RemoteStatus::*;
        let remotes = [Active, Succeeded, Failed, Cancelled, Unknown];

        let expected = |local: RunStatus| -> Option<RemoteStatus> {
            match local {
                RunStatus::Queued => None,
                RunStatus::Running => Some(Active),
                RunStatus::Completed => Some(Succeeded),
                RunStatus::Failed => Some(Failed),
                RunStatus::Cancelled => Some(Cancelled),
            }
        };

        for local in RunStatus::ALL {
            for remote in remotes {
                assert_eq!(
                    local.matches_remote(remote),
                    expected(local) == Some(remote),
                    "{} vs {}",
                    local,
                    remote
                );
            }
        }
    }

    #[test]
    fn test_remote_status_from_execution_state() {
        assert_eq!(RemoteStatus::from(ExecutionState::Active), RemoteStatus::Active);
        assert_eq!(RemoteStatus::from(ExecutionState::Queued), RemoteStatus::Active);
        assert_eq!(
            RemoteStatus::from(ExecutionState::Succeeded),
            RemoteStatus::Succeeded
        );
        assert_eq!(RemoteStatus::from(ExecutionState::Failed), RemoteStatus::Failed);
        assert_eq!(
            RemoteStatus::from(ExecutionState::Cancelled),
            RemoteStatus::Cancelled
        );
        assert_eq!(
            RemoteStatus::from(ExecutionState::Unavailable),
            RemoteStatus::Unknown
        );
        assert_eq!(
            RemoteStatus::from(ExecutionState::Unspecified),
            RemoteStatus::Unknown
        );
    }

    #[test]
    fn test_sync_reason_targets_and_messages() {
        let stale = SyncReason::stale_timeout(Duration::from_secs(6 * 3600));
        assert_eq!(stale.as_str(), "stale_timeout");
        assert_eq!(stale.target_status(), RunStatus::Failed);
        assert!(stale.error_message().unwrap().contains("6 hours"));

        assert_eq!(
            SyncReason::WorkflowCompleted.target_status(),
            RunStatus::Completed
        );
        assert!(SyncReason::WorkflowCompleted.error_message().is_none());

        assert_eq!(
            SyncReason::WorkflowCancelled.target_status(),
            RunStatus::Cancelled
        );
        assert!(SyncReason::WorkflowCancelled.error_message().is_none());

        let failed = SyncReason::workflow_failed();
        assert_eq!(failed.as_str(), "workflow_failed");
        assert_eq!(failed.error_message(), Some(REMOTE_FAILED_MESSAGE));

        let missing = SyncReason::missing_execution_handle();
        assert_eq!(missing.as_str(), "manual_sync");
        assert_eq!(missing.error_message(), Some(MISSING_HANDLE_MESSAGE));

        let manual = SyncReason::manual("operator: stuck on illustration step");
        assert_eq!(manual.target_status(), RunStatus::Failed);
        assert_eq!(
            manual.error_message(),
            Some("operator: stuck on illustration step")
        );
    }

    #[test]
    fn test_threshold_formatting() {
        assert_eq!(format_threshold(Duration::from_secs(3600)), "1 hour");
        assert_eq!(format_threshold(Duration::from_secs(7200)), "2 hours");
        assert_eq!(format_threshold(Duration::from_secs(600)), "10 minutes");
        assert_eq!(format_threshold(Duration::from_secs(45)), "45 seconds");
    }

    #[test]
    fn test_with_status_keeps_ended_at_consistent() {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let run = WorkflowRun::new("r1", "s1", at);
        assert_eq!(run.status, RunStatus::Queued);
        assert!(run.ended_at.is_none());

        let done = run.clone().with_status(RunStatus::Completed);
        assert_eq!(done.ended_at, Some(at));

        let running = done.with_status(RunStatus::Running);
        assert!(running.ended_at.is_none());
    }

    #[test]
    fn test_empty_handle_counts_as_missing() {
        let at = Utc::now();
        let run = WorkflowRun::new("r1", "s1", at).with_execution_handle("  ");
        assert!(run.handle().is_none());
        let run = run.with_execution_handle("exec-1");
        assert_eq!(run.handle(), Some("exec-1"));
    }

    #[test]
    fn test_sync_result_serialization() {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let run = WorkflowRun::new("r1", "s1", at)
            .with_execution_handle("exec-1")
            .with_status(RunStatus::Running);

        let unchanged = serde_json::to_value(WorkflowSyncResult::unchanged(&run)).unwrap();
        assert_eq!(unchanged["runId"], "r1");
        assert_eq!(unchanged["previousStatus"], "running");
        assert_eq!(unchanged["newStatus"], "running");
        assert!(unchanged["syncReason"].is_null());
        assert!(unchanged.get("errorMessage").is_none());

        let failed = WorkflowSyncResult::corrected(&run, SyncReason::workflow_failed());
        assert!(failed.is_correction());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["newStatus"], "failed");
        assert_eq!(json["syncReason"], "workflow_failed");
        assert_eq!(json["errorMessage"], REMOTE_FAILED_MESSAGE);
        assert_eq!(json["executionHandle"], "exec-1");
    }
}
