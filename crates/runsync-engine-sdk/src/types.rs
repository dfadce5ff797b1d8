// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Types returned by the executions API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of an execution as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    /// Execution is running.
    Active,
    /// Execution finished successfully.
    Succeeded,
    /// Execution finished with an error.
    Failed,
    /// Execution was cancelled.
    Cancelled,
    /// Execution is waiting for capacity before it starts.
    Queued,
    /// Execution data is temporarily unavailable.
    Unavailable,
    /// State is missing or not recognized by this SDK.
    #[default]
    #[serde(other)]
    Unspecified,
}

impl ExecutionState {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }
}

/// Error details attached to a failed execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionError {
    /// Error payload (usually a JSON-encoded string).
    #[serde(default)]
    pub payload: Option<String>,
    /// Human-readable context, e.g. the failing step.
    #[serde(default)]
    pub context: Option<String>,
}

/// A single workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Full resource name of the execution.
    #[serde(default)]
    pub name: String,
    /// Current state.
    #[serde(default)]
    pub state: ExecutionState,
    /// When the execution started.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// When the execution finished (terminal states only).
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// JSON-encoded input argument.
    #[serde(default)]
    pub argument: Option<String>,
    /// JSON-encoded result (succeeded executions only).
    #[serde(default)]
    pub result: Option<String>,
    /// Error details (failed executions only).
    #[serde(default)]
    pub error: Option<ExecutionError>,
}

impl Execution {
    /// Short execution identifier: the last path segment of the resource name.
    pub fn execution_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}
