// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Remote execution status lookup.
//!
//! Every failure mode of the engine degrades to [`RemoteStatus::Unknown`]:
//! a missing execution is logged as a warning, any other error (including
//! rejected credentials and timeouts) as an error. Callers decide what an
//! unknown status means; this module never retries.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::engine::WorkflowEngine;
use crate::models::RemoteStatus;

/// Default upper bound on one status fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches and normalizes execution status from the workflow engine.
#[derive(Clone)]
pub struct ExecutionStatusFetcher {
    engine: Arc<dyn WorkflowEngine>,
    timeout: Duration,
}

impl ExecutionStatusFetcher {
    /// Create a fetcher with the given per-fetch timeout.
    pub fn new(engine: Arc<dyn WorkflowEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    /// Per-fetch timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current status of one execution, or `Unknown` if it cannot be determined.
    pub async fn fetch_remote_status(&self, execution_handle: &str) -> RemoteStatus {
        if execution_handle.trim().is_empty() {
            warn!("Refusing to fetch status for an empty execution handle");
            return RemoteStatus::Unknown;
        }

        let fetch = self.engine.get_execution(execution_handle);
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(execution)) => {
                let status = RemoteStatus::from(execution.state);
                debug!(
                    execution_handle = %execution_handle,
                    state = ?execution.state,
                    remote_status = %status,
                    "Fetched remote execution status"
                );
                status
            }
            Ok(Err(e)) if e.is_not_found() => {
                warn!(
                    execution_handle = %execution_handle,
                    engine = self.engine.engine_type(),
                    "Execution not found in workflow engine"
                );
                RemoteStatus::Unknown
            }
            Ok(Err(e)) => {
                error!(
                    execution_handle = %execution_handle,
                    engine = self.engine.engine_type(),
                    access_denied = e.is_access_denied(),
                    error = %e,
                    "Failed to fetch execution status"
                );
                RemoteStatus::Unknown
            }
            Err(_) => {
                error!(
                    execution_handle = %execution_handle,
                    engine = self.engine.engine_type(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Timed out fetching execution status"
                );
                RemoteStatus::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;
    use crate::engine::mock::MockExecution;
    use runsync_engine_sdk::ExecutionState;

    fn fetcher(engine: MockEngine) -> (ExecutionStatusFetcher, Arc<MockEngine>) {
        let engine = Arc::new(engine);
        (
            ExecutionStatusFetcher::new(engine.clone(), Duration::from_millis(100)),
            engine,
        )
    }

    #[tokio::test]
    async fn test_states_are_normalized() {
        let (fetcher, _) = fetcher(
            MockEngine::new()
                .with_state("a", ExecutionState::Active)
                .with_state("q", ExecutionState::Queued)
                .with_state("s", ExecutionState::Succeeded)
                .with_state("f", ExecutionState::Failed)
                .with_state("c", ExecutionState::Cancelled)
                .with_state("u", ExecutionState::Unspecified),
        );

        assert_eq!(fetcher.fetch_remote_status("a").await, RemoteStatus::Active);
        assert_eq!(fetcher.fetch_remote_status("q").await, RemoteStatus::Active);
        assert_eq!(fetcher.fetch_remote_status("s").await, RemoteStatus::Succeeded);
        assert_eq!(fetcher.fetch_remote_status("f").await, RemoteStatus::Failed);
        assert_eq!(fetcher.fetch_remote_status("c").await, RemoteStatus::Cancelled);
        assert_eq!(fetcher.fetch_remote_status("u").await, RemoteStatus::Unknown);
    }

    #[tokio::test]
    async fn test_errors_degrade_to_unknown() {
        let (fetcher, _) = fetcher(
            MockEngine::new()
                .with_response("denied", MockExecution::AccessDenied)
                .with_response(
                    "down",
                    MockExecution::ConnectionError("connection reset".to_string()),
                ),
        );

        assert_eq!(fetcher.fetch_remote_status("missing").await, RemoteStatus::Unknown);
        assert_eq!(fetcher.fetch_remote_status("denied").await, RemoteStatus::Unknown);
        assert_eq!(fetcher.fetch_remote_status("down").await, RemoteStatus::Unknown);
    }

    #[tokio::test]
    async fn test_hanging_fetch_times_out_to_unknown() {
        let (fetcher, _) = fetcher(MockEngine::new().with_response("slow", MockExecution::Hang));
        assert_eq!(fetcher.fetch_remote_status("slow").await, RemoteStatus::Unknown);
    }

    #[tokio::test]
    async fn test_empty_handle_skips_engine() {
        let (fetcher, engine) = fetcher(MockEngine::new());
        assert_eq!(fetcher.fetch_remote_status("").await, RemoteStatus::Unknown);
        assert_eq!(engine.call_count().await, 0);
    }
}
