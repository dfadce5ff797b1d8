// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock engine for testing.
//!
//! Serves scripted execution states without talking to a real engine and
//! records every handle it was asked about.

use async_trait::async_trait;
use runsync_engine_sdk::{Execution, ExecutionError, ExecutionState, SdkError};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::traits::*;

/// Scripted response for one execution handle.
#[derive(Debug, Clone)]
pub enum MockExecution {
    /// Return an execution in this state.
    State(ExecutionState),
    /// Report that the execution does not exist.
    NotFound,
    /// Reject the request's credentials.
    AccessDenied,
    /// Fail at the transport level.
    ConnectionError(String),
    /// Never answer.
    Hang,
}

/// Mock engine for testing.
///
/// Handles without a scripted response are reported as not found.
pub struct MockEngine {
    executions: Mutex<HashMap<String, MockExecution>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a mock engine with no executions.
    pub fn new() -> Self {
        Self {
            executions: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script a state for `handle` while building the mock.
    pub fn with_state(self, handle: &str, state: ExecutionState) -> Self {
        self.with_response(handle, MockExecution::State(state))
    }

    /// Script any response for `handle` while building the mock.
    pub fn with_response(mut self, handle: &str, response: MockExecution) -> Self {
        self.executions
            .get_mut()
            .insert(handle.to_string(), response);
        self
    }

    /// Script or replace the response for `handle`.
    pub async fn set_response(&self, handle: &str, response: MockExecution) {
        self.executions
            .lock()
            .await
            .insert(handle.to_string(), response);
    }

    /// Handles requested so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Number of requests served so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl WorkflowEngine for MockEngine {
    fn engine_type(&self) -> &'static str {
        "mock"
    }

    async fn get_execution(&self, execution_handle: &str) -> Result<Execution> {
        self.calls.lock().await.push(execution_handle.to_string());

        let response = self
            .executions
            .lock()
            .await
            .get(execution_handle)
            .cloned()
            .unwrap_or(MockExecution::NotFound);

        match response {
            MockExecution::State(state) => Ok(Execution {
                name: execution_handle.to_string(),
                state,
                start_time: None,
                end_time: None,
                argument: None,
                result: None,
                error: (state == ExecutionState::Failed).then(|| ExecutionError {
                    payload: Some("mock failure".to_string()),
                    context: None,
                }),
            }),
            MockExecution::NotFound => Err(SdkError::NotFound(execution_handle.to_string())),
            MockExecution::AccessDenied => Err(SdkError::AccessDenied {
                status: 403,
                message: "mock permission denied".to_string(),
            }),
            MockExecution::ConnectionError(message) => Err(SdkError::Connection(message)),
            MockExecution::Hang => std::future::pending().await,
        }
    }
}
