// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow engine trait definitions.
//!
//! Defines the abstract interface the reconciler reads remote execution
//! state through.

use async_trait::async_trait;
use runsync_engine_sdk::{Execution, SdkError};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Read access to the external workflow engine.
///
/// Engines are injected into the reconciler rather than held as process-wide
/// state. Implementations must report a missing execution as
/// [`SdkError::NotFound`] and rejected credentials as [`SdkError::AccessDenied`].
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Engine type identifier (e.g., "executions-api", "mock")
    fn engine_type(&self) -> &'static str;

    /// Fetch the current state of one execution.
    async fn get_execution(&self, execution_handle: &str) -> Result<Execution>;
}
