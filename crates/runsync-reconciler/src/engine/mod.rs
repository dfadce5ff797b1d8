// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Engine module - access to the external workflow engine.

pub mod mock;
mod traits;

use async_trait::async_trait;
use runsync_engine_sdk::{Execution, ExecutionsClient};

pub use mock::MockEngine;
pub use traits::*;

#[async_trait]
impl WorkflowEngine for ExecutionsClient {
    fn engine_type(&self) -> &'static str {
        "executions-api"
    }

    async fn get_execution(&self, execution_handle: &str) -> Result<Execution> {
        ExecutionsClient::get_execution(self, execution_handle).await
    }
}
