// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runsync Engine SDK
//!
//! Client for the executions API of the managed workflow engine that runs
//! story-generation workflows.
//!
//! The reconciler only ever reads executions, so the SDK exposes a single
//! remote operation: fetching one execution by its handle (the full resource
//! name returned when the execution was created).
//!
//! # Example
//!
//! ```no_run
//! use runsync_engine_sdk::{EngineConfig, ExecutionsClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ExecutionsClient::new(
//!     EngineConfig::new().with_access_token("ya29.token"),
//! )?;
//!
//! let execution = client
//!     .get_execution("projects/p/locations/us-central1/workflows/story/executions/abc")
//!     .await?;
//! println!("State: {:?}", execution.state);
//! # Ok(())
//! # }
//! ```
//!
//! # Error model
//!
//! Two remote conditions are distinguishable from everything else, because
//! callers treat them differently in their logs:
//!
//! | Condition | Error |
//! |-----------|-------|
//! | Execution does not exist (HTTP 404) | [`SdkError::NotFound`] |
//! | Credentials rejected (HTTP 401/403) | [`SdkError::AccessDenied`] |

mod client;
mod config;
mod error;
mod types;

pub use client::ExecutionsClient;
pub use config::EngineConfig;
pub use error::{Result, SdkError};
pub use types::{Execution, ExecutionError, ExecutionState};
