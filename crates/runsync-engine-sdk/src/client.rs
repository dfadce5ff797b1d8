// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ExecutionsClient for reading executions from the workflow engine.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::error::{Result, SdkError};
use crate::types::Execution;

/// Maximum number of body characters carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP client for the engine's executions API.
///
/// The client is cheap to clone and safe to share between tasks; the
/// underlying connection pool is reused across requests.
#[derive(Clone)]
pub struct ExecutionsClient {
    http: reqwest::Client,
    config: EngineConfig,
}

impl ExecutionsClient {
    /// Create a new client with the given configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SdkError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = EngineConfig::from_env()?;
        Self::new(config)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// URL of an execution resource.
    pub fn execution_url(&self, execution_handle: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            execution_handle.trim_start_matches('/')
        )
    }

    /// Fetch a single execution by its handle.
    ///
    /// Returns [`SdkError::NotFound`] when the engine has no such execution and
    /// [`SdkError::AccessDenied`] when the credentials are rejected.
    #[instrument(skip(self), fields(execution_handle = %execution_handle))]
    pub async fn get_execution(&self, execution_handle: &str) -> Result<Execution> {
        if execution_handle.trim().is_empty() {
            return Err(SdkError::InvalidInput(
                "execution handle must not be empty".to_string(),
            ));
        }

        let url = self.execution_url(execution_handle);
        debug!(url = %url, "Fetching execution");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
            let execution: Execution = serde_json::from_slice(&body)?;
            debug!(state = ?execution.state, "Fetched execution");
            return Ok(execution);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status.as_u16(), &body, execution_handle))
    }

    fn transport_error(&self, err: reqwest::Error) -> SdkError {
        if err.is_timeout() {
            SdkError::Timeout(self.config.request_timeout.as_millis() as u64)
        } else {
            SdkError::Connection(err.to_string())
        }
    }
}

/// Map a non-success HTTP status to an SDK error.
fn error_for_status(status: u16, body: &str, execution_handle: &str) -> SdkError {
    match status {
        404 => SdkError::NotFound(execution_handle.to_string()),
        401 | 403 => SdkError::AccessDenied {
            status,
            message: error_message(body),
        },
        _ => SdkError::Server {
            status,
            message: error_message(body),
        },
    }
}

/// Extract `error.message` from a JSON error envelope, falling back to the raw body.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });

    match parsed {
        Some(message) => message,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}
