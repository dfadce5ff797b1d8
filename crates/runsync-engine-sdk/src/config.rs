// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the engine SDK.

use std::time::Duration;

use crate::error::{Result, SdkError};

/// Default executions API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://workflowexecutions.googleapis.com/v1";

/// Configuration for the ExecutionsClient.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the executions API. Execution handles are appended to it.
    pub base_url: String,
    /// Bearer token sent with every request, if set.
    pub access_token: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUNSYNC_ENGINE_URL`: Executions API base URL (default: the managed endpoint)
    /// - `RUNSYNC_ENGINE_ACCESS_TOKEN`: Bearer token (default: none)
    /// - `RUNSYNC_ENGINE_CONNECT_TIMEOUT_MS`: Connection timeout in milliseconds (default: 10000)
    /// - `RUNSYNC_ENGINE_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds (default: 30000)
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("RUNSYNC_ENGINE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SdkError::Config(format!(
                "invalid RUNSYNC_ENGINE_URL: {}",
                base_url
            )));
        }

        let access_token = std::env::var("RUNSYNC_ENGINE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let connect_timeout_ms: u64 = std::env::var("RUNSYNC_ENGINE_CONNECT_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .map_err(|e| {
                SdkError::Config(format!("invalid RUNSYNC_ENGINE_CONNECT_TIMEOUT_MS: {}", e))
            })?;

        let request_timeout_ms: u64 = std::env::var("RUNSYNC_ENGINE_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .map_err(|e| {
                SdkError::Config(format!("invalid RUNSYNC_ENGINE_REQUEST_TIMEOUT_MS: {}", e))
            })?;

        Ok(Self {
            base_url,
            access_token,
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the bearer access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
