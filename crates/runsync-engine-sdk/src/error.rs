// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for runsync-engine-sdk.

use thiserror::Error;

/// Result type using SdkError.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors that can occur when talking to the workflow engine.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection to the engine failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Request timed out.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// The execution does not exist.
    #[error("execution not found: {0}")]
    NotFound(String),

    /// The engine rejected our credentials.
    #[error("access denied [{status}]: {message}")]
    AccessDenied { status: u16, message: String },

    /// Engine returned an error response.
    #[error("server error [{status}]: {message}")]
    Server { status: u16, message: String },

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SdkError {
    /// True if the engine reported that the execution does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SdkError::NotFound(_))
    }

    /// True if the engine rejected the request's credentials.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, SdkError::AccessDenied { .. })
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Serialization(err.to_string())
    }
}
