// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP error mapping for admin API handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::error::Error;

/// Error body nested in every error response.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    request_id: String,
    error: ErrorBody,
}

/// Kind of API failure; decides the HTTP status and error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    BadRequest,
    NotFound,
    Internal,
}

/// Error returned by admin API handlers.
#[derive(Clone, Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            request_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Internal, message)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::RunNotFound(run_id) => {
                Self::not_found(format!("Workflow run not found: {}", run_id))
            }
            Error::InvalidRequest(message) => Self::bad_request(message),
            other => {
                error!(error = %other, "Admin API request failed");
                Self::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self.kind {
            ApiErrorKind::BadRequest => (StatusCode::BAD_REQUEST, "invalid_argument"),
            ApiErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            ApiErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let request_id = self
            .request_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let body = ErrorEnvelope {
            request_id,
            error: ErrorBody {
                code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_kinds() {
        assert_eq!(
            ApiError::from(Error::RunNotFound("r1".to_string())).kind,
            ApiErrorKind::NotFound
        );
        assert_eq!(
            ApiError::from(Error::InvalidRequest("bad".to_string())).kind,
            ApiErrorKind::BadRequest
        );

        let internal = ApiError::from(Error::Other("db exploded".to_string()));
        assert_eq!(internal.kind, ApiErrorKind::Internal);
        assert!(!internal.message.contains("exploded"));
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::not_found("nope").with_request_id("req-1").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::bad_request("bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
