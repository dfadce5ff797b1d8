// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Admin API handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use super::errors::ApiError;
use crate::models::WorkflowSyncResult;

/// Body of `POST /api/workflow-runs/sync`.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub action: String,
}

/// Body of `POST /api/workflow-runs/{run_id}/force-fail`.
#[derive(Debug, Deserialize)]
pub struct ForceFailRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub(crate) fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Run the `status` or `sync-all` action over every running run.
pub async fn sync_runs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let rid = request_id(&headers);
    let Json(req) =
        body.map_err(|e| ApiError::bad_request(e.body_text()).with_request_id(rid.clone()))?;

    info!(request_id = %rid, action = %req.action, "Workflow run sync requested");

    match req.action.as_str() {
        "status" => {
            let summary = state
                .reconciler
                .status_summary()
                .await
                .map_err(|e| ApiError::from(e).with_request_id(rid.clone()))?;
            Ok(Json(summary).into_response())
        }
        "sync-all" => {
            let report = state
                .reconciler
                .reconcile_all()
                .await
                .map_err(|e| ApiError::from(e).with_request_id(rid.clone()))?;
            Ok(Json(report).into_response())
        }
        other => Err(ApiError::bad_request(format!(
            "Unknown action '{}', expected 'status' or 'sync-all'",
            other
        ))
        .with_request_id(rid)),
    }
}

/// Reconcile one run.
pub async fn sync_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<WorkflowSyncResult>, ApiError> {
    let rid = request_id(&headers);
    info!(request_id = %rid, run_id = %run_id, "Workflow run sync requested");

    let result = state
        .reconciler
        .reconcile_run(&run_id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(rid))?;
    Ok(Json(result))
}

/// Manually fail one run.
pub async fn force_fail_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<ForceFailRequest>, JsonRejection>,
) -> Result<Json<WorkflowSyncResult>, ApiError> {
    let rid = request_id(&headers);
    let Json(req) =
        body.map_err(|e| ApiError::bad_request(e.body_text()).with_request_id(rid.clone()))?;

    info!(request_id = %rid, run_id = %run_id, "Workflow run force-fail requested");

    let result = state
        .reconciler
        .force_mark_failed(&run_id, req.reason.trim())
        .await
        .map_err(|e| ApiError::from(e).with_request_id(rid))?;
    Ok(Json(result))
}
