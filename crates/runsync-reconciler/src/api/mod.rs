// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Admin HTTP API.
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | GET | `/health` | Liveness |
//! | POST | `/api/workflow-runs/sync` | `{"action": "status" \| "sync-all"}` |
//! | POST | `/api/workflow-runs/{run_id}/sync` | Reconcile one run |
//! | POST | `/api/workflow-runs/{run_id}/force-fail` | `{"reason": "..."}` |
//!
//! Errors are rendered as `{"requestId": ..., "error": {"code", "message"}}`.
//! Authentication is left to the surrounding deployment.

pub mod errors;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::error::Result;
use crate::reconciler::Reconciler;

pub use errors::ApiError;

/// Shared state of the admin API.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }
}

/// Build the admin API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/workflow-runs/sync", post(handlers::sync_runs))
        .route("/api/workflow-runs/{run_id}/sync", post(handlers::sync_run))
        .route(
            "/api/workflow-runs/{run_id}/force-fail",
            post(handlers::force_fail_run),
        )
        .layer(from_fn(request_log_middleware))
        .with_state(state)
}

async fn request_log_middleware(request: Request, next: Next) -> Response {
    let rid = handlers::request_id(request.headers());
    debug!(
        request_id = %rid,
        method = %request.method(),
        path = %request.uri().path(),
        "Admin API request"
    );
    next.run(request).await
}

/// Serve the admin API on `addr` until `shutdown` is notified.
pub async fn serve(addr: SocketAddr, state: AppState, shutdown: Arc<Notify>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state, shutdown).await
}

/// Serve the admin API on an already bound listener until `shutdown` is notified.
pub async fn serve_on(listener: TcpListener, state: AppState, shutdown: Arc<Notify>) -> Result<()> {
    info!(addr = %listener.local_addr()?, "Admin API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await?;

    info!("Admin API stopped");
    Ok(())
}
