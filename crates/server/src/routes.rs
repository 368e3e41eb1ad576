// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API routing.

use crate::handlers;
use crate::AppState;
use axum::routing::{get, patch, post};
use axum::Router;
use std::sync::Arc;

/// Build the execution API router. Everything lives under
/// `/executions`; the liveness probe is the one unauthenticated route.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/executions", executions_router())
        .with_state(state)
}

fn executions_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/test-case", post(handlers::start_test_case))
        .route("/test-suite", post(handlers::start_test_suite))
        .route("/", get(handlers::list_executions))
        .route("/queue/status", get(handlers::queue_status))
        .route("/queue/pause", post(handlers::pause_queue))
        .route("/queue/resume", post(handlers::resume_queue))
        .route("/analytics", get(handlers::analytics))
        .route("/trends", get(handlers::trends))
        .route("/statistics", get(handlers::statistics))
        .route("/system/health", get(handlers::system_health))
        .route("/health", get(handlers::liveness))
        .route("/{id}", get(handlers::get_execution))
        .route("/{id}/status", patch(handlers::update_status))
        .route("/{id}/progress", get(handlers::progress))
        .route("/{id}/report", get(handlers::report))
}
