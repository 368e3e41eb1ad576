// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the execution API.

use crate::auth::AuthContext;
use crate::dto::{
    AnalyticsQuery, GetQuery, ListQuery, ListResponse, PaginationMeta, ReportQuery,
    StartTestCaseRequest, StartTestSuiteRequest, TrendsQuery, UpdateStatusRequest,
};
use crate::error::ApiError;
use crate::projection::{project_trace, StepFields, TraceFields};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rig_core::HealthStatus;
use std::sync::Arc;

pub async fn start_test_case(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(request): Json<StartTestCaseRequest>,
) -> Result<Response, ApiError> {
    let trace = state
        .executions
        .start_test_case(&auth.user_id, request.into())
        .await?;
    let body = project_trace(&trace, &[], TraceFields::Summary, StepFields::Basic);
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn start_test_suite(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(request): Json<StartTestSuiteRequest>,
) -> Result<Response, ApiError> {
    let trace = state
        .executions
        .start_test_suite(&auth.user_id, request.into())
        .await?;
    let body = project_trace(&trace, &[], TraceFields::Summary, StepFields::Basic);
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn get_execution(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(execution_id): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (trace_fields, step_fields) = query.levels()?;
    let (trace, steps) = state
        .executions
        .get_execution(&auth.user_id, &execution_id)?;
    Ok(Json(project_trace(&trace, &steps, trace_fields, step_fields)))
}

pub async fn list_executions(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let trace_query = query.trace_query()?;
    let (sort, direction) = query.sort()?;
    let page = query.page()?;
    let (trace_fields, step_fields) = query.levels()?;

    let result =
        state
            .executions
            .list_executions(&auth.user_id, trace_query, sort, direction, page)?;

    let executions = result
        .items
        .iter()
        .map(|trace| {
            // Steps are only serialized from DETAILED upward; skip the
            // store read otherwise.
            let steps = if trace_fields >= TraceFields::Detailed {
                state.store.steps_for(&trace.execution_id)
            } else {
                Vec::new()
            };
            project_trace(trace, &steps, trace_fields, step_fields)
        })
        .collect();

    Ok(Json(ListResponse {
        executions,
        pagination: PaginationMeta {
            page: result.page,
            page_size: result.page_size,
            total_count: result.total,
            total_pages: result.total_pages,
            has_next: result.page < result.total_pages,
            has_previous: result.page > 1,
        },
    }))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(execution_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let trace = state.executions.update_status(
        &auth.user_id,
        &execution_id,
        request.new_status,
        request.reason,
        request.metadata,
    )?;
    Ok(Json(project_trace(
        &trace,
        &[],
        TraceFields::Summary,
        StepFields::Basic,
    )))
}

pub async fn progress(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(execution_id): Path<String>,
) -> Result<Json<rig_engine::ExecutionProgress>, ApiError> {
    Ok(Json(state.executions.progress(&auth.user_id, &execution_id)?))
}

pub async fn report(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(execution_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let format = query.report_format()?;
    let include_details = query.include_details.unwrap_or(false);
    let report = state
        .executions
        .report(&auth.user_id, &execution_id, format, include_details)?;
    Ok((
        [(header::CONTENT_TYPE, report.content_type)],
        report.body,
    )
        .into_response())
}

pub async fn queue_status(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
) -> Json<rig_engine::QueueStatusReport> {
    Json(state.queue.status_report())
}

pub async fn pause_queue(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
) -> Json<serde_json::Value> {
    state.queue.pause();
    Json(serde_json::json!({ "queue_state": state.queue.queue_state() }))
}

pub async fn resume_queue(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
) -> Json<serde_json::Value> {
    state.queue.resume();
    Json(serde_json::json!({ "queue_state": state.queue.queue_state() }))
}

pub async fn analytics(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<rig_engine::AnalyticsReport>, ApiError> {
    let hours = query.window_hours()?;
    Ok(Json(state.monitor.performance_analytics(hours)))
}

pub async fn trends(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<rig_engine::TrendReport>, ApiError> {
    let days = query.window_days()?;
    Ok(Json(state.monitor.trends(days)))
}

pub async fn statistics(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
) -> Json<rig_engine::StatisticsReport> {
    Json(state.monitor.summary_statistics())
}

pub async fn system_health(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
) -> Json<rig_engine::SystemHealthReport> {
    Json(state.monitor.system_health())
}

/// Unauthenticated liveness probe: 503 only when the monitor reports
/// the system DOWN overall.
pub async fn liveness(State(state): State<Arc<AppState>>) -> Response {
    let status = state.monitor.liveness();
    let body = Json(serde_json::json!({ "status": status }));
    if status == HealthStatus::Down {
        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    } else {
        body.into_response()
    }
}
