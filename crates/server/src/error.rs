// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rig_engine::EngineError;
use serde::Serialize;

/// API-facing error. Each variant carries its HTTP status.
#[derive(Debug)]
pub enum ApiError {
    /// 422: input failed schema or value rules.
    Validation(String),
    /// 404: execution or resource absent (or not visible to the caller).
    NotFound(String),
    /// 400: illegal transition or known business error.
    BadRequest(String),
    /// 401: no usable identity on the request.
    Unauthorized(String),
    /// 409: optimistic-concurrency conflict; safe to retry.
    Conflict(String),
    /// 503: resource unavailable (queue stopped, liveness down).
    Unavailable(String),
    /// 500: anything unexpected.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            ApiError::Validation(m) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", m),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(%status, message, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error,
                message: message.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(m) => ApiError::Validation(m),
            EngineError::NotFound(m) => ApiError::NotFound(m),
            EngineError::StateTransition { .. } => ApiError::BadRequest(err.to_string()),
            EngineError::Conflict(m) => ApiError::Conflict(m),
            EngineError::Execution(m) => ApiError::BadRequest(m),
            EngineError::Timeout { .. } => ApiError::BadRequest(err.to_string()),
            EngineError::ResourceAllocation { .. } => ApiError::Unavailable(err.to_string()),
            EngineError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
