// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request identity extraction.
//!
//! Authentication itself is an external collaborator; the server only
//! needs the caller's user id, taken from the `x-user-id` header the
//! auth proxy sets. Requests without one are rejected with 401.

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header"))
            })?;
        Ok(AuthContext {
            user_id: user_id.to_string(),
        })
    }
}
