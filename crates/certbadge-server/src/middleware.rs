//! Admin authentication middleware.
//!
//! Compares the `X-Api-Key` header against the configured admin key in
//! constant time. With no key configured every admin request is rejected.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the admin API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Middleware that validates the `X-Api-Key` header.
pub async fn admin_auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_api_key.as_deref() else {
        return AppError::Unauthorized("admin API is disabled".to_owned()).into_response();
    };

    let Some(provided) = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return AppError::Unauthorized(format!("missing {API_KEY_HEADER} header")).into_response();
    };

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        next.run(req).await
    } else {
        warn!(path = %req.uri().path(), "rejected admin request with invalid API key");
        AppError::Unauthorized("invalid API key".to_owned()).into_response()
    }
}
