//! HTTP error types for the `certbadge` server.
//!
//! Maps domain errors from `certbadge-core` into HTTP responses. Every error
//! variant produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use certbadge_core::error::{ImageError, RecordError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid input.
    BadRequest(String),
    /// Missing or wrong admin API key.
    Unauthorized(String),
    /// Requested resource not found.
    NotFound(String),
    /// A conflict (e.g., identifier already taken).
    Conflict(String),
    /// Internal server error. The detail is logged, never returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound { .. } => Self::NotFound(err.to_string()),
            RecordError::AlreadyExists { .. } => Self::Conflict(err.to_string()),
            RecordError::Invalid { .. } => Self::BadRequest(err.to_string()),
            RecordError::Corrupt { .. } | RecordError::Storage(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidRequest { .. } => Self::BadRequest(err.to_string()),
            ImageError::NotFound { .. } => Self::NotFound(err.to_string()),
            ImageError::Render(_) | ImageError::Conversion(_) => Self::Internal(err.to_string()),
            ImageError::Record(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use certbadge_core::error::RenderError;

    #[test]
    fn record_errors_map_to_statuses() {
        let cases = [
            (RecordError::NotFound { id: "a".into() }, StatusCode::NOT_FOUND),
            (RecordError::AlreadyExists { id: "a".into() }, StatusCode::CONFLICT),
            (RecordError::Invalid { reason: "r".into() }, StatusCode::BAD_REQUEST),
            (
                RecordError::Corrupt {
                    id: "a".into(),
                    reason: "r".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn image_errors_map_to_statuses() {
        let bad = ImageError::InvalidRequest {
            reason: "unsupported format 'gif'".into(),
        };
        assert_eq!(AppError::from(bad).into_response().status(), StatusCode::BAD_REQUEST);

        let missing = ImageError::NotFound { id: "x".into() };
        assert_eq!(AppError::from(missing).into_response().status(), StatusCode::NOT_FOUND);

        let render = ImageError::Render(RenderError::Task {
            reason: "cancelled".into(),
        });
        assert_eq!(
            AppError::from(render).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_detail_is_not_exposed() {
        use http_body_util::BodyExt;

        let response = AppError::Internal("disk on fire at /var/lib".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], "internal server error");
    }
}
