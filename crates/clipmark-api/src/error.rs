//! API error type and its mapping onto HTTP responses.
//!
//! Every error response has the shape `{"status": "error", "message": ...}`.
//! Internal error details are suppressed in production.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::error;

/// Whether internal error messages are passed through to clients.
/// Set once at startup from the environment mode.
static EXPOSE_INTERNAL_ERRORS: std::sync::atomic::AtomicBool =
    std::sync::atomic::AtomicBool::new(false);

/// Configure error detail exposure (development only).
pub fn expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, std::sync::atomic::Ordering::Relaxed);
}

/// Error type returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(clipmark_core::Error),
}

impl From<clipmark_core::Error> for ApiError {
    fn from(err: clipmark_core::Error) -> Self {
        use clipmark_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::DocumentNotFound(id) => ApiError::NotFound(format!("document {}", id)),
            Error::SegmentNotFound(id) => ApiError::NotFound(format!("segment {}", id)),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::Config(msg) => ApiError::BadRequest(msg),
            // The upstream file is gone or permission was revoked.
            Error::ProviderAccessLost(msg) => ApiError::Forbidden(msg),
            Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    let friendly = if msg.contains("tag_user_id_name_key") {
                        "A tag with this name already exists".to_string()
                    } else if msg.contains("category_user_id_name_key") {
                        "A category with this name already exists".to_string()
                    } else if msg.contains("segment_association") {
                        "These segments are already associated".to_string()
                    } else if msg.contains("document_user_id_provider_file_id_key") {
                        "This document is already registered".to_string()
                    } else {
                        msg
                    };
                    return ApiError::Conflict(friendly);
                }
                ApiError::Internal(Error::Database(sqlx_err))
            }
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            // Business-rule violations (duplicate names included) are
            // client errors in this API's contract.
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(err) => {
                error!(subsystem = "api", error = %err, "Internal error");
                let message = if EXPOSE_INTERNAL_ERRORS.load(std::sync::atomic::Ordering::Relaxed)
                {
                    err.to_string()
                } else {
                    "Internal server error".to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = Json(serde_json::json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipmark_core::Error;

    #[test]
    fn test_not_found_maps_to_404() {
        let err: ApiError = Error::SegmentNotFound(uuid::Uuid::nil()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_conflict_maps_to_bad_request() {
        let err: ApiError = Error::Conflict("category not empty".to_string()).into();
        assert!(matches!(err, ApiError::BadRequest(_)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_access_lost_maps_to_403() {
        let err: ApiError = Error::ProviderAccessLost("revoked".to_string()).into();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_unexpected_error_is_internal() {
        let err: ApiError = Error::Internal("boom".to_string()).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
