use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use authz::{AuthzError, DenyReason};
use database::DatabaseError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Message sent in place of the details of any 5xx error
pub const GENERIC_SERVER_ERROR: &str = "Internal server error";

/// API Error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// An ownership check refused the request
    #[error(transparent)]
    Denied(#[from] DenyReason),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response structure for OpenAPI documentation
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorDetail {
    /// One of `unauthorized`, `not_found`, `bad_request`, `too_short`,
    /// `database_error`, `internal_error`
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Denied(DenyReason::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Denied(DenyReason::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Denied(DenyReason::BadRequest) => StatusCode::BAD_REQUEST,
            ApiError::Denied(DenyReason::TooShort) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for the error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Denied(reason) => reason.kind(),
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::DatabaseError(_) => "database_error",
            ApiError::InternalError(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            GENERIC_SERVER_ERROR.to_string()
        } else {
            self.to_string()
        };

        let error_response = ApiErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Denied(reason) => ApiError::Denied(reason),
            AuthzError::Lookup(message) => ApiError::DatabaseError(message),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Convert database errors to API errors
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::DatabaseError(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::InternalError(format!("Background task failed: {}", err))
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_reasons_map_to_status() {
        let cases = [
            (DenyReason::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized"),
            (DenyReason::NotFound, StatusCode::NOT_FOUND, "not_found"),
            (DenyReason::BadRequest, StatusCode::BAD_REQUEST, "bad_request"),
            (DenyReason::TooShort, StatusCode::BAD_REQUEST, "too_short"),
        ];
        for (reason, status, code) in cases {
            let err = ApiError::from(reason);
            assert_eq!(err.status_code(), status);
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn test_authz_errors() {
        let denied = ApiError::from(AuthzError::Denied(DenyReason::TooShort));
        assert_eq!(denied.error_code(), "too_short");

        let hashing = ApiError::from(AuthzError::Hashing("boom".into()));
        assert_eq!(hashing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let (status, body) = body_json(ApiError::DatabaseError(
            "no such table: guestbook_entries at /srv/data/guestbook.db".into(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "database_error");
        assert_eq!(body["error"]["message"], GENERIC_SERVER_ERROR);

        let (_, body) = body_json(ApiError::InternalError(
            "Failed to write upload /var/uploads/a.png: denied".into(),
        ))
        .await;
        assert_eq!(body["error"]["code"], "internal_error");
        assert!(!body.to_string().contains("/var/uploads"));
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let (status, body) = body_json(ApiError::BadRequest("name is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "name is required");
    }

    #[test]
    fn test_database_errors_are_server_errors() {
        let err = ApiError::from(DatabaseError::Io(std::io::Error::other("disk gone")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "database_error");
    }
}
