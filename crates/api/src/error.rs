//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeline::SystemError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Error raised by the box system.
    System(SystemError),
}

impl ApiError {
    /// Status code and stable error kind for the response body.
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::System(err) => match err {
                SystemError::UserAlreadyExists(_) => (StatusCode::CONFLICT, "user_already_exists"),
                SystemError::EmailAlreadyExists(_) => {
                    (StatusCode::CONFLICT, "email_already_exists")
                }
                SystemError::VersionConflict { .. } => (StatusCode::CONFLICT, "version_conflict"),
                SystemError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                SystemError::InvalidTransition { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition")
                }
                SystemError::InvalidCommand(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_command")
                }
                SystemError::UnknownPosition(_)
                | SystemError::PolicyFailed { .. }
                | SystemError::Projection(_)
                | SystemError::Domain(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classify();
        let message = match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::System(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

impl From<SystemError> for ApiError {
    fn from(err: SystemError) -> Self {
        ApiError::System(err)
    }
}
