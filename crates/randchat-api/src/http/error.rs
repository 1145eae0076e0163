//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use randchat_types::error::{RepositoryError, UserError};

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// User lookups and transitions.
    User(UserError),
    /// Direct storage access (stats).
    Repository(RepositoryError),
    /// Malformed request.
    Validation(String),
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        AppError::User(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::User(UserError::NotFound) => {
                (StatusCode::NOT_FOUND, "USER_NOT_FOUND", "User not found".to_string())
            }
            AppError::User(e) if e.is_validation() => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::User(e) => (StatusCode::INTERNAL_SERVER_ERROR, "USER_ERROR", e.to_string()),
            AppError::Repository(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Entity not found".to_string())
            }
            AppError::Repository(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }
        (status, ApiResponse::error(code, &message).into_body()).into_response()
    }
}
