//! Unified error handling.
//!
//! Provides a unified `AppError` type covering the error taxonomy of the
//! API: validation, not-found, duplicate-key, unauthorized and forbidden,
//! plus repository/internal failures. All route handlers return
//! `Result<T, AppError>`; server-side failures are logged before the
//! response is shaped, and internal detail never reaches the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type for the customer API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input fields, rejected before any mutation.
    #[error("validation failed")]
    Validation(Vec<String>),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write collided with the email-uniqueness invariant.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Missing or invalid session on a guarded route.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Action attempted against a customer not matching the session
    /// identity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        }

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Validation(messages) => {
                json!({ "error": "validation failed", "details": messages })
            }
            Self::Repository(RepositoryError::NotFound) | Self::NotFound(_) => {
                json!({ "error": "not found" })
            }
            Self::Repository(RepositoryError::Conflict(msg)) | Self::Duplicate(msg) => {
                json!({ "error": msg })
            }
            Self::Repository(_) | Self::Internal(_) => {
                json!({ "error": "internal server error" })
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => json!({ "error": "invalid credentials" }),
                AuthError::EmailTaken => {
                    json!({ "error": "an account with this email already exists" })
                }
                AuthError::WeakPassword(msg) => json!({ "error": msg }),
                AuthError::InvalidEmail(e) => json!({ "error": e.to_string() }),
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    json!({ "error": "internal server error" })
                }
            },
            Self::Unauthorized(_) => json!({ "error": "unauthorized" }),
            Self::Forbidden(_) => json!({ "error": "forbidden" }),
        };

        (status, Json(body)).into_response()
    }
}

impl AppError {
    /// HTTP status the error maps to.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            Self::Duplicate(_) | Self::Repository(RepositoryError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Repository(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
