//! Unified error handling for the HTTP API.
//!
//! Every handler returns `Result<_, AppError>`. Server-side failures are
//! captured to Sentry and logged, and their details never reach the client.
//! Bodies are JSON: `{"error": "..."}`, plus `fields` for validation errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use katha_vault_core::ValidationErrors;

use crate::ai::FlowError;
use crate::db::RepositoryError;
use crate::services::{AuthError, UploadError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Writing assistant failed.
    #[error("Assistant error: {0}")]
    Ai(#[from] FlowError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// One or more form fields are invalid.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not signed in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_owned()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Deactivated => StatusCode::FORBIDDEN,
                AuthError::UserAlreadyExists(_) => StatusCode::CONFLICT,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Ai(err) => match err {
                FlowError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                FlowError::Provider(_) | FlowError::InvalidOutput(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Upload(err) => match err {
                UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                UploadError::UnsupportedType(_) | UploadError::ContentMismatch(_) => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                UploadError::MissingFile | UploadError::Multipart(_) => StatusCode::BAD_REQUEST,
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() && !matches!(self, Self::Ai(FlowError::NotConfigured)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Validation(errors) | Self::Auth(AuthError::Invalid(errors)) => json!({
                "error": "Validation failed",
                "fields": errors.fields,
            }),
            Self::Ai(FlowError::Provider(_) | FlowError::InvalidOutput(_)) => {
                json!({ "error": "Writing assistant is unavailable" })
            }
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Set the Sentry user context for the signed-in user.
pub fn set_sentry_user(user_id: i32, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}
