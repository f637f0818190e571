//! Authentication error types.

use thiserror::Error;

use katha_vault_core::ValidationErrors;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Sign-up form failed validation.
    #[error("invalid sign-up: {0}")]
    Invalid(ValidationErrors),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but has been deactivated by an admin.
    #[error("account is deactivated")]
    Deactivated,

    /// Email or username already registered.
    #[error("{0}")]
    UserAlreadyExists(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
