//! Account management commands.
//!
//! New accounts are only created through sign-up (or by listing the email in
//! `KATHA_ADMIN_EMAILS`); this command upgrades an existing one.

use katha_vault_core::{Email, EmailError, UserRole};
use katha_vault_server::db::{RepositoryError, UserRepository};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("No account with email: {0}")]
    UnknownUser(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Give the account registered under `email` the admin role.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let store = connect().await?;
    let users = UserRepository::new(&store);

    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(email.to_string()))?;

    if user.is_admin() {
        tracing::info!(user_id = %user.id, "Account is already an admin");
        return Ok(());
    }

    let user = users.set_role(user.id, UserRole::Admin).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "Promoted to admin");
    Ok(())
}
