//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time. The server never runs them on startup.

use thiserror::Error;

use super::{ConnectError, database_url};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run every pending migration.
pub async fn run() -> Result<(), MigrationError> {
    let url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = katha_vault_server::db::create_pool(&url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
