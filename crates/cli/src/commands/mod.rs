//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use katha_vault_server::db::{self, PgDocumentStore, Store};
use secrecy::SecretString;
use thiserror::Error;

/// Failure to reach the configured database.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Missing environment variable: KATHA_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read the database URL, loading `.env` first.
pub fn database_url() -> Result<SecretString, ConnectError> {
    dotenvy::dotenv().ok();
    std::env::var("KATHA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)
}

/// Connect to Postgres and wrap the pool as a document store.
pub async fn connect() -> Result<Store, ConnectError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&url).await?;
    Ok(Store::Postgres(PgDocumentStore::new(pool)))
}
