//! `PostgreSQL` document backend.
//!
//! One row per document in the `documents` table. Queries are built at
//! runtime (`sqlx::query`) since the schema is a single generic table.

use serde_json::Value;
use sqlx::{PgPool, Row};

use super::RepositoryError;

/// Documents stored as JSONB rows.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM documents WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get::<Value, _>("value")).transpose()?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn put(&self, key: &str, value: Value) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO documents (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, key: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE key LIKE $1")
            .bind(like_prefix(prefix))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>, RepositoryError> {
        let rows = sqlx::query("SELECT key, value FROM documents WHERE key LIKE $1 ORDER BY key")
            .bind(like_prefix(prefix))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| -> Result<(String, Value), RepositoryError> {
                Ok((r.try_get("key")?, r.try_get("value")?))
            })
            .collect()
    }

    /// Read-modify-write inside a transaction holding the row lock.
    ///
    /// The row is created first (as JSON `null`) so that two writers of a
    /// brand new key still serialize on `FOR UPDATE`.
    ///
    /// # Errors
    ///
    /// Returns the error of `apply`, or a database error converted into `E`.
    pub async fn update<R, E, A>(&self, key: &str, apply: A) -> Result<R, E>
    where
        A: FnOnce(Option<Value>) -> Result<(R, Value), E>,
        E: From<RepositoryError>,
    {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        sqlx::query("INSERT INTO documents (key, value) VALUES ($1, 'null'::jsonb) ON CONFLICT (key) DO NOTHING")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        let current: Value = sqlx::query("SELECT value FROM documents WHERE key = $1 FOR UPDATE")
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("value"))
            .map_err(RepositoryError::from)?;

        // Dropping `tx` on error rolls back, including the placeholder row.
        let (out, value) = apply(Some(current))?;

        sqlx::query("UPDATE documents SET value = $2, updated_at = NOW() WHERE key = $1")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(out)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

/// `LIKE` pattern matching keys that start with `prefix`.
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}
