//! Document storage.
//!
//! Every collection is one JSON document under a well-known key and every
//! mutation rewrites the whole document, inside a lock on that key:
//!
//! - `novels` - all novels with their chapters
//! - `novel_seq` - last novel id handed out; ids are never reused
//! - `posts` - the community feed, comments embedded
//! - `users` - profiles
//! - `credentials` - password hashes by user id
//! - `chapter_comments:{novel}:{chapter}` - one comment tree per chapter
//! - `library:{user}` - saved novel ids
//! - `following:{user}` - followed user ids
//! - `home_layout` - admin-chosen home page sections
//!
//! Two backends implement the same operations: `PostgreSQL` (a single
//! `documents` table, JSONB values) and an in-memory map used when no
//! database URL is configured.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p katha-vault-cli -- migrate
//! ```

pub mod comments;
pub mod layout;
pub mod memory;
pub mod novels;
pub mod postgres;
pub mod posts;
pub mod social;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use comments::ChapterCommentRepository;
pub use layout::LayoutRepository;
pub use memory::MemoryDocumentStore;
pub use novels::NovelRepository;
pub use postgres::PgDocumentStore;
pub use posts::PostRepository;
pub use social::SocialRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or does not match its type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Document keys.
pub mod keys {
    use katha_vault_core::{ChapterId, NovelId, UserId};

    pub const NOVELS: &str = "novels";
    pub const NOVEL_SEQ: &str = "novel_seq";
    pub const POSTS: &str = "posts";
    pub const USERS: &str = "users";
    pub const CREDENTIALS: &str = "credentials";
    pub const HOME_LAYOUT: &str = "home_layout";
    pub const CHAPTER_COMMENTS_PREFIX: &str = "chapter_comments:";

    #[must_use]
    pub fn chapter_comments(novel: NovelId, chapter: ChapterId) -> String {
        format!("{CHAPTER_COMMENTS_PREFIX}{novel}:{chapter}")
    }

    /// Prefix shared by every chapter thread of one novel.
    #[must_use]
    pub fn novel_comments_prefix(novel: NovelId) -> String {
        format!("{CHAPTER_COMMENTS_PREFIX}{novel}:")
    }

    /// Inverse of [`chapter_comments`].
    #[must_use]
    pub fn parse_chapter_comments(key: &str) -> Option<(NovelId, ChapterId)> {
        let rest = key.strip_prefix(CHAPTER_COMMENTS_PREFIX)?;
        let (novel, chapter) = rest.split_once(':')?;
        Some((novel.parse().ok()?, chapter.parse().ok()?))
    }

    #[must_use]
    pub fn library(user: UserId) -> String {
        format!("library:{user}")
    }

    #[must_use]
    pub fn following(user: UserId) -> String {
        format!("following:{user}")
    }
}

/// The configured document backend.
#[derive(Clone)]
pub enum Store {
    Postgres(PgDocumentStore),
    Memory(MemoryDocumentStore),
}

impl Store {
    /// An empty in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryDocumentStore::default())
    }

    /// Human-readable backend name for logs.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Read a document, `None` if the key was never written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails and
    /// `RepositoryError::DataCorruption` if the stored value does not match `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let raw = match self {
            Self::Postgres(store) => store.get(key).await?,
            Self::Memory(store) => store.get(key).await,
        };
        raw.map(|value| decode(key, value)).transpose()
    }

    /// Read a document, falling back to `T::default()` for missing keys.
    ///
    /// # Errors
    ///
    /// See [`Store::get`].
    pub async fn get_or_default<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<T, RepositoryError> {
        Ok(self.get(key).await?.unwrap_or_default())
    }

    /// Overwrite a document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        let value = encode(key, value)?;
        match self {
            Self::Postgres(store) => store.put(key, value).await,
            Self::Memory(store) => {
                store.put(key, value).await;
                Ok(())
            }
        }
    }

    /// Delete a document. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<bool, RepositoryError> {
        match self {
            Self::Postgres(store) => store.delete(key).await,
            Self::Memory(store) => Ok(store.delete(key).await),
        }
    }

    /// Delete every document whose key starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<u64, RepositoryError> {
        match self {
            Self::Postgres(store) => store.delete_prefix(prefix).await,
            Self::Memory(store) => Ok(store.delete_prefix(prefix).await),
        }
    }

    /// Every document whose key starts with `prefix`, ordered by key.
    ///
    /// # Errors
    ///
    /// See [`Store::get`].
    pub async fn scan<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, T)>, RepositoryError> {
        let rows = match self {
            Self::Postgres(store) => store.scan(prefix).await?,
            Self::Memory(store) => store.scan(prefix).await,
        };
        rows.into_iter()
            .map(|(key, value)| {
                let doc = decode(&key, value)?;
                Ok((key, doc))
            })
            .collect()
    }

    /// Read-modify-write a document atomically with respect to other writers
    /// of the same key.
    ///
    /// A missing document starts as `T::default()`. The document is written
    /// back only when `f` returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a `RepositoryError` converted into `E`.
    pub async fn update<T, R, E, F>(&self, key: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<R, E> + Send,
        E: From<RepositoryError>,
    {
        let apply = |current: Option<Value>| -> Result<(R, Value), E> {
            let mut doc: T = match current {
                Some(value) if !value.is_null() => decode(key, value)?,
                _ => T::default(),
            };
            let out = f(&mut doc)?;
            Ok((out, encode(key, &doc)?))
        };
        match self {
            Self::Postgres(store) => store.update(key, apply).await,
            Self::Memory(store) => store.update(key, apply).await,
        }
    }

    /// Check that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if `PostgreSQL` is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        match self {
            Self::Postgres(store) => store.ping().await,
            Self::Memory(_) => Ok(()),
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("document {key}: {e}")))
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("document {key}: {e}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use katha_vault_core::{ChapterId, NovelId, UserId};

    #[test]
    fn test_chapter_comment_keys_round_trip() {
        let key = keys::chapter_comments(NovelId::new(12), ChapterId::new(3));
        assert_eq!(key, "chapter_comments:12:3");
        assert_eq!(
            keys::parse_chapter_comments(&key),
            Some((NovelId::new(12), ChapterId::new(3)))
        );
        assert!(key.starts_with(&keys::novel_comments_prefix(NovelId::new(12))));
        assert!(!key.starts_with(&keys::novel_comments_prefix(NovelId::new(1))));
        assert_eq!(keys::parse_chapter_comments("library:1"), None);
        assert_eq!(keys::parse_chapter_comments("chapter_comments:x:1"), None);
    }

    #[test]
    fn test_user_keys() {
        assert_eq!(keys::library(UserId::new(4)), "library:4");
        assert_eq!(keys::following(UserId::new(4)), "following:4");
    }

    #[tokio::test]
    async fn test_write_then_read_returns_equal_document() {
        let store = Store::memory();
        let doc = vec![NovelId::new(1), NovelId::new(5)];
        store.put("library:1", &doc).await.unwrap();
        let read: Vec<NovelId> = store.get("library:1").await.unwrap().unwrap();
        assert_eq!(read, doc);
        assert!(store.get::<Vec<NovelId>>("library:2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_persists_only_on_ok() {
        let store = Store::memory();
        let pushed: Result<usize, RepositoryError> = store
            .update("nums", |nums: &mut Vec<i32>| {
                nums.push(1);
                Ok(nums.len())
            })
            .await;
        assert_eq!(pushed.unwrap(), 1);

        let failed: Result<(), RepositoryError> = store
            .update("nums", |nums: &mut Vec<i32>| {
                nums.push(2);
                Err(RepositoryError::NotFound)
            })
            .await;
        assert!(matches!(failed, Err(RepositoryError::NotFound)));
        assert_eq!(store.get::<Vec<i32>>("nums").await.unwrap().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_data_corruption() {
        let store = Store::memory();
        store.put("users", &"not a list").await.unwrap();
        let err = store.get::<Vec<i32>>("users").await.unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[tokio::test]
    async fn test_scan_and_delete_prefix() {
        let store = Store::memory();
        store.put("chapter_comments:1:1", &vec![1]).await.unwrap();
        store.put("chapter_comments:1:2", &vec![2]).await.unwrap();
        store.put("chapter_comments:2:1", &vec![3]).await.unwrap();

        let all: Vec<(String, Vec<i32>)> = store.scan("chapter_comments:").await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].0, "chapter_comments:1:1");

        assert_eq!(store.delete_prefix("chapter_comments:1:").await.unwrap(), 2);
        let rest: Vec<(String, Vec<i32>)> = store.scan("chapter_comments:").await.unwrap();
        assert_eq!(rest.len(), 1);
        assert!(store.delete("chapter_comments:2:1").await.unwrap());
        assert!(!store.delete("chapter_comments:2:1").await.unwrap());
    }
}
