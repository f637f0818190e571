//! Per-user library (saved novels) and follow lists.
//!
//! Adding an entry that is already present and removing one that is absent
//! are both no-ops.

use katha_vault_core::{NovelId, UserId};

use super::{RepositoryError, Store, keys};

/// Repository for libraries and follows.
pub struct SocialRepository<'a> {
    store: &'a Store,
}

impl<'a> SocialRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Saved novel ids, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn library(&self, user: UserId) -> Result<Vec<NovelId>, RepositoryError> {
        self.store.get_or_default(&keys::library(user)).await
    }

    /// Returns `true` if the novel was newly saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn save(&self, user: UserId, novel: NovelId) -> Result<bool, RepositoryError> {
        insert(self.store, &keys::library(user), novel).await
    }

    /// Returns `true` if the novel was in the library.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn unsave(&self, user: UserId, novel: NovelId) -> Result<bool, RepositoryError> {
        remove(self.store, &keys::library(user), novel).await
    }

    /// Followed user ids, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn following(&self, user: UserId) -> Result<Vec<UserId>, RepositoryError> {
        self.store.get_or_default(&keys::following(user)).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn follow(&self, user: UserId, target: UserId) -> Result<bool, RepositoryError> {
        insert(self.store, &keys::following(user), target).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn unfollow(&self, user: UserId, target: UserId) -> Result<bool, RepositoryError> {
        remove(self.store, &keys::following(user), target).await
    }
}

async fn insert<T>(store: &Store, key: &str, id: T) -> Result<bool, RepositoryError>
where
    T: PartialEq + serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
{
    store
        .update(key, |ids: &mut Vec<T>| {
            if ids.contains(&id) {
                return Ok(false);
            }
            ids.push(id);
            Ok(true)
        })
        .await
}

async fn remove<T>(store: &Store, key: &str, id: T) -> Result<bool, RepositoryError>
where
    T: PartialEq + serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
{
    store
        .update(key, |ids: &mut Vec<T>| {
            let before = ids.len();
            ids.retain(|x| *x != id);
            Ok(ids.len() != before)
        })
        .await
}
