//! Application state shared across handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;

use katha_vault_core::{User, UserId};

use crate::ai::AiService;
use crate::config::KathaConfig;
use crate::db::{RepositoryError, Store, UserRepository};

/// How long a profile stays in the user cache.
const USER_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const USER_CACHE_CAPACITY: u64 = 10_000;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: KathaConfig,
    store: Store,
    ai: AiService,
    users: Cache<UserId, User>,
    /// Bumped on every invalidation; a load that overlaps one is not cached.
    user_epoch: AtomicU64,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: KathaConfig, store: Store, ai: AiService) -> Self {
        let users = Cache::builder()
            .max_capacity(USER_CACHE_CAPACITY)
            .time_to_live(USER_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                ai,
                users,
                user_epoch: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &KathaConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Get a reference to the writing assistant.
    #[must_use]
    pub fn ai(&self) -> &AiService {
        &self.inner.ai
    }

    /// Load a profile, through the cache.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the users document cannot be read.
    pub async fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        if let Some(user) = self.inner.users.get(&id).await {
            return Ok(Some(user));
        }
        let seen = self.inner.user_epoch.load(Ordering::SeqCst);
        let user = UserRepository::new(self.store()).get_by_id(id).await?;
        if let Some(user) = &user {
            self.remember(user.clone(), seen).await;
        }
        Ok(user)
    }

    /// Cache a profile read at epoch `seen`, unless an invalidation ran
    /// since: the read may predate the write that triggered it.
    async fn remember(&self, user: User, seen: u64) {
        let id = user.id;
        self.inner.users.insert(id, user).await;
        if self.inner.user_epoch.load(Ordering::SeqCst) != seen {
            self.inner.users.invalidate(&id).await;
        }
    }

    /// Drop a cached profile after it changed.
    pub async fn forget_user(&self, id: UserId) {
        self.inner.user_epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.users.invalidate(&id).await;
    }
}
