//! Home page layout document.

use katha_vault_core::HomeLayoutConfig;

use super::{RepositoryError, Store, keys};

/// Repository for the admin-edited home layout.
pub struct LayoutRepository<'a> {
    store: &'a Store,
}

impl<'a> LayoutRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// The stored layout, or the default one if none was saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn get(&self) -> Result<HomeLayoutConfig, RepositoryError> {
        self.store.get_or_default(keys::HOME_LAYOUT).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn put(&self, config: &HomeLayoutConfig) -> Result<(), RepositoryError> {
        self.store.put(keys::HOME_LAYOUT, config).await
    }
}
