//! In-memory document backend.
//!
//! Used when no database URL is configured and by the test suites. Contents
//! are lost on restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

/// Documents held in a `BTreeMap` behind a tokio `RwLock`.
///
/// Cloning shares the same map.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.documents.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: &str, value: Value) {
        self.documents.write().await.insert(key.to_owned(), value);
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.documents.write().await.remove(key).is_some()
    }

    pub async fn delete_prefix(&self, prefix: &str) -> u64 {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|key, _| !key.starts_with(prefix));
        (before - documents.len()) as u64
    }

    pub async fn scan(&self, prefix: &str) -> Vec<(String, Value)> {
        self.documents
            .read()
            .await
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Run `apply` on the current value while holding the write lock and
    /// store its output on success.
    pub async fn update<R, E, A>(&self, key: &str, apply: A) -> Result<R, E>
    where
        A: FnOnce(Option<Value>) -> Result<(R, Value), E>,
    {
        let mut documents = self.documents.write().await;
        let (out, value) = apply(documents.get(key).cloned())?;
        documents.insert(key.to_owned(), value);
        Ok(out)
    }
}
