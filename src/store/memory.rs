//! In-process store, for tests and throwaway runs

use super::{CacheKey, Namespace, Store};
use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Simple in-memory store
///
/// Can be switched into a failing mode to exercise the unavailable paths.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Bytes>>,
    failing: AtomicBool,
    failing_deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            failing: AtomicBool::new(false),
            failing_deletes: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent operation fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make the next `count` namespace deletions fail
    pub fn fail_deletes(&self, count: usize) {
        self.failing_deletes.store(count, Ordering::SeqCst);
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// All physical keys, in order
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StoreError> {
        self.check()?;
        Ok(self.entries.read().await.get(&key.path()).cloned())
    }

    async fn put(&self, key: &CacheKey, value: Bytes) -> Result<(), StoreError> {
        self.check()?;
        self.entries.write().await.insert(key.path(), value);
        Ok(())
    }

    async fn get_all(&self, namespace: &Namespace) -> Result<Vec<Bytes>, StoreError> {
        self.check()?;
        let prefix = namespace.prefix();
        Ok(self
            .entries
            .read()
            .await
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn delete_all(&self, namespace: &Namespace) -> Result<(), StoreError> {
        self.check()?;
        let injected = self
            .failing_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable(format!(
                "memory store set to fail deleting {}",
                namespace
            )));
        }
        let prefix = namespace.prefix();
        self.entries
            .write()
            .await
            .retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }
}
