//! Persistent store backed by sled

use super::{CacheKey, Namespace, Store};
use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parts database
pub struct SledStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledStore {
    /// Open or create the database at `path`
    pub async fn open<P: AsRef<Path>>(path: P, cache_capacity: u64) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }

        let db = sled::Config::new()
            .path(&path)
            .cache_capacity(cache_capacity)
            .open()?;

        info!(path = %path.display(), "Opened parts database");
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SledStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StoreError> {
        Ok(self
            .db
            .get(key.path().as_bytes())?
            .map(|value| Bytes::copy_from_slice(&value)))
    }

    async fn put(&self, key: &CacheKey, value: Bytes) -> Result<(), StoreError> {
        self.db.insert(key.path().as_bytes(), value.as_ref())?;
        Ok(())
    }

    async fn get_all(&self, namespace: &Namespace) -> Result<Vec<Bytes>, StoreError> {
        let mut values = Vec::new();
        for item in self.db.scan_prefix(namespace.prefix().as_bytes()) {
            let (_, value) = item?;
            values.push(Bytes::copy_from_slice(&value));
        }
        Ok(values)
    }

    async fn delete_all(&self, namespace: &Namespace) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        let mut count = 0usize;
        for item in self.db.scan_prefix(namespace.prefix().as_bytes()) {
            let (key, _) = item?;
            batch.remove(key);
            count += 1;
        }
        self.db.apply_batch(batch)?;
        debug!(namespace = %namespace, count, "Deleted namespace");
        Ok(())
    }
}
