//! Generation-aware view of the parts catalog
//!
//! The basic catalog is replaced wholesale on every seed. Each seed writes
//! into a fresh generation and only then moves the active-generation pointer,
//! so readers see either the previous catalog or the new one, never a
//! half-written or cleared one.

use crate::error::StoreError;
use crate::store::{CacheKey, Namespace, Store};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Catalog operations over a [`Store`]
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Store>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Generation currently served, `None` before the first seed
    pub async fn active_generation(&self) -> Result<Option<u64>, StoreError> {
        let Some(raw) = self.store.get(&CacheKey::active_generation()).await? else {
            return Ok(None);
        };
        let generation: u64 = serde_json::from_slice(&raw)?;
        Ok(Some(generation))
    }

    /// Serialized basic record of `name` in the active generation
    pub async fn part(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        match self.active_generation().await? {
            Some(generation) => self.store.get(&CacheKey::basic(generation, name)).await,
            None => Ok(None),
        }
    }

    /// Serialized name index of the active generation
    pub async fn index(&self) -> Result<Option<Bytes>, StoreError> {
        match self.active_generation().await? {
            Some(generation) => self.store.get(&CacheKey::index(generation)).await,
            None => Ok(None),
        }
    }

    /// Cached extended record of `name`
    pub async fn extended(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        self.store.get(&CacheKey::extended(name)).await
    }

    /// Make sure `generation` starts empty, clearing leftovers of an aborted seed
    pub async fn stage(&self, generation: u64) -> Result<(), StoreError> {
        let namespace = Namespace::BasicParts(generation);
        let leftovers = self.store.get_all(&namespace).await?;
        if !leftovers.is_empty() {
            info!(
                generation,
                count = leftovers.len(),
                "Clearing parts left by an earlier seed"
            );
            self.store.delete_all(&namespace).await?;
        }
        if self.store.get(&CacheKey::index(generation)).await?.is_some() {
            self.store.delete_all(&Namespace::Index(generation)).await?;
        }
        Ok(())
    }

    pub async fn put_part(&self, generation: u64, name: &str, data: Bytes) -> Result<(), StoreError> {
        self.store.put(&CacheKey::basic(generation, name), data).await
    }

    pub async fn put_index(&self, generation: u64, names: &[String]) -> Result<(), StoreError> {
        let data = serde_json::to_vec(names)?;
        self.store.put(&CacheKey::index(generation), Bytes::from(data)).await
    }

    /// Point readers at `generation`
    pub async fn activate(&self, generation: u64) -> Result<(), StoreError> {
        let data = serde_json::to_vec(&generation)?;
        self.store
            .put(&CacheKey::active_generation(), Bytes::from(data))
            .await?;
        info!(generation, "Activated catalog generation");
        Ok(())
    }

    /// Generations replaced by a seed whose deletion has not succeeded yet
    pub async fn retiring(&self) -> Result<Vec<u64>, StoreError> {
        match self.store.get(&CacheKey::retiring_generations()).await? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn put_retiring(&self, generations: &[u64]) -> Result<(), StoreError> {
        let data = serde_json::to_vec(generations)?;
        self.store
            .put(&CacheKey::retiring_generations(), Bytes::from(data))
            .await
    }

    /// Retire `replaced` along with every generation left over by earlier
    /// failed retirements.
    ///
    /// The queue is persisted before deleting anything, so a generation is
    /// never forgotten. Returns the generations still queued.
    pub async fn retire_stale(&self, replaced: Option<u64>) -> Result<Vec<u64>, StoreError> {
        let mut queue = self.retiring().await?;
        if let Some(generation) = replaced {
            if !queue.contains(&generation) {
                queue.push(generation);
                self.put_retiring(&queue).await?;
            }
        }
        if queue.is_empty() {
            return Ok(queue);
        }

        let active = self.active_generation().await?;
        let mut remaining = Vec::new();
        for generation in queue {
            if Some(generation) == active {
                continue;
            }
            if let Err(e) = self.retire(generation).await {
                warn!(generation, error = %e, "Failed to retire catalog generation");
                remaining.push(generation);
            }
        }

        self.put_retiring(&remaining).await?;
        Ok(remaining)
    }

    /// Drop the records and index of a generation no longer served
    pub async fn retire(&self, generation: u64) -> Result<(), StoreError> {
        self.store.delete_all(&Namespace::BasicParts(generation)).await?;
        self.store.delete_all(&Namespace::Index(generation)).await?;
        debug!(generation, "Retired catalog generation");
        Ok(())
    }
}
