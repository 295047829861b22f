//! Store gateway - key-value persistence for parts
//!
//! Keys are two-segment paths `{namespace}/{name}`. Basic records, extended
//! records and indexes never share a namespace, so "is this a known part" and
//! "do we have extended data for it" are independent lookups.
//!
//! ## Key Layout
//!
//! ```text
//! basic-parts.<gen>/<part name>    # Biobrick JSON, one catalog generation
//! index.<gen>/parts                # JSON array of part names for <gen>
//! index/active-generation          # generation currently served
//! index/retiring-generations       # JSON array of generations still to delete
//! extended-parts/<part name>       # ExtendedBiobrick JSON, lazily cached
//! ```

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Key-value persistence consumed by the seeder and the resolver
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a value, `None` when the key is absent
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StoreError>;

    /// Insert or replace a value
    async fn put(&self, key: &CacheKey, value: Bytes) -> Result<(), StoreError>;

    /// All values stored under a namespace
    async fn get_all(&self, namespace: &Namespace) -> Result<Vec<Bytes>, StoreError>;

    /// Remove every key under a namespace
    async fn delete_all(&self, namespace: &Namespace) -> Result<(), StoreError>;
}

/// Top-level key namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Basic records of one catalog generation
    BasicParts(u64),
    /// Lazily cached extended records
    ExtendedParts,
    /// Name index of one catalog generation
    Index(u64),
    /// Catalog bookkeeping (generation pointer)
    Meta,
}

impl Namespace {
    /// Path prefix of every key in this namespace, trailing separator included
    pub fn prefix(&self) -> String {
        format!("{}/", self)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::BasicParts(gen) => write!(f, "basic-parts.{}", gen),
            Namespace::ExtendedParts => f.write_str("extended-parts"),
            Namespace::Index(gen) => write!(f, "index.{}", gen),
            Namespace::Meta => f.write_str("index"),
        }
    }
}

/// Name of the parts index inside an index namespace
pub const PARTS_INDEX: &str = "parts";

/// Name of the active generation pointer inside the meta namespace
pub const ACTIVE_GENERATION: &str = "active-generation";

/// Name of the list of generations awaiting deletion inside the meta namespace
pub const RETIRING_GENERATIONS: &str = "retiring-generations";

/// Logical `{namespace, name}` path of a stored value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: Namespace,
    pub name: String,
}

impl CacheKey {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    pub fn basic(generation: u64, name: &str) -> Self {
        Self::new(Namespace::BasicParts(generation), name)
    }

    pub fn extended(name: &str) -> Self {
        Self::new(Namespace::ExtendedParts, name)
    }

    pub fn index(generation: u64) -> Self {
        Self::new(Namespace::Index(generation), PARTS_INDEX)
    }

    pub fn active_generation() -> Self {
        Self::new(Namespace::Meta, ACTIVE_GENERATION)
    }

    pub fn retiring_generations() -> Self {
        Self::new(Namespace::Meta, RETIRING_GENERATIONS)
    }

    /// Physical key as stored
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_paths() {
        assert_eq!(CacheKey::basic(3, "BBa_B0034").path(), "basic-parts.3/BBa_B0034");
        assert_eq!(CacheKey::extended("BBa_B0034").path(), "extended-parts/BBa_B0034");
        assert_eq!(CacheKey::index(3).path(), "index.3/parts");
        assert_eq!(CacheKey::active_generation().path(), "index/active-generation");
    }

    #[test]
    fn test_namespaces_do_not_overlap() {
        let basic = CacheKey::basic(1, "BBa_B0034").path();
        let extended = CacheKey::extended("BBa_B0034").path();
        assert_ne!(basic, extended);
        assert!(!extended.starts_with(&Namespace::BasicParts(1).prefix()));
        // Generation 1 must not match generation 10's prefix
        assert!(!CacheKey::basic(10, "x")
            .path()
            .starts_with(&Namespace::BasicParts(1).prefix()));
        assert!(!CacheKey::index(1)
            .path()
            .starts_with(&Namespace::Meta.prefix()));
    }
}
