//! Cache-aside resolution of extended part records
//!
//! ```text
//! extended-parts/{name} ── hit ──► serve
//!        │ miss
//!        ▼
//! basic-parts/{name} ── absent ──► 404 (registry never asked)
//!        │ present
//!        ▼
//! registry part.cgi ── 0 results ──► 404
//!        │ first result
//!        ├──► serve
//!        └──► write-back queue ──► extended-parts/{returned name}
//! ```

use crate::catalog::Catalog;
use crate::store::CacheKey;
use crate::upstream::PartsUpstream;
use crate::writeback::WriteBack;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// How a resolution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Fetched,
    NotFound,
    UpstreamUnavailable,
}

/// Result of resolving one extended record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Served from the local cache
    Hit(Bytes),
    /// Fetched from the registry; a write-back was queued
    Fetched(Bytes),
    /// Not a catalog part, or the registry has no record for it
    NotFound,
    /// Store or registry failure; carries a short client-facing reason
    UpstreamUnavailable(String),
}

impl Resolution {
    pub fn outcome(&self) -> Outcome {
        match self {
            Resolution::Hit(_) => Outcome::Hit,
            Resolution::Fetched(_) => Outcome::Fetched,
            Resolution::NotFound => Outcome::NotFound,
            Resolution::UpstreamUnavailable(_) => Outcome::UpstreamUnavailable,
        }
    }

    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Resolution::Hit(data) | Resolution::Fetched(data) => Some(data),
            _ => None,
        }
    }
}

/// Serves extended records from the store, falling back to the registry
pub struct ExtendedResolver {
    catalog: Catalog,
    upstream: Arc<dyn PartsUpstream>,
    writeback: WriteBack,
}

impl ExtendedResolver {
    pub fn new(catalog: Catalog, upstream: Arc<dyn PartsUpstream>, writeback: WriteBack) -> Self {
        Self {
            catalog,
            upstream,
            writeback,
        }
    }

    /// Write-back pool used for fetched records
    pub fn writeback(&self) -> &WriteBack {
        &self.writeback
    }

    pub async fn resolve(&self, name: &str) -> Resolution {
        match self.catalog.extended(name).await {
            Ok(Some(data)) => return Resolution::Hit(data),
            Ok(None) => {}
            Err(e) => {
                error!(part = %name, error = %e, "Extended part lookup failed");
                return Resolution::UpstreamUnavailable(format!(
                    "cannot fulfill request for part named {}",
                    name
                ));
            }
        }

        // Only query the registry for parts the catalog knows about
        match self.catalog.part(name).await {
            Ok(Some(_)) => {}
            Ok(None) => return Resolution::NotFound,
            Err(e) => {
                error!(part = %name, error = %e, "Reverse lookup of basic part failed");
                return Resolution::UpstreamUnavailable(format!(
                    "cannot fulfill request for reverse lookup on part named {}",
                    name
                ));
            }
        }

        info!(part = %name, "Extended part not found locally, querying registry");
        let started = Instant::now();
        let result = self.upstream.query_extended(name).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let parts = match result {
            Ok(parts) => parts,
            Err(e) => {
                error!(part = %name, error = %e, elapsed_ms, "Registry lookup failed");
                return Resolution::UpstreamUnavailable(format!(
                    "cannot fulfill request, registry lookup failed for part {}",
                    name
                ));
            }
        };
        info!(part = %name, results = parts.len(), elapsed_ms, "Registry lookup done");

        if parts.len() > 1 {
            warn!(
                part = %name,
                results = parts.len(),
                "Found several parts instead of 1, using the first"
            );
        }
        let Some(part) = parts.into_iter().next() else {
            warn!(part = %name, "Part not found in registry, but is in catalog");
            return Resolution::NotFound;
        };

        let data = match serde_json::to_vec(&part) {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                error!(part = %name, error = %e, "Could not serialize extended part");
                return Resolution::UpstreamUnavailable(format!(
                    "cannot fulfill request, registry lookup failed for part {}",
                    name
                ));
            }
        };

        // Keyed by the name the registry returned
        self.writeback
            .submit(CacheKey::extended(&part.name), data.clone());

        Resolution::Fetched(data)
    }
}
