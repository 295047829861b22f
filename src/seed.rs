//! Bulk seeding of the parts catalog
//!
//! Downloads the registry dump, parses it block by block and writes every
//! part plus the name index into a fresh catalog generation. The generation
//! is activated only after the index is written; the previous one is then
//! retired, along with any generation an earlier seed failed to delete.

use crate::bricks::BiobrickReader;
use crate::catalog::Catalog;
use crate::error::SeedError;
use crate::upstream::PartsUpstream;
use bytes::Bytes;
use std::io::{BufRead, Cursor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Progress is logged every this many parts
const PROGRESS_EVERY: usize = 5_000;

/// Seeder configuration
#[derive(Debug, Clone, Default)]
pub struct SeederConfig {
    /// Local copy of the dump. Read instead of downloading when present,
    /// written after a download when absent.
    pub dump_file: Option<PathBuf>,
}

/// Outcome of a successful seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// Generation now being served
    pub generation: u64,
    /// Parts written (and names in the index)
    pub records: usize,
}

/// Populates the catalog from the registry dump
pub struct Seeder {
    catalog: Catalog,
    upstream: Arc<dyn PartsUpstream>,
    config: SeederConfig,
}

impl Seeder {
    pub fn new(catalog: Catalog, upstream: Arc<dyn PartsUpstream>) -> Self {
        Self {
            catalog,
            upstream,
            config: SeederConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SeederConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the whole catalog with the current registry dump
    pub async fn seed(&self) -> Result<SeedReport, SeedError> {
        let started = Instant::now();
        let dump = self.load_dump().await?;
        let report = self.seed_from_reader(Cursor::new(dump)).await?;

        info!(
            generation = report.generation,
            records = report.records,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Seeded parts catalog"
        );
        Ok(report)
    }

    /// Replace the whole catalog with the parts read from `reader`
    ///
    /// A parse error or failed write aborts before activation, readers keep
    /// the previous generation.
    pub async fn seed_from_reader<R: BufRead + Send>(&self, reader: R) -> Result<SeedReport, SeedError> {
        let previous = self.catalog.active_generation().await?;
        let generation = previous.map_or(1, |g| g + 1);

        self.catalog.stage(generation).await?;
        debug!(generation, ?previous, "Staging catalog generation");

        let mut names = Vec::new();
        for brick in BiobrickReader::new(reader) {
            let brick = brick?;
            let data = serde_json::to_vec(&brick).map_err(|source| SeedError::Serialize {
                name: brick.part_name.clone(),
                source,
            })?;

            self.catalog
                .put_part(generation, &brick.part_name, Bytes::from(data))
                .await?;
            names.push(brick.part_name);

            if names.len() % PROGRESS_EVERY == 0 {
                info!(parts = names.len(), "Reading bricks");
            }
        }

        self.catalog.put_index(generation, &names).await?;
        self.catalog.activate(generation).await?;

        match self.catalog.retire_stale(previous).await {
            Ok(remaining) if !remaining.is_empty() => {
                warn!(?remaining, "Catalog generations left for the next seed to retire");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to retire previous catalog generations"),
        }

        Ok(SeedReport {
            generation,
            records: names.len(),
        })
    }

    async fn load_dump(&self) -> Result<Bytes, SeedError> {
        let Some(path) = &self.config.dump_file else {
            return Ok(self.upstream.download_dump().await?);
        };

        if tokio::fs::try_exists(path).await? {
            info!(path = %path.display(), "Reading parts dump from local file");
            return Ok(Bytes::from(tokio::fs::read(path).await?));
        }

        let dump = self.upstream.download_dump().await?;
        if let Err(e) = tokio::fs::write(path, &dump).await {
            warn!(path = %path.display(), error = %e, "Failed to save parts dump");
        } else {
            info!(path = %path.display(), "Saved parts dump");
        }
        Ok(dump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bricks::ExtendedBiobrick;
    use crate::error::UpstreamError;
    use crate::store::{CacheKey, MemoryStore, Store};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DUMP: &str = "\
>BBa_B0034 Released 151 RBS \"RBS (Elowitz 1999)\"
aaagaggagaaa

>BBa_B0010 Released 187 Terminator \"T1 from E. coli rrnB\"
ccaggcatcaaat
";

    struct DumpUpstream {
        dump: &'static str,
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl PartsUpstream for DumpUpstream {
        async fn download_dump(&self) -> Result<Bytes, UpstreamError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(self.dump.as_bytes()))
        }

        async fn query_extended(&self, _name: &str) -> Result<Vec<ExtendedBiobrick>, UpstreamError> {
            Ok(Vec::new())
        }
    }

    fn seeder(store: Arc<MemoryStore>, dump: &'static str) -> (Seeder, Arc<DumpUpstream>) {
        let upstream = Arc::new(DumpUpstream {
            dump,
            downloads: AtomicUsize::new(0),
        });
        (Seeder::new(Catalog::new(store), upstream.clone()), upstream)
    }

    #[tokio::test]
    async fn test_seed_writes_parts_and_index() {
        let store = Arc::new(MemoryStore::new());
        let (seeder, _) = seeder(store.clone(), DUMP);

        let report = seeder.seed().await.unwrap();
        assert_eq!(report, SeedReport { generation: 1, records: 2 });

        let index = store.get(&CacheKey::index(1)).await.unwrap().unwrap();
        let names: Vec<String> = serde_json::from_slice(&index).unwrap();
        assert_eq!(names, vec!["BBa_B0034", "BBa_B0010"]);
    }

    #[tokio::test]
    async fn test_parse_error_keeps_previous_generation() {
        let store = Arc::new(MemoryStore::new());
        let catalog = Catalog::new(store.clone());
        let (good, _) = seeder(store.clone(), DUMP);
        good.seed().await.unwrap();

        let (bad, _) = seeder(store.clone(), ">BBa_X Released nope RBS \"x\"\n");
        let err = bad.seed().await.unwrap_err();
        assert!(matches!(err, SeedError::Parse(_)));

        assert_eq!(catalog.active_generation().await.unwrap(), Some(1));
        assert!(catalog.part("BBa_B0034").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_dump_file_is_saved_then_reused() {
        let temp = tempfile::TempDir::new().unwrap();
        let dump_file = temp.path().join("allpart.dump");
        let store = Arc::new(MemoryStore::new());
        let (seeder, upstream) = seeder(store, DUMP);
        let seeder = seeder.with_config(SeederConfig {
            dump_file: Some(dump_file.clone()),
        });

        seeder.seed().await.unwrap();
        assert!(dump_file.exists());
        seeder.seed().await.unwrap();
        assert_eq!(upstream.downloads.load(Ordering::SeqCst), 1);
    }
}
