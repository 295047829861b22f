//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bricklayer::{
    Catalog, ExtendedBiobrick, ExtendedResolver, MemoryStore, PartsUpstream, Seeder, UpstreamError,
    WriteBack, WriteBackConfig,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DUMP: &str = "\
>BBa_B0034 Released 151 RBS \"RBS (Elowitz 1999) -- defines RBSs\"
aaagagg
agaaa

>BBa_B0010 Released 187 Terminator \"T1 from E. coli rrnB\"
ccaggcatcaaataaaacgaaaggctcagtcgaaag
actgggcctttcgttttatctgttgtttgtcggtgaacgctctc

>BBa_R0040 Released 187 Regulatory \"TetR repressible promoter\"
tccctatcagtgatagagattgacatccctatcagtgatagagatactgagcac

";

/// Upstream serving a fixed dump and canned extended records, counting calls
pub struct MockUpstream {
    dump: Mutex<String>,
    extended: Mutex<HashMap<String, Vec<ExtendedBiobrick>>>,
    pub dump_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MockUpstream {
    pub fn new(dump: &str) -> Self {
        Self {
            dump: Mutex::new(dump.to_string()),
            extended: Mutex::new(HashMap::new()),
            dump_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn with_extended(self, name: &str, parts: Vec<ExtendedBiobrick>) -> Self {
        self.extended.lock().unwrap().insert(name.to_string(), parts);
        self
    }

    pub fn set_dump(&self, dump: &str) {
        *self.dump.lock().unwrap() = dump.to_string();
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn queries(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PartsUpstream for MockUpstream {
    async fn download_dump(&self) -> Result<Bytes, UpstreamError> {
        self.dump_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UpstreamError::Unavailable("mock registry down".into()));
        }
        Ok(Bytes::from(self.dump.lock().unwrap().clone()))
    }

    async fn query_extended(&self, name: &str) -> Result<Vec<ExtendedBiobrick>, UpstreamError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UpstreamError::Unavailable("mock registry down".into()));
        }
        Ok(self
            .extended
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn extended(id: i64, name: &str) -> ExtendedBiobrick {
    ExtendedBiobrick {
        id,
        name: name.to_string(),
        short_name: name.trim_start_matches("BBa_").to_string(),
        short_desc: format!("{} description", name),
        full_type: "RBS".to_string(),
        rating: "3".to_string(),
        ..Default::default()
    }
}

/// Store, upstream, catalog and resolver wired together
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub upstream: Arc<MockUpstream>,
    pub catalog: Catalog,
    pub resolver: Arc<ExtendedResolver>,
}

impl Fixture {
    pub fn new(upstream: MockUpstream) -> Self {
        let store = Arc::new(MemoryStore::new());
        let upstream = Arc::new(upstream);
        let catalog = Catalog::new(store.clone());
        let writeback = WriteBack::new(store.clone(), WriteBackConfig::default());
        let resolver = Arc::new(ExtendedResolver::new(
            catalog.clone(),
            upstream.clone(),
            writeback,
        ));
        Self {
            store,
            upstream,
            catalog,
            resolver,
        }
    }

    pub fn seeder(&self) -> Seeder {
        Seeder::new(self.catalog.clone(), self.upstream.clone())
    }

    /// Fixture with the catalog already seeded from `DUMP`
    pub async fn seeded(upstream: MockUpstream) -> Self {
        let fixture = Self::new(upstream);
        fixture.seeder().seed().await.unwrap();
        fixture
    }
}
