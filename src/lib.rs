//! Bricklayer - BioBrick parts catalog service
//!
//! Mirrors the iGEM parts registry into a local sled database and serves it
//! over HTTP.
//!
//! ## Architecture
//!
//! - **Seeder**: downloads the registry's FASTA dump and replaces the basic
//!   catalog (one record per part plus a name index)
//! - **Resolver**: serves extended part records cache-aside, querying the
//!   registry on first access and writing the answer back in the background
//! - **HTTP API**: conditional (`ETag`) responses over all of the above
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/bricklayer/
//! ├── parts.sled/            # Parts database (see `store` for key layout)
//! ├── allpart.dump           # Optional local copy of the registry dump
//! └── config.toml            # Configuration
//! ```

pub mod bricks;
pub mod catalog;
pub mod conditional;
pub mod config;
pub mod error;
pub mod http;
pub mod resolver;
pub mod seed;
pub mod store;
pub mod upstream;
pub mod writeback;

// Re-exports
pub use bricks::{Biobrick, BiobrickReader, ExtendedBiobrick};
pub use catalog::Catalog;
pub use conditional::{fingerprint, Conditional};
pub use config::Config;
pub use error::{ConfigError, ParseError, SeedError, StoreError, UpstreamError};
pub use http::HttpServer;
pub use resolver::{ExtendedResolver, Outcome, Resolution};
pub use seed::{SeedReport, Seeder, SeederConfig};
pub use store::{CacheKey, MemoryStore, Namespace, SledStore, Store};
pub use upstream::{IgemClient, IgemClientConfig, PartsUpstream};
pub use writeback::{WriteBack, WriteBackConfig};
