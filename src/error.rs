//! Error types for bricklayer

use thiserror::Error;

/// Failure while reading the FASTA-like parts dump.
///
/// Any of these aborts the whole stream; records are never partially yielded.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: expected '>' prefix for FASTA header")]
    MissingPrefix { line: usize },

    #[error("line {line}: got {found} instead of 5 expected parts in abstract '{text}'")]
    TooFewFields {
        line: usize,
        found: usize,
        text: String,
    },

    #[error("line {line}: need integer for part ID, got '{value}'")]
    InvalidId { line: usize, value: String },

    #[error("IO error reading parts stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Store gateway failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Remote registry failures
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("decoding XML stream: {0}")]
    Decode(#[from] quick_xml::DeError),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// Bulk seeding failures
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("failed to download parts in seed of DB: {0}")]
    Download(#[from] UpstreamError),

    #[error("reading parts dump: {0}")]
    Parse(#[from] ParseError),

    #[error("persisting catalog: {0}")]
    Store(#[from] StoreError),

    #[error("could not serialize part '{name}': {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("dump file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("writing config file: {0}")]
    Serialize(#[from] toml::ser::Error),
}
