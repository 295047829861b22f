//! Configuration for bricklayer

use crate::error::ConfigError;
use crate::upstream::{DEFAULT_DUMP_URL, DEFAULT_PART_API_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default data directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bricklayer")
}

/// Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the parts database
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Registry bulk dump URL
    #[serde(default = "default_dump_url")]
    pub dump_url: String,

    /// Registry per-part lookup URL, `{name}` is substituted
    #[serde(default = "default_part_api_url")]
    pub part_api_url: String,

    /// Local copy of the bulk dump, reused across seeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_file: Option<PathBuf>,

    /// Timeout for registry requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Database page cache size in bytes
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity_bytes: u64,

    /// Write-back worker tasks
    #[serde(default = "default_writeback_workers")]
    pub writeback_workers: usize,

    /// Write-back queue depth
    #[serde(default = "default_writeback_queue")]
    pub writeback_queue: usize,
}

fn default_http_port() -> u16 {
    3000
}

fn default_dump_url() -> String {
    DEFAULT_DUMP_URL.to_string()
}

fn default_part_api_url() -> String {
    DEFAULT_PART_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_cache_capacity() -> u64 {
    64 * 1024 * 1024
}

fn default_writeback_workers() -> usize {
    2
}

fn default_writeback_queue() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            dump_url: default_dump_url(),
            part_api_url: default_part_api_url(),
            dump_file: None,
            request_timeout_secs: default_request_timeout(),
            cache_capacity_bytes: default_cache_capacity(),
            writeback_workers: default_writeback_workers(),
            writeback_queue: default_writeback_queue(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parts database path
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join("parts.sled")
    }

    /// Config file path inside the storage directory
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}
