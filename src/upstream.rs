//! iGEM registry client
//!
//! Two endpoints are consumed:
//! - the bulk FASTA dump of every part (seeding)
//! - the per-part XML lookup (extended records, on cache miss)

use crate::bricks::{parse_rsbpml, ExtendedBiobrick};
use crate::error::UpstreamError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info};

/// Bulk dump of every part in FASTA-like form
pub const DEFAULT_DUMP_URL: &str = "http://parts.igem.org/fasta/parts/All_Parts";

/// Per-part XML lookup; `{name}` is replaced by the url-encoded part name
pub const DEFAULT_PART_API_URL: &str = "http://parts.igem.org/cgi/xml/part.cgi?part={name}";

/// Remote source of truth for parts
#[async_trait]
pub trait PartsUpstream: Send + Sync {
    /// Download the complete parts dump
    async fn download_dump(&self) -> Result<Bytes, UpstreamError>;

    /// Look up the extended records matching `name` (zero or more)
    async fn query_extended(&self, name: &str) -> Result<Vec<ExtendedBiobrick>, UpstreamError>;
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct IgemClientConfig {
    pub dump_url: String,
    pub part_api_url: String,
    pub request_timeout: Duration,
}

impl Default for IgemClientConfig {
    fn default() -> Self {
        Self {
            dump_url: DEFAULT_DUMP_URL.to_string(),
            part_api_url: DEFAULT_PART_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the iGEM registry
pub struct IgemClient {
    config: IgemClientConfig,
    http_client: reqwest::Client,
}

impl IgemClient {
    pub fn new(config: IgemClientConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("bricklayer/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    /// Lookup URL for one part
    pub fn part_url(&self, name: &str) -> String {
        self.config
            .part_api_url
            .replace("{name}", &urlencoding::encode(name))
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, UpstreamError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|source| UpstreamError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|source| UpstreamError::Request {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PartsUpstream for IgemClient {
    async fn download_dump(&self) -> Result<Bytes, UpstreamError> {
        info!(url = %self.config.dump_url, "Downloading parts dump");
        let body = self.fetch(&self.config.dump_url).await?;
        info!(bytes = body.len(), "Parts dump downloaded");
        Ok(body)
    }

    async fn query_extended(&self, name: &str) -> Result<Vec<ExtendedBiobrick>, UpstreamError> {
        let url = self.part_url(name);
        debug!(part = %name, url = %url, "Querying registry for extended part");

        let body = self.fetch(&url).await?;
        let text = String::from_utf8_lossy(&body);
        Ok(parse_rsbpml(&text)?)
    }
}
