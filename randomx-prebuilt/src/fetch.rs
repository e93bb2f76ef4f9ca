//! Retrieval of release archive bytes.
//!
//! Archives are small enough to buffer whole, so fetchers return the complete
//! body and extraction works from memory. No retries are attempted; the first
//! failure aborts the entry.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{StageError, StageResult};

/// Source of archive bytes.
pub trait ArchiveFetcher {
    /// Fetch the full content at `url`.
    fn fetch(&self, url: &str) -> StageResult<Vec<u8>>;
}

impl<F: ArchiveFetcher + ?Sized> ArchiveFetcher for &F {
    fn fetch(&self, url: &str) -> StageResult<Vec<u8>> {
        (**self).fetch(url)
    }
}

impl<F: ArchiveFetcher + ?Sized> ArchiveFetcher for Box<F> {
    fn fetch(&self, url: &str) -> StageResult<Vec<u8>> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP(S) fetcher.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    pub(crate) timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Create a fetcher without a request timeout.
    pub fn new() -> StageResult<Self> {
        Self::build(None)
    }

    /// Create a fetcher that aborts requests taking longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> StageResult<Self> {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> StageResult<Self> {
        // reqwest's blocking client defaults to 30s; None disables it.
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("randomx-prebuilt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StageError::HttpClient(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> StageResult<Vec<u8>> {
        let mut response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                StageError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.map(|t| t.as_secs()).unwrap_or(0),
                }
            } else {
                StageError::Network {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::Network {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        let mut body = Vec::new();
        response
            .read_to_end(&mut body)
            .map_err(|e| StageError::Network {
                url: url.to_string(),
                reason: format!("Read error: {}", e),
            })?;

        Ok(body)
    }
}

/// Fetcher for `file://` URLs and plain filesystem paths.
///
/// Stages from a local mirror of the release assets without network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFetcher;

impl LocalFetcher {
    pub fn new() -> Self {
        Self
    }

    fn resolve(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

impl ArchiveFetcher for LocalFetcher {
    fn fetch(&self, url: &str) -> StageResult<Vec<u8>> {
        let path = Self::resolve(url);
        fs::read(&path).map_err(|e| StageError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
