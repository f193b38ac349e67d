//! Disk-cached URL fetching.
//!
//! Cache entries are idempotent by URL, so plain files keyed by the
//! percent-encoded URL are sufficient; concurrent writers of the same entry
//! write the same bytes.

use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

/// Outbound fetch seam (mockable in tests).
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    /// GET a URL with the given Accept header, returning the body bytes.
    async fn fetch(&self, url: &str, accept: &str) -> Result<Vec<u8>>;
}

/// Fetcher with a write-through on-disk cache.
pub struct CachedFetcher {
    cache_dir: PathBuf,
    http: reqwest::Client,
}

impl CachedFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            http: reqwest::Client::new(),
        }
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(urlencoding::encode(url).as_ref())
    }
}

#[async_trait]
impl UrlFetcher for CachedFetcher {
    async fn fetch(&self, url: &str, accept: &str) -> Result<Vec<u8>> {
        let path = self.cache_path(url);
        if let Ok(data) = tokio::fs::read(&path).await {
            return Ok(data);
        }

        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Fetch {
                url: url.to_string(),
                status,
                body: body.trim().to_string(),
            });
        }

        // responses with missing or non-matching content types (e.g. HTML
        // error pages served with 200) cache as empty entries
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_string())
            .unwrap_or_default();
        let data = if !content_type.is_empty() && accept.contains(&content_type) {
            resp.bytes().await?.to_vec()
        } else {
            Vec::new()
        };

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        if let Err(err) = tokio::fs::write(&path, &data).await {
            warn!(url, error = %err, "failed caching response");
        }
        Ok(data)
    }
}
