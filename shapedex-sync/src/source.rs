//! Profile candidate sources: the remote metadata profile service and the
//! local profiles directory.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, warn};

/// One profile offered by a source: its IRI and its Turtle definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileCandidate {
    pub base_url: String,
    pub definition: String,
}

/// A source of profile candidates for the sync loop.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn candidates(&self) -> Result<Vec<ProfileCandidate>>;
}

/// Remote profile service: a GET returning a JSON array of candidates.
pub struct RemoteProfileSource {
    url: String,
    http: reqwest::Client,
}

impl RemoteProfileSource {
    /// `url` is the fully assembled query URL (endpoint, query, language,
    /// community, includeDefinition).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("default reqwest client"),
        }
    }
}

#[async_trait]
impl ProfileSource for RemoteProfileSource {
    async fn candidates(&self) -> Result<Vec<ProfileCandidate>> {
        debug!(endpoint = %self.url, "loading remote profiles");
        let resp = self.http.get(&self.url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                url: self.url.clone(),
                status,
                body: body.trim().to_string(),
            });
        }
        Ok(resp.json().await?)
    }
}

static FIND_BASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@base <(.*)>").expect("base regex"));

/// Local `*.ttl` files; the profile IRI comes from each file's `@base`.
pub struct LocalProfileSource {
    dir: PathBuf,
}

impl LocalProfileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ProfileSource for LocalProfileSource {
    async fn candidates(&self) -> Result<Vec<ProfileCandidate>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) => {
                error!(dir = %self.dir.display(), error = %err, "couldn't read local profiles");
                return Ok(Vec::new());
            }
        };

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("ttl") {
                continue;
            }
            debug!(file = %path.display(), "loading local profile");
            let turtle = match tokio::fs::read_to_string(&path).await {
                Ok(turtle) => turtle,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "failed reading local profile");
                    continue;
                }
            };
            let base = FIND_BASE
                .captures(&turtle)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            match base {
                Some(base) if !base.is_empty() => candidates.push(ProfileCandidate {
                    base_url: base,
                    definition: turtle,
                }),
                _ => warn!(file = %path.display(), "rejecting local profile because it has no @base definition"),
            }
        }
        candidates.sort_by(|a, b| a.base_url.cmp(&b.base_url));
        Ok(candidates)
    }
}
