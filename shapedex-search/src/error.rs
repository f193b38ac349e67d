//! Error types for shapedex-search

use thiserror::Error;

/// Result type alias using SearchError
pub type Result<T> = std::result::Result<T, SearchError>;

/// Search engine and projection errors
#[derive(Error, Debug)]
pub enum SearchError {
    /// Non-2xx from the search engine
    #[error("{context} failed with status {status} for {url}: {body}")]
    Upstream {
        context: String,
        url: String,
        status: u16,
        body: String,
    },

    /// The engine answered 2xx but reported an error payload
    #[error("search engine error: {0}")]
    Engine(String),

    /// Network-level failure
    #[error("search engine request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Engine never became reachable during startup
    #[error("search engine not ready after {attempts} attempts")]
    NotReady { attempts: u32 },

    /// A conforming shape has no registered profile
    #[error("profile not found: {0}")]
    MissingProfile(String),

    /// Loading or parsing a resource during reindex failed
    #[error(transparent)]
    Catalog(#[from] shapedex_catalog::CatalogError),
}
