//! Error types for shapedex-sync

use thiserror::Error;

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

/// Profile synchronization errors
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote profile endpoint answered non-2xx
    #[error("failed loading remote profiles from {url} - status: {status}, response: '{body}'")]
    Remote {
        url: String,
        status: u16,
        body: String,
    },

    /// Network-level failure reaching the remote profile endpoint
    #[error("remote profile request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local profile directory I/O failure
    #[error("local profile read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Triple store interaction failed
    #[error(transparent)]
    Store(#[from] shapedex_sparql::SparqlError),

    /// Profile parsing or persistence failed
    #[error(transparent)]
    Shacl(#[from] shapedex_shacl::ShaclError),

    /// Resource reload or metadata rebuild failed
    #[error(transparent)]
    Catalog(#[from] shapedex_catalog::CatalogError),

    /// Reindexing failed
    #[error(transparent)]
    Search(#[from] shapedex_search::SearchError),
}
