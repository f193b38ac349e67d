//! Error types for shapedex-catalog

use thiserror::Error;

/// Result type alias using CatalogError
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Resource lifecycle errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Malformed input: unparseable Turtle, invalid IRI, empty payload
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The resource graph references no registered profile
    #[error("resource graph has no dcterms:conformsTo or rdf:type relation to a known profile")]
    NoProfile,

    /// The resource graph references more than one registered profile
    #[error("resource graph has multiple dcterms:conformsTo or rdf:type relations to known profiles")]
    AmbiguousProfile,

    /// Declared resource ID does not match the discovered root subject
    #[error("id mismatch. given: {given}, found: {found}")]
    IdMismatch { given: String, found: String },

    /// The root subject does not conform to its declared profile
    #[error("resource does not conform to expected shape {expected}")]
    ShapeMismatch { expected: String },

    /// Requester is not the recorded creator
    #[error("creator mismatch")]
    CreatorMismatch,

    /// Delete denied: another graph still references a subject of this one
    #[error("resource is linked by other resources")]
    ResourceLinked,

    /// Fetching an external URL failed
    #[error("failed retrieving {url} - status: {status}, response: '{body}'")]
    Fetch {
        url: String,
        status: u16,
        body: String,
    },

    /// Network-level failure on an external fetch
    #[error("fetch failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Disk cache I/O failure
    #[error("cache i/o failed: {0}")]
    CacheIo(#[from] std::io::Error),

    /// Triple store interaction failed
    #[error(transparent)]
    Store(#[from] shapedex_sparql::SparqlError),

    /// Profile registry or validator failure
    #[error(transparent)]
    Shacl(#[from] shapedex_shacl::ShaclError),
}

impl From<shapedex_graph_turtle::TurtleError> for CatalogError {
    fn from(err: shapedex_graph_turtle::TurtleError) -> Self {
        CatalogError::BadRequest(err.to_string())
    }
}
