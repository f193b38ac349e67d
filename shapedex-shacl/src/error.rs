//! Error types for shapedex-shacl

use thiserror::Error;

/// Result type alias using ShaclError
pub type Result<T> = std::result::Result<T, ShaclError>;

/// Profile parsing and validation errors
#[derive(Error, Debug)]
pub enum ShaclError {
    /// Profile Turtle could not be parsed
    #[error(transparent)]
    Turtle(#[from] shapedex_graph_turtle::TurtleError),

    /// Triple store interaction failed
    #[error(transparent)]
    Store(#[from] shapedex_sparql::SparqlError),

    /// A shape definition violates the constraints this parser relies on
    #[error("invalid shape definition: {0}")]
    InvalidShape(String),

    /// Non-2xx from the validator service
    #[error("validation of {data_id} failed with status {status} for {url}: {body}")]
    Validator {
        data_id: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Network-level failure talking to the validator
    #[error("validator request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
