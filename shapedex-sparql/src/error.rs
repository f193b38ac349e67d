//! Error types for shapedex-sparql

use thiserror::Error;

/// Result type alias using SparqlError
pub type Result<T> = std::result::Result<T, SparqlError>;

/// Triple-store client errors
#[derive(Error, Debug)]
pub enum SparqlError {
    /// Value failed scheme:opaque IRI validation before query interpolation
    #[error("invalid IRI: '{0}'")]
    InvalidIri(String),

    /// Named graph absent
    #[error("graph {graph} not found in dataset {dataset}")]
    NotFound { dataset: String, graph: String },

    /// createGraph target already exists
    #[error("graph {graph} already exists in dataset {dataset}")]
    Conflict { dataset: String, graph: String },

    /// Non-2xx from the triple store, with the failing URL and response body
    #[error("{context} failed with status {status} for {url}: {body}")]
    Upstream {
        context: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Network-level failure; caller retries at its discretion
    #[error("triple store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response did not match the SPARQL JSON results contract
    #[error("unexpected triple store response: {0}")]
    InvalidResults(String),
}

impl SparqlError {
    /// Build an Upstream error from a response, consuming its body.
    pub async fn from_response(context: &str, url: &str, resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        SparqlError::Upstream {
            context: context.to_string(),
            url: url.to_string(),
            status,
            body: body.trim().to_string(),
        }
    }
}
