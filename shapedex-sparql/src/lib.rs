//! Triple-store client for shapedex.
//!
//! Named-graph CRUD over SPARQL 1.1 Query/Update plus the Graph Store
//! Protocol, with dataset bootstrap against a Fuseki-style management API.
//! All IRIs are validated before interpolation into query strings.

pub mod client;
pub mod error;
pub mod iri;
pub mod results;

pub use client::{Datasets, FusekiClient, GraphHook, StoreConfig, TripleStore};
pub use error::{Result, SparqlError};
pub use iri::{is_valid_iri, validate_iri};
pub use results::{results_to_nquads, BoundTerm, SelectResults};
