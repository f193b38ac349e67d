//! Search projection for shapedex.
//!
//! Talks to a Solr-style nested-document engine (block-join documents,
//! delete-by-root, schema API) and projects validated resources plus their
//! conformance maps into container/main/sub document trees with
//! deterministic field names.

pub mod error;
pub mod fields;
pub mod indexer;
pub mod solr;

pub use error::{Result, SearchError};
pub use fields::{field_name, field_suffix, fixup_datetime};
pub use indexer::{Document, Indexer};
pub use solr::{init, SearchConfig, SearchIndex, SolrClient};
