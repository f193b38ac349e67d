//! Resource catalog for shapedex.
//!
//! Ties the triple store, the profile registry, and the remote validator
//! together into the resource lifecycle: create/read/update/delete of RDF
//! resources as named graphs, metadata derivation with shape conformance,
//! link resolution across the configured namespace, and label extraction.

pub mod error;
pub mod fetch;
pub mod labels;
pub mod links;
pub mod metadata;
pub mod resource;
pub mod test_support;

pub use error::{CatalogError, Result};
pub use fetch::{CachedFetcher, UrlFetcher};
pub use labels::{
    clean_token, find_labels, is_label_predicate, LabelHook, LabelStore, LABEL_PREDICATES,
};
pub use links::{linked_component_query, LinkResolver, ResolvedLinks};
pub use metadata::{find_resource_profile, MetadataStore, ResourceMetadata};
pub use resource::ResourceStore;
