//! SHACL profiles for shapedex.
//!
//! Profiles are SHACL node shapes stored as named graphs. This crate owns
//! their object model, the parse/merge/denormalize pipeline, blank-node
//! canonicalization with content hashing, the process-wide registry
//! snapshot, and the client for the remote validator service.

pub mod canonicalize;
pub mod error;
pub mod model;
pub mod parse;
pub mod registry;
pub mod validator;

pub use canonicalize::{content_hash, replace_blank_nodes, BLANK_NODE_PREFIX};
pub use error::{Result, ShaclError};
pub use model::{NodeShape, Property};
pub use parse::{parse_list, parse_node_shape, parse_property};
pub use registry::{ProfileRegistry, ProfileStore, SharedProfiles};
pub use validator::{Conformance, HttpValidator, ShaclValidator};
