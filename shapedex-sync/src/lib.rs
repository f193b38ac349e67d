//! Profile synchronization for shapedex.
//!
//! Reconciles local and remote profile sources against the profile
//! dataset: hash-based change detection, uploads and deletions, a full
//! registry reparse, and a cascading metadata rebuild plus reindex of
//! every resource conforming to a changed or deleted profile.

pub mod error;
pub mod source;
pub mod synchronizer;

pub use error::{Result, SyncError};
pub use source::{LocalProfileSource, ProfileCandidate, ProfileSource, RemoteProfileSource};
pub use synchronizer::{normalize_boolean_tokens, Synchronizer};
