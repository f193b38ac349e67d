//! Fetch-diff-apply reconciliation of profiles, with cascading reindex.
//!
//! `synchronize()` is idempotent and serialized by a process-wide
//! try-lock; a second call while one runs returns immediately with a
//! warning. Background work never aborts the loop on per-item failures.

use crate::error::Result;
use crate::source::{ProfileCandidate, ProfileSource};
use once_cell::sync::Lazy;
use regex::Regex;
use shapedex_catalog::{LabelStore, ResourceStore};
use shapedex_graph_ir::{Graph, Term};
use shapedex_search::Indexer;
use shapedex_shacl::{content_hash, ProfileStore};
use shapedex_vocab::owl;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Normalizes `true]` / `false]` into `true ; ]` to sidestep a boolean
/// list-termination parser quirk in upstream profile payloads.
static FIX_BOOLEANS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(true|false)\s*]").expect("boolean fix regex"));

pub fn normalize_boolean_tokens(turtle: &str) -> String {
    FIX_BOOLEANS.replace_all(turtle, "$1 ; ]").to_string()
}

/// What one reconciliation pass applied.
struct SyncOutcome {
    /// Count of uploads and deletions issued (new + changed + deleted).
    applied: usize,
    /// Profiles whose conforming resources need rebuilding.
    changed_or_deleted: Vec<String>,
}

/// Profile synchronization driver.
pub struct Synchronizer {
    sources: Vec<Arc<dyn ProfileSource>>,
    profile_store: Arc<ProfileStore>,
    resources: Arc<ResourceStore>,
    labels: Arc<LabelStore>,
    indexer: Arc<Indexer>,
    lock: tokio::sync::Mutex<()>,
}

impl Synchronizer {
    pub fn new(
        sources: Vec<Arc<dyn ProfileSource>>,
        profile_store: Arc<ProfileStore>,
        resources: Arc<ResourceStore>,
        labels: Arc<LabelStore>,
        indexer: Arc<Indexer>,
    ) -> Self {
        Self {
            sources,
            profile_store,
            resources,
            labels,
            indexer,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one reconciliation pass. Concurrent invocations are skipped.
    pub async fn synchronize(&self) {
        let Ok(_guard) = self.lock.try_lock() else {
            warn!("skipping profile synchronization: already running");
            return;
        };

        let outcome = match self.synchronize_profiles().await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "failed syncing profiles");
                return;
            }
        };
        if outcome.applied == 0 {
            return;
        }

        // reparse the whole registry so every denormalization sees a
        // consistent snapshot of the changes
        let registry = match self.profile_store.parse_all().await {
            Ok(registry) => registry,
            Err(err) => {
                error!(error = %err, "failed parsing profiles");
                return;
            }
        };

        for profile_id in &outcome.changed_or_deleted {
            let resource_ids = match self.resources.conforming_resources(profile_id).await {
                Ok(ids) => ids,
                Err(err) => {
                    error!(id = %profile_id, error = %err, "failed getting conforming resources for changed profile");
                    continue;
                }
            };
            for resource_id in resource_ids {
                debug!(id = %resource_id, "updating metadata and search index for resource");
                if let Err(err) = self.rebuild_resource(&resource_id, &registry).await {
                    error!(id = %resource_id, error = %err, "failed updating resource after profile change");
                }
            }
        }
    }

    /// Reload one resource, rebuild its metadata with the original
    /// modification time, and reindex it.
    async fn rebuild_resource(
        &self,
        id: &str,
        registry: &shapedex_shacl::ProfileRegistry,
    ) -> Result<()> {
        let (turtle, previous) = self.resources.get(id, false).await?;
        let (metadata, graph) = self
            .resources
            .metadata()
            .build_and_store(
                Some(id),
                &turtle,
                &previous.creator,
                Some(previous.last_modified),
            )
            .await?;
        self.indexer
            .index_resource(&graph, &metadata, registry)
            .await?;
        Ok(())
    }

    /// Fetch candidates, classify against stored hashes, apply uploads and
    /// deletions, and walk `owl:imports` of anything new or changed.
    async fn synchronize_profiles(&self) -> Result<SyncOutcome> {
        info!("syncing profiles...");
        let start = Instant::now();

        let mut candidates: Vec<ProfileCandidate> = Vec::new();
        for source in &self.sources {
            candidates.extend(source.candidates().await?);
        }

        let mut candidate_ids: BTreeSet<String> = BTreeSet::new();
        let mut new_profiles: Vec<(String, Graph)> = Vec::new();
        let mut changed_profiles: Vec<(String, Graph)> = Vec::new();
        let mut deleted_profiles: Vec<String> = Vec::new();

        for candidate in &candidates {
            candidate_ids.insert(candidate.base_url.clone());

            let normalized = normalize_boolean_tokens(&candidate.definition);
            let input_hash = content_hash(normalized.as_bytes());
            let existing_hash = match self.profile_store.get_profile_hash(&candidate.base_url).await
            {
                Ok(hash) => hash,
                Err(err) => {
                    warn!(id = %candidate.base_url, error = %err, "failed retrieving hash for profile");
                    continue;
                }
            };
            match existing_hash {
                None => {
                    let graph = self
                        .profile_store
                        .update_profile(&candidate.base_url, normalized.as_bytes())
                        .await?;
                    new_profiles.push((candidate.base_url.clone(), graph));
                }
                Some(existing) if existing != input_hash => {
                    let graph = self
                        .profile_store
                        .update_profile(&candidate.base_url, normalized.as_bytes())
                        .await?;
                    changed_profiles.push((candidate.base_url.clone(), graph));
                }
                Some(_) => {}
            }
        }

        // stored profiles absent from every source are gone
        match self.profile_store.profile_ids().await {
            Ok(existing_ids) => {
                for existing_id in existing_ids {
                    if candidate_ids.contains(&existing_id) {
                        continue;
                    }
                    info!(id = %existing_id, "deleting existing profile");
                    match self.profile_store.delete_profile(&existing_id).await {
                        Ok(()) => deleted_profiles.push(existing_id),
                        Err(err) => {
                            error!(id = %existing_id, error = %err, "failed deleting existing profile")
                        }
                    }
                }
            }
            Err(err) => error!(error = %err, "failed loading profile IDs"),
        }

        for (_, graph) in new_profiles.iter().chain(changed_profiles.iter()) {
            self.import_owl_imports(graph, &candidate_ids).await;
        }

        info!(
            profiles = candidates.len(),
            new = new_profiles.len(),
            changed = changed_profiles.len(),
            deleted = deleted_profiles.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "syncing profiles finished"
        );

        let applied = new_profiles.len() + changed_profiles.len() + deleted_profiles.len();
        let mut changed_or_deleted: Vec<String> =
            changed_profiles.into_iter().map(|(id, _)| id).collect();
        changed_or_deleted.extend(deleted_profiles);
        Ok(SyncOutcome {
            applied,
            changed_or_deleted,
        })
    }

    /// Follow `owl:imports` of a profile graph, importing labels for every
    /// target that is neither a profile nor already imported. The label
    /// graph presence acts as the cross-run visited set; `seen` breaks
    /// cycles within this walk even when a target yields no labels.
    async fn import_owl_imports(&self, graph: &Graph, profile_ids: &BTreeSet<String>) {
        let imports = Term::iri(owl::IMPORTS);
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut queue: Vec<Graph> = vec![graph.clone()];

        while let Some(current) = queue.pop() {
            for triple in current.matching(None, Some(&imports), None) {
                let url = triple.o.raw().to_string();
                if profile_ids.contains(&url) || !seen.insert(url.clone()) {
                    continue;
                }
                match self.labels.labels_exist(&url).await {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(err) => {
                        debug!(url, error = %err, "failed checking for imported labels");
                        continue;
                    }
                }
                debug!(url, "loading owl:imports");
                match self.labels.import_labels_from_url(&url).await {
                    Ok(imported) => queue.push(imported),
                    Err(err) => debug!(url, error = %err, "failed loading owl:imports"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_tokens_before_brackets_are_normalized() {
        assert_eq!(
            normalize_boolean_tokens("[ dash:facet true]"),
            "[ dash:facet true ; ]"
        );
        assert_eq!(
            normalize_boolean_tokens("[ dash:facet false   ]"),
            "[ dash:facet false ; ]"
        );
        assert_eq!(
            normalize_boolean_tokens("sh:hasValue true ."),
            "sh:hasValue true ."
        );
    }
}
