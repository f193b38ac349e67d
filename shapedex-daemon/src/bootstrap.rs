//! Component wiring and startup bootstrap.
//!
//! Build order matters only in one place: the label hook needs the label
//! store, which needs the triple-store client, so the hook is installed on
//! the client after construction.

use crate::config::Args;
use shapedex_catalog::{
    CachedFetcher, LabelHook, LabelStore, LinkResolver, MetadataStore, ResourceStore,
};
use shapedex_search::{Indexer, SolrClient};
use shapedex_shacl::{HttpValidator, ProfileStore, SharedProfiles};
use shapedex_sparql::{FusekiClient, TripleStore};
use shapedex_sync::{LocalProfileSource, ProfileSource, RemoteProfileSource, Synchronizer};
use shapedex_vocab::geo;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Startup failures that abort the daemon.
#[derive(Error, Debug)]
pub enum BootError {
    #[error(transparent)]
    Store(#[from] shapedex_sparql::SparqlError),

    #[error(transparent)]
    Shacl(#[from] shapedex_shacl::ShaclError),

    #[error(transparent)]
    Catalog(#[from] shapedex_catalog::CatalogError),

    #[error(transparent)]
    Search(#[from] shapedex_search::SearchError),

    #[error("reading local data graphs failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid cron expression: {0}")]
    Cron(#[from] cron::error::Error),
}

/// The wired application.
pub struct App {
    pub store: Arc<FusekiClient>,
    pub search: Arc<SolrClient>,
    pub profile_store: Arc<ProfileStore>,
    pub labels: Arc<LabelStore>,
    pub synchronizer: Arc<Synchronizer>,
}

/// Construct every component and wire the seams.
pub fn build(args: &Args) -> App {
    let datasets = args.datasets();
    let store = Arc::new(FusekiClient::new(args.store_config()));
    let store_dyn: Arc<dyn TripleStore> = store.clone();

    let fetcher = Arc::new(CachedFetcher::new(args.cache_dir()));
    let labels = Arc::new(LabelStore::new(
        store_dyn.clone(),
        datasets.clone(),
        fetcher,
    ));
    store.set_graph_hook(Arc::new(LabelHook::new(
        labels.clone(),
        datasets.profile.clone(),
    )));

    let profile_store = Arc::new(ProfileStore::new(
        store_dyn.clone(),
        datasets.profile.clone(),
        SharedProfiles::new(),
    ));
    let validator = Arc::new(HttpValidator::new(&args.validator_endpoint));
    let metadata = Arc::new(MetadataStore::new(
        store_dyn.clone(),
        datasets.clone(),
        validator,
        profile_store.clone(),
        LinkResolver::new(
            store_dyn.clone(),
            datasets.resource.clone(),
            args.rdf_namespace.clone(),
        ),
    ));
    let resources = Arc::new(ResourceStore::new(
        store_dyn.clone(),
        datasets.clone(),
        metadata,
        Arc::new(LinkResolver::new(
            store_dyn.clone(),
            datasets.resource.clone(),
            args.rdf_namespace.clone(),
        )),
    ));

    let search = Arc::new(SolrClient::new(args.search_config()));
    let indexer = Arc::new(Indexer::new(search.clone(), geo::WKT_LITERAL));

    let mut sources: Vec<Arc<dyn ProfileSource>> = Vec::new();
    if args.mps_enabled {
        sources.push(Arc::new(RemoteProfileSource::new(args.mps_url())));
    }
    if args.local_profiles_enabled {
        sources.push(Arc::new(LocalProfileSource::new(args.profiles_dir())));
    }
    let synchronizer = Arc::new(Synchronizer::new(
        sources,
        profile_store.clone(),
        resources,
        labels.clone(),
        indexer,
    ));

    App {
        store,
        search,
        profile_store,
        labels,
        synchronizer,
    }
}

/// Startup sequence: datasets, local bootstrap graphs, standard
/// taxonomies, search collection, profile registry, initial sync.
pub async fn bootstrap(app: &App, args: &Args) -> Result<(), BootError> {
    for dataset in app.store.datasets().all() {
        app.store.ensure_dataset(dataset).await?;
    }

    if let Err(err) = import_local_datagraphs(app, args).await {
        // bootstrap data is a convenience, not a requirement
        warn!(error = %err, "failed importing local resources");
    }

    app.labels
        .import_standard_taxonomies(&args.standard_taxonomies())
        .await;

    shapedex_search::init(app.search.as_ref(), false).await?;

    let registry = app.profile_store.parse_all().await?;
    if args.cron.is_empty() || registry.is_empty() {
        // no schedule (or an empty registry) means sync right away
        app.synchronizer.synchronize().await;
    }
    Ok(())
}

/// Upload `local/datagraph/*.ttl` into the resource dataset. Each file
/// must name its graph via `@base`; files without one are skipped.
async fn import_local_datagraphs(app: &App, args: &Args) -> Result<(), BootError> {
    let dir = args.datagraph_dir();
    let resource_dataset = app.store.datasets().resource.clone();
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("ttl") {
            continue;
        }
        info!(file = %path.display(), "importing resource graph");
        let turtle = tokio::fs::read_to_string(&path).await?;
        let Some(id) = extract_base(&turtle) else {
            warn!(file = %path.display(), "skipping data graph without @base definition");
            continue;
        };
        app.store.upload_graph(&resource_dataset, &id, &turtle).await?;
    }
    Ok(())
}

fn extract_base(turtle: &str) -> Option<String> {
    let start = turtle.find("@base <")? + "@base <".len();
    let end = turtle[start..].find('>')? + start;
    let base = &turtle[start..end];
    (!base.is_empty()).then(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn build_wires_all_components() {
        let args = Args::parse_from(["shapedex"]);
        let app = build(&args);
        assert_eq!(app.store.datasets().profile, "profile");
        // synchronizer handle is live and shared
        assert_eq!(Arc::strong_count(&app.synchronizer), 1);
    }

    #[test]
    fn base_extraction() {
        assert_eq!(
            extract_base("@base <http://ex/g1> .\n<a> <b> <c> ."),
            Some("http://ex/g1".to_string())
        );
        assert_eq!(extract_base("<a> <b> <c> ."), None);
    }
}
