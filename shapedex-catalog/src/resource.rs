//! Resource store: named-graph CRUD with authorization and link protection.
//!
//! Writes for one resource are serialized by an IRI-keyed mutex so a
//! validate/upload/metadata sequence cannot interleave with a delete of the
//! same resource. There is no cross-dataset transaction; failed resource
//! uploads compensate by deleting the metadata graph written just before.

use crate::error::{CatalogError, Result};
use crate::links::LinkResolver;
use crate::metadata::{MetadataStore, ResourceMetadata};
use shapedex_graph_ir::Graph;
use shapedex_sparql::{is_valid_iri, results_to_nquads, validate_iri, Datasets, TripleStore};
use shapedex_vocab::dcterms;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// CRUD over stored RDF resources.
pub struct ResourceStore {
    store: Arc<dyn TripleStore>,
    datasets: Datasets,
    metadata: Arc<MetadataStore>,
    links: Arc<LinkResolver>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResourceStore {
    pub fn new(
        store: Arc<dyn TripleStore>,
        datasets: Datasets,
        metadata: Arc<MetadataStore>,
        links: Arc<LinkResolver>,
    ) -> Self {
        Self {
            store,
            datasets,
            metadata,
            links,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Handle to the metadata store (used by reindexing paths).
    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }

    /// Load a resource and its metadata. With `include_linked`, linked
    /// graphs are appended to the Turtle as N-Quads.
    pub async fn get(&self, id: &str, include_linked: bool) -> Result<(String, ResourceMetadata)> {
        let mut resource = self.store.load_graph(&self.datasets.resource, id).await?;
        let metadata = self.metadata.load(id).await?;
        if include_linked {
            let graph = shapedex_graph_turtle::parse(&resource)?;
            let resolved = self.links.resolve(&graph).await?;
            if !resolved.nquads.is_empty() {
                resource.push('\n');
                resource.push_str(&resolved.nquads);
            }
        }
        Ok((resource, metadata))
    }

    /// Validate and store a new resource. Fails with `Conflict` when a
    /// graph with the discovered root IRI already exists.
    pub async fn create(&self, resource: &str, creator: &str) -> Result<(Graph, ResourceMetadata)> {
        let (metadata, graph) = self
            .metadata
            .build_and_store(None, resource, creator, None)
            .await?;

        let lock = self.lock_for(&metadata.id);
        let _guard = lock.lock().await;
        if let Err(err) = self
            .store
            .create_graph(&self.datasets.resource, &metadata.id, resource)
            .await
        {
            // roll back the metadata graph written a moment ago
            if let Err(rollback) = self.metadata.delete(&metadata.id).await {
                error!(id = %metadata.id, error = %rollback, "failed rolling back resource metadata");
            }
            return Err(err.into());
        }
        Ok((graph, metadata))
    }

    /// Validate and replace an existing resource.
    pub async fn update(
        &self,
        id: &str,
        resource: &str,
        creator: &str,
    ) -> Result<(Graph, ResourceMetadata)> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        self.validate_creator(id, creator).await?;
        let (metadata, graph) = self
            .metadata
            .build_and_store(Some(id), resource, creator, None)
            .await?;
        if let Err(err) = self
            .store
            .upload_graph(&self.datasets.resource, id, resource)
            .await
        {
            if let Err(rollback) = self.metadata.delete(id).await {
                error!(id, error = %rollback, "failed rolling back resource metadata");
            }
            return Err(err.into());
        }
        Ok((graph, metadata))
    }

    /// Delete a resource unless any other graph still references one of
    /// its subjects.
    pub async fn delete(&self, id: &str, creator: &str) -> Result<()> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        self.validate_creator(id, creator).await?;

        let mut subjects = self.graph_subjects(id).await?;
        if is_valid_iri(id) && !subjects.iter().any(|s| s.as_str() == id) {
            subjects.push(id.to_string());
        }
        for subject in &subjects {
            if self.has_incoming_links(subject, id).await? {
                return Err(CatalogError::ResourceLinked);
            }
        }

        self.store.delete_graph(&self.datasets.resource, id).await?;
        self.metadata.delete(id).await?;
        Ok(())
    }

    /// All stored resource IRIs.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_graph_names(&self.datasets.resource)
            .await?)
    }

    /// Resources whose metadata graph records conformance to a shape.
    pub async fn conforming_resources(&self, shape: &str) -> Result<Vec<String>> {
        validate_iri(shape)?;
        let results = self
            .store
            .select(
                &self.datasets.resource_meta,
                &format!(
                    "SELECT DISTINCT ?g WHERE {{ GRAPH ?g {{ ?s <{}> <{}> }} }}",
                    dcterms::CONFORMS_TO,
                    shape
                ),
            )
            .await?;
        Ok(results.column("g")?)
    }

    /// Connected-component N-Quads of every instance of the given classes.
    pub async fn class_instances(&self, classes: &[String]) -> Result<String> {
        let mut values = String::new();
        for class in classes {
            validate_iri(class)?;
            write!(values, "<{}> ", class).expect("write to string");
        }
        let results = self
            .store
            .select(
                &self.datasets.resource,
                &format!(
                    "SELECT DISTINCT ?s ?p ?o ?g WHERE {{ GRAPH ?g {{ VALUES ?class {{ {} }} ?instance a ?class . ?instance (<>|!<>)* ?s . ?s ?p ?o }} }}",
                    values.trim_end()
                ),
            )
            .await?;
        Ok(results_to_nquads(&results)?)
    }

    /// Creator check: empty requester passes, otherwise the stored creator
    /// must match.
    async fn validate_creator(&self, id: &str, user: &str) -> Result<()> {
        if user.is_empty() {
            return Ok(());
        }
        let metadata = self.metadata.load(id).await?;
        if metadata.creator == user {
            return Ok(());
        }
        warn!(creator = %metadata.creator, user, "resource creator mismatch");
        Err(CatalogError::CreatorMismatch)
    }

    /// Distinct IRI subjects of a resource graph.
    async fn graph_subjects(&self, id: &str) -> Result<Vec<String>> {
        validate_iri(id)?;
        let results = self
            .store
            .select(
                &self.datasets.resource,
                &format!("SELECT DISTINCT ?s WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }}", id),
            )
            .await?;
        let mut subjects = Vec::new();
        for row in &results.results.bindings {
            let Some(s) = row.get("s") else { continue };
            if s.term_type == "uri" && is_valid_iri(&s.value) && !subjects.contains(&s.value) {
                subjects.push(s.value.clone());
            }
        }
        Ok(subjects)
    }

    /// ASK whether any graph besides `exclude` references the subject.
    async fn has_incoming_links(&self, subject: &str, exclude: &str) -> Result<bool> {
        validate_iri(subject)?;
        validate_iri(exclude)?;
        Ok(self
            .store
            .ask(
                &self.datasets.resource,
                &format!(
                    "ASK WHERE {{ GRAPH ?g {{ ?s ?p <{}> }} FILTER (?g != <{}>) }}",
                    subject, exclude
                ),
            )
            .await?)
    }

    fn lock_for(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .expect("resource lock map poisoned")
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStore, StubValidator};
    use shapedex_shacl::{ProfileStore, SharedProfiles};

    const PROFILE_ID: &str = "http://ex/Book";
    const PROFILE_TTL: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        <http://ex/Book> a sh:NodeShape ;
            sh:property [ sh:path <http://ex/title> ; sh:datatype xsd:string ; sh:maxCount 1 ] .
    "#;

    async fn fixture(conforming: &[(&str, &str)]) -> (Arc<MemoryStore>, ResourceStore) {
        let store = Arc::new(MemoryStore::new());
        store.put_graph("profile", PROFILE_ID, PROFILE_TTL).await;

        let profiles = SharedProfiles::new();
        let profile_store = Arc::new(ProfileStore::new(
            store.clone(),
            "profile",
            profiles.clone(),
        ));
        profile_store.parse_all().await.unwrap();

        let links = Arc::new(LinkResolver::new(store.clone(), "resource", "http://ex/"));
        let metadata = Arc::new(MetadataStore::new(
            store.clone(),
            Datasets::default(),
            Arc::new(StubValidator::conforming(conforming)),
            profile_store,
            LinkResolver::new(store.clone(), "resource", "http://ex/"),
        ));
        let resources = ResourceStore::new(store.clone(), Datasets::default(), metadata, links);
        (store, resources)
    }

    const BOOK_TTL: &str = r#"<http://ex/b1> <http://purl.org/dc/terms/conformsTo> <http://ex/Book> .
<http://ex/b1> <http://ex/title> "A" ."#;

    #[tokio::test]
    async fn create_stores_resource_and_metadata() {
        let (store, resources) = fixture(&[("http://ex/b1", PROFILE_ID)]).await;

        let (_, metadata) = resources.create(BOOK_TTL, "alice").await.unwrap();
        assert_eq!(metadata.id, "http://ex/b1");
        assert!(store.graph("resource", "http://ex/b1").await.is_some());
        assert!(store.graph("resourcemeta", "http://ex/b1").await.is_some());
    }

    #[tokio::test]
    async fn create_of_existing_resource_conflicts() {
        let (_, resources) = fixture(&[("http://ex/b1", PROFILE_ID)]).await;
        resources.create(BOOK_TTL, "").await.unwrap();

        let err = resources.create(BOOK_TTL, "").await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Store(shapedex_sparql::SparqlError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn create_then_delete_restores_prior_state() {
        let (store, resources) = fixture(&[("http://ex/b1", PROFILE_ID)]).await;
        resources.create(BOOK_TTL, "").await.unwrap();
        resources.delete("http://ex/b1", "").await.unwrap();

        assert!(store.graph("resource", "http://ex/b1").await.is_none());
        assert!(store.graph("resourcemeta", "http://ex/b1").await.is_none());
    }

    #[tokio::test]
    async fn get_round_trips_the_triple_set() {
        let (_, resources) = fixture(&[("http://ex/b1", PROFILE_ID)]).await;
        resources.create(BOOK_TTL, "").await.unwrap();

        let (turtle, metadata) = resources.get("http://ex/b1", false).await.unwrap();
        let original = shapedex_graph_turtle::parse(BOOK_TTL).unwrap();
        let loaded = shapedex_graph_turtle::parse(&turtle).unwrap();
        assert_eq!(original.triple_set(), loaded.triple_set());
        assert_eq!(metadata.root_shape(), Some(PROFILE_ID));
    }

    #[tokio::test]
    async fn update_requires_matching_creator() {
        let (_, resources) = fixture(&[("http://ex/b1", PROFILE_ID)]).await;
        resources.create(BOOK_TTL, "alice").await.unwrap();

        let err = resources
            .update("http://ex/b1", BOOK_TTL, "mallory")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::CreatorMismatch));

        // matching creator and disabled auth both pass
        resources.update("http://ex/b1", BOOK_TTL, "alice").await.unwrap();
        resources.update("http://ex/b1", BOOK_TTL, "").await.unwrap();
    }

    #[tokio::test]
    async fn delete_blocked_while_referenced_then_allowed() {
        let (store, resources) = fixture(&[]).await;
        store
            .put_graph(
                "resource",
                "http://ex/b2",
                "<http://ex/b2> <http://ex/title> \"B\" .",
            )
            .await;
        store
            .put_graph(
                "resource",
                "http://ex/b1",
                "<http://ex/b1> <http://ex/related> <http://ex/b2> .",
            )
            .await;

        let err = resources.delete("http://ex/b2", "").await.unwrap_err();
        assert!(matches!(err, CatalogError::ResourceLinked));

        resources.delete("http://ex/b1", "").await.unwrap();
        resources.delete("http://ex/b2", "").await.unwrap();
        assert!(store.graph("resource", "http://ex/b2").await.is_none());
    }

    #[tokio::test]
    async fn conforming_resources_queries_the_metadata_dataset() {
        let (store, resources) = fixture(&[]).await;
        store.push_select(
            "http://ex/Book",
            serde_json::json!([
                {"g": {"type": "uri", "value": "http://ex/b1"}},
                {"g": {"type": "uri", "value": "http://ex/b9"}}
            ]),
        );
        let ids = resources.conforming_resources(PROFILE_ID).await.unwrap();
        assert_eq!(ids, vec!["http://ex/b1", "http://ex/b9"]);
    }

    #[tokio::test]
    async fn class_instances_rejects_invalid_class_iris() {
        let (_, resources) = fixture(&[]).await;
        let err = resources
            .class_instances(&["not an iri".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Store(shapedex_sparql::SparqlError::InvalidIri(_))
        ));
    }
}
