//! Metadata derivation: validation orchestration and conformance persistence.
//!
//! A resource's metadata graph lives in the metadata dataset under the
//! resource's own IRI and carries `dcterms:modified`, an optional
//! `dcterms:creator`, and one `dcterms:conformsTo` triple per conforming
//! subject of the resource itself (linked resources are filtered out).

use crate::error::{CatalogError, Result};
use crate::links::LinkResolver;
use chrono::{DateTime, SecondsFormat, Utc};
use shapedex_graph_ir::{Graph, Term};
use shapedex_shacl::{NodeShape, ProfileStore, ShaclValidator};
use shapedex_sparql::{validate_iri, Datasets, TripleStore};
use shapedex_vocab::{dcterms, rdf, xsd};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Derived metadata for a stored resource.
#[derive(Debug, Clone)]
pub struct ResourceMetadata {
    /// Resource IRI (the root subject)
    pub id: String,
    /// Recorded creator; empty when auth is disabled
    pub creator: String,
    /// UTC timestamp of the last write
    pub last_modified: DateTime<Utc>,
    /// Subject IRI -> conforming shape IRI, for this resource's subjects
    pub conformance: BTreeMap<String, String>,
}

impl ResourceMetadata {
    pub fn new(id: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            creator: creator.into(),
            last_modified: Utc::now(),
            conformance: BTreeMap::new(),
        }
    }

    /// The shape the root subject conforms to, when recorded.
    pub fn root_shape(&self) -> Option<&str> {
        self.conformance.get(&self.id).map(String::as_str)
    }

    /// Render the metadata triples.
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        let id = Term::iri(&self.id);
        graph.add_triple(
            id.clone(),
            Term::iri(dcterms::MODIFIED),
            Term::typed(
                self.last_modified
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                xsd::DATE_TIME,
            ),
        );
        if !self.creator.is_empty() {
            graph.add_triple(
                id,
                Term::iri(dcterms::CREATOR),
                Term::string(&self.creator),
            );
        }
        for (subject, shape) in &self.conformance {
            graph.add_triple(
                Term::iri(subject),
                Term::iri(dcterms::CONFORMS_TO),
                Term::iri(shape),
            );
        }
        graph
    }
}

/// Builds, stores, and loads resource metadata.
pub struct MetadataStore {
    store: Arc<dyn TripleStore>,
    datasets: Datasets,
    validator: Arc<dyn ShaclValidator>,
    profile_store: Arc<ProfileStore>,
    links: LinkResolver,
}

impl MetadataStore {
    pub fn new(
        store: Arc<dyn TripleStore>,
        datasets: Datasets,
        validator: Arc<dyn ShaclValidator>,
        profile_store: Arc<ProfileStore>,
        links: LinkResolver,
    ) -> Self {
        Self {
            store,
            datasets,
            validator,
            profile_store,
            links,
        }
    }

    /// Load stored metadata. A missing metadata graph yields defaults
    /// (empty creator, empty conformance), which readers treat as
    /// "not yet indexed".
    pub async fn load(&self, id: &str) -> Result<ResourceMetadata> {
        validate_iri(id)?;
        let mut metadata = ResourceMetadata::new(id, "");
        let results = self
            .store
            .select(
                &self.datasets.resource_meta,
                &format!("SELECT * WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }}", id),
            )
            .await?;
        for row in &results.results.bindings {
            let (Some(s), Some(p), Some(o)) = (row.get("s"), row.get("p"), row.get("o")) else {
                continue;
            };
            match p.value.as_str() {
                dcterms::CREATOR if s.value == id => {
                    metadata.creator = o.value.clone();
                }
                dcterms::MODIFIED if s.value == id => {
                    if let Ok(ts) = DateTime::parse_from_rfc3339(&o.value) {
                        metadata.last_modified = ts.with_timezone(&Utc);
                    }
                }
                dcterms::CONFORMS_TO => {
                    metadata.conformance.insert(s.value.clone(), o.value.clone());
                }
                _ => {}
            }
        }
        Ok(metadata)
    }

    /// Delete the metadata graph of a resource.
    pub async fn delete(&self, id: &str) -> Result<()> {
        Ok(self
            .store
            .delete_graph(&self.datasets.resource_meta, id)
            .await?)
    }

    /// Validate a resource and persist its metadata graph.
    ///
    /// `last_modified` overrides the timestamp; the reindex path uses it to
    /// preserve historical modification times. Returns the metadata and
    /// the parsed resource graph.
    pub async fn build_and_store(
        &self,
        declared_id: Option<&str>,
        resource: &str,
        creator: &str,
        last_modified: Option<DateTime<Utc>>,
    ) -> Result<(ResourceMetadata, Graph)> {
        let graph = shapedex_graph_turtle::parse(resource)?;
        let registry = self.profile_store.profiles().snapshot();

        let declared_term = declared_id.map(Term::iri);
        let (root, profile) = find_resource_profile(&graph, declared_term.as_ref(), &registry)?;
        let root_id = root.raw().to_string();
        if let Some(given) = declared_id {
            if given != root_id {
                return Err(CatalogError::IdMismatch {
                    given: given.to_string(),
                    found: root_id,
                });
            }
        }

        let shapes_graph = self.profile_store.get_profile(&profile.id).await?;

        // the validator needs the closed world for this resource, so linked
        // graphs are folded into the data it sees
        let resolved = self.links.resolve(&graph).await?;
        let data_graph = if resolved.nquads.is_empty() {
            resource.to_string()
        } else {
            format!("{}\n{}", resource, resolved.nquads)
        };

        let mut conformance = self
            .validator
            .validate(&shapes_graph, &profile.id, &data_graph, &root_id)
            .await?;

        if conformance.get(&root_id) != Some(&profile.id) {
            return Err(CatalogError::ShapeMismatch {
                expected: profile.id.clone(),
            });
        }

        // keep only subjects of this resource: anything that is not a
        // subject in the original graph arrived via link resolution
        conformance.retain(|subject, _| {
            !resolved.targets.iter().any(|t| t == subject)
                && graph.has_subject(&Term::iri(subject))
        });

        let mut metadata = ResourceMetadata::new(root_id, creator);
        if let Some(ts) = last_modified {
            metadata.last_modified = ts;
        }
        metadata.conformance = conformance;

        self.store
            .upload_graph(
                &self.datasets.resource_meta,
                &metadata.id,
                &metadata.to_graph().to_ntriples(),
            )
            .await?;
        Ok((metadata, graph))
    }
}

/// Find the root subject and its profile: the unique triple relating a
/// subject via `dcterms:conformsTo` or `rdf:type` to a registered profile.
pub fn find_resource_profile(
    graph: &Graph,
    declared: Option<&Term>,
    registry: &shapedex_shacl::ProfileRegistry,
) -> Result<(Term, Arc<NodeShape>)> {
    let conforms_to = Term::iri(dcterms::CONFORMS_TO);
    let rdf_type = Term::iri(rdf::TYPE);

    let mut found: Option<(Term, Arc<NodeShape>)> = None;
    let refs = graph
        .matching(declared, Some(&conforms_to), None)
        .chain(graph.matching(declared, Some(&rdf_type), None));
    for triple in refs {
        let Some(shape) = registry.get(triple.o.raw()) else {
            continue;
        };
        if found.is_some() {
            return Err(CatalogError::AmbiguousProfile);
        }
        found = Some((triple.s.clone(), shape.clone()));
    }
    found.ok_or(CatalogError::NoProfile)
}
