//! Profile registry: storage operations and the parsed-shape snapshot.
//!
//! The registry is rebuilt as a whole (never patched in place) and swapped
//! behind a read-write lock, so readers always observe a complete,
//! consistent set of shapes. The sync loop is the only writer.

use crate::canonicalize::{content_hash, replace_blank_nodes, BLANK_NODE_PREFIX};
use crate::error::Result;
use crate::model::NodeShape;
use crate::parse::parse_node_shape;
use shapedex_graph_ir::{Graph, Term};
use shapedex_sparql::{validate_iri, TripleStore};
use shapedex_vocab::{rdf, sh, spdx};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use tracing::warn;

/// An immutable snapshot of all parsed profiles, keyed by shape IRI.
///
/// Qualified-value sub-shapes (canonicalized blank nodes) are registered
/// under their own `urn:` IRIs alongside the root profiles.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    shapes: BTreeMap<String, Arc<NodeShape>>,
}

impl ProfileRegistry {
    /// Look up a shape by IRI.
    pub fn get(&self, id: &str) -> Option<&Arc<NodeShape>> {
        self.shapes.get(id)
    }

    /// Check whether a shape IRI is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.shapes.contains_key(id)
    }

    /// All registered shape IRIs.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl From<BTreeMap<String, NodeShape>> for ProfileRegistry {
    fn from(shapes: BTreeMap<String, NodeShape>) -> Self {
        Self {
            shapes: shapes
                .into_iter()
                .map(|(id, shape)| (id, Arc::new(shape)))
                .collect(),
        }
    }
}

/// Cloneable handle to the current registry snapshot.
///
/// `snapshot()` is cheap (an `Arc` clone); the lock is held only for the
/// pointer swap, never across I/O.
#[derive(Clone, Default)]
pub struct SharedProfiles {
    inner: Arc<RwLock<Arc<ProfileRegistry>>>,
}

impl SharedProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current registry snapshot.
    pub fn snapshot(&self) -> Arc<ProfileRegistry> {
        self.inner.read().expect("profile registry lock poisoned").clone()
    }

    /// Atomically replace the registry.
    pub fn replace(&self, registry: Arc<ProfileRegistry>) {
        *self.inner.write().expect("profile registry lock poisoned") = registry;
    }
}

/// Profile persistence plus full-registry reparse.
pub struct ProfileStore {
    store: Arc<dyn TripleStore>,
    dataset: String,
    profiles: SharedProfiles,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn TripleStore>, dataset: impl Into<String>, profiles: SharedProfiles) -> Self {
        Self {
            store,
            dataset: dataset.into(),
            profiles,
        }
    }

    /// Handle to the shared registry this store refreshes.
    pub fn profiles(&self) -> &SharedProfiles {
        &self.profiles
    }

    /// Load a stored profile's serialized graph.
    pub async fn get_profile(&self, id: &str) -> Result<String> {
        Ok(self.store.load_graph(&self.dataset, id).await?)
    }

    /// All stored profile IRIs.
    pub async fn profile_ids(&self) -> Result<Vec<String>> {
        Ok(self.store.list_graph_names(&self.dataset).await?)
    }

    /// Store a profile: canonicalize blank nodes, persist the rewritten
    /// graph, and record the hash of the original bytes.
    pub async fn update_profile(&self, id: &str, payload: &[u8]) -> Result<Graph> {
        let graph = shapedex_graph_turtle::parse_bytes(payload)?;
        let canonical = replace_blank_nodes(&graph);

        self.delete_profile_hash(id).await?;
        // hash the original payload so identical re-uploads stay identical
        let hash = content_hash(payload);
        self.store
            .upload_graph(&self.dataset, id, &canonical.to_ntriples())
            .await?;
        self.save_profile_hash(id, hash).await?;
        Ok(canonical)
    }

    /// Remove a profile graph and its hash record.
    pub async fn delete_profile(&self, id: &str) -> Result<()> {
        self.delete_profile_hash(id).await?;
        self.store.delete_graph(&self.dataset, id).await?;
        Ok(())
    }

    /// The stored content hash for a profile, if any.
    pub async fn get_profile_hash(&self, id: &str) -> Result<Option<u32>> {
        validate_iri(id)?;
        let results = self
            .store
            .select(
                &self.dataset,
                &format!("SELECT ?hash WHERE {{ <{}> <{}> ?hash }}", id, spdx::CHECKSUM_VALUE),
            )
            .await?;
        Ok(results
            .results
            .bindings
            .first()
            .and_then(|row| row.get("hash"))
            .and_then(|b| b.value.parse::<u32>().ok()))
    }

    async fn save_profile_hash(&self, id: &str, hash: u32) -> Result<()> {
        validate_iri(id)?;
        self.store
            .update(
                &self.dataset,
                &format!("INSERT DATA {{ <{}> <{}> {} . }}", id, spdx::CHECKSUM_VALUE, hash),
            )
            .await?;
        Ok(())
    }

    async fn delete_profile_hash(&self, id: &str) -> Result<()> {
        validate_iri(id)?;
        self.store
            .update(
                &self.dataset,
                &format!("DELETE WHERE {{ <{}> <{}> ?hash . }}", id, spdx::CHECKSUM_VALUE),
            )
            .await?;
        Ok(())
    }

    /// Reparse every stored profile into a fresh registry and swap it in.
    ///
    /// A parse error on any profile aborts the whole pass; the previous
    /// registry stays in place.
    pub async fn parse_all(&self) -> Result<Arc<ProfileRegistry>> {
        let ids = self.profile_ids().await?;
        let rdf_type = Term::iri(rdf::TYPE);
        let node_shape = Term::iri(sh::NODE_SHAPE);

        let mut shapes: BTreeMap<String, NodeShape> = BTreeMap::new();
        for id in ids {
            let turtle: Arc<str> = Arc::from(self.get_profile(&id).await?);
            let graph = shapedex_graph_turtle::parse(&turtle)?;

            let root = parse_node_shape(&Term::iri(&id), &graph, turtle.clone())?;
            shapes.insert(id.clone(), root);

            // sub-profiles: node shapes that entered as blank nodes and now
            // carry canonical urn: identifiers
            for triple in graph.matching(None, Some(&rdf_type), Some(&node_shape)) {
                if triple.s.is_iri() && triple.s.raw().starts_with(BLANK_NODE_PREFIX) {
                    let sub = parse_node_shape(&triple.s, &graph, turtle.clone())?;
                    shapes.insert(triple.s.raw().to_string(), sub);
                }
            }
        }

        denormalize_qualified_shapes(&mut shapes);

        let registry = Arc::new(ProfileRegistry::from(shapes));
        self.profiles.replace(registry.clone());
        Ok(registry)
    }
}

/// Attach a denormalized shape to every property with a resolvable
/// `sh:qualifiedValueShape`: the target's properties plus those of all its
/// transitive parents, merged under the usual discipline.
pub fn denormalize_qualified_shapes(shapes: &mut BTreeMap<String, NodeShape>) {
    let source = shapes.clone();
    for shape in shapes.values_mut() {
        for props in shape.properties.values_mut() {
            for prop in props.iter_mut() {
                let Some(target_id) = prop.qualified_value_shape.clone() else {
                    continue;
                };
                let Some(target) = source.get(&target_id) else {
                    warn!(id = %target_id, path = %prop.path, "property's qualifiedValueShape not found");
                    continue;
                };
                let mut denormalized = NodeShape::new(prop.id.raw());
                denormalized.rdf = shape.rdf.clone();
                let mut visited = BTreeSet::new();
                fold_shape(target, &mut denormalized, &source, &mut visited);
                prop.qualified_value_shape_denormalized = Some(Box::new(denormalized));
            }
        }
    }
}

/// Fold a shape and its transitive parents into `target`. Cycles in the
/// parent relation are broken by the visited set.
fn fold_shape(
    current: &NodeShape,
    target: &mut NodeShape,
    shapes: &BTreeMap<String, NodeShape>,
    visited: &mut BTreeSet<String>,
) {
    if !visited.insert(current.id.clone()) {
        return;
    }
    target.parents.insert(current.id.clone());
    for props in current.properties.values() {
        for prop in props {
            target.add_property(prop.clone());
        }
    }
    for parent in &current.parents {
        match shapes.get(parent) {
            Some(parent_shape) => fold_shape(parent_shape, target, shapes, visited),
            None => warn!(id = %parent, "parent shape not found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Property;
    use async_trait::async_trait;
    use shapedex_sparql::{Result as SparqlResult, SelectResults, SparqlError};
    use std::collections::HashMap;

    fn shape_with_prop(id: &str, path: &str) -> NodeShape {
        let mut shape = NodeShape::new(id);
        let mut prop = Property::new(Term::iri(format!("{id}#p")));
        prop.path = path.to_string();
        shape.add_property(prop);
        shape
    }

    #[test]
    fn denormalization_folds_target_and_parents() {
        let mut shapes = BTreeMap::new();

        let mut parent = shape_with_prop("http://ex/Parent", "http://ex/base");
        parent.id = "http://ex/Parent".to_string();
        shapes.insert(parent.id.clone(), parent);

        let mut target = shape_with_prop("urn:sub", "http://ex/extra");
        target.parents.insert("http://ex/Parent".to_string());
        shapes.insert("urn:sub".to_string(), target);

        let mut root = NodeShape::new("http://ex/Root");
        let mut qualified = Property::new(Term::iri("urn:sub"));
        qualified.path = "http://ex/part".to_string();
        qualified.qualified_value_shape = Some("urn:sub".to_string());
        qualified.qualified_min_count = 1;
        root.add_property(qualified);
        shapes.insert(root.id.clone(), root);

        denormalize_qualified_shapes(&mut shapes);

        let root = &shapes["http://ex/Root"];
        let denorm = root.properties["http://ex/part"][0]
            .qualified_value_shape_denormalized
            .as_ref()
            .unwrap();
        assert!(denorm.properties.contains_key("http://ex/extra"));
        assert!(denorm.properties.contains_key("http://ex/base"));
        assert!(denorm.parents.contains("urn:sub"));
        assert!(denorm.parents.contains("http://ex/Parent"));
    }

    #[test]
    fn denormalization_survives_parent_cycles() {
        let mut shapes = BTreeMap::new();

        let mut a = shape_with_prop("http://ex/A", "http://ex/pa");
        a.parents.insert("http://ex/B".to_string());
        shapes.insert(a.id.clone(), a);

        let mut b = shape_with_prop("http://ex/B", "http://ex/pb");
        b.parents.insert("http://ex/A".to_string());
        shapes.insert(b.id.clone(), b);

        let mut root = NodeShape::new("http://ex/Root");
        let mut qualified = Property::new(Term::iri("urn:q"));
        qualified.path = "http://ex/part".to_string();
        qualified.qualified_value_shape = Some("http://ex/A".to_string());
        root.add_property(qualified);
        shapes.insert(root.id.clone(), root);

        denormalize_qualified_shapes(&mut shapes);

        let denorm = shapes["http://ex/Root"].properties["http://ex/part"][0]
            .qualified_value_shape_denormalized
            .as_ref()
            .unwrap();
        assert!(denorm.properties.contains_key("http://ex/pa"));
        assert!(denorm.properties.contains_key("http://ex/pb"));
    }

    #[test]
    fn unknown_qualified_target_is_skipped() {
        let mut shapes = BTreeMap::new();
        let mut root = NodeShape::new("http://ex/Root");
        let mut qualified = Property::new(Term::iri("urn:q"));
        qualified.path = "http://ex/part".to_string();
        qualified.qualified_value_shape = Some("http://ex/Missing".to_string());
        root.add_property(qualified);
        shapes.insert(root.id.clone(), root);

        denormalize_qualified_shapes(&mut shapes);
        assert!(shapes["http://ex/Root"].properties["http://ex/part"][0]
            .qualified_value_shape_denormalized
            .is_none());
    }

    /// In-memory store stub serving only the calls `parse_all` makes.
    struct StubStore {
        graphs: HashMap<String, String>,
    }

    #[async_trait]
    impl TripleStore for StubStore {
        async fn ensure_dataset(&self, _dataset: &str) -> SparqlResult<()> {
            Ok(())
        }
        async fn graph_exists(&self, _dataset: &str, id: &str) -> SparqlResult<bool> {
            Ok(self.graphs.contains_key(id))
        }
        async fn load_graph(&self, dataset: &str, id: &str) -> SparqlResult<String> {
            self.graphs
                .get(id)
                .cloned()
                .ok_or_else(|| SparqlError::NotFound {
                    dataset: dataset.to_string(),
                    graph: id.to_string(),
                })
        }
        async fn upload_graph(&self, _d: &str, _i: &str, _t: &str) -> SparqlResult<()> {
            Ok(())
        }
        async fn create_graph(&self, _d: &str, _i: &str, _t: &str) -> SparqlResult<()> {
            Ok(())
        }
        async fn delete_graph(&self, _d: &str, _i: &str) -> SparqlResult<()> {
            Ok(())
        }
        async fn select(&self, _d: &str, _q: &str) -> SparqlResult<SelectResults> {
            Err(SparqlError::InvalidResults("not stubbed".to_string()))
        }
        async fn ask(&self, _d: &str, _q: &str) -> SparqlResult<bool> {
            Ok(false)
        }
        async fn update(&self, _d: &str, _q: &str) -> SparqlResult<()> {
            Ok(())
        }
        async fn list_graph_names(&self, _d: &str) -> SparqlResult<Vec<String>> {
            let mut names: Vec<String> = self.graphs.keys().cloned().collect();
            names.sort();
            Ok(names)
        }
    }

    #[tokio::test]
    async fn parse_all_registers_roots_and_urn_sub_shapes() {
        let profile = r#"
            @prefix sh: <http://www.w3.org/ns/shacl#> .
            @prefix ex: <http://ex/> .
            ex:Book a sh:NodeShape ;
                sh:property [ sh:path ex:title ; sh:maxCount 1 ] ;
                sh:property [
                    sh:path ex:chapter ;
                    sh:qualifiedValueShape <urn:chapter-shape> ;
                    sh:qualifiedMinCount 1 ;
                ] .
            <urn:chapter-shape> a sh:NodeShape ;
                sh:property [ sh:path ex:heading ] .
        "#;
        let store = Arc::new(StubStore {
            graphs: HashMap::from([("http://ex/Book".to_string(), profile.to_string())]),
        });
        let profiles = SharedProfiles::new();
        let registry = ProfileStore::new(store, "profile", profiles.clone())
            .parse_all()
            .await
            .unwrap();

        assert!(registry.contains("http://ex/Book"));
        assert!(registry.contains("urn:chapter-shape"));

        let book = registry.get("http://ex/Book").unwrap();
        let chapter = &book.properties["http://ex/chapter"][0];
        let denorm = chapter.qualified_value_shape_denormalized.as_ref().unwrap();
        assert!(denorm.properties.contains_key("http://ex/heading"));

        // the shared handle observes the same snapshot
        assert_eq!(profiles.snapshot().len(), registry.len());
    }

    #[tokio::test]
    async fn parse_failure_keeps_previous_registry() {
        let good = Arc::new(StubStore {
            graphs: HashMap::from([(
                "http://ex/Book".to_string(),
                "@prefix sh: <http://www.w3.org/ns/shacl#> . <http://ex/Book> a sh:NodeShape ."
                    .to_string(),
            )]),
        });
        let profiles = SharedProfiles::new();
        ProfileStore::new(good, "profile", profiles.clone())
            .parse_all()
            .await
            .unwrap();
        assert_eq!(profiles.snapshot().len(), 1);

        let broken = Arc::new(StubStore {
            graphs: HashMap::from([("http://ex/Book".to_string(), "not turtle {{{".to_string())]),
        });
        let result = ProfileStore::new(broken, "profile", profiles.clone())
            .parse_all()
            .await;
        assert!(result.is_err());
        assert_eq!(profiles.snapshot().len(), 1);
    }
}
