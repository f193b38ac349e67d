//! Projection of validated resources into nested search documents.
//!
//! Each resource becomes a three-level tree: a container document
//! (`container_<id>`), one main document for the resource itself, and one
//! sub-document per conforming sub-resource. SHACL inheritance is
//! flattened: parent shapes contribute their fields to the same document.
//! Every index write is preceded by a deindex of the same id.

use crate::error::{Result, SearchError};
use crate::fields::{field_name, field_suffix, fixup_datetime};
use crate::solr::{init, SearchIndex};
use chrono::SecondsFormat;
use serde_json::{json, Value};
use shapedex_catalog::{find_labels, ResourceMetadata, ResourceStore};
use shapedex_graph_ir::{Graph, Term};
use shapedex_shacl::{NodeShape, ProfileRegistry};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A search document under construction.
pub type Document = serde_json::Map<String, Value>;

/// Append a value to a multi-valued document field.
fn append_value(doc: &mut Document, field: &str, value: Value) {
    let entry = doc
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(existing) = entry {
        match value {
            Value::Array(values) => existing.extend(values),
            other => existing.push(other),
        }
    }
}

/// Builds and submits search documents.
pub struct Indexer {
    search: Arc<dyn SearchIndex>,
    geo_datatype: String,
}

impl Indexer {
    pub fn new(search: Arc<dyn SearchIndex>, geo_datatype: impl Into<String>) -> Self {
        Self {
            search,
            geo_datatype: geo_datatype.into(),
        }
    }

    /// Remove a resource's document tree from the index.
    pub async fn deindex_resource(&self, id: &str) -> Result<()> {
        self.search.delete_by_root(id).await
    }

    /// Project a resource into its document tree and submit it.
    ///
    /// A resource whose metadata records no root conformance is skipped
    /// (logged, not an error): it was stored before its profile vanished.
    pub async fn index_resource(
        &self,
        resource: &Graph,
        metadata: &ResourceMetadata,
        profiles: &ProfileRegistry,
    ) -> Result<()> {
        self.deindex_resource(&metadata.id).await?;

        let Some(root_shape) = metadata.root_shape() else {
            warn!(resource = %metadata.id, creator = %metadata.creator, "not indexing because root profile not found");
            return Ok(());
        };
        let profile = profiles
            .get(root_shape)
            .ok_or_else(|| SearchError::MissingProfile(root_shape.to_string()))?;
        debug!(resource = %metadata.id, creator = %metadata.creator, "indexing");

        let last_modified = metadata
            .last_modified
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut main = Document::new();
        main.insert("id".to_string(), json!(metadata.id));
        main.insert("creator".to_string(), json!(metadata.creator));
        main.insert("lastModified".to_string(), json!(last_modified));
        main.insert(
            "label".to_string(),
            json!(find_labels(&Term::iri(&metadata.id), resource)),
        );
        main.insert("docType".to_string(), json!("main"));

        let builder = DocBuilder {
            graph: resource,
            metadata,
            profiles,
            geo_datatype: &self.geo_datatype,
        };
        builder.build(&Term::iri(&metadata.id), profile, None, &mut main);

        let mut container = Document::new();
        container.insert("id".to_string(), json!(format!("container_{}", metadata.id)));
        container.insert("creator".to_string(), json!(metadata.creator));
        container.insert("lastModified".to_string(), json!(last_modified));
        container.insert("docType".to_string(), json!("container"));
        container.insert("_children_".to_string(), json!([Value::Object(main)]));

        self.search.update_doc(&Value::Object(container)).await
    }

    /// Rebuild the whole index: recreate the collection, then reindex
    /// every stored resource. Per-resource failures are logged and
    /// skipped. Returns the number of resources indexed.
    pub async fn reindex_all(
        &self,
        resources: &ResourceStore,
        profiles: &ProfileRegistry,
    ) -> Result<usize> {
        info!("reindexing...");
        let start = Instant::now();
        init(self.search.as_ref(), true).await?;

        let ids = resources.list_ids().await?;
        let mut indexed = 0;
        for id in &ids {
            match self.reindex_one(resources, profiles, id).await {
                Ok(()) => indexed += 1,
                Err(err) => error!(id, error = %err, "failed indexing resource"),
            }
        }
        info!(resources = indexed, elapsed_ms = start.elapsed().as_millis() as u64, "reindexing finished");
        Ok(indexed)
    }

    async fn reindex_one(
        &self,
        resources: &ResourceStore,
        profiles: &ProfileRegistry,
        id: &str,
    ) -> Result<()> {
        let (turtle, metadata) = resources.get(id, false).await?;
        let graph =
            shapedex_graph_turtle::parse(&turtle).map_err(shapedex_catalog::CatalogError::from)?;
        self.index_resource(&graph, &metadata, profiles).await
    }
}

/// Recursive document construction for one resource.
struct DocBuilder<'a> {
    graph: &'a Graph,
    metadata: &'a ResourceMetadata,
    profiles: &'a ProfileRegistry,
    geo_datatype: &'a str,
}

impl DocBuilder<'_> {
    /// Build `doc` for `subject` under `shape`.
    ///
    /// `field_shape` carries the sub-document's own main shape once the
    /// walk has descended into a sub-resource; at the root it is `None`
    /// and leaf fields are named by the shape frame that contributes them.
    fn build(&self, subject: &Term, shape: &NodeShape, field_shape: Option<&str>, doc: &mut Document) {
        append_value(doc, "shape", json!(shape.id));

        // inheritance is flattened: parents write into the same document
        for parent_id in &shape.parents {
            match self.profiles.get(parent_id) {
                Some(parent) => self.build(subject, parent, field_shape, doc),
                None => warn!(id = %parent_id, "profile not found"),
            }
        }

        for (path, properties) in &shape.properties {
            let path_term = Term::iri(path);
            for property in properties {
                let suffix = field_suffix(property, self.geo_datatype);
                let values: Vec<&Term> = self
                    .graph
                    .matching(Some(subject), Some(&path_term), None)
                    .map(|t| &t.o)
                    .collect();
                for value in values {
                    let conforming = self.metadata.conformance.get(value.raw());

                    if let (Some(denormalized), Some(qualified)) = (
                        &property.qualified_value_shape_denormalized,
                        &property.qualified_value_shape,
                    ) {
                        if conforming.map(String::as_str) == Some(qualified.as_str()) {
                            let child = self.child_doc(value, denormalized, doc);
                            append_value(doc, "ref_shapes", json!(denormalized.id));
                            append_value(doc, "_children_", Value::Object(child));
                            continue;
                        }
                    }

                    if !property.node_shapes.is_empty() {
                        for node_shape_id in &property.node_shapes {
                            if conforming.map(String::as_str) != Some(node_shape_id.as_str()) {
                                continue;
                            }
                            match self.profiles.get(node_shape_id) {
                                Some(child_shape) => {
                                    let child = self.child_doc(value, child_shape, doc);
                                    append_value(doc, "ref_shapes", json!(node_shape_id));
                                    append_value(doc, "_children_", Value::Object(child));
                                }
                                None => warn!(id = %node_shape_id, "profile not found"),
                            }
                        }
                        continue;
                    }

                    // leaf value
                    let text = match value {
                        Term::Literal(lit) => lit.lexical.to_string(),
                        other => other.to_string(),
                    };
                    let shape_of_field = field_shape.unwrap_or(shape.id.as_str());
                    if suffix == "t" {
                        append_value(doc, "_text_", json!(text));
                        append_value(
                            doc,
                            &field_name(shape_of_field, property.id.raw(), suffix),
                            json!(text),
                        );
                    } else {
                        let text = if suffix == "dts" {
                            fixup_datetime(&text)
                        } else {
                            text
                        };
                        append_value(
                            doc,
                            &field_name(shape_of_field, property.id.raw(), suffix),
                            json!(text),
                        );
                    }
                }
            }
        }
    }

    /// Build a sub-document for a conforming sub-resource.
    fn child_doc(&self, value: &Term, shape: &NodeShape, parent_doc: &Document) -> Document {
        let mut child = Document::new();
        child.insert("id".to_string(), json!(value.raw()));
        child.insert("label".to_string(), json!(find_labels(value, self.graph)));
        if let Some(parent_shapes) = parent_doc.get("shape") {
            append_value(&mut child, "ref_shapes", parent_shapes.clone());
        }
        self.build(value, shape, Some(shape.id.as_str()), &mut child);
        child
    }
}
