//! Label extraction and language-ranked label lookup.
//!
//! Every upload of a profile or resource graph regenerates that graph's
//! entry in the label dataset. Profiles additionally get synthetic labels
//! for their node shapes and property nodes, keyed by a normalized token so
//! the search frontend can resolve facet field names back to titles.

use crate::error::Result;
use crate::fetch::UrlFetcher;
use async_trait::async_trait;
use shapedex_graph_ir::{Graph, Term};
use shapedex_sparql::{validate_iri, Datasets, GraphHook, TripleStore};
use shapedex_vocab::{dcterms, foaf, rdf, rdfs, sh, skos};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Predicates whose literal objects count as labels.
pub const LABEL_PREDICATES: [&str; 5] = [
    sh::NAME,
    skos::PREF_LABEL,
    rdfs::LABEL,
    dcterms::TITLE,
    foaf::NAME,
];

const FALLBACK_LANGUAGE: &str = "en";

/// Check whether a predicate IRI is a label predicate.
pub fn is_label_predicate(iri: &str) -> bool {
    LABEL_PREDICATES.contains(&iri)
}

/// Normalize an IRI into a search-safe token: lowercase, with every
/// character in `[/*?"<>|#:.\- ]` replaced by `_`.
pub fn clean_token(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            '/' | '*' | '?' | '"' | '<' | '>' | '|' | '#' | ':' | '.' | '-' | ' ' => '_',
            other => other,
        })
        .collect()
}

/// Collect the literal labels of a subject within a graph.
pub fn find_labels(subject: &Term, graph: &Graph) -> Vec<String> {
    graph
        .matching(Some(subject), None, None)
        .filter(|t| is_label_predicate(t.p.raw()))
        .filter_map(|t| t.o.as_literal())
        .map(|lit| lit.lexical.to_string())
        .collect()
}

/// Label persistence and lookup against the label dataset.
pub struct LabelStore {
    store: Arc<dyn TripleStore>,
    datasets: Datasets,
    fetcher: Arc<dyn UrlFetcher>,
}

impl LabelStore {
    pub fn new(
        store: Arc<dyn TripleStore>,
        datasets: Datasets,
        fetcher: Arc<dyn UrlFetcher>,
    ) -> Self {
        Self {
            store,
            datasets,
            fetcher,
        }
    }

    /// Extract label triples from a graph and store them under the same
    /// graph name in the label dataset.
    ///
    /// With `convert_shacl_properties`, node shapes and property nodes also
    /// get synthetic `<:token>` entries; property labels under a
    /// `sh:qualifiedValueShape` or `sh:node` are prefixed with the
    /// profile's own label as `"<shape-label> > <prop-label>"`.
    pub async fn extract_labels(
        &self,
        id: &str,
        graph: &Graph,
        convert_shacl_properties: bool,
    ) -> Result<()> {
        let rdf_type = Term::iri(rdf::TYPE);
        let node_shape = Term::iri(sh::NODE_SHAPE);
        let sh_path = Term::iri(sh::PATH);
        let sh_qvs = Term::iri(sh::QUALIFIED_VALUE_SHAPE);
        let sh_node = Term::iri(sh::NODE);

        let profile_labels = if convert_shacl_properties {
            find_profile_labels(&Term::iri(id), graph)
        } else {
            BTreeMap::new()
        };

        let mut out = String::new();
        for triple in graph.iter() {
            if !is_label_predicate(triple.p.raw()) {
                continue;
            }
            let Some(lit) = triple.o.as_literal() else {
                continue;
            };

            if convert_shacl_properties {
                if graph
                    .first(Some(&triple.s), Some(&rdf_type), Some(&node_shape))
                    .is_some()
                {
                    writeln!(
                        out,
                        "<:{}> <{}> {} .",
                        clean_token(triple.s.raw()),
                        rdfs::LABEL,
                        triple.o
                    )
                    .expect("write to string");
                } else if graph.first(Some(&triple.s), Some(&sh_path), None).is_some() {
                    let lang = lit
                        .language
                        .as_deref()
                        .unwrap_or(FALLBACK_LANGUAGE)
                        .to_string();
                    let mut label = lit.lexical.to_string();
                    if graph.first(Some(&triple.s), Some(&sh_qvs), None).is_some()
                        || graph.first(Some(&triple.s), Some(&sh_node), None).is_some()
                    {
                        if let Some(shape_label) = profile_labels.get(&lang) {
                            label = format!("{} > {}", shape_label, label);
                        }
                    }
                    writeln!(
                        out,
                        "<:{}> <{}> {} .",
                        clean_token(triple.s.raw()),
                        rdfs::LABEL,
                        Term::lang_string(&label, &lang)
                    )
                    .expect("write to string");
                }
            }

            writeln!(out, "{} <{}> {} .", triple.s, rdfs::LABEL, triple.o)
                .expect("write to string");
        }

        if !out.is_empty() {
            self.store
                .upload_graph(&self.datasets.label, id, &out)
                .await?;
        }
        Ok(())
    }

    /// Language-ranked label lookup.
    ///
    /// Ranking per id: exact language, its primary subtag, `en`, untagged.
    /// Ids without any ranked label are absent from the result.
    pub async fn get_labels(
        &self,
        language: &str,
        ids: &[String],
    ) -> Result<BTreeMap<String, String>> {
        let mut result = BTreeMap::new();
        if ids.is_empty() {
            return Ok(result);
        }

        let mut priorities = vec![language.to_string()];
        if language.len() > 2 {
            priorities.push(language[..2].to_string());
        }
        if language != FALLBACK_LANGUAGE {
            priorities.push(FALLBACK_LANGUAGE.to_string());
        }
        priorities.push(String::new());

        let mut values = String::new();
        for id in ids {
            validate_iri(id)?;
            write!(values, "<{}> ", id).expect("write to string");
        }
        let query = format!(
            "SELECT DISTINCT ?id ?label WHERE {{ GRAPH ?g {{ VALUES ?id {{ {} }} ?id ?p ?label . }} }}",
            values.trim_end()
        );

        let results = self.store.select(&self.datasets.label, &query).await?;
        let mut current_ranks: BTreeMap<String, usize> = BTreeMap::new();
        for row in &results.results.bindings {
            let (Some(id), Some(label)) = (row.get("id"), row.get("label")) else {
                continue;
            };
            let lang = label.lang.as_deref().unwrap_or("");
            let Some(rank) = priorities.iter().position(|p| p.as_str() == lang) else {
                continue;
            };
            let better = current_ranks
                .get(&id.value)
                .is_none_or(|current| rank < *current);
            if better {
                result.insert(id.value.clone(), label.value.clone());
                current_ranks.insert(id.value.clone(), rank);
            }
        }
        Ok(result)
    }

    /// Whether a label graph for this source already exists.
    pub async fn labels_exist(&self, url: &str) -> Result<bool> {
        Ok(self.store.graph_exists(&self.datasets.label, url).await?)
    }

    /// Fetch an RDF document (through the disk cache), extract its labels,
    /// and store them under the URL as graph name.
    pub async fn import_labels_from_url(&self, url: &str) -> Result<Graph> {
        info!(url, "importing labels");
        let data = self.fetcher.fetch(url, "text/turtle").await?;
        let graph = shapedex_graph_turtle::parse_bytes(&data)?;
        self.extract_labels(url, &graph, false).await?;
        Ok(graph)
    }

    /// Import labels from each configured standard taxonomy URL, once.
    pub async fn import_standard_taxonomies(&self, urls: &[String]) {
        for url in urls {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            match self.labels_exist(url).await {
                Ok(true) => {}
                Ok(false) => {
                    if let Err(err) = self.import_labels_from_url(url).await {
                        warn!(url, error = %err, "failed importing labels from standard taxonomy");
                    }
                }
                Err(err) => warn!(url, error = %err, "failed checking for existing labels"),
            }
        }
    }
}

/// Gather a profile's own labels per language (first one wins).
fn find_profile_labels(id: &Term, graph: &Graph) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for predicate in LABEL_PREDICATES {
        let p = Term::iri(predicate);
        for triple in graph.matching(Some(id), Some(&p), None) {
            if let Some(lit) = triple.o.as_literal() {
                let lang = lit
                    .language
                    .as_deref()
                    .unwrap_or(FALLBACK_LANGUAGE)
                    .to_string();
                labels
                    .entry(lang)
                    .or_insert_with(|| lit.lexical.to_string());
            }
        }
    }
    labels
}

/// Post-upload hook: regenerate the label graph of the uploaded source.
///
/// Installed on the triple-store client at wiring time; extraction failures
/// are logged, never propagated into the upload path.
pub struct LabelHook {
    labels: Arc<LabelStore>,
    profile_dataset: String,
}

impl LabelHook {
    pub fn new(labels: Arc<LabelStore>, profile_dataset: impl Into<String>) -> Self {
        Self {
            labels,
            profile_dataset: profile_dataset.into(),
        }
    }
}

#[async_trait]
impl GraphHook for LabelHook {
    async fn graph_uploaded(&self, dataset: &str, id: &str, turtle: &str) {
        let graph = match shapedex_graph_turtle::parse(turtle) {
            Ok(graph) => graph,
            Err(err) => {
                error!(id, error = %err, "failed parsing graph for label extraction");
                return;
            }
        };
        let convert = dataset == self.profile_dataset;
        if let Err(err) = self.labels.extract_labels(id, &graph, convert).await {
            error!(id, error = %err, "failed extracting labels");
        }
    }
}
