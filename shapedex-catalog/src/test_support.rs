//! In-memory fakes for exercising store-backed components in tests.
//!
//! `MemoryStore` keeps named graphs in a map and answers the handful of
//! query shapes the catalog and sync paths issue: whole-graph selects,
//! incoming-link ASKs, and profile hash bookkeeping. Anything fancier can
//! be canned with `push_select`.

use crate::error::Result as CatalogResult;
use crate::fetch::UrlFetcher;
use async_trait::async_trait;
use shapedex_graph_ir::Term;
use shapedex_shacl::{Conformance, Result as ShaclResult, ShaclValidator};
use shapedex_sparql::{Result as SparqlResult, SelectResults, SparqlError, TripleStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// In-memory named-graph store.
#[derive(Default)]
pub struct MemoryStore {
    graphs: Mutex<HashMap<(String, String), String>>,
    hashes: Mutex<HashMap<String, u32>>,
    canned_selects: Mutex<Vec<(String, serde_json::Value)>>,
    updates: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a named graph.
    pub async fn put_graph(&self, dataset: &str, id: &str, turtle: &str) {
        self.graphs
            .lock()
            .unwrap()
            .insert((dataset.to_string(), id.to_string()), turtle.to_string());
    }

    /// Read back a stored graph.
    pub async fn graph(&self, dataset: &str, id: &str) -> Option<String> {
        self.graphs
            .lock()
            .unwrap()
            .get(&(dataset.to_string(), id.to_string()))
            .cloned()
    }

    /// Can a SELECT response for queries containing `needle`.
    pub fn push_select(&self, needle: &str, bindings: serde_json::Value) {
        self.canned_selects
            .lock()
            .unwrap()
            .push((needle.to_string(), bindings));
    }

    /// All updates issued against a dataset.
    pub fn updates_for(&self, dataset: &str) -> Vec<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(ds, _)| ds == dataset)
            .map(|(_, q)| q.clone())
            .collect()
    }

    pub fn stored_hash(&self, id: &str) -> Option<u32> {
        self.hashes.lock().unwrap().get(id).copied()
    }

    fn results_from_bindings(bindings: serde_json::Value) -> SparqlResult<SelectResults> {
        serde_json::from_value(serde_json::json!({
            "head": {"vars": []},
            "results": {"bindings": bindings}
        }))
        .map_err(|e| SparqlError::InvalidResults(e.to_string()))
    }

    fn term_binding(term: &Term) -> serde_json::Value {
        match term {
            Term::Iri(iri) => serde_json::json!({"type": "uri", "value": iri.as_ref()}),
            Term::Blank(label) => serde_json::json!({"type": "bnode", "value": label.as_ref()}),
            Term::Literal(lit) => {
                let mut obj = serde_json::json!({"type": "literal", "value": lit.lexical.as_ref()});
                if let Some(lang) = &lit.language {
                    obj["xml:lang"] = serde_json::json!(lang.as_ref());
                } else {
                    obj["datatype"] = serde_json::json!(lit.datatype.as_ref());
                }
                obj
            }
        }
    }

    /// Bindings of every triple of one stored graph (`?s ?p ?o ?g`).
    fn graph_bindings(&self, dataset: &str, id: &str) -> serde_json::Value {
        let turtle = self
            .graphs
            .lock()
            .unwrap()
            .get(&(dataset.to_string(), id.to_string()))
            .cloned()
            .unwrap_or_default();
        let graph = shapedex_graph_turtle::parse(&turtle).unwrap_or_default();
        let rows: Vec<serde_json::Value> = graph
            .iter()
            .map(|t| {
                serde_json::json!({
                    "s": Self::term_binding(&t.s),
                    "p": Self::term_binding(&t.p),
                    "o": Self::term_binding(&t.o),
                    "g": {"type": "uri", "value": id},
                })
            })
            .collect();
        serde_json::json!(rows)
    }

    fn extract_between<'a>(haystack: &'a str, prefix: &str) -> Option<&'a str> {
        let start = haystack.find(prefix)? + prefix.len();
        let end = haystack[start..].find('>')? + start;
        Some(&haystack[start..end])
    }
}

#[async_trait]
impl TripleStore for MemoryStore {
    async fn ensure_dataset(&self, _dataset: &str) -> SparqlResult<()> {
        Ok(())
    }

    async fn graph_exists(&self, dataset: &str, id: &str) -> SparqlResult<bool> {
        Ok(self
            .graphs
            .lock()
            .unwrap()
            .contains_key(&(dataset.to_string(), id.to_string())))
    }

    async fn load_graph(&self, dataset: &str, id: &str) -> SparqlResult<String> {
        self.graphs
            .lock()
            .unwrap()
            .get(&(dataset.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| SparqlError::NotFound {
                dataset: dataset.to_string(),
                graph: id.to_string(),
            })
    }

    async fn upload_graph(&self, dataset: &str, id: &str, turtle: &str) -> SparqlResult<()> {
        self.put_graph(dataset, id, turtle).await;
        Ok(())
    }

    async fn create_graph(&self, dataset: &str, id: &str, turtle: &str) -> SparqlResult<()> {
        if self.graph_exists(dataset, id).await? {
            return Err(SparqlError::Conflict {
                dataset: dataset.to_string(),
                graph: id.to_string(),
            });
        }
        self.put_graph(dataset, id, turtle).await;
        Ok(())
    }

    async fn delete_graph(&self, dataset: &str, id: &str) -> SparqlResult<()> {
        self.graphs
            .lock()
            .unwrap()
            .remove(&(dataset.to_string(), id.to_string()));
        Ok(())
    }

    async fn select(&self, dataset: &str, query: &str) -> SparqlResult<SelectResults> {
        // canned answers take precedence
        {
            let canned = self.canned_selects.lock().unwrap();
            if let Some((_, bindings)) = canned.iter().find(|(needle, _)| query.contains(needle)) {
                return Self::results_from_bindings(bindings.clone());
            }
        }

        // profile hash lookup
        if query.contains("?hash") {
            let id = Self::extract_between(query, "{ <").unwrap_or_default();
            let bindings = match self.hashes.lock().unwrap().get(id) {
                Some(hash) => serde_json::json!([
                    {"hash": {"type": "literal", "value": hash.to_string()}}
                ]),
                None => serde_json::json!([]),
            };
            return Self::results_from_bindings(bindings);
        }

        // whole-graph scan: SELECT ... WHERE { GRAPH <id> { ?s ?p ?o } }
        if let Some(id) = Self::extract_between(query, "GRAPH <") {
            return Self::results_from_bindings(self.graph_bindings(dataset, id));
        }

        Self::results_from_bindings(serde_json::json!([]))
    }

    async fn ask(&self, dataset: &str, query: &str) -> SparqlResult<bool> {
        // incoming-link probe: ASK { GRAPH ?g { ?s ?p <subject> } FILTER (?g != <exclude>) }
        if let Some(subject) = Self::extract_between(query, "?s ?p <") {
            let exclude = Self::extract_between(query, "?g != <").unwrap_or_default();
            let graphs = self.graphs.lock().unwrap().clone();
            for ((ds, id), turtle) in graphs {
                if ds != dataset || id == exclude {
                    continue;
                }
                let graph = shapedex_graph_turtle::parse(&turtle).unwrap_or_default();
                let target = Term::iri(subject);
                if graph.first(None, None, Some(&target)).is_some() {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        Ok(false)
    }

    async fn update(&self, dataset: &str, update: &str) -> SparqlResult<()> {
        self.updates
            .lock()
            .unwrap()
            .push((dataset.to_string(), update.to_string()));

        // profile hash bookkeeping
        if update.contains("checksumValue") {
            if let Some(id) = Self::extract_between(update, "{ <") {
                if update.starts_with("INSERT DATA") {
                    if let Some(hash) = update
                        .rsplit(' ')
                        .find_map(|tok| tok.trim_end_matches([' ', '.', '}']).parse::<u32>().ok())
                    {
                        self.hashes.lock().unwrap().insert(id.to_string(), hash);
                    }
                } else if update.starts_with("DELETE WHERE") {
                    self.hashes.lock().unwrap().remove(id);
                }
            }
        } else if update.starts_with("DROP") {
            if let Some(id) = Self::extract_between(update, "GRAPH <") {
                self.graphs
                    .lock()
                    .unwrap()
                    .remove(&(dataset.to_string(), id.to_string()));
            }
        }
        Ok(())
    }

    async fn list_graph_names(&self, dataset: &str) -> SparqlResult<Vec<String>> {
        let mut names: Vec<String> = self
            .graphs
            .lock()
            .unwrap()
            .keys()
            .filter(|(ds, _)| ds == dataset)
            .map(|(_, id)| id.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Validator fake returning a fixed conformance map.
#[derive(Default)]
pub struct StubValidator {
    conformance: Conformance,
    pub calls: Mutex<Vec<String>>,
}

impl StubValidator {
    pub fn conforming(entries: &[(&str, &str)]) -> Self {
        Self {
            conformance: entries
                .iter()
                .map(|(s, shape)| (s.to_string(), shape.to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ShaclValidator for StubValidator {
    async fn validate(
        &self,
        _shapes_graph: &str,
        _shape_id: &str,
        data_graph: &str,
        _data_id: &str,
    ) -> ShaclResult<Conformance> {
        self.calls.lock().unwrap().push(data_graph.to_string());
        Ok(self.conformance.clone())
    }
}

/// Fetcher fake serving canned bodies by URL.
#[derive(Default)]
pub struct StubFetcher {
    bodies: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl StubFetcher {
    pub fn with(urls: &[(&str, &str)]) -> Self {
        Self {
            bodies: Mutex::new(
                urls.iter()
                    .map(|(u, b)| (u.to_string(), b.as_bytes().to_vec()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl UrlFetcher for StubFetcher {
    async fn fetch(&self, url: &str, _accept: &str) -> CatalogResult<Vec<u8>> {
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| crate::error::CatalogError::Fetch {
                url: url.to_string(),
                status: 404,
                body: "not stubbed".to_string(),
            })
    }
}
