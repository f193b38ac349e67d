//! HTTP client for a SPARQL 1.1 triple store with named-graph datasets.
//!
//! Targets a Fuseki-compatible surface: `/$/stats` and `/$/datasets` for
//! dataset management, `POST /<ds>` for queries, `POST /<ds>/update` for
//! updates, and `POST /<ds>/data?graph=<iri>` (multipart) for Graph Store
//! Protocol uploads. Nothing vendor-specific beyond that is assumed.

use crate::error::{Result, SparqlError};
use crate::iri::validate_iri;
use crate::results::{decode_ask, SelectResults};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

/// Names of the four named-graph datasets the store uses.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub resource: String,
    pub resource_meta: String,
    pub profile: String,
    pub label: String,
}

impl Default for Datasets {
    fn default() -> Self {
        Self {
            resource: "resource".to_string(),
            resource_meta: "resourcemeta".to_string(),
            profile: "profile".to_string(),
            label: "label".to_string(),
        }
    }
}

impl Datasets {
    /// All dataset names, for startup bootstrap.
    pub fn all(&self) -> [&str; 4] {
        [
            &self.resource,
            &self.resource_meta,
            &self.profile,
            &self.label,
        ]
    }
}

/// Triple store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub user: String,
    pub password: String,
    pub datasets: Datasets,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3030".to_string(),
            user: "admin".to_string(),
            password: "secret".to_string(),
            datasets: Datasets::default(),
        }
    }
}

/// Hook invoked after a successful upload into the profile or resource
/// dataset. Used to regenerate derived label graphs; implementations log
/// their own failures.
#[async_trait]
pub trait GraphHook: Send + Sync {
    async fn graph_uploaded(&self, dataset: &str, id: &str, turtle: &str);
}

/// Dataset-scoped CRUD over named graphs.
#[async_trait]
pub trait TripleStore: Send + Sync {
    /// Create the dataset if the management endpoint does not know it.
    async fn ensure_dataset(&self, dataset: &str) -> Result<()>;

    /// ASK whether a named graph holds any triple.
    async fn graph_exists(&self, dataset: &str, id: &str) -> Result<bool>;

    /// Load a named graph as Turtle. `NotFound` when absent.
    async fn load_graph(&self, dataset: &str, id: &str) -> Result<String>;

    /// Replace a named graph (DROP + Graph Store Protocol upload).
    async fn upload_graph(&self, dataset: &str, id: &str, turtle: &str) -> Result<()>;

    /// Like `upload_graph`, but fails with `Conflict` when the graph exists.
    async fn create_graph(&self, dataset: &str, id: &str, turtle: &str) -> Result<()>;

    /// Drop a named graph.
    async fn delete_graph(&self, dataset: &str, id: &str) -> Result<()>;

    /// Run a SELECT query, decoding SPARQL JSON results.
    async fn select(&self, dataset: &str, query: &str) -> Result<SelectResults>;

    /// Run an ASK query.
    async fn ask(&self, dataset: &str, query: &str) -> Result<bool>;

    /// Run a SPARQL update.
    async fn update(&self, dataset: &str, update: &str) -> Result<()>;

    /// List the names of all non-empty named graphs in a dataset.
    async fn list_graph_names(&self, dataset: &str) -> Result<Vec<String>>;
}

/// Reqwest-backed client for a Fuseki-compatible triple store.
pub struct FusekiClient {
    config: StoreConfig,
    http: reqwest::Client,
    hook: RwLock<Option<Arc<dyn GraphHook>>>,
}

impl FusekiClient {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            hook: RwLock::new(None),
        }
    }

    /// Dataset names this client was configured with.
    pub fn datasets(&self) -> &Datasets {
        &self.config.datasets
    }

    /// Install the post-upload hook. Called once during wiring, after the
    /// label extractor (which itself needs this client) exists.
    pub fn set_graph_hook(&self, hook: Arc<dyn GraphHook>) {
        *self.hook.write() = Some(hook);
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.config.user, Some(&self.config.password))
    }

    fn derives_labels(&self, dataset: &str) -> bool {
        dataset == self.config.datasets.profile || dataset == self.config.datasets.resource
    }

    async fn query_raw(&self, dataset: &str, query: &str, accept: &str) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.config.endpoint, dataset);
        let resp = self
            .auth(self.http.post(&url))
            .header(reqwest::header::ACCEPT, accept)
            .form(&[("query", query)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SparqlError::from_response("query", &url, resp).await);
        }
        Ok(resp)
    }
}

#[async_trait]
impl TripleStore for FusekiClient {
    async fn ensure_dataset(&self, dataset: &str) -> Result<()> {
        let probe_url = format!("{}/$/stats/{}", self.config.endpoint, dataset);
        let resp = self.auth(self.http.get(&probe_url)).send().await?;
        if resp.status().is_success() {
            return Ok(());
        }

        let create_url = format!(
            "{}/$/datasets?dbName={}&dbType=TDB2",
            self.config.endpoint,
            urlencoding::encode(dataset)
        );
        let resp = self.auth(self.http.post(&create_url)).send().await?;
        if !resp.status().is_success() {
            return Err(SparqlError::from_response("create dataset", &create_url, resp).await);
        }
        Ok(())
    }

    async fn graph_exists(&self, dataset: &str, id: &str) -> Result<bool> {
        let id = validate_iri(id)?;
        self.ask(dataset, &format!("ASK WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }}", id))
            .await
    }

    async fn load_graph(&self, dataset: &str, id: &str) -> Result<String> {
        let id = validate_iri(id)?;
        if !self.graph_exists(dataset, id).await? {
            return Err(SparqlError::NotFound {
                dataset: dataset.to_string(),
                graph: id.to_string(),
            });
        }
        let query = format!(
            "CONSTRUCT {{ ?s ?p ?o }} WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }}",
            id
        );
        let resp = self.query_raw(dataset, &query, "text/turtle").await?;
        Ok(resp.text().await?)
    }

    async fn upload_graph(&self, dataset: &str, id: &str, turtle: &str) -> Result<()> {
        let id = validate_iri(id)?;
        self.delete_graph(dataset, id).await?;

        let url = format!(
            "{}/{}/data?graph={}",
            self.config.endpoint,
            dataset,
            urlencoding::encode(id)
        );
        let part = reqwest::multipart::Part::text(turtle.to_string())
            .file_name("graph.ttl")
            .mime_str("text/turtle")
            .map_err(SparqlError::Transport)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self.auth(self.http.post(&url)).multipart(form).send().await?;
        if !resp.status().is_success() {
            return Err(SparqlError::from_response("upload graph", &url, resp).await);
        }

        if self.derives_labels(dataset) {
            let hook = self.hook.read().clone();
            if let Some(hook) = hook {
                hook.graph_uploaded(dataset, id, turtle).await;
            }
        }
        Ok(())
    }

    async fn create_graph(&self, dataset: &str, id: &str, turtle: &str) -> Result<()> {
        if self.graph_exists(dataset, id).await? {
            return Err(SparqlError::Conflict {
                dataset: dataset.to_string(),
                graph: id.to_string(),
            });
        }
        self.upload_graph(dataset, id, turtle).await
    }

    async fn delete_graph(&self, dataset: &str, id: &str) -> Result<()> {
        let id = validate_iri(id)?;
        self.update(dataset, &format!("DROP SILENT GRAPH <{}>", id))
            .await?;

        // labels derived from this graph go with it
        if self.derives_labels(dataset) {
            let label_ds = self.config.datasets.label.clone();
            if let Err(err) = self
                .update(&label_ds, &format!("DROP SILENT GRAPH <{}>", id))
                .await
            {
                warn!(id, error = %err, "failed deleting labels extracted from graph");
            }
        }
        Ok(())
    }

    async fn select(&self, dataset: &str, query: &str) -> Result<SelectResults> {
        let resp = self
            .query_raw(dataset, query, "application/sparql-results+json")
            .await?;
        Ok(resp.json::<SelectResults>().await?)
    }

    async fn ask(&self, dataset: &str, query: &str) -> Result<bool> {
        let resp = self
            .query_raw(dataset, query, "application/sparql-results+json")
            .await?;
        let body = resp.json::<serde_json::Value>().await?;
        decode_ask(&body)
    }

    async fn update(&self, dataset: &str, update: &str) -> Result<()> {
        let url = format!("{}/{}/update", self.config.endpoint, dataset);
        let resp = self
            .auth(self.http.post(&url))
            .form(&[("update", update)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SparqlError::from_response("update", &url, resp).await);
        }
        Ok(())
    }

    async fn list_graph_names(&self, dataset: &str) -> Result<Vec<String>> {
        let results = self
            .select(dataset, "SELECT DISTINCT ?g WHERE { GRAPH ?g { } }")
            .await?;
        results.column("g")
    }
}
