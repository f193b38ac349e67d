//! Search-engine client: nested-document updates, delete-by-root, and
//! collection/schema administration.
//!
//! The engine is treated as a schemaless nested-document service: a fixed
//! set of base fields is registered on collection creation, dynamic-suffix
//! fields materialize on first use, and a `* -> _text_` copy-field feeds
//! full-text search.

use crate::error::{Result, SearchError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Search engine configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub collection: String,
    pub num_shards: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8983".to_string(),
            collection: "rdf".to_string(),
            num_shards: 1,
        }
    }
}

/// Operations the indexer needs from the engine.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Whether the collection exists and the engine is reachable.
    async fn collection_exists(&self) -> Result<bool>;

    /// Drop and rebuild the collection with the base schema.
    async fn recreate_collection(&self) -> Result<()>;

    /// Submit one (nested) document and commit.
    async fn update_doc(&self, doc: &Value) -> Result<()>;

    /// Remove every document under `container_<id>` and commit.
    async fn delete_by_root(&self, id: &str) -> Result<()>;
}

/// Wait for the engine, creating the collection when missing.
///
/// With `force_recreate` the collection is dropped and rebuilt
/// unconditionally. Otherwise the engine is probed once per second for up
/// to 30 attempts before giving up.
pub async fn init(search: &dyn SearchIndex, force_recreate: bool) -> Result<()> {
    if force_recreate {
        return search.recreate_collection().await;
    }
    const MAX_ATTEMPTS: u32 = 30;
    for attempt in 1..=MAX_ATTEMPTS {
        match search.collection_exists().await {
            Ok(true) => return Ok(()),
            Ok(false) => return search.recreate_collection().await,
            Err(err) => {
                warn!(attempt, max_attempts = MAX_ATTEMPTS, error = %err, "search engine not ready yet");
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    Err(SearchError::NotReady {
        attempts: MAX_ATTEMPTS,
    })
}

/// Reqwest-backed Solr-style client.
pub struct SolrClient {
    config: SearchConfig,
    http: reqwest::Client,
}

impl SolrClient {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn check(&self, context: &str, url: &str, resp: reqwest::Response) -> Result<Value> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Upstream {
                context: context.to_string(),
                url: url.to_string(),
                status,
                body: body.trim().to_string(),
            });
        }
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if let Some(msg) = body.pointer("/error/msg").and_then(|m| m.as_str()) {
            return Err(SearchError::Engine(msg.to_string()));
        }
        Ok(body)
    }

    async fn admin(&self, context: &str, action_query: &str) -> Result<Value> {
        let url = format!(
            "{}/solr/admin/collections?{}&wt=json",
            self.config.endpoint, action_query
        );
        let resp = self.http.get(&url).send().await?;
        self.check(context, &url, resp).await
    }

    async fn post_update(&self, context: &str, body: &Value) -> Result<()> {
        let url = format!(
            "{}/solr/{}/update",
            self.config.endpoint, self.config.collection
        );
        let resp = self.http.post(&url).json(body).send().await?;
        self.check(context, &url, resp).await?;
        Ok(())
    }

    async fn post_schema(&self, context: &str, body: &Value) -> Result<()> {
        let url = format!(
            "{}/solr/{}/schema",
            self.config.endpoint, self.config.collection
        );
        let resp = self.http.post(&url).json(body).send().await?;
        self.check(context, &url, resp).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.post_update("commit", &json!({"commit": {}})).await
    }

    /// Base fields present on every collection; dynamic-suffix fields are
    /// created by the engine on first use.
    fn base_schema() -> Value {
        json!({
            "add-field": [
                {"name": "label", "type": "string", "multiValued": true},
                {"name": "shape", "type": "string", "multiValued": true, "stored": true},
                {"name": "ref_shapes", "type": "string", "multiValued": true, "stored": true},
                {"name": "creator", "type": "string"},
                {"name": "docType", "type": "string", "stored": true},
                {"name": "_nest_parent_", "type": "string", "stored": true},
                {"name": "lastModified", "type": "pdate"}
            ]
        })
    }

    /// Enable WKT polygon indexing on the spatial field type (requires
    /// jts-core on the engine's classpath).
    fn location_field_patch() -> Value {
        json!({
            "replace-field-type": {
                "name": "location_rpt",
                "class": "solr.SpatialRecursivePrefixTreeFieldType",
                "spatialContextFactory": "JTS",
                "autoIndex": "true",
                "validationRule": "repairBuffer0",
                "distErrPct": "0.025",
                "maxDistErr": "0.001",
                "distanceUnits": "kilometers"
            }
        })
    }
}

#[async_trait]
impl SearchIndex for SolrClient {
    async fn collection_exists(&self) -> Result<bool> {
        let body = self.admin("list collections", "action=LIST").await?;
        let collections = body
            .get("collections")
            .and_then(|c| c.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(collections
            .iter()
            .any(|c| c.as_str() == Some(self.config.collection.as_str())))
    }

    async fn recreate_collection(&self) -> Result<()> {
        debug!(collection = %self.config.collection, "recreating search collection");
        if let Err(err) = self
            .admin(
                "delete collection",
                &format!("action=DELETE&name={}", self.config.collection),
            )
            .await
        {
            warn!(error = %err, "collection couldn't be deleted");
        }
        self.admin(
            "create collection",
            &format!(
                "action=CREATE&name={}&numShards={}",
                self.config.collection, self.config.num_shards
            ),
        )
        .await?;
        self.post_schema("add base fields", &Self::base_schema())
            .await?;
        self.post_schema(
            "add copy field",
            &json!({"add-copy-field": {"source": "*", "dest": "_text_"}}),
        )
        .await?;
        self.post_schema("patch location field", &Self::location_field_patch())
            .await?;
        Ok(())
    }

    async fn update_doc(&self, doc: &Value) -> Result<()> {
        self.post_update("update document", &json!({"add": {"doc": doc}}))
            .await?;
        self.commit().await
    }

    async fn delete_by_root(&self, id: &str) -> Result<()> {
        let query = format!("_root_:\"container_{}\"", id);
        self.post_update("delete documents", &json!({"delete": {"query": query}}))
            .await?;
        self.commit().await
    }
}
