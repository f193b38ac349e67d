//! Daemon configuration.
//!
//! Every option is settable as a flag or through the environment variable
//! the deployment contract names. Paths under `--local-dir` follow the
//! conventional layout: `profiles/` for local profile inputs,
//! `datagraph/` for bootstrap resources, `cache/` for the URL fetch cache.

use clap::Parser;
use shapedex_search::SearchConfig;
use shapedex_sparql::{Datasets, StoreConfig};
use std::path::PathBuf;

/// shapedex metadata store daemon
#[derive(Parser, Debug, Clone)]
#[command(name = "shapedex")]
#[command(about = "SHACL-profiled RDF metadata store with faceted search projection")]
pub struct Args {
    /// Triple store base URL
    #[arg(long, env = "FUSEKI_ENDPOINT", default_value = "http://localhost:3030")]
    pub fuseki_endpoint: String,

    /// Triple store management user
    #[arg(long, env = "FUSEKI_USER", default_value = "admin")]
    pub fuseki_user: String,

    /// Triple store management password
    #[arg(long, env = "FUSEKI_PASSWORD", default_value = "secret")]
    pub fuseki_password: String,

    /// Dataset holding resource graphs
    #[arg(long, env = "FUSEKI_RESOURCE_DATASET", default_value = "resource")]
    pub resource_dataset: String,

    /// Dataset holding resource metadata graphs
    #[arg(long, env = "FUSEKI_RESOURCE_META_DATASET", default_value = "resourcemeta")]
    pub resource_meta_dataset: String,

    /// Dataset holding profile graphs
    #[arg(long, env = "FUSEKI_PROFILE_DATASET", default_value = "profile")]
    pub profile_dataset: String,

    /// Dataset holding extracted label graphs
    #[arg(long, env = "FUSEKI_LABEL_DATASET", default_value = "label")]
    pub label_dataset: String,

    /// SHACL validator service URL
    #[arg(long, env = "VALIDATOR_ENDPOINT", default_value = "http://localhost:8000")]
    pub validator_endpoint: String,

    /// Search engine base URL
    #[arg(long, env = "SOLR_ENDPOINT", default_value = "http://localhost:8983")]
    pub solr_endpoint: String,

    /// Search collection name
    #[arg(long, env = "SOLR_INDEX", default_value = "rdf")]
    pub solr_index: String,

    /// Search collection shard count
    #[arg(long, env = "SOLR_NUM_SHARDS", default_value_t = 1)]
    pub solr_num_shards: u32,

    /// Namespace whose IRIs are treated as links between stored resources
    #[arg(long, env = "RDF_NAMESPACE", default_value = "http://example.org/")]
    pub rdf_namespace: String,

    /// Comma-separated taxonomy URLs whose labels are imported at startup
    #[arg(long, env = "RDF_STANDARD_TAXONOMIES", default_value = "")]
    pub rdf_standard_taxonomies: String,

    /// Whether local/profiles/*.ttl participates in profile sync
    #[arg(
        long,
        env = "LOCAL_PROFILES_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub local_profiles_enabled: bool,

    /// Whether the remote metadata profile service participates in sync
    #[arg(
        long,
        env = "MPS_ENABLED",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub mps_enabled: bool,

    /// Remote metadata profile service endpoint
    #[arg(
        long,
        env = "MPS_ENDPOINT",
        default_value = "https://pg4aims.ulb.tu-darmstadt.de/AIMS/application-profiles"
    )]
    pub mps_endpoint: String,

    /// Remote profile query
    #[arg(long, env = "MPS_QUERY", default_value = "")]
    pub mps_query: String,

    /// Remote profile language
    #[arg(long, env = "MPS_LANGUAGE", default_value = "EN")]
    pub mps_language: String,

    /// Remote profile community filter
    #[arg(long, env = "MPS_COMMUNITY", default_value = "")]
    pub mps_community: String,

    /// Cron expression for scheduled profile sync; empty disables scheduling
    #[arg(long, env = "CRON", default_value = "")]
    pub cron: String,

    /// Log threshold (ERROR, WARN, INFO, DEBUG, TRACE)
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Base directory for local inputs and the fetch cache
    #[arg(long, default_value = "local")]
    pub local_dir: PathBuf,
}

impl Args {
    pub fn datasets(&self) -> Datasets {
        Datasets {
            resource: self.resource_dataset.clone(),
            resource_meta: self.resource_meta_dataset.clone(),
            profile: self.profile_dataset.clone(),
            label: self.label_dataset.clone(),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            endpoint: self.fuseki_endpoint.clone(),
            user: self.fuseki_user.clone(),
            password: self.fuseki_password.clone(),
            datasets: self.datasets(),
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            endpoint: self.solr_endpoint.clone(),
            collection: self.solr_index.clone(),
            num_shards: self.solr_num_shards,
        }
    }

    /// Fully assembled remote profile query URL.
    pub fn mps_url(&self) -> String {
        format!(
            "{}/?query={}&language={}&community={}&includeDefinition=true",
            self.mps_endpoint, self.mps_query, self.mps_language, self.mps_community
        )
    }

    /// Configured standard taxonomy URLs.
    pub fn standard_taxonomies(&self) -> Vec<String> {
        self.rdf_standard_taxonomies
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.local_dir.join("profiles")
    }

    pub fn datagraph_dir(&self) -> PathBuf {
        self.local_dir.join("datagraph")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.local_dir.join("cache")
    }

    /// `tracing` filter directive for the configured log level.
    pub fn log_filter(&self) -> String {
        match self.log_level.to_uppercase().as_str() {
            "ERROR" => "error",
            "WARN" | "WARNING" => "warn",
            "DEBUG" => "debug",
            "TRACE" => "trace",
            _ => "info",
        }
        .to_string()
    }
}
