//! End-to-end synchronization behavior against in-memory fakes.

use async_trait::async_trait;
use serde_json::{json, Value};
use shapedex_catalog::test_support::{MemoryStore, StubFetcher, StubValidator};
use shapedex_catalog::{LabelStore, LinkResolver, MetadataStore, ResourceStore};
use shapedex_search::{Indexer, Result as SearchResult, SearchIndex};
use shapedex_shacl::{ProfileStore, SharedProfiles};
use shapedex_sparql::Datasets;
use shapedex_sync::{ProfileCandidate, ProfileSource, Synchronizer};
use shapedex_vocab::geo;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StaticSource {
    candidates: Mutex<Vec<ProfileCandidate>>,
}

impl StaticSource {
    fn set(&self, candidates: Vec<(&str, &str)>) {
        *self.candidates.lock().unwrap() = candidates
            .into_iter()
            .map(|(base_url, definition)| ProfileCandidate {
                base_url: base_url.to_string(),
                definition: definition.to_string(),
            })
            .collect();
    }
}

#[async_trait]
impl ProfileSource for StaticSource {
    async fn candidates(&self) -> shapedex_sync::Result<Vec<ProfileCandidate>> {
        Ok(self.candidates.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct StubSearch {
    events: Mutex<Vec<String>>,
    docs: Mutex<Vec<Value>>,
}

#[async_trait]
impl SearchIndex for StubSearch {
    async fn collection_exists(&self) -> SearchResult<bool> {
        Ok(true)
    }
    async fn recreate_collection(&self) -> SearchResult<()> {
        Ok(())
    }
    async fn update_doc(&self, doc: &Value) -> SearchResult<()> {
        self.events.lock().unwrap().push("update".to_string());
        self.docs.lock().unwrap().push(doc.clone());
        Ok(())
    }
    async fn delete_by_root(&self, id: &str) -> SearchResult<()> {
        self.events.lock().unwrap().push(format!("delete:{id}"));
        Ok(())
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    source: Arc<StaticSource>,
    search: Arc<StubSearch>,
    sync: Synchronizer,
}

fn fixture(fetcher: StubFetcher) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let profiles = SharedProfiles::new();
    let profile_store = Arc::new(ProfileStore::new(store.clone(), "profile", profiles));

    let validator = Arc::new(StubValidator::conforming(&[(
        "http://ex/b1",
        "http://ex/Book",
    )]));
    let metadata = Arc::new(MetadataStore::new(
        store.clone(),
        Datasets::default(),
        validator,
        profile_store.clone(),
        LinkResolver::new(store.clone(), "resource", "http://data/"),
    ));
    let resources = Arc::new(ResourceStore::new(
        store.clone(),
        Datasets::default(),
        metadata,
        Arc::new(LinkResolver::new(store.clone(), "resource", "http://data/")),
    ));
    let labels = Arc::new(LabelStore::new(
        store.clone(),
        Datasets::default(),
        Arc::new(fetcher),
    ));

    let search = Arc::new(StubSearch::default());
    let indexer = Arc::new(Indexer::new(search.clone(), geo::WKT_LITERAL));

    let source = Arc::new(StaticSource::default());
    let sync = Synchronizer::new(
        vec![source.clone()],
        profile_store,
        resources,
        labels,
        indexer,
    );
    Fixture {
        store,
        source,
        search,
        sync,
    }
}

const BOOK_V1: &str = "@base <http://ex/Book> .\n@prefix sh: <http://www.w3.org/ns/shacl#> .\n@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n<> a sh:NodeShape ;\n  sh:property [ sh:path <http://ex/title> ; sh:datatype xsd:string ; sh:maxCount 1 ] .\n";

async fn seed_resource(fx: &Fixture) {
    fx.store
        .put_graph(
            "resource",
            "http://ex/b1",
            "<http://ex/b1> <http://purl.org/dc/terms/conformsTo> <http://ex/Book> .\n<http://ex/b1> <http://ex/title> \"A\" .",
        )
        .await;
    fx.store
        .put_graph(
            "resourcemeta",
            "http://ex/b1",
            "<http://ex/b1> <http://purl.org/dc/terms/modified> \"2020-05-01T10:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime> .\n<http://ex/b1> <http://purl.org/dc/terms/creator> \"bob\" .\n<http://ex/b1> <http://purl.org/dc/terms/conformsTo> <http://ex/Book> .",
        )
        .await;
    fx.store.push_select(
        "<http://purl.org/dc/terms/conformsTo> <http://ex/Book>",
        json!([{"g": {"type": "uri", "value": "http://ex/b1"}}]),
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn new_profiles_are_uploaded_and_hashed() {
    let fx = fixture(StubFetcher::default());
    fx.source.set(vec![("http://ex/Book", BOOK_V1)]);

    fx.sync.synchronize().await;

    let stored = fx.store.graph("profile", "http://ex/Book").await.unwrap();
    assert!(stored.contains("http://www.w3.org/ns/shacl#NodeShape"));
    // blank nodes never survive into stored profiles
    assert!(!stored.contains("_:"));
    assert!(fx.store.stored_hash("http://ex/Book").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_sync_without_changes_is_a_no_op() {
    let fx = fixture(StubFetcher::default());
    fx.source.set(vec![("http://ex/Book", BOOK_V1)]);

    fx.sync.synchronize().await;
    let updates_after_first = fx.store.updates_for("profile").len();
    let hash_after_first = fx.store.stored_hash("http://ex/Book");

    fx.sync.synchronize().await;
    assert_eq!(fx.store.updates_for("profile").len(), updates_after_first);
    assert_eq!(fx.store.stored_hash("http://ex/Book"), hash_after_first);
    assert!(fx.search.events.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn changed_profiles_trigger_reindex_preserving_last_modified() {
    let fx = fixture(StubFetcher::default());
    seed_resource(&fx).await;
    fx.source.set(vec![("http://ex/Book", BOOK_V1)]);
    fx.sync.synchronize().await;
    assert!(fx.search.events.lock().unwrap().is_empty());

    // any byte change flips the hash, even whitespace
    let changed = format!("{}\n", BOOK_V1);
    fx.source.set(vec![("http://ex/Book", &changed)]);
    fx.sync.synchronize().await;

    let events = fx.search.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec!["delete:http://ex/b1".to_string(), "update".to_string()]
    );

    // metadata was rebuilt with the historical timestamp
    let meta = fx.store.graph("resourcemeta", "http://ex/b1").await.unwrap();
    assert!(meta.contains("2020-05-01T10:00:00Z"));
    assert!(meta.contains("bob"));

    let docs = fx.search.docs.lock().unwrap();
    assert_eq!(docs[0]["lastModified"], "2020-05-01T10:00:00Z");
    assert_eq!(docs[0]["creator"], "bob");
}

#[tokio::test(flavor = "multi_thread")]
async fn vanished_profiles_are_deleted_with_their_hash() {
    let fx = fixture(StubFetcher::default());
    fx.source.set(vec![("http://ex/Book", BOOK_V1)]);
    fx.sync.synchronize().await;
    assert!(fx.store.graph("profile", "http://ex/Book").await.is_some());

    fx.source.set(vec![]);
    fx.sync.synchronize().await;

    assert!(fx.store.graph("profile", "http://ex/Book").await.is_none());
    assert!(fx.store.stored_hash("http://ex/Book").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn owl_imports_labels_are_fetched_once_and_cycles_terminate() {
    let fetcher = StubFetcher::with(&[
        (
            "http://tax/colors",
            r#"@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
               @prefix owl: <http://www.w3.org/2002/07/owl#> .
               <http://tax/colors> owl:imports <http://tax/shapes2> .
               <http://tax/colors/red> skos:prefLabel "red"@en ."#,
        ),
        (
            "http://tax/shapes2",
            r#"@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
               @prefix owl: <http://www.w3.org/2002/07/owl#> .
               <http://tax/shapes2> owl:imports <http://tax/colors> .
               <http://tax/shapes2/blue> skos:prefLabel "blue"@en ."#,
        ),
    ]);
    let fx = fixture(fetcher);

    let definition = format!(
        "{}<> <http://www.w3.org/2002/07/owl#imports> <http://tax/colors> .\n",
        BOOK_V1
    );
    fx.source.set(vec![("http://ex/Book", &definition)]);
    fx.sync.synchronize().await;

    assert!(fx.store.graph("label", "http://tax/colors").await.is_some());
    assert!(fx.store.graph("label", "http://tax/shapes2").await.is_some());
}
