//! Label extraction and lookup behavior.

use serde_json::json;
use shapedex_catalog::test_support::{MemoryStore, StubFetcher};
use shapedex_catalog::LabelStore;
use shapedex_sparql::Datasets;
use std::sync::Arc;

fn label_store(store: Arc<MemoryStore>, fetcher: StubFetcher) -> LabelStore {
    LabelStore::new(store, Datasets::default(), Arc::new(fetcher))
}

#[tokio::test]
async fn extracts_literal_labels_into_the_label_dataset() {
    let store = Arc::new(MemoryStore::new());
    let labels = label_store(store.clone(), StubFetcher::default());

    let graph = shapedex_graph_turtle::parse(
        r#"
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix dcterms: <http://purl.org/dc/terms/> .
        @prefix ex: <http://ex/> .
        ex:x rdfs:label "Apfel"@de ;
             dcterms:title "apple"@en ;
             ex:ignored "not a label" .
    "#,
    )
    .unwrap();
    labels
        .extract_labels("http://ex/x", &graph, false)
        .await
        .unwrap();

    let stored = store.graph("label", "http://ex/x").await.unwrap();
    assert!(stored.contains("\"Apfel\"@de"));
    assert!(stored.contains("\"apple\"@en"));
    assert!(!stored.contains("not a label"));
    // every emitted triple is normalized onto rdfs:label
    assert!(!stored.contains("http://purl.org/dc/terms/title"));
}

#[tokio::test]
async fn graphs_without_labels_store_nothing() {
    let store = Arc::new(MemoryStore::new());
    let labels = label_store(store.clone(), StubFetcher::default());

    let graph =
        shapedex_graph_turtle::parse("<http://ex/x> <http://ex/p> <http://ex/y> .").unwrap();
    labels
        .extract_labels("http://ex/x", &graph, false)
        .await
        .unwrap();
    assert!(store.graph("label", "http://ex/x").await.is_none());
}

#[tokio::test]
async fn profile_extraction_emits_synthetic_tokens_and_prefixed_property_labels() {
    let store = Arc::new(MemoryStore::new());
    let labels = label_store(store.clone(), StubFetcher::default());

    let profile = shapedex_graph_turtle::parse(
        r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix dcterms: <http://purl.org/dc/terms/> .
        @prefix ex: <http://ex/> .

        ex:Book a sh:NodeShape ;
            dcterms:title "Book"@en ;
            sh:property <urn:author-prop> ;
            sh:property <urn:title-prop> .

        <urn:author-prop> sh:path ex:author ;
            sh:node ex:Person ;
            sh:name "Author"@en .

        <urn:title-prop> sh:path ex:title ;
            sh:name "Title"@en .
    "#,
    )
    .unwrap();
    labels
        .extract_labels("http://ex/Book", &profile, true)
        .await
        .unwrap();

    let stored = store.graph("label", "http://ex/Book").await.unwrap();
    // the node shape's own label lands under its normalized token
    assert!(stored.contains("<:http___ex_book>"));
    // a property under sh:node gets the shape label prefixed
    assert!(stored.contains("\"Book > Author\"@en"));
    // a plain property keeps its own label
    assert!(stored.contains("<:urn_title_prop>"));
    assert!(stored.contains("\"Title\"@en"));
    assert!(!stored.contains("Book > Title"));
}

#[tokio::test]
async fn label_lookup_ranks_languages() {
    let store = Arc::new(MemoryStore::new());
    store.push_select(
        "VALUES ?id { <http://ex/x> }",
        json!([
            {"id": {"type": "uri", "value": "http://ex/x"},
             "label": {"type": "literal", "value": "Apfel", "xml:lang": "de"}},
            {"id": {"type": "uri", "value": "http://ex/x"},
             "label": {"type": "literal", "value": "apple", "xml:lang": "en"}}
        ]),
    );
    let labels = label_store(store, StubFetcher::default());

    // no French label: ranking falls through fr-CA, fr, then en
    let result = labels
        .get_labels("fr-CA", &["http://ex/x".to_string()])
        .await
        .unwrap();
    assert_eq!(result.get("http://ex/x").map(String::as_str), Some("apple"));

    let store = Arc::new(MemoryStore::new());
    store.push_select(
        "VALUES ?id { <http://ex/x> }",
        json!([
            {"id": {"type": "uri", "value": "http://ex/x"},
             "label": {"type": "literal", "value": "Apfel", "xml:lang": "de"}},
            {"id": {"type": "uri", "value": "http://ex/x"},
             "label": {"type": "literal", "value": "apple", "xml:lang": "en"}}
        ]),
    );
    let labels = label_store(store, StubFetcher::default());
    let result = labels
        .get_labels("de", &["http://ex/x".to_string()])
        .await
        .unwrap();
    assert_eq!(result.get("http://ex/x").map(String::as_str), Some("Apfel"));
}

#[tokio::test]
async fn ids_without_labels_are_absent_from_the_result() {
    let store = Arc::new(MemoryStore::new());
    store.push_select("VALUES ?id", json!([]));
    let labels = label_store(store, StubFetcher::default());

    let result = labels
        .get_labels("en", &["http://ex/missing".to_string()])
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn unranked_languages_never_win() {
    let store = Arc::new(MemoryStore::new());
    store.push_select(
        "VALUES ?id",
        json!([
            {"id": {"type": "uri", "value": "http://ex/x"},
             "label": {"type": "literal", "value": "jabłko", "xml:lang": "pl"}}
        ]),
    );
    let labels = label_store(store, StubFetcher::default());
    let result = labels
        .get_labels("en", &["http://ex/x".to_string()])
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn imports_labels_from_url_under_the_url_graph() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::with(&[(
        "http://taxonomies.example/colors",
        r#"@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
           <http://taxonomies.example/colors/red> skos:prefLabel "red"@en ."#,
    )]);
    let labels = label_store(store.clone(), fetcher);

    labels
        .import_labels_from_url("http://taxonomies.example/colors")
        .await
        .unwrap();
    let stored = store
        .graph("label", "http://taxonomies.example/colors")
        .await
        .unwrap();
    assert!(stored.contains("\"red\"@en"));
}
