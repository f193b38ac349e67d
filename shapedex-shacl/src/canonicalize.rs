//! Blank-node canonicalization and profile content hashing.
//!
//! Profiles are addressed by IRI, and `sh:qualifiedValueShape` must be able
//! to reference a specific sub-shape, so blank nodes cannot survive into
//! stored profile graphs. Each upload rewrites every blank node to a fresh
//! `urn:<uuid>` IRI; the mapping is deterministic within one upload (the
//! same blank label maps to one IRI) and disjoint across uploads.
//!
//! The content hash that drives sync change detection is computed over the
//! pre-canonicalization bytes, so re-uploading identical payloads does not
//! look like a change.

use shapedex_graph_ir::{Graph, Term, Triple};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// IRI prefix for canonicalized blank nodes. Sub-profile registration keys
/// off this prefix.
pub const BLANK_NODE_PREFIX: &str = "urn:";

/// Rewrite every blank node in the graph to a fresh `urn:<uuid>` IRI.
pub fn replace_blank_nodes(graph: &Graph) -> Graph {
    let mut mappings: HashMap<String, Term> = HashMap::new();
    let mut replacement = |term: &Term| -> Term {
        match term {
            Term::Blank(label) => mappings
                .entry(label.to_string())
                .or_insert_with(|| {
                    Term::iri(format!("{}{}", BLANK_NODE_PREFIX, uuid::Uuid::new_v4()))
                })
                .clone(),
            other => other.clone(),
        }
    };

    let mut out = Graph::new();
    for triple in graph.iter() {
        out.add(Triple::new(
            replacement(&triple.s),
            triple.p.clone(),
            replacement(&triple.o),
        ));
    }
    out
}

/// Stable 32-bit content hash (leading bytes of SHA-256).
pub fn content_hash(data: &[u8]) -> u32 {
    let digest = Sha256::digest(data);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapedex_graph_turtle::parse;

    #[test]
    fn blank_nodes_are_replaced_consistently() {
        let graph = parse(
            r#"
            @prefix ex: <http://ex/> .
            _:b ex:p ex:x .
            _:b ex:q ex:y .
            ex:z ex:r _:b .
        "#,
        )
        .unwrap();
        let canonical = replace_blank_nodes(&graph);

        assert!(canonical.iter().all(|t| !t.s.is_blank() && !t.o.is_blank()));

        // the one blank label must map to exactly one IRI
        let subjects: std::collections::BTreeSet<_> = canonical
            .iter()
            .filter(|t| t.s.raw().starts_with(BLANK_NODE_PREFIX))
            .map(|t| t.s.raw().to_string())
            .collect();
        assert_eq!(subjects.len(), 1);
        let object = canonical
            .first(Some(&Term::iri("http://ex/z")), None, None)
            .unwrap()
            .o
            .raw();
        assert!(subjects.contains(object));
    }

    #[test]
    fn distinct_labels_get_distinct_iris() {
        let graph = parse(
            r#"
            @prefix ex: <http://ex/> .
            _:a ex:p ex:x .
            _:b ex:p ex:y .
        "#,
        )
        .unwrap();
        let canonical = replace_blank_nodes(&graph);
        let subjects: std::collections::BTreeSet<_> =
            canonical.iter().map(|t| t.s.raw().to_string()).collect();
        assert_eq!(subjects.len(), 2);
    }

    #[test]
    fn uploads_are_disjoint() {
        let graph = parse("@prefix ex: <http://ex/> . _:a ex:p ex:x .").unwrap();
        let first = replace_blank_nodes(&graph);
        let second = replace_blank_nodes(&graph);
        assert_ne!(
            first.iter().next().unwrap().s,
            second.iter().next().unwrap().s
        );
    }

    #[test]
    fn hash_is_stable_and_input_sensitive() {
        let a = content_hash(b"profile body");
        assert_eq!(a, content_hash(b"profile body"));
        assert_ne!(a, content_hash(b"profile body "));
    }
}
