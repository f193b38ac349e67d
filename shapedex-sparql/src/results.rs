//! SPARQL 1.1 JSON results model.
//!
//! Covers the two response shapes the store produces: SELECT results with
//! `head`/`results.bindings`, and ASK results with `boolean`.

use crate::error::{Result, SparqlError};
use serde::Deserialize;
use shapedex_graph_ir::{quad_line, Term, Triple};
use std::collections::BTreeMap;

/// Decoded SELECT results.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectResults {
    #[serde(default)]
    pub head: Head,
    pub results: Bindings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bindings {
    pub bindings: Vec<BTreeMap<String, BoundTerm>>,
}

/// One bound RDF term in a results row.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundTerm {
    #[serde(rename = "type")]
    pub term_type: String,
    pub value: String,
    #[serde(rename = "xml:lang")]
    pub lang: Option<String>,
    pub datatype: Option<String>,
}

impl BoundTerm {
    /// Convert to a graph-IR term.
    ///
    /// `typed-literal` is the legacy spelling some engines still emit.
    pub fn to_term(&self) -> Result<Term> {
        match self.term_type.as_str() {
            "uri" => Ok(Term::iri(&self.value)),
            "bnode" => Ok(Term::blank(&self.value)),
            "literal" | "typed-literal" => Ok(match (&self.lang, &self.datatype) {
                (Some(lang), _) => Term::lang_string(&self.value, lang),
                (None, Some(dt)) => Term::typed(&self.value, dt),
                (None, None) => Term::string(&self.value),
            }),
            other => Err(SparqlError::InvalidResults(format!(
                "unknown term type '{}' in binding",
                other
            ))),
        }
    }
}

impl SelectResults {
    /// Extract one variable as a list of term values (IRIs as raw strings).
    pub fn column(&self, var: &str) -> Result<Vec<String>> {
        self.results
            .bindings
            .iter()
            .map(|row| {
                row.get(var)
                    .map(|b| b.value.clone())
                    .ok_or_else(|| {
                        SparqlError::InvalidResults(format!("binding missing variable '{}'", var))
                    })
            })
            .collect()
    }
}

/// Convert `?s ?p ?o ?g` SELECT results into N-Quads text.
///
/// Rows missing any of the four variables are rejected.
pub fn results_to_nquads(results: &SelectResults) -> Result<String> {
    let mut out = String::new();
    for row in &results.results.bindings {
        let quad = ["s", "p", "o", "g"]
            .map(|var| row.get(var).map(BoundTerm::to_term));
        let [Some(s), Some(p), Some(o), Some(g)] = quad else {
            return Err(SparqlError::InvalidResults(
                "quad binding missing one of ?s ?p ?o ?g".to_string(),
            ));
        };
        let (s, p, o, g) = (s?, p?, o?, g?);
        let triple = Triple::new(s, p, o);
        out.push_str(&quad_line(&triple, g.raw()));
        out.push('\n');
    }
    Ok(out)
}

/// Decode an ASK response body.
pub fn decode_ask(body: &serde_json::Value) -> Result<bool> {
    body.get("boolean")
        .and_then(|b| b.as_bool())
        .ok_or_else(|| SparqlError::InvalidResults("ASK response has no boolean field".to_string()))
}
