//! RDF terms: IRI, blank node, and literal
//!
//! # Invariants
//!
//! - `Term::Iri` always holds a fully expanded IRI, never a prefixed form.
//! - Literal lexical forms are preserved verbatim; no value-space
//!   normalization happens here.
//! - A literal with a language tag implicitly has datatype `rdf:langString`.

use crate::write::escape_literal;
use serde::{Deserialize, Serialize};
use shapedex_vocab::{rdf, xsd};
use std::sync::Arc;

/// An RDF term in subject, predicate, or object position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// Full expanded IRI (e.g. "http://purl.org/dc/terms/title")
    Iri(Arc<str>),

    /// Blank node label (without the `_:` prefix)
    Blank(Arc<str>),

    /// Literal with verbatim lexical form
    Literal(Literal),
}

/// A literal value: lexical form, datatype IRI, optional language tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    /// The lexical form, exactly as written in the source
    pub lexical: Arc<str>,
    /// Datatype IRI; `xsd:string` for plain literals, `rdf:langString` when
    /// a language tag is present
    pub datatype: Arc<str>,
    /// Language tag (lowercased region form as written, e.g. "en", "de-AT")
    pub language: Option<Arc<str>>,
}

impl Term {
    /// Create an IRI term from an expanded IRI string.
    pub fn iri(iri: impl AsRef<str>) -> Self {
        Term::Iri(Arc::from(iri.as_ref()))
    }

    /// Create a blank node term from a label (without `_:`).
    pub fn blank(label: impl AsRef<str>) -> Self {
        Term::Blank(Arc::from(label.as_ref()))
    }

    /// Create a plain string literal (`xsd:string`).
    pub fn string(lexical: impl AsRef<str>) -> Self {
        Term::typed(lexical, xsd::STRING)
    }

    /// Create a typed literal.
    pub fn typed(lexical: impl AsRef<str>, datatype: impl AsRef<str>) -> Self {
        Term::Literal(Literal {
            lexical: Arc::from(lexical.as_ref()),
            datatype: Arc::from(datatype.as_ref()),
            language: None,
        })
    }

    /// Create a language-tagged string literal (`rdf:langString`).
    pub fn lang_string(lexical: impl AsRef<str>, lang: impl AsRef<str>) -> Self {
        Term::Literal(Literal {
            lexical: Arc::from(lexical.as_ref()),
            datatype: Arc::from(rdf::LANG_STRING),
            language: Some(Arc::from(lang.as_ref())),
        })
    }

    /// Check if this is an IRI term.
    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    /// Check if this is a blank node.
    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    /// Check if this is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Try to get as IRI string.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Try to get literal components.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// The raw textual content of the term: the IRI without brackets, the
    /// blank label without `_:`, or the literal lexical form.
    pub fn raw(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Blank(label) => label,
            Term::Literal(lit) => &lit.lexical,
        }
    }
}

impl std::fmt::Display for Term {
    /// N-Triples rendering of the term.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", escape_literal(&lit.lexical))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{}", lang)
                } else if lit.datatype.as_ref() != xsd::STRING {
                    write!(f, "^^<{}>", lit.datatype)
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_and_accessors() {
        let iri = Term::iri("http://example.org/a");
        assert!(iri.is_iri());
        assert_eq!(iri.as_iri(), Some("http://example.org/a"));
        assert_eq!(iri.raw(), "http://example.org/a");

        let blank = Term::blank("b0");
        assert!(blank.is_blank());
        assert_eq!(blank.raw(), "b0");

        let lit = Term::lang_string("Apfel", "de");
        let parts = lit.as_literal().unwrap();
        assert_eq!(parts.lexical.as_ref(), "Apfel");
        assert_eq!(parts.datatype.as_ref(), rdf::LANG_STRING);
        assert_eq!(parts.language.as_deref(), Some("de"));
    }

    #[test]
    fn display_is_ntriples() {
        assert_eq!(
            Term::iri("http://example.org/a").to_string(),
            "<http://example.org/a>"
        );
        assert_eq!(Term::blank("b1").to_string(), "_:b1");
        assert_eq!(Term::string("hi").to_string(), "\"hi\"");
        assert_eq!(Term::lang_string("hi", "en").to_string(), "\"hi\"@en");
        assert_eq!(
            Term::typed("42", xsd::INTEGER).to_string(),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn display_escapes_literals() {
        assert_eq!(
            Term::string("line1\nline2 \"x\"").to_string(),
            "\"line1\\nline2 \\\"x\\\"\""
        );
    }

    #[test]
    fn lexical_forms_survive_verbatim() {
        // "007" must not be normalized to "7"
        let lit = Term::typed("007", xsd::INTEGER);
        assert_eq!(lit.raw(), "007");
    }
}
