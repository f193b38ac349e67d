//! RDF triples

use crate::term::Term;
use crate::write::triple_line;
use serde::{Deserialize, Serialize};

/// A single RDF triple.
///
/// Subjects may be IRIs or blank nodes, predicates must be IRIs, objects may
/// be any term. The model does not enforce this statically; parsers do.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub s: Term,
    pub p: Term,
    pub o: Term,
}

impl Triple {
    /// Create a triple from its components.
    pub fn new(s: Term, p: Term, o: Term) -> Self {
        Self { s, p, o }
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&triple_line(self))
    }
}
