//! RDF term, triple, and graph model for shapedex
//!
//! A deliberately small in-memory representation: terms keep their lexical
//! forms verbatim, graphs are triple multisets with pattern-matching
//! accessors, and serialization targets N-Triples / N-Quads (both valid
//! Turtle input for the stores this feeds).

pub mod graph;
pub mod term;
pub mod triple;
pub mod write;

pub use graph::Graph;
pub use term::{Literal, Term};
pub use triple::Triple;
pub use write::{escape_literal, quad_line, triple_line};
