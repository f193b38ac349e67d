//! Turtle parser for shapedex.
//!
//! Parses Turtle documents into `shapedex_graph_ir::Graph`. Collections are
//! expanded into `rdf:first`/`rdf:rest` chains, relative IRIs are resolved
//! against `@base`, and literal lexical forms are preserved verbatim.
//!
//! # Example
//!
//! ```
//! let turtle = r#"
//!     @prefix ex: <http://example.org/> .
//!     ex:alice ex:name "Alice" .
//! "#;
//! let graph = shapedex_graph_turtle::parse(turtle).unwrap();
//! assert_eq!(graph.len(), 1);
//! ```

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{Result, TurtleError};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::parse;

/// Parse a Turtle document supplied as bytes.
///
/// Convenience for call sites holding raw upload payloads; the bytes must
/// be valid UTF-8.
pub fn parse_bytes(input: &[u8]) -> Result<shapedex_graph_ir::Graph> {
    let text = std::str::from_utf8(input).map_err(|e| TurtleError::Lexer {
        position: e.valid_up_to(),
        message: format!("input is not valid UTF-8: {}", e),
    })?;
    parse(text)
}
