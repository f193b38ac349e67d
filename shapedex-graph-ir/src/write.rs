//! N-Triples / N-Quads emission helpers

use crate::triple::Triple;

#[cfg(test)]
use crate::term::Term;

/// Escape special characters for a double-quoted literal.
///
/// Handles `\` `"` newline, carriage return, and tab.
pub fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Render a triple as one N-Triples statement (no trailing newline).
pub fn triple_line(t: &Triple) -> String {
    format!("{} {} {} .", t.s, t.p, t.o)
}

/// Render a triple as one N-Quads statement in the given named graph.
pub fn quad_line(t: &Triple, graph_name: &str) -> String {
    format!("{} {} {} <{}> .", t.s, t.p, t.o, graph_name)
}
