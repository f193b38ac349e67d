//! Turtle parser producing a `Graph`.
//!
//! Recursive descent over the token stream. Collections are expanded into
//! `rdf:first`/`rdf:rest` chains so RDF list consumers (SHACL `sh:and`,
//! `sh:or`, `sh:in`) see the standard triples.

use std::collections::HashMap;

use shapedex_graph_ir::{Graph, Term};
use shapedex_vocab::{rdf, xsd};

use crate::error::{Result, TurtleError};
use crate::lexer::{tokenize, NumericKind, Token, TokenKind};

/// Parse a Turtle document into a graph.
pub fn parse(input: &str) -> Result<Graph> {
    Parser::new(input)?.parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    prefixes: HashMap<String, String>,
    base: Option<String>,
    graph: Graph,
    /// Counter for anonymous blank nodes (`[]`, property lists, list cells).
    gen_count: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
            prefixes: HashMap::new(),
            base: None,
            graph: Graph::new(),
            gen_count: 0,
        })
    }

    fn parse(mut self) -> Result<Graph> {
        while !self.at_end() {
            self.parse_statement()?;
        }
        Ok(self.graph)
    }

    // -----------------------------------------------------------------------
    // token navigation
    // -----------------------------------------------------------------------

    fn at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind) {
            self.advance();
            Ok(())
        } else {
            Err(TurtleError::parse(
                self.current().start,
                format!("expected {:?}, found {:?}", kind, self.current().kind),
            ))
        }
    }

    fn fresh_blank(&mut self) -> Term {
        let term = Term::blank(format!("genid{}", self.gen_count));
        self.gen_count += 1;
        term
    }

    // -----------------------------------------------------------------------
    // statements
    // -----------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<()> {
        match self.current().kind {
            TokenKind::KwPrefix => self.parse_prefix_directive(),
            TokenKind::KwBase => self.parse_base_directive(),
            TokenKind::Eof => Ok(()),
            _ => self.parse_triples(),
        }
    }

    fn parse_prefix_directive(&mut self) -> Result<()> {
        self.advance();

        let prefix = match &self.current().kind {
            TokenKind::PrefixedName { prefix, local } if local.is_empty() => prefix.to_string(),
            other => {
                return Err(TurtleError::parse(
                    self.current().start,
                    format!("expected prefix namespace, found {:?}", other),
                ))
            }
        };
        self.advance();

        let namespace = match &self.current().kind {
            TokenKind::Iri(iri) => self.resolve_iri(iri)?,
            other => {
                return Err(TurtleError::parse(
                    self.current().start,
                    format!("expected IRI for prefix namespace, found {:?}", other),
                ))
            }
        };
        self.advance();

        self.prefixes.insert(prefix, namespace);

        // `@prefix` requires a trailing dot, SPARQL-style `PREFIX` omits it
        if matches!(self.current().kind, TokenKind::Dot) {
            self.advance();
        }
        Ok(())
    }

    fn parse_base_directive(&mut self) -> Result<()> {
        self.advance();

        let base = match &self.current().kind {
            TokenKind::Iri(iri) => iri.to_string(),
            other => {
                return Err(TurtleError::parse(
                    self.current().start,
                    format!("expected IRI for base, found {:?}", other),
                ))
            }
        };
        self.advance();
        self.base = Some(base);

        if matches!(self.current().kind, TokenKind::Dot) {
            self.advance();
        }
        Ok(())
    }

    fn parse_triples(&mut self) -> Result<()> {
        let subject = self.parse_subject()?;
        self.parse_predicate_object_list(&subject)?;
        self.expect(&TokenKind::Dot)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // terms
    // -----------------------------------------------------------------------

    fn parse_subject(&mut self) -> Result<Term> {
        match self.current().kind.clone() {
            TokenKind::Iri(iri) => {
                self.advance();
                Ok(Term::iri(self.resolve_iri(&iri)?))
            }
            TokenKind::PrefixedName { prefix, local } => {
                self.advance();
                Ok(Term::iri(self.expand_prefixed(&prefix, &local)?))
            }
            TokenKind::BlankLabel(label) => {
                self.advance();
                Ok(Term::blank(label.as_ref()))
            }
            TokenKind::Anon => {
                self.advance();
                Ok(self.fresh_blank())
            }
            TokenKind::LBracket => self.parse_blank_node_property_list(),
            TokenKind::LParen => self.parse_collection(),
            TokenKind::Nil => {
                self.advance();
                Ok(Term::iri(rdf::NIL))
            }
            other => Err(TurtleError::parse(
                self.current().start,
                format!("expected subject, found {:?}", other),
            )),
        }
    }

    fn parse_predicate(&mut self) -> Result<Term> {
        match self.current().kind.clone() {
            TokenKind::Iri(iri) => {
                self.advance();
                Ok(Term::iri(self.resolve_iri(&iri)?))
            }
            TokenKind::PrefixedName { prefix, local } => {
                self.advance();
                Ok(Term::iri(self.expand_prefixed(&prefix, &local)?))
            }
            TokenKind::KwA => {
                self.advance();
                Ok(Term::iri(rdf::TYPE))
            }
            other => Err(TurtleError::parse(
                self.current().start,
                format!("expected predicate, found {:?}", other),
            )),
        }
    }

    fn parse_object(&mut self) -> Result<Term> {
        match self.current().kind.clone() {
            TokenKind::Iri(_)
            | TokenKind::PrefixedName { .. }
            | TokenKind::BlankLabel(_)
            | TokenKind::Anon
            | TokenKind::LBracket
            | TokenKind::LParen
            | TokenKind::Nil => self.parse_subject(),
            TokenKind::Str(value) => {
                self.advance();
                self.parse_literal_suffix(&value)
            }
            TokenKind::Numeric { text, kind } => {
                self.advance();
                let datatype = match kind {
                    NumericKind::Integer => xsd::INTEGER,
                    NumericKind::Decimal => xsd::DECIMAL,
                    NumericKind::Double => xsd::DOUBLE,
                };
                Ok(Term::typed(text.as_ref(), datatype))
            }
            TokenKind::Boolean(b) => {
                self.advance();
                Ok(Term::typed(if b { "true" } else { "false" }, xsd::BOOLEAN))
            }
            other => Err(TurtleError::parse(
                self.current().start,
                format!("expected object, found {:?}", other),
            )),
        }
    }

    /// Handle the optional `@lang` or `^^datatype` suffix after a string.
    fn parse_literal_suffix(&mut self, value: &str) -> Result<Term> {
        match self.current().kind.clone() {
            TokenKind::LangTag(lang) => {
                self.advance();
                Ok(Term::lang_string(value, lang.as_ref()))
            }
            TokenKind::DoubleCaret => {
                self.advance();
                let datatype = match self.current().kind.clone() {
                    TokenKind::Iri(iri) => {
                        self.advance();
                        self.resolve_iri(&iri)?
                    }
                    TokenKind::PrefixedName { prefix, local } => {
                        self.advance();
                        self.expand_prefixed(&prefix, &local)?
                    }
                    other => {
                        return Err(TurtleError::parse(
                            self.current().start,
                            format!("expected datatype IRI, found {:?}", other),
                        ))
                    }
                };
                Ok(Term::typed(value, datatype))
            }
            _ => Ok(Term::string(value)),
        }
    }

    // -----------------------------------------------------------------------
    // grammar productions
    // -----------------------------------------------------------------------

    fn parse_predicate_object_list(&mut self, subject: &Term) -> Result<()> {
        loop {
            let predicate = self.parse_predicate()?;
            self.parse_object_list(subject, &predicate)?;

            if matches!(self.current().kind, TokenKind::Semicolon) {
                self.advance();
                // trailing semicolons before the closing token are legal
                if matches!(
                    self.current().kind,
                    TokenKind::Dot | TokenKind::RBracket | TokenKind::Eof
                ) {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn parse_object_list(&mut self, subject: &Term, predicate: &Term) -> Result<()> {
        loop {
            let object = self.parse_object()?;
            self.graph
                .add_triple(subject.clone(), predicate.clone(), object);

            if matches!(self.current().kind, TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(())
    }

    /// `[ predicate object ; ... ]`
    fn parse_blank_node_property_list(&mut self) -> Result<Term> {
        self.expect(&TokenKind::LBracket)?;
        let bnode = self.fresh_blank();
        if !matches!(self.current().kind, TokenKind::RBracket) {
            self.parse_predicate_object_list(&bnode)?;
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(bnode)
    }

    /// `( item1 item2 ... )` as an rdf:first/rdf:rest chain.
    fn parse_collection(&mut self) -> Result<Term> {
        self.expect(&TokenKind::LParen)?;

        if matches!(self.current().kind, TokenKind::RParen) {
            self.advance();
            return Ok(Term::iri(rdf::NIL));
        }

        let head = self.fresh_blank();
        let mut cell = head.clone();
        loop {
            let item = self.parse_object()?;
            self.graph
                .add_triple(cell.clone(), Term::iri(rdf::FIRST), item);

            if matches!(self.current().kind, TokenKind::RParen) {
                self.graph
                    .add_triple(cell, Term::iri(rdf::REST), Term::iri(rdf::NIL));
                break;
            }
            let next = self.fresh_blank();
            self.graph
                .add_triple(cell, Term::iri(rdf::REST), next.clone());
            cell = next;
        }

        self.expect(&TokenKind::RParen)?;
        Ok(head)
    }

    // -----------------------------------------------------------------------
    // IRI handling
    // -----------------------------------------------------------------------

    fn expand_prefixed(&self, prefix: &str, local: &str) -> Result<String> {
        match self.prefixes.get(prefix) {
            Some(namespace) => Ok(format!("{}{}", namespace, local)),
            None => Err(TurtleError::UndefinedPrefix(prefix.to_string())),
        }
    }

    /// Resolve a potentially relative IRI against the base (RFC 3986).
    fn resolve_iri(&self, reference: &str) -> Result<String> {
        if reference.is_empty() {
            return self
                .base
                .clone()
                .ok_or_else(|| TurtleError::IriResolution("empty IRI reference without base".into()));
        }
        if has_scheme(reference) {
            return Ok(reference.to_string());
        }

        let base = self.base.as_deref().ok_or_else(|| {
            TurtleError::IriResolution(format!("relative IRI '{}' without base", reference))
        })?;

        let (scheme, authority, base_path) = split_iri(base);

        if let Some(rest) = reference.strip_prefix("//") {
            return Ok(format!("{}://{}", scheme, rest));
        }
        if let Some(frag) = reference.strip_prefix('#') {
            return Ok(format!("{}#{}", base.split('#').next().unwrap_or(base), frag));
        }
        let merged = if reference.starts_with('/') {
            reference.to_string()
        } else {
            match base_path.rfind('/') {
                Some(pos) => format!("{}{}", &base_path[..=pos], reference),
                None => format!("/{}", reference),
            }
        };
        let path = remove_dot_segments(&merged);
        match authority {
            Some(auth) => Ok(format!("{}://{}{}", scheme, auth, path)),
            None => Ok(format!("{}:{}", scheme, path)),
        }
    }
}

/// Check for an RFC 3986 scheme prefix.
fn has_scheme(reference: &str) -> bool {
    match reference.find(':') {
        Some(pos) if pos > 0 => {
            let scheme = &reference[..pos];
            scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        _ => false,
    }
}

/// Split an absolute IRI into (scheme, authority, path-and-beyond).
fn split_iri(iri: &str) -> (&str, Option<&str>, &str) {
    let (scheme, rest) = match iri.find(':') {
        Some(pos) => (&iri[..pos], &iri[pos + 1..]),
        None => ("", iri),
    };
    if let Some(after) = rest.strip_prefix("//") {
        let end = after.find(['/', '?', '#']).unwrap_or(after.len());
        (scheme, Some(&after[..end]), &after[end..])
    } else {
        (scheme, None, rest)
    }
}

fn remove_dot_segments(path: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." => {}
            ".." => {
                output.pop();
            }
            s => output.push(s),
        }
    }
    let result = output.join("/");
    if path.starts_with('/') && !result.starts_with('/') {
        format!("/{}", result)
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapedex_graph_ir::Term;

    #[test]
    fn simple_triple() {
        let g = parse(r#"<http://ex/alice> <http://ex/name> "Alice" ."#).unwrap();
        assert_eq!(g.len(), 1);
        let t = g.iter().next().unwrap();
        assert_eq!(t.s, Term::iri("http://ex/alice"));
        assert_eq!(t.o, Term::string("Alice"));
    }

    #[test]
    fn prefix_expansion() {
        let g = parse(
            r#"
            @prefix ex: <http://ex/> .
            ex:alice ex:knows ex:bob .
        "#,
        )
        .unwrap();
        let t = g.iter().next().unwrap();
        assert_eq!(t.s, Term::iri("http://ex/alice"));
        assert_eq!(t.o, Term::iri("http://ex/bob"));
    }

    #[test]
    fn a_keyword_is_rdf_type() {
        let g = parse("@prefix ex: <http://ex/> . ex:a a ex:Thing .").unwrap();
        assert_eq!(g.iter().next().unwrap().p, Term::iri(rdf::TYPE));
    }

    #[test]
    fn semicolons_and_commas() {
        let g = parse(
            r#"
            @prefix ex: <http://ex/> .
            ex:a ex:p "1" ; ex:q "2", "3" .
        "#,
        )
        .unwrap();
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn trailing_semicolon_tolerated() {
        let g = parse("@prefix ex: <http://ex/> . ex:a ex:p \"1\" ; .").unwrap();
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn blank_node_property_list() {
        let g = parse(
            r#"
            @prefix ex: <http://ex/> .
            ex:a ex:knows [ ex:name "Bob" ] .
        "#,
        )
        .unwrap();
        assert_eq!(g.len(), 2);
        let link = g
            .first(Some(&Term::iri("http://ex/a")), None, None)
            .unwrap();
        assert!(link.o.is_blank());
    }

    #[test]
    fn collections_expand_to_list_triples() {
        let g = parse(
            r#"
            @prefix ex: <http://ex/> .
            ex:a ex:items ( ex:x ex:y ) .
        "#,
        )
        .unwrap();
        // 1 link + 2 first + 2 rest
        assert_eq!(g.len(), 5);
        let first = Term::iri(rdf::FIRST);
        let rest = Term::iri(rdf::REST);
        assert_eq!(g.matching(None, Some(&first), None).count(), 2);
        let nil = Term::iri(rdf::NIL);
        assert_eq!(g.matching(None, Some(&rest), Some(&nil)).count(), 1);
    }

    #[test]
    fn typed_and_tagged_literals() {
        let g = parse(
            r#"
            @prefix ex: <http://ex/> .
            @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
            ex:a ex:born "2000-01-01"^^xsd:date ; ex:label "Apfel"@de .
        "#,
        )
        .unwrap();
        let date = g
            .iter()
            .find_map(|t| t.o.as_literal().filter(|l| l.language.is_none()))
            .unwrap();
        assert_eq!(date.datatype.as_ref(), xsd::DATE);
        let tagged = g
            .iter()
            .find_map(|t| t.o.as_literal().filter(|l| l.language.is_some()))
            .unwrap();
        assert_eq!(tagged.language.as_deref(), Some("de"));
    }

    #[test]
    fn numeric_literals_keep_lexical_form() {
        let g = parse("@prefix ex: <http://ex/> . ex:a ex:n 007 .").unwrap();
        let lit = g.iter().next().unwrap().o.as_literal().unwrap();
        assert_eq!(lit.lexical.as_ref(), "007");
        assert_eq!(lit.datatype.as_ref(), xsd::INTEGER);
    }

    #[test]
    fn boolean_objects() {
        let g = parse("@prefix ex: <http://ex/> . ex:a ex:flag true .").unwrap();
        let lit = g.iter().next().unwrap().o.as_literal().unwrap();
        assert_eq!(lit.lexical.as_ref(), "true");
        assert_eq!(lit.datatype.as_ref(), xsd::BOOLEAN);
    }

    #[test]
    fn base_resolution() {
        let g = parse(
            r#"
            @base <http://ex/path/> .
            <alice> <name> "Alice" .
            <../bob> <name> "Bob" .
            <> <name> "Doc" .
        "#,
        )
        .unwrap();
        let subjects: Vec<_> = g.iter().map(|t| t.s.raw().to_string()).collect();
        assert!(subjects.contains(&"http://ex/path/alice".to_string()));
        assert!(subjects.contains(&"http://ex/bob".to_string()));
        assert!(subjects.contains(&"http://ex/path/".to_string()));
    }

    #[test]
    fn sparql_style_directives() {
        let g = parse("PREFIX ex: <http://ex/>\nex:a ex:p ex:b .").unwrap();
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn undefined_prefix_is_an_error() {
        assert!(matches!(
            parse("ex:a ex:p ex:b ."),
            Err(TurtleError::UndefinedPrefix(_))
        ));
    }

    #[test]
    fn urn_base_resolution_keeps_scheme() {
        let g = parse("@base <urn:uuid:abc/> . <x> <p> <y> .").unwrap();
        let t = g.iter().next().unwrap();
        assert!(t.s.raw().starts_with("urn:"));
    }
}
