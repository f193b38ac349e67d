//! Turtle lexer built on winnow.
//!
//! Tokenizes a Turtle document into payload-carrying tokens. Numeric
//! literals keep their raw text so lexical forms survive into the graph
//! unchanged. Fails fast on the first lexical error with line/column
//! context.

use std::sync::Arc;

use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt, peek, preceded};
use winnow::error::ContextError;
use winnow::stream::{AsChar, Location, Stream};
use winnow::token::{any, one_of, take_till, take_while};
use winnow::{LocatingSlice, ModalResult, Parser};

use crate::error::{Result, TurtleError};

/// Input type for the lexer - tracks position for error reporting.
type Input<'a> = LocatingSlice<&'a str>;

/// A token with its start byte offset.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
}

/// Kind of numeric literal, preserving the Turtle grammar distinction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Decimal,
    Double,
}

/// Token kinds for Turtle.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// Full IRI: `<http://example.org/>` (content without angle brackets)
    Iri(Arc<str>),
    /// Prefixed name `prefix:local`; the bare namespace form `prefix:` has
    /// an empty local part
    PrefixedName { prefix: Arc<str>, local: Arc<str> },
    /// Labeled blank node: `_:name`
    BlankLabel(Arc<str>),
    /// Anonymous blank node: `[]`
    Anon,
    /// Empty collection: `()`
    Nil,
    /// String literal (escapes already applied)
    Str(Arc<str>),
    /// Numeric literal with its raw text
    Numeric { text: Arc<str>, kind: NumericKind },
    /// Language tag without the `@`
    LangTag(Arc<str>),
    /// `@prefix` / `PREFIX`
    KwPrefix,
    /// `@base` / `BASE`
    KwBase,
    /// `a`
    KwA,
    /// `true` / `false`
    Boolean(bool),
    /// `^^`
    DoubleCaret,
    Dot,
    Comma,
    Semicolon,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Eof,
}

/// Tokenize a Turtle document.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut stream = LocatingSlice::new(input);

    loop {
        skip_ws_and_comments(&mut stream);

        if stream.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                start: stream.current_token_start(),
            });
            break;
        }

        let start = stream.current_token_start();
        match next_token(&mut stream) {
            Ok(kind) => tokens.push(Token { kind, start }),
            Err(_) => return Err(lex_error(input, start)),
        }
    }

    Ok(tokens)
}

/// Build a descriptive lexer error with line/column and source context.
fn lex_error(input: &str, position: usize) -> TurtleError {
    let bad_char = input[position..].chars().next().unwrap_or('?');
    let (line, col) = line_col(input, position);
    let line_content = input.lines().nth(line.saturating_sub(1)).unwrap_or("");
    let message = if bad_char == '"' || bad_char == '\'' {
        format!(
            "unterminated string literal at line {line}, column {col}: {line_content}"
        )
    } else if bad_char == '<' {
        format!("invalid or unterminated IRI at line {line}, column {col}: {line_content}")
    } else {
        format!("unexpected character '{bad_char}' at line {line}, column {col}: {line_content}")
    };
    TurtleError::Lexer { position, message }
}

/// Convert a byte position to 1-indexed (line, column).
fn line_col(input: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in input.char_indices() {
        if i >= position {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn skip_ws_and_comments(input: &mut Input<'_>) {
    loop {
        let _: ModalResult<&str, ContextError> = take_while(0.., is_ws).parse_next(input);
        if input.starts_with('#') {
            let _: ModalResult<&str, ContextError> =
                take_till(0.., |c| c == '\n' || c == '\r').parse_next(input);
        } else {
            break;
        }
    }
}

fn next_token(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        parse_double_caret,
        parse_iri_ref,
        parse_blank_label,
        parse_anon,
        parse_nil,
        parse_at_directive,
        parse_default_prefixed,
        parse_word,
        parse_string_literal,
        parse_numeric,
        parse_punctuation,
    ))
    .parse_next(input)
}

// ---------------------------------------------------------------------------
// character classes (Turtle grammar, shared with SPARQL)
// ---------------------------------------------------------------------------

fn is_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_pn_chars_base(c: char) -> bool {
    matches!(c,
        'A'..='Z' |
        'a'..='z' |
        '\u{00C0}'..='\u{00D6}' |
        '\u{00D8}'..='\u{00F6}' |
        '\u{00F8}'..='\u{02FF}' |
        '\u{0370}'..='\u{037D}' |
        '\u{037F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' |
        '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' |
        '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' |
        '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

fn is_pn_chars_u(c: char) -> bool {
    is_pn_chars_base(c) || c == '_'
}

fn is_pn_chars(c: char) -> bool {
    is_pn_chars_u(c)
        || c == '-'
        || c.is_ascii_digit()
        || c == '\u{00B7}'
        || matches!(c, '\u{0300}'..='\u{036F}' | '\u{203F}'..='\u{2040}')
}

fn is_iri_char(c: char) -> bool {
    !matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' | '\x00'..='\x20')
}

// ---------------------------------------------------------------------------
// IRIs
// ---------------------------------------------------------------------------

fn parse_iri_ref(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    delimited('<', parse_iri_content, '>')
        .map(|s: String| TokenKind::Iri(Arc::from(s)))
        .parse_next(input)
}

fn parse_iri_content(input: &mut Input<'_>) -> ModalResult<String> {
    let mut result = String::new();

    loop {
        let chunk: &str = take_while(0.., is_iri_char).parse_next(input)?;
        result.push_str(chunk);

        if input.is_empty() || input.starts_with('>') {
            break;
        }

        if input.starts_with('\\') {
            '\\'.parse_next(input)?;
            let c = parse_unicode_escape(input)?;
            result.push(c);
        } else {
            return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
        }
    }

    // empty IRIs are allowed (relative reference to base)
    Ok(result)
}

fn parse_unicode_escape(input: &mut Input<'_>) -> ModalResult<char> {
    let marker: char = one_of(['u', 'U']).parse_next(input)?;
    let len = if marker == 'u' { 4 } else { 8 };
    let hex: &str = take_while(len..=len, AsChar::is_hex_digit).parse_next(input)?;
    let code = u32::from_str_radix(hex, 16)
        .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))?;
    char::from_u32(code).ok_or_else(|| winnow::error::ErrMode::Backtrack(ContextError::new()))
}

// ---------------------------------------------------------------------------
// directives and prefixed names
// ---------------------------------------------------------------------------

fn parse_at_directive(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    '@'.parse_next(input)?;
    let word: &str =
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)?;
    match word.to_lowercase().as_str() {
        "prefix" => Ok(TokenKind::KwPrefix),
        "base" => Ok(TokenKind::KwBase),
        _ => Ok(TokenKind::LangTag(Arc::from(word))),
    }
}

/// `:local` or bare `:` (default prefix).
fn parse_default_prefixed(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    ':'.parse_next(input)?;
    let local = opt(parse_pn_local).parse_next(input)?;
    Ok(TokenKind::PrefixedName {
        prefix: Arc::from(""),
        local: Arc::from(local.unwrap_or_default().as_str()),
    })
}

/// A bare word: keyword (`a`, `true`, `false`, `PREFIX`, `BASE`) or a
/// prefixed name `prefix:local`.
fn parse_word(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let start = input.checkpoint();

    let first: char = any.parse_next(input)?;
    if !is_pn_chars_base(first) {
        input.reset(&start);
        return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
    }

    let mut word = String::new();
    word.push(first);
    loop {
        let chunk: &str = take_while(0.., is_pn_chars).parse_next(input)?;
        word.push_str(chunk);
        // interior dots are allowed in PN_PREFIX when followed by PN_CHARS
        if input.starts_with('.') {
            let rest = &input.as_ref()[1..];
            if rest.chars().next().is_some_and(is_pn_chars) {
                '.'.parse_next(input)?;
                word.push('.');
                continue;
            }
        }
        break;
    }

    if peek(opt(':')).parse_next(input)?.is_some() {
        ':'.parse_next(input)?;
        let local = opt(parse_pn_local).parse_next(input)?;
        Ok(TokenKind::PrefixedName {
            prefix: Arc::from(word.as_str()),
            local: Arc::from(local.unwrap_or_default().as_str()),
        })
    } else {
        match word.as_str() {
            "a" => Ok(TokenKind::KwA),
            "true" => Ok(TokenKind::Boolean(true)),
            "false" => Ok(TokenKind::Boolean(false)),
            "PREFIX" => Ok(TokenKind::KwPrefix),
            "BASE" => Ok(TokenKind::KwBase),
            _ => {
                input.reset(&start);
                Err(winnow::error::ErrMode::Backtrack(ContextError::new()))
            }
        }
    }
}

fn parse_pn_local(input: &mut Input<'_>) -> ModalResult<String> {
    let first = input
        .chars()
        .next()
        .ok_or_else(|| winnow::error::ErrMode::Backtrack(ContextError::new()))?;
    if !(is_pn_chars_u(first) || first == ':' || first.is_ascii_digit() || first == '%' || first == '\\')
    {
        return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
    }

    let mut result = String::new();
    loop {
        let chunk: &str =
            take_while(0.., |c: char| is_pn_chars(c) || c == ':').parse_next(input)?;
        result.push_str(chunk);

        if input.is_empty() {
            break;
        }

        if input.starts_with('.') {
            let rest = &input.as_ref()[1..];
            if rest
                .chars()
                .next()
                .is_some_and(|c| is_pn_chars(c) || c == ':' || c == '%' || c == '\\')
            {
                '.'.parse_next(input)?;
                result.push('.');
                continue;
            }
            break;
        }

        if input.starts_with('%') {
            '%'.parse_next(input)?;
            let hex: &str = take_while(2..=2, AsChar::is_hex_digit).parse_next(input)?;
            result.push('%');
            result.push_str(hex);
        } else if input.starts_with('\\') {
            '\\'.parse_next(input)?;
            let escaped: char = any.parse_next(input)?;
            if "_~.-!$&'()*+,;=/?#@%".contains(escaped) {
                result.push(escaped);
            } else {
                return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
            }
        } else {
            break;
        }
    }

    if result.is_empty() {
        return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// blank nodes and collections
// ---------------------------------------------------------------------------

fn parse_blank_label(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    preceded("_:", parse_blank_name)
        .map(|name: &str| TokenKind::BlankLabel(Arc::from(name)))
        .parse_next(input)
}

fn parse_blank_name<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    let result: &str = (
        take_while(1, |c: char| is_pn_chars_u(c) || c.is_ascii_digit()),
        take_while(0.., |c: char| is_pn_chars(c) || c == '.'),
    )
        .take()
        .parse_next(input)?;
    if result.ends_with('.') {
        return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
    }
    Ok(result)
}

fn parse_anon(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    ('[', take_while(0.., is_ws), ']')
        .map(|_| TokenKind::Anon)
        .parse_next(input)
}

fn parse_nil(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    ('(', take_while(0.., is_ws), ')')
        .map(|_| TokenKind::Nil)
        .parse_next(input)
}

// ---------------------------------------------------------------------------
// string literals
// ---------------------------------------------------------------------------

fn parse_string_literal(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        delimited("\"\"\"", |i: &mut Input<'_>| long_string_content(i, '"'), "\"\"\""),
        delimited("'''", |i: &mut Input<'_>| long_string_content(i, '\''), "'''"),
        delimited('"', |i: &mut Input<'_>| short_string_content(i, '"'), '"'),
        delimited('\'', |i: &mut Input<'_>| short_string_content(i, '\''), '\''),
    ))
    .map(|s: String| TokenKind::Str(Arc::from(s)))
    .parse_next(input)
}

fn short_string_content(input: &mut Input<'_>, quote: char) -> ModalResult<String> {
    let mut result = String::new();
    loop {
        let chunk: &str =
            take_while(0.., |c| c != quote && c != '\\' && c != '\n' && c != '\r')
                .parse_next(input)?;
        result.push_str(chunk);

        if input.is_empty() || input.starts_with(quote) {
            break;
        }

        if input.starts_with('\\') {
            '\\'.parse_next(input)?;
            result.push(parse_escape_char(input)?);
        } else {
            break;
        }
    }
    Ok(result)
}

fn long_string_content(input: &mut Input<'_>, quote: char) -> ModalResult<String> {
    let closer = if quote == '"' { "\"\"\"" } else { "'''" };
    let mut result = String::new();
    loop {
        let chunk: &str = take_while(0.., |c| c != quote && c != '\\').parse_next(input)?;
        result.push_str(chunk);

        if input.is_empty() || input.starts_with(closer) {
            break;
        }

        if input.starts_with('\\') {
            '\\'.parse_next(input)?;
            result.push(parse_escape_char(input)?);
        } else if input.starts_with(quote) {
            let c: char = any.parse_next(input)?;
            result.push(c);
        } else {
            break;
        }
    }
    Ok(result)
}

fn parse_escape_char(input: &mut Input<'_>) -> ModalResult<char> {
    let c: char = any.parse_next(input)?;
    match c {
        't' => Ok('\t'),
        'b' => Ok('\x08'),
        'n' => Ok('\n'),
        'r' => Ok('\r'),
        'f' => Ok('\x0C'),
        '"' => Ok('"'),
        '\'' => Ok('\''),
        '\\' => Ok('\\'),
        'u' | 'U' => {
            let len = if c == 'u' { 4 } else { 8 };
            let hex: &str = take_while(len..=len, AsChar::is_hex_digit).parse_next(input)?;
            let code = u32::from_str_radix(hex, 16)
                .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))?;
            char::from_u32(code)
                .ok_or_else(|| winnow::error::ErrMode::Backtrack(ContextError::new()))
        }
        _ => Err(winnow::error::ErrMode::Backtrack(ContextError::new())),
    }
}

// ---------------------------------------------------------------------------
// numerics - raw text is preserved
// ---------------------------------------------------------------------------

fn parse_numeric(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((parse_double, parse_decimal, parse_integer)).parse_next(input)
}

fn parse_integer(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let text: &str = (opt(one_of(['+', '-'])), digit1).take().parse_next(input)?;

    if peek(opt(one_of(['e', 'E']))).parse_next(input)?.is_some() {
        return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
    }
    if input.starts_with('.') {
        let rest = &input.as_ref()[1..];
        if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
        }
    }

    Ok(TokenKind::Numeric {
        text: Arc::from(text),
        kind: NumericKind::Integer,
    })
}

fn parse_decimal(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let text: &str = (
        opt(one_of(['+', '-'])),
        alt(((digit1, '.', digit1).take(), ('.', digit1).take())),
    )
        .take()
        .parse_next(input)?;

    if peek(opt(one_of(['e', 'E']))).parse_next(input)?.is_some() {
        return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
    }

    Ok(TokenKind::Numeric {
        text: Arc::from(text),
        kind: NumericKind::Decimal,
    })
}

fn parse_double(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let text: &str = (
        opt(one_of(['+', '-'])),
        alt(((digit1, '.', opt(digit1)).take(), ('.', digit1).take(), digit1)),
        one_of(['e', 'E']),
        opt(one_of(['+', '-'])),
        digit1,
    )
        .take()
        .parse_next(input)?;

    Ok(TokenKind::Numeric {
        text: Arc::from(text),
        kind: NumericKind::Double,
    })
}

// ---------------------------------------------------------------------------
// operators and punctuation
// ---------------------------------------------------------------------------

fn parse_double_caret(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    "^^".map(|_| TokenKind::DoubleCaret).parse_next(input)
}

fn parse_punctuation(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    any.verify_map(|c| match c {
        '.' => Some(TokenKind::Dot),
        ',' => Some(TokenKind::Comma),
        ';' => Some(TokenKind::Semicolon),
        '[' => Some(TokenKind::LBracket),
        ']' => Some(TokenKind::RBracket),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        _ => None,
    })
    .parse_next(input)
}
