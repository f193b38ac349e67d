//! IRI validation for SPARQL interpolation.
//!
//! Every IRI interpolated into a query string must pass this check first;
//! anything else is rejected before a request leaves the process.

/// Check a value against a `scheme:opaque` grammar.
///
/// The scheme must be ASCII-alphabetic followed by alphanumerics or
/// `+ - .`; the remainder must be non-empty and free of characters that
/// could break out of a `<...>` IRI reference in a query (whitespace,
/// angle brackets, quotes, braces, backslash, control characters).
pub fn is_valid_iri(value: &str) -> bool {
    let Some(colon) = value.find(':') else {
        return false;
    };
    let (scheme, opaque) = (&value[..colon], &value[colon + 1..]);

    if scheme.is_empty() || opaque.is_empty() {
        return false;
    }
    if !scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    if !scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    {
        return false;
    }
    opaque.chars().all(|c| {
        !matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' | '\x00'..='\x20')
    })
}

/// Validate an IRI, returning it on success.
pub fn validate_iri(value: &str) -> crate::error::Result<&str> {
    if is_valid_iri(value) {
        Ok(value)
    } else {
        Err(crate::error::SparqlError::InvalidIri(value.to_string()))
    }
}
