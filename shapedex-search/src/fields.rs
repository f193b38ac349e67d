//! Deterministic field naming and datatype-to-suffix mapping.
//!
//! Every indexed value lands in a field named
//! `<token(shape)>.<token(property)>_<suffix>`, where the token form is
//! the shared normalization from the label extractor. Distinct
//! (shape, property) pairs yield distinct tokens for the IRI schemes in
//! use, so collisions cannot arise by construction.

use shapedex_catalog::clean_token;
use shapedex_shacl::Property;
use shapedex_vocab::{sh, xsd};

/// Dynamic-field suffix for a property, given the configured geo datatype.
pub fn field_suffix(property: &Property, geo_datatype: &str) -> &'static str {
    // fixed single values are plain text
    if property.has_value && property.max_count == 1 {
        return "t";
    }
    // enumerations and IRI references facet as strings
    if property.has_in || property.node_kind.as_deref() == Some(sh::IRI) {
        return "ss";
    }
    match property.datatype.as_deref() {
        Some(dt) if dt == geo_datatype => "srpt",
        Some(xsd::STRING) => "t",
        Some(
            xsd::INTEGER | xsd::INT | xsd::SHORT | xsd::BYTE | xsd::UNSIGNED_INT
            | xsd::UNSIGNED_SHORT | xsd::UNSIGNED_BYTE,
        ) => "is",
        Some(xsd::LONG | xsd::UNSIGNED_LONG) => "ls",
        Some(xsd::FLOAT) => "fs",
        Some(xsd::DOUBLE | xsd::DECIMAL) => "ds",
        Some(xsd::DATE | xsd::DATE_TIME) => "dts",
        Some(xsd::BOOLEAN) => "bs",
        _ => "t",
    }
}

/// Full dynamic field name for a (shape, property) pair.
pub fn field_name(shape: &str, property_id: &str, suffix: &str) -> String {
    format!("{}.{}_{}", clean_token(shape), clean_token(property_id), suffix)
}

/// Lexical fix-up for date values: pure dates gain a midnight time, and
/// zone-less timestamps gain a trailing `Z`.
pub fn fixup_datetime(value: &str) -> String {
    match value.len() {
        10 => format!("{}T00:00:00Z", value),
        19 => format!("{}Z", value),
        _ => value.to_string(),
    }
}
