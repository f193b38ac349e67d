//! SHACL NodeShape and Property object model.
//!
//! Shapes are parsed from profile graphs; properties sharing a path are
//! merged unless a qualified value shape is involved, because qualified
//! constraints describe sibling sub-shapes that must stay distinct.

use shapedex_graph_ir::Term;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A SHACL node shape (a profile, or a sub-shape of one).
#[derive(Debug, Clone, Default)]
pub struct NodeShape {
    /// Shape IRI
    pub id: String,
    /// Parent shape IRIs (`sh:node` targets plus `sh:and` list members)
    pub parents: BTreeSet<String>,
    /// Properties grouped by `sh:path` IRI
    pub properties: BTreeMap<String, Vec<Property>>,
    /// The serialized Turtle this shape was parsed from, retained for
    /// validator calls
    pub rdf: Arc<str>,
}

/// A SHACL property constraint.
#[derive(Debug, Clone)]
pub struct Property {
    /// The property node (an IRI after blank-node canonicalization)
    pub id: Term,
    /// `sh:path` IRI
    pub path: String,
    /// `sh:datatype` IRI
    pub datatype: Option<String>,
    /// `sh:node` targets plus `sh:and` / `sh:or` list members
    pub node_shapes: BTreeSet<String>,
    /// `sh:or` / `sh:xone` alternatives
    pub or: BTreeSet<String>,
    /// `sh:qualifiedValueShape` target
    pub qualified_value_shape: Option<String>,
    /// Synthetic shape built from the qualified target and its parents
    /// during denormalization
    pub qualified_value_shape_denormalized: Option<Box<NodeShape>>,
    /// `sh:qualifiedMinCount`
    pub qualified_min_count: i64,
    /// `sh:maxCount`
    pub max_count: i64,
    /// Presence of `sh:class`
    pub class: bool,
    /// Presence of `sh:in`
    pub has_in: bool,
    /// Presence of `sh:hasValue`
    pub has_value: bool,
    /// `sh:nodeKind` IRI
    pub node_kind: Option<String>,
    /// `dash:facet`
    pub facet: Option<bool>,
}

impl Property {
    /// A fresh property for the given node term.
    pub fn new(id: Term) -> Self {
        Self {
            id,
            path: String::new(),
            datatype: None,
            node_shapes: BTreeSet::new(),
            or: BTreeSet::new(),
            qualified_value_shape: None,
            qualified_value_shape_denormalized: None,
            qualified_min_count: 0,
            max_count: 0,
            class: false,
            has_in: false,
            has_value: false,
            node_kind: None,
            facet: None,
        }
    }

    /// Merge another property constraint on the same path into this one.
    ///
    /// Booleans OR-combine. `qualified_min_count` takes the max. `max_count`
    /// takes the min when both are positive, otherwise the max. Scalar
    /// fields prefer the other side when set. `node_shapes` unions.
    pub fn merge(&mut self, other: &Property) {
        self.has_in = self.has_in || other.has_in;
        self.class = self.class || other.class;
        self.has_value = self.has_value || other.has_value;
        self.qualified_min_count = self.qualified_min_count.max(other.qualified_min_count);
        if self.max_count > 0 && other.max_count > 0 {
            self.max_count = self.max_count.min(other.max_count);
        } else {
            self.max_count = self.max_count.max(other.max_count);
        }
        if other.node_kind.is_some() {
            self.node_kind = other.node_kind.clone();
        }
        if other.datatype.is_some() {
            self.datatype = other.datatype.clone();
        }
        if other.facet.is_some() {
            self.facet = other.facet;
        }
        self.node_shapes
            .extend(other.node_shapes.iter().cloned());
    }
}

impl NodeShape {
    /// A fresh shape with the given IRI.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Register a property, merging where the path already carries an
    /// unqualified constraint. Pathless properties are discarded.
    pub fn add_property(&mut self, property: Property) {
        if property.path.is_empty() {
            return;
        }
        if property.qualified_value_shape.is_none() {
            if let Some(existing) = self.property_without_qualified_shape_mut(&property.path) {
                existing.merge(&property);
                return;
            }
        }
        self.properties
            .entry(property.path.clone())
            .or_default()
            .push(property);
    }

    /// All properties carrying a qualified value shape with at least the
    /// given min count.
    pub fn qualified_properties(&self, min_count: i64) -> Vec<&Property> {
        self.properties
            .values()
            .flatten()
            .filter(|p| {
                p.qualified_value_shape.is_some() && p.qualified_min_count >= min_count
            })
            .collect()
    }

    fn property_without_qualified_shape_mut(&mut self, path: &str) -> Option<&mut Property> {
        self.properties
            .get_mut(path)?
            .iter_mut()
            .find(|p| p.qualified_value_shape.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(path: &str) -> Property {
        let mut p = Property::new(Term::iri(format!("urn:prop-{path}")));
        p.path = path.to_string();
        p
    }

    #[test]
    fn merge_boolean_flags_or_combine() {
        let mut a = prop("http://ex/p");
        a.has_in = true;
        let mut b = prop("http://ex/p");
        b.has_value = true;
        a.merge(&b);
        assert!(a.has_in);
        assert!(a.has_value);
        assert!(!a.class);
    }

    #[test]
    fn merge_max_count_prefers_min_when_both_positive() {
        let mut a = prop("http://ex/p");
        a.max_count = 5;
        let mut b = prop("http://ex/p");
        b.max_count = 2;
        a.merge(&b);
        assert_eq!(a.max_count, 2);

        let mut c = prop("http://ex/p");
        c.max_count = 0;
        let mut d = prop("http://ex/p");
        d.max_count = 3;
        c.merge(&d);
        assert_eq!(c.max_count, 3);
    }

    #[test]
    fn merge_scalars_other_wins_when_set() {
        let mut a = prop("http://ex/p");
        a.datatype = Some("http://www.w3.org/2001/XMLSchema#string".to_string());
        let mut b = prop("http://ex/p");
        b.datatype = Some("http://www.w3.org/2001/XMLSchema#date".to_string());
        b.facet = Some(true);
        a.merge(&b);
        assert_eq!(
            a.datatype.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#date")
        );
        assert_eq!(a.facet, Some(true));

        // unset on the other side leaves ours alone
        let c = prop("http://ex/p");
        a.merge(&c);
        assert_eq!(
            a.datatype.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#date")
        );
    }

    #[test]
    fn add_property_merges_same_path() {
        let mut shape = NodeShape::new("http://ex/Shape");
        let mut a = prop("http://ex/p");
        a.max_count = 1;
        let mut b = prop("http://ex/p");
        b.has_in = true;
        shape.add_property(a);
        shape.add_property(b);

        let props = &shape.properties["http://ex/p"];
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].max_count, 1);
        assert!(props[0].has_in);
    }

    #[test]
    fn qualified_properties_stay_siblings() {
        let mut shape = NodeShape::new("http://ex/Shape");
        let base = prop("http://ex/p");
        let mut qualified = prop("http://ex/p");
        qualified.qualified_value_shape = Some("http://ex/Sub".to_string());
        qualified.qualified_min_count = 1;
        shape.add_property(base);
        shape.add_property(qualified);

        assert_eq!(shape.properties["http://ex/p"].len(), 2);
        assert_eq!(shape.qualified_properties(1).len(), 1);
    }

    #[test]
    fn pathless_properties_are_discarded() {
        let mut shape = NodeShape::new("http://ex/Shape");
        shape.add_property(Property::new(Term::iri("urn:x")));
        assert!(shape.properties.is_empty());
    }
}
