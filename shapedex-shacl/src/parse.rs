//! Parsing SHACL node shapes out of profile graphs.

use crate::error::{Result, ShaclError};
use crate::model::{NodeShape, Property};
use shapedex_graph_ir::{Graph, Term};
use shapedex_vocab::{dash, rdf, sh};
use std::sync::Arc;

/// Parse the node shape rooted at `id` from a profile graph.
///
/// `rdf` is the serialized Turtle the graph came from; it travels with the
/// shape for later validator calls.
pub fn parse_node_shape(id: &Term, graph: &Graph, rdf: Arc<str>) -> Result<NodeShape> {
    let mut shape = NodeShape::new(id.raw());
    shape.rdf = rdf;

    for triple in graph.matching(Some(id), None, None) {
        let predicate = triple.p.raw();
        if predicate == sh::NODE {
            shape.parents.insert(triple.o.raw().to_string());
        } else if predicate == sh::AND {
            for member in parse_list(&triple.o, graph) {
                shape.parents.insert(member.raw().to_string());
            }
        } else if predicate == sh::PROPERTY {
            let property = parse_property(&triple.o, graph)?;
            shape.add_property(property);
        }
    }
    Ok(shape)
}

/// Parse a single property constraint node.
pub fn parse_property(id: &Term, graph: &Graph) -> Result<Property> {
    let mut prop = Property::new(id.clone());

    for triple in graph.matching(Some(id), None, None) {
        match triple.p.raw() {
            sh::DATATYPE => {
                let Some(iri) = triple.o.as_iri() else {
                    return Err(ShaclError::InvalidShape(format!(
                        "property's sh:datatype is not a named node: {}",
                        triple.o
                    )));
                };
                prop.datatype = Some(iri.to_string());
            }
            sh::PATH => {
                if let Some(iri) = triple.o.as_iri() {
                    prop.path = iri.to_string();
                }
            }
            sh::NODE => {
                prop.node_shapes.insert(triple.o.raw().to_string());
            }
            sh::AND => {
                for member in parse_list(&triple.o, graph) {
                    prop.node_shapes.insert(member.raw().to_string());
                }
            }
            sh::OR => {
                for member in parse_list(&triple.o, graph) {
                    prop.node_shapes.insert(member.raw().to_string());
                    prop.or.insert(member.raw().to_string());
                }
            }
            sh::XONE => {
                for member in parse_list(&triple.o, graph) {
                    prop.or.insert(member.raw().to_string());
                }
            }
            sh::QUALIFIED_VALUE_SHAPE => {
                prop.qualified_value_shape = Some(triple.o.raw().to_string());
            }
            sh::QUALIFIED_MIN_COUNT => {
                if let Ok(n) = triple.o.raw().parse::<i64>() {
                    prop.qualified_min_count = n;
                }
            }
            sh::MAX_COUNT => {
                if let Ok(n) = triple.o.raw().parse::<i64>() {
                    prop.max_count = n;
                }
            }
            sh::CLASS => prop.class = true,
            sh::IN => prop.has_in = true,
            sh::HAS_VALUE => prop.has_value = true,
            sh::NODE_KIND => {
                if let Some(iri) = triple.o.as_iri() {
                    prop.node_kind = Some(iri.to_string());
                }
            }
            dash::FACET => {
                let Ok(value) = triple.o.raw().parse::<bool>() else {
                    return Err(ShaclError::InvalidShape(format!(
                        "property's dash:facet is not a boolean: {}",
                        triple.o.raw()
                    )));
                };
                prop.facet = Some(value);
            }
            _ => {}
        }
    }
    Ok(prop)
}

/// Traverse an RDF list into its member terms.
pub fn parse_list(head: &Term, graph: &Graph) -> Vec<Term> {
    let first = Term::iri(rdf::FIRST);
    let rest = Term::iri(rdf::REST);

    let mut members = Vec::new();
    let mut cell = head.clone();
    loop {
        let Some(first_triple) = graph.first(Some(&cell), Some(&first), None) else {
            break;
        };
        let Some(rest_triple) = graph.first(Some(&cell), Some(&rest), None) else {
            break;
        };
        members.push(first_triple.o.clone());
        cell = rest_triple.o.clone();
    }
    members
}
