//! Scalar projections of document leaves.

use crate::value::Value;
use kstar_yaml::NodeRef;
use yaml_rust2::Yaml;

/// A scalar leaf of a document, as held in a field cache.
///
/// Field reads hand out [`ScalarNode::value`] instead of the projection
/// itself, so scripts work with plain strings and numbers.
#[derive(Debug, Clone)]
pub struct ScalarNode {
    node: NodeRef,
}

impl ScalarNode {
    pub const TYPE_NAME: &'static str = "ScalarNode";

    pub(crate) fn new(node: NodeRef) -> Self {
        Self { node }
    }

    /// The underlying document node.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// The primitive held by this leaf.
    pub fn value(&self) -> Value {
        match &self.node.borrow().scalar {
            Yaml::String(s) => Value::String(s.clone()),
            Yaml::Integer(i) => Value::Int(*i),
            Yaml::Real(s) => match parse_real(s) {
                Some(f) => Value::Float(f),
                None => Value::String(s.clone()),
            },
            Yaml::Boolean(b) => Value::Bool(*b),
            _ => Value::None,
        }
    }
}

/// Parse a YAML float, including the `.inf`/`.nan` spellings.
pub(crate) fn parse_real(text: &str) -> Option<f64> {
    match text {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

/// Render a float the way YAML spells it.
pub(crate) fn format_real(value: f64) -> String {
    if value.is_nan() {
        ".nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { ".inf" } else { "-.inf" }.to_string()
    } else {
        format!("{value:?}")
    }
}
