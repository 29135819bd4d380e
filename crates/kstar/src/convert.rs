//! Conversion between script values and document nodes.
//!
//! Every read and write of a mapping node crosses this boundary:
//! [`to_node`] turns a script value into a fresh, unshared tree, and
//! [`from_node`] projects a tree node into a script value that aliases it.

use crate::error::Error;
use crate::mapping::MappingNode;
use crate::merge::MergeOptions;
use crate::scalar::{format_real, ScalarNode};
use crate::schema::Schema;
use crate::value::Value;
use kstar_yaml::{Node, NodeKind, NodeRef};
use std::rc::Rc;
use thiserror::Error;
use yaml_rust2::Yaml;

/// Errors from converting a script value into a document node.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot represent a value of type {type_name:?} as a YAML node")]
    Unrepresentable { type_name: &'static str },

    /// A pending node expression failed while being materialized.
    #[error("unable to evaluate expression")]
    Evaluation(#[source] Box<Error>),
}

/// Convert a script value into a new document tree.
///
/// The result never aliases the source: mapping and scalar handles are
/// deep-copied, and pending expressions are evaluated against a copy of
/// their target.
pub fn to_node(value: &Value) -> Result<NodeRef, ConvertError> {
    let node = match value {
        Value::None => Node::null(),
        Value::Bool(b) => Node::scalar(Yaml::Boolean(*b)),
        Value::Int(i) => Node::scalar(Yaml::Integer(*i)),
        Value::Float(f) => Node::scalar(Yaml::Real(format_real(*f))),
        Value::String(s) => Node::string(s.as_str()),
        Value::List(items) => Node::sequence(
            items
                .iter()
                .map(to_node)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Dict(entries) => {
            let mut node = Node::mapping();
            for (key, value) in entries {
                node.content.push(Node::string(key.as_str()).into_ref());
                node.content.push(to_node(value)?);
            }
            node
        }
        Value::Mapping(mapping) => return Ok(mapping.document_copy()),
        Value::Scalar(scalar) => return Ok(scalar.node().deep_copy()),
        Value::Expr(expr) => {
            let target = expr
                .materialize()
                .map_err(|err| ConvertError::Evaluation(Box::new(err)))?;
            return to_node(&target.into_value());
        }
        Value::Opaque(opaque) => {
            return Err(ConvertError::Unrepresentable {
                type_name: opaque.type_name(),
            });
        }
    };
    Ok(node.into_ref())
}

/// Project a document node into a script value that aliases it.
///
/// Mappings become [`MappingNode`]s over the same subtree (carrying
/// `schema` and `options`), scalars become [`ScalarNode`]s, and sequences
/// become lists of projected items with scalars unwrapped.
pub fn from_node(node: NodeRef, schema: Option<Rc<Schema>>, options: &MergeOptions) -> Value {
    match node.kind() {
        NodeKind::Mapping => {
            let mut mapping = MappingNode::wrap(node).with_options(*options);
            if let Some(schema) = schema {
                mapping = mapping.with_schema(schema);
            }
            Value::Mapping(mapping)
        }
        NodeKind::Scalar => Value::Scalar(ScalarNode::new(node)),
        NodeKind::Sequence => {
            let item_schema = schema.and_then(|schema| schema.items());
            let items = node
                .borrow()
                .content
                .iter()
                .map(|item| from_node(item.clone(), item_schema.clone(), options).unwrap_scalar())
                .collect();
            Value::List(items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OpaqueValue;

    #[derive(Debug)]
    struct Module;

    impl OpaqueValue for Module {
        fn type_name(&self) -> &'static str {
            "module"
        }
    }

    #[test]
    fn test_primitives_to_scalars() {
        assert_eq!(to_node(&Value::Int(3)).unwrap().borrow().scalar, Yaml::Integer(3));
        assert_eq!(
            to_node(&Value::from("x")).unwrap().borrow().scalar,
            Yaml::String("x".into())
        );
        assert!(to_node(&Value::None).unwrap().borrow().is_null());
        assert_eq!(
            to_node(&Value::Float(0.5)).unwrap().borrow().scalar,
            Yaml::Real("0.5".into())
        );
    }

    #[test]
    fn test_dict_keeps_insertion_order() {
        let dict: Value = [("b", Value::Int(1)), ("a", Value::from("x"))]
            .into_iter()
            .collect();
        let node = to_node(&dict).unwrap();
        let node = node.borrow();

        assert!(node.is_mapping());
        let keys: Vec<_> = node
            .pairs()
            .map(|(k, _)| k.borrow().scalar_text().unwrap())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_opaque_is_unrepresentable() {
        let err = to_node(&Value::Opaque(Rc::new(Module))).unwrap_err();
        assert!(matches!(err, ConvertError::Unrepresentable { type_name: "module" }));
    }

    #[test]
    fn test_unrepresentable_inside_list() {
        let list = Value::List(vec![Value::Int(1), Value::Opaque(Rc::new(Module))]);
        assert!(to_node(&list).is_err());
    }

    #[test]
    fn test_from_node_mapping_aliases_tree() {
        let node = Node::mapping().into_ref();
        let value = from_node(node.clone(), None, &MergeOptions::default());

        let mapping = value.as_mapping().unwrap();
        assert!(mapping.node().unwrap().ptr_eq(&node));
    }

    #[test]
    fn test_from_node_sequence_unwraps_scalars() {
        let node = Node::sequence(vec![
            Node::scalar(Yaml::Integer(1)).into_ref(),
            Node::string("two").into_ref(),
        ])
        .into_ref();

        let value = from_node(node, None, &MergeOptions::default());
        assert_eq!(value, Value::List(vec![Value::Int(1), Value::from("two")]));
    }

    #[test]
    fn test_mapping_to_node_is_a_copy() {
        let mapping = MappingNode::wrap(Node::mapping().into_ref());
        let copy = to_node(&Value::Mapping(mapping.clone())).unwrap();
        assert!(!copy.ptr_eq(&mapping.node().unwrap()));
    }
}
