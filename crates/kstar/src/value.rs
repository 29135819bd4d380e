//! Script-side values.

use crate::expr::NodeExpr;
use crate::mapping::MappingNode;
use crate::protocol::{HasBinary, HasSetField, HasSetKey, ScriptValue};
use crate::scalar::ScalarNode;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A host value that has no tree representation (functions, modules, ...).
pub trait OpaqueValue: fmt::Debug {
    fn type_name(&self) -> &'static str;
}

/// A value as seen by a script.
///
/// Primitive variants carry their data; `Mapping`, `Scalar`, and `Expr`
/// are handles, so cloning them shares the underlying node.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Dict(IndexMap<String, Value>),

    /// A mapping node of a document
    Mapping(MappingNode),

    /// A scalar leaf of a document, not yet unwrapped
    Scalar(ScalarNode),

    /// An uncommitted node operation (e.g. `node + other`)
    Expr(NodeExpr),

    Opaque(Rc<dyn OpaqueValue>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Mapping(node) => node.type_name(),
            Value::Scalar(_) => ScalarNode::TYPE_NAME,
            Value::Expr(expr) => expr.type_name(),
            Value::Opaque(value) => value.type_name(),
        }
    }

    pub fn truth(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Mapping(node) => node.truth(),
            Value::Scalar(scalar) => scalar.value().truth(),
            Value::Expr(_) | Value::Opaque(_) => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&MappingNode> {
        match self {
            Value::Mapping(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&NodeExpr> {
        match self {
            Value::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    /// Replace a scalar projection by the primitive it holds.
    pub fn unwrap_scalar(self) -> Value {
        match self {
            Value::Scalar(scalar) => scalar.value(),
            other => other,
        }
    }

    /// Identity for node handles, equality for primitives.
    ///
    /// Scalar projections compare by the primitive they hold, so a field
    /// read (which unwraps scalars) is the same as its cached projection.
    pub fn same_as(&self, other: &Value) -> bool {
        let primitive = |value: &Value| match value {
            Value::Scalar(scalar) => Some(scalar.value()),
            _ => None,
        };
        let (left, right) = (primitive(self), primitive(other));
        let left = left.as_ref().unwrap_or(self);
        let right = right.as_ref().unwrap_or(other);

        match (left, right) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_binary(&self) -> Option<&dyn HasBinary> {
        match self {
            Value::Mapping(node) => Some(node),
            Value::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_set_field(&self) -> Option<&dyn HasSetField> {
        match self {
            Value::Mapping(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_set_key(&self) -> Option<&dyn HasSetKey> {
        match self {
            Value::Mapping(node) => Some(node),
            _ => None,
        }
    }
}

/// Structural equality for plain data; identity for node handles.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Scalar(a), Value::Scalar(b)) => a.node().ptr_eq(b.node()),
            (Value::Expr(a), Value::Expr(b)) => a.ptr_eq(b),
            _ => self.same_as(other),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<MappingNode> for Value {
    fn from(node: MappingNode) -> Self {
        Value::Mapping(node)
    }
}

impl From<NodeExpr> for Value {
    fn from(expr: NodeExpr) -> Self {
        Value::Expr(expr)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Dict(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
