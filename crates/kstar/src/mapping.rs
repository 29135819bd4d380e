//! Mapping nodes: script-facing views of YAML mappings.
//!
//! A [`MappingNode`] is a handle. Cloning it (the Rust `Clone`) shares
//! the node, the way a script variable shares the value it names; the
//! script-level copy is [`MappingNode::deep_copy`].
//!
//! Reads go through a lazily built [field cache](crate::fields). Writes
//! go to the backing document first and then update the cache with a
//! projection of the very node that was written, so the two never
//! disagree. Merges replace the document content and drop the cache.

use crate::convert::{from_node, to_node, ConvertError};
use crate::error::{Error, Feature, Result};
use crate::expr::{combine_op, ExprKind, ExprTarget, NodeExpr};
use crate::fields::FieldCache;
use crate::merge::{merge_nodes, MergeOptions};
use crate::protocol::{BinaryOp, HasAttrs, HasBinary, HasSetField, HasSetKey, ScriptValue, Side};
use crate::schema::Schema;
use crate::value::Value;
use kstar_yaml::{is_nil_or_empty, Node, NodeKind, NodeRef};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A mapping of a YAML document, exposed to scripts.
#[derive(Clone, Default)]
pub struct MappingNode {
    state: Rc<RefCell<MappingState>>,
}

#[derive(Default)]
struct MappingState {
    /// Merge hints for this level, shared with copies and parents
    schema: Option<Rc<Schema>>,

    /// Backing document; `None` until the first write or merge
    node: Option<NodeRef>,

    /// `None` until first read, and again after every merge
    fields: Option<FieldCache>,

    options: MergeOptions,
}

impl MappingNode {
    pub const TYPE_NAME: &'static str = "MappingNode";

    /// An empty node with no backing document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a document node, which must be a mapping.
    pub(crate) fn wrap(node: NodeRef) -> Self {
        Self {
            state: Rc::new(RefCell::new(MappingState {
                node: Some(node),
                ..MappingState::default()
            })),
        }
    }

    /// Wrap `node` if it is a mapping.
    pub fn from_node(node: NodeRef) -> Option<Self> {
        (node.kind() == NodeKind::Mapping).then(|| Self::wrap(node))
    }

    /// Parse a YAML document whose root is a mapping.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let node = kstar_yaml::parse(text)?;
        Self::from_node(node).ok_or_else(|| {
            Error::Document(kstar_yaml::Error::InvalidStructure {
                message: "document root is not a mapping".to_string(),
            })
        })
    }

    /// View any script value whose tree form is a mapping as a mapping node.
    ///
    /// Mapping nodes are returned as-is (shared); dicts and pending
    /// expressions are converted into a new document. Values with no
    /// mapping form yield `None`; a pending expression that fails to
    /// evaluate yields its error.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Mapping(node) => Ok(Some(node.clone())),
            other => match to_node(other) {
                Ok(node) => Ok(Self::from_node(node)),
                Err(ConvertError::Evaluation(err)) => Err(*err),
                Err(ConvertError::Unrepresentable { .. }) => Ok(None),
            },
        }
    }

    pub fn with_schema(self, schema: Rc<Schema>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.schema = Some(schema);
            state.fields = None;
        }
        self
    }

    pub fn with_options(self, options: MergeOptions) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.options = options;
            state.fields = None;
        }
        self
    }

    pub fn schema(&self) -> Option<Rc<Schema>> {
        self.state.borrow().schema.clone()
    }

    pub fn options(&self) -> MergeOptions {
        self.state.borrow().options
    }

    /// The backing document, shared.
    pub fn node(&self) -> Option<NodeRef> {
        self.state.borrow().node.clone()
    }

    /// Check whether two handles refer to the same mapping node.
    pub fn ptr_eq(&self, other: &MappingNode) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// An independent node: same schema and options, copied document,
    /// unpopulated field cache.
    pub fn deep_copy(&self) -> MappingNode {
        let state = self.state.borrow();
        MappingNode {
            state: Rc::new(RefCell::new(MappingState {
                schema: state.schema.clone(),
                node: state.node.as_ref().map(NodeRef::deep_copy),
                fields: None,
                options: state.options,
            })),
        }
    }

    /// A copy of the backing document; an empty mapping if there is none.
    pub(crate) fn document_copy(&self) -> NodeRef {
        match &self.state.borrow().node {
            Some(node) => node.deep_copy(),
            None => Node::mapping().into_ref(),
        }
    }

    /// Merge `other` into this node.
    ///
    /// The merged document is built first and installed only on success.
    /// It replaces the content of the existing backing node, so parents
    /// holding that node see the result.
    pub fn merge(&self, other: &MappingNode) -> Result<()> {
        let (dest, schema, options) = {
            let state = self.state.borrow();
            (state.node.clone(), state.schema.clone(), state.options)
        };
        let src = other.node();

        let merged = {
            let dest = dest.as_ref().map(NodeRef::borrow);
            let src = src.as_ref().map(NodeRef::borrow);
            merge_nodes(dest.as_deref(), src.as_deref(), schema.as_deref(), &options)?
        };

        let state = &mut *self.state.borrow_mut();
        match &state.node {
            Some(node) => {
                node.replace(merged);
            }
            None => state.node = Some(merged.into_ref()),
        }
        state.fields = None;

        tracing::debug!("merged mapping node, field cache cleared");
        Ok(())
    }

    /// Read a field, with scalar leaves unwrapped. Missing fields read as `None`.
    pub fn field(&self, name: &str) -> Value {
        self.with_fields(|fields| fields.get(name).cloned())
            .map_or(Value::None, Value::unwrap_scalar)
    }

    /// Field names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.with_fields(FieldCache::names)
    }

    fn with_fields<R>(&self, f: impl FnOnce(&FieldCache) -> R) -> R {
        let state = &mut *self.state.borrow_mut();
        let fields = state.fields.get_or_insert_with(|| {
            FieldCache::load(state.node.as_ref(), state.schema.as_ref(), &state.options)
        });
        f(fields)
    }

    /// Write `value` under `name`.
    ///
    /// Writing back the value already cached under `name` does nothing.
    /// Writing an expression whose target is that cached value evaluates
    /// the expression in place instead of converting it.
    pub fn set_field(&self, name: &str, value: Value) -> Result<()> {
        let cached = {
            let state = self.state.borrow();
            state
                .fields
                .as_ref()
                .and_then(|fields| fields.get(name).cloned())
        };

        if let Some(field) = &cached {
            if value.same_as(field) {
                return Ok(());
            }
            if let Value::Expr(expr) = &value {
                if expr.target().same_as(field) {
                    expr.evaluate()?;
                    return Ok(());
                }
            }
        }

        let node = to_node(&value).map_err(|source| Error::SetField {
            name: name.to_string(),
            source,
        })?;

        let state = &mut *self.state.borrow_mut();
        let document = state
            .node
            .get_or_insert_with(|| Node::mapping().into_ref())
            .clone();
        document.borrow_mut().set_entry(name, node.clone())?;

        if let Some(fields) = &mut state.fields {
            let field_schema = state.schema.as_ref().and_then(|schema| schema.property(name));
            fields.insert(name, from_node(node, field_schema, &state.options));
        }
        Ok(())
    }
}

/// The field name a key addresses, after unwrapping scalar projections.
fn key_name(key: &Value) -> Result<String> {
    match key {
        Value::String(name) => Ok(name.clone()),
        Value::Scalar(scalar) => match scalar.value() {
            Value::String(name) => Ok(name),
            other => Err(Error::UnsupportedKeyType {
                type_name: other.type_name(),
            }),
        },
        Value::Mapping(_) => Err(Error::NotImplemented(Feature::KeyMatchLookup)),
        other => Err(Error::UnsupportedKeyType {
            type_name: other.type_name(),
        }),
    }
}

impl fmt::Debug for MappingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("MappingNode")
                .field("node", &state.node)
                .field("has_schema", &state.schema.is_some())
                .finish(),
            Err(_) => f.write_str("MappingNode(<borrowed>)"),
        }
    }
}

impl ScriptValue for MappingNode {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn truth(&self) -> bool {
        let state = self.state.borrow();
        let node = state.node.as_ref().map(NodeRef::borrow);
        !is_nil_or_empty(node.as_deref())
    }

    fn hash(&self) -> Result<u32> {
        Err(Error::NotImplemented(Feature::Hashing))
    }

    fn to_str(&self) -> Result<String> {
        Err(Error::NotImplemented(Feature::StringRendering))
    }
}

impl HasAttrs for MappingNode {
    fn attr(&self, name: &str) -> Result<Value> {
        Ok(self.field(name))
    }

    fn attr_names(&self) -> Vec<String> {
        self.names()
    }
}

impl HasSetField for MappingNode {
    fn set_field(&self, name: &str, value: Value) -> Result<()> {
        MappingNode::set_field(self, name, value)
    }
}

impl HasSetKey for MappingNode {
    fn get(&self, key: &Value) -> Result<Value> {
        Ok(self.field(&key_name(key)?))
    }

    fn set_key(&self, key: &Value, value: Value) -> Result<()> {
        self.set_field(&key_name(key)?, value)
    }
}

impl HasBinary for MappingNode {
    fn binary(&self, op: BinaryOp, other: &Value, side: Side) -> Result<Option<Value>> {
        if side != Side::Left {
            return Ok(None);
        }
        let Some(source) = MappingNode::from_value(other)? else {
            return Ok(None);
        };

        match op {
            BinaryOp::Plus => Ok(Some(Value::Expr(NodeExpr::new(
                ExprKind::Combine,
                ExprTarget::Mapping(self.clone()),
                combine_op(source),
            )))),
            BinaryOp::Minus => Err(Error::NotImplemented(Feature::Subtraction)),
            _ => Ok(None),
        }
    }
}
