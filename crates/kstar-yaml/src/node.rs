//! YAML document nodes.

use crate::{Error, Result};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use yaml_rust2::Yaml;

/// The structural kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Ordered key/value entries
    Mapping,

    /// Ordered items
    Sequence,

    /// A leaf value (string, number, boolean or null)
    Scalar,
}

/// A single node of a YAML document.
///
/// The layout follows what a YAML parser hands out:
/// - for mappings, `content` holds alternating key and value nodes
///   (`[k0, v0, k1, v1, ...]`) in document order
/// - for sequences, `content` holds the items
/// - for scalars, `content` is empty and `scalar` holds the value
///
/// Children are [`NodeRef`] handles, so cloning a `Node` would alias its
/// children. Use [`Node::deep_copy`] to get an independent tree.
#[derive(Debug, PartialEq)]
pub struct Node {
    /// Structural kind
    pub kind: NodeKind,

    /// Explicit YAML tag, if the source carried one (e.g. `!prefer`)
    pub tag: Option<String>,

    /// Scalar payload. Always `Yaml::Null` for mappings and sequences.
    pub scalar: Yaml,

    /// Child nodes (see the type-level docs for the layout)
    pub content: Vec<NodeRef>,
}

/// A shared, mutable handle to a [`Node`].
///
/// Two handles are the *same node* when [`NodeRef::ptr_eq`] holds;
/// `==` compares structure.
#[derive(Clone, PartialEq)]
pub struct NodeRef(Rc<RefCell<Node>>);

impl Node {
    /// Create an empty mapping.
    pub fn mapping() -> Self {
        Self {
            kind: NodeKind::Mapping,
            tag: None,
            scalar: Yaml::Null,
            content: Vec::new(),
        }
    }

    /// Create a mapping from key/value pairs, keeping their order.
    pub fn mapping_from<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, NodeRef)>,
        K: Into<String>,
    {
        let mut node = Self::mapping();
        for (key, value) in entries {
            node.content.push(Node::string(key).into_ref());
            node.content.push(value);
        }
        node
    }

    /// Create a sequence holding `items`.
    pub fn sequence(items: Vec<NodeRef>) -> Self {
        Self {
            kind: NodeKind::Sequence,
            tag: None,
            scalar: Yaml::Null,
            content: items,
        }
    }

    /// Create a scalar leaf.
    ///
    /// Collection values (`Yaml::Hash`, `Yaml::Array`) are not leaves and
    /// are converted to their tree form instead.
    pub fn scalar(yaml: Yaml) -> Self {
        match yaml {
            Yaml::Hash(hash) => {
                let mut node = Self::mapping();
                for (key, value) in hash {
                    node.content.push(Node::scalar(key).into_ref());
                    node.content.push(Node::scalar(value).into_ref());
                }
                node
            }
            Yaml::Array(items) => Self::sequence(
                items
                    .into_iter()
                    .map(|item| Node::scalar(item).into_ref())
                    .collect(),
            ),
            Yaml::Alias(_) | Yaml::BadValue => Self::null(),
            yaml => Self {
                kind: NodeKind::Scalar,
                tag: None,
                scalar: yaml,
                content: Vec::new(),
            },
        }
    }

    /// Create a string scalar.
    pub fn string(value: impl Into<String>) -> Self {
        Self::scalar(Yaml::String(value.into()))
    }

    /// Create a null scalar.
    pub fn null() -> Self {
        Self::scalar(Yaml::Null)
    }

    /// Wrap this node in a fresh handle.
    pub fn into_ref(self) -> NodeRef {
        NodeRef(Rc::new(RefCell::new(self)))
    }

    /// Set the explicit tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn is_mapping(&self) -> bool {
        self.kind == NodeKind::Mapping
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == NodeKind::Sequence
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == NodeKind::Scalar
    }

    /// Check if this is a null scalar (`~`, `null`, or tagged `!!null`).
    pub fn is_null(&self) -> bool {
        self.is_scalar()
            && (self.scalar.is_null()
                || self
                    .tag
                    .as_deref()
                    .is_some_and(|tag| tag.ends_with(":null") || tag == "!!null"))
    }

    /// Number of entries (mappings), items (sequences), or 0 (scalars).
    pub fn len(&self) -> usize {
        match self.kind {
            NodeKind::Mapping => self.content.len() / 2,
            NodeKind::Sequence => self.content.len(),
            NodeKind::Scalar => 0,
        }
    }

    /// Check if this node has no children.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Textual form of a scalar, as used for mapping keys.
    ///
    /// Returns `None` for mappings and sequences.
    pub fn scalar_text(&self) -> Option<String> {
        if !self.is_scalar() {
            return None;
        }
        match &self.scalar {
            Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
            Yaml::Integer(i) => Some(i.to_string()),
            Yaml::Boolean(b) => Some(b.to_string()),
            Yaml::Null => Some("null".to_string()),
            _ => None,
        }
    }

    /// Iterate over the key/value pairs of a mapping in document order.
    ///
    /// Yields nothing for sequences and scalars.
    pub fn pairs(&self) -> impl Iterator<Item = (&NodeRef, &NodeRef)> {
        let content: &[NodeRef] = if self.is_mapping() {
            &self.content
        } else {
            &[]
        };
        content.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Position of the key node named `name` inside `content`.
    fn key_index(&self, name: &str) -> Option<usize> {
        if !self.is_mapping() {
            return None;
        }
        self.content
            .chunks_exact(2)
            .position(|pair| pair[0].borrow().scalar_text().as_deref() == Some(name))
            .map(|pair_index| pair_index * 2)
    }

    /// Get the value stored under `name` in a mapping.
    pub fn get(&self, name: &str) -> Option<NodeRef> {
        self.key_index(name).map(|idx| self.content[idx + 1].clone())
    }

    /// Check whether a mapping has an entry named `name`.
    pub fn contains_key(&self, name: &str) -> bool {
        self.key_index(name).is_some()
    }

    /// Insert or replace the entry named `name`.
    ///
    /// If the key already exists, the existing key node and its position
    /// are kept and only the value is swapped. Otherwise a new string key
    /// is appended.
    pub fn set_entry(&mut self, name: &str, value: NodeRef) -> Result<()> {
        if !self.is_mapping() {
            return Err(Error::InvalidStructure {
                message: format!("cannot set entry {:?} on a {:?} node", name, self.kind),
            });
        }

        match self.key_index(name) {
            Some(idx) => self.content[idx + 1] = value,
            None => {
                self.content.push(Node::string(name).into_ref());
                self.content.push(value);
            }
        }
        Ok(())
    }

    /// Remove the entry named `name`, returning its value.
    pub fn remove_entry(&mut self, name: &str) -> Option<NodeRef> {
        let idx = self.key_index(name)?;
        let mut removed = self.content.drain(idx..idx + 2);
        removed.nth(1)
    }

    /// Structural copy with fresh handles all the way down.
    pub fn deep_copy(&self) -> Node {
        Node {
            kind: self.kind,
            tag: self.tag.clone(),
            scalar: self.scalar.clone(),
            content: self.content.iter().map(NodeRef::deep_copy).collect(),
        }
    }
}

/// Check whether a node is absent, null, or a collection without content.
///
/// An empty string is a value, not an absence.
pub fn is_nil_or_empty(node: Option<&Node>) -> bool {
    match node {
        None => true,
        Some(node) => match node.kind {
            NodeKind::Mapping | NodeKind::Sequence => node.content.is_empty(),
            NodeKind::Scalar => node.is_null(),
        },
    }
}

impl NodeRef {
    pub fn new(node: Node) -> Self {
        node.into_ref()
    }

    pub fn borrow(&self) -> Ref<'_, Node> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Node> {
        self.0.borrow_mut()
    }

    /// Check whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind
    }

    /// Structural copy into a new, unshared handle.
    pub fn deep_copy(&self) -> NodeRef {
        self.0.borrow().deep_copy().into_ref()
    }

    /// Swap in new content, keeping this handle (and its aliases) valid.
    pub fn replace(&self, node: Node) -> Node {
        self.0.replace(node)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(node) => node.fmt(f),
            Err(_) => f.write_str("NodeRef(<borrowed>)"),
        }
    }
}

impl From<Node> for NodeRef {
    fn from(node: Node) -> Self {
        node.into_ref()
    }
}
