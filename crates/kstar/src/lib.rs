//! # kstar
//!
//! Script-facing mapping nodes over YAML documents.
//!
//! An embedding interpreter hands scripts [`MappingNode`] values and
//! drives them through the capability traits in [`protocol`]: attribute
//! and key reads/writes, truthiness, and binary operators. Reads and
//! writes cross the [`convert`] boundary; `node + other` builds a
//! deferred [`NodeExpr`] that performs a schema-aware structural
//! [`merge`] when it is committed.
//!
//! ## Example
//!
//! ```rust
//! use kstar::protocol::{binary, BinaryOp};
//! use kstar::{MappingNode, Value};
//!
//! let node = MappingNode::from_yaml("meta:\n  a: 1").unwrap();
//! let patch = MappingNode::from_yaml("b: 2").unwrap();
//!
//! // `node.meta = node.meta + patch`
//! let meta = node.field("meta");
//! let expr = binary(BinaryOp::Plus, &meta, &Value::from(patch)).unwrap();
//! node.set_field("meta", expr).unwrap();
//!
//! let meta = node.field("meta");
//! assert_eq!(meta.as_mapping().unwrap().names(), vec!["a", "b"]);
//! ```

pub mod convert;
pub mod error;
pub mod expr;
mod fields;
pub mod mapping;
pub mod merge;
pub mod protocol;
pub mod scalar;
pub mod schema;
pub mod value;

pub use convert::{from_node, to_node, ConvertError};
pub use error::{Error, Feature, Result};
pub use expr::{ExprKind, ExprOp, ExprTarget, NodeExpr};
pub use mapping::MappingNode;
pub use merge::{merge_nodes, MergeError, MergeOptions};
pub use protocol::{BinaryOp, HasAttrs, HasBinary, HasSetField, HasSetKey, ScriptValue, Side};
pub use scalar::ScalarNode;
pub use schema::{MergeStrategy, Schema, SchemaError};
pub use value::{OpaqueValue, Value};
