//! Error types for mapping nodes and their operations.

use crate::convert::ConvertError;
use crate::merge::MergeError;
use crate::protocol::BinaryOp;
use std::fmt;
use thiserror::Error;

/// Result type alias for kstar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A protocol feature that is recognized but has no implementation yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// `node - other`: structural removal
    Subtraction,

    /// `node[other_node]`: lookup by structural match
    KeyMatchLookup,

    /// Textual rendering of a node
    StringRendering,

    /// Hashing (mapping nodes cannot be set members or dict keys)
    Hashing,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Feature::Subtraction => "subtraction of mapping nodes",
            Feature::KeyMatchLookup => "lookup by mapping node key",
            Feature::StringRendering => "string rendering of mapping nodes",
            Feature::Hashing => "hashing of mapping nodes",
        };
        f.write_str(what)
    }
}

/// Errors returned to the scripting layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A key that is neither a string nor a mapping node.
    #[error("unsupported field type: {type_name:?}")]
    UnsupportedKeyType { type_name: &'static str },

    /// The value could not be written into the document.
    #[error("unable to set {name:?}")]
    SetField {
        name: String,
        #[source]
        source: ConvertError,
    },

    /// The structural merge failed; the destination was left untouched.
    #[error("unable to merge values")]
    Merge(#[from] MergeError),

    /// The backing document rejected an edit.
    #[error("invalid document")]
    Document(#[from] kstar_yaml::Error),

    /// Neither operand handles the operator.
    #[error("unknown binary op: {left} {op} {right}")]
    UnsupportedOperation {
        op: BinaryOp,
        left: &'static str,
        right: &'static str,
    },

    /// A recognized feature without an implementation.
    #[error("not implemented: {0}")]
    NotImplemented(Feature),
}

impl Error {
    /// True when the failure means "feature absent" rather than a runtime error.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Error::NotImplemented(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_implemented_is_distinguishable() {
        assert!(Error::NotImplemented(Feature::Hashing).is_not_implemented());
        assert!(!Error::UnsupportedKeyType { type_name: "int" }.is_not_implemented());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::UnsupportedKeyType { type_name: "int" }.to_string(),
            "unsupported field type: \"int\""
        );
        assert_eq!(
            Error::NotImplemented(Feature::Subtraction).to_string(),
            "not implemented: subtraction of mapping nodes"
        );
        assert_eq!(
            Error::UnsupportedOperation {
                op: BinaryOp::Plus,
                left: "dict",
                right: "MappingNode",
            }
            .to_string(),
            "unknown binary op: dict + MappingNode"
        );
    }
}
