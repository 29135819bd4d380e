//! Error types for the document tree.

use thiserror::Error;

/// Result type alias for kstar-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, editing, or emitting a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// YAML syntax error
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// The operation needs a different kind of node
    #[error("Invalid YAML structure: {message}")]
    InvalidStructure { message: String },

    /// The emitter failed to render the document
    #[error("Emit error: {message}")]
    Emit { message: String },
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        Error::Parse {
            message: err.to_string(),
        }
    }
}
