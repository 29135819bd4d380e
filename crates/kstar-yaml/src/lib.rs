//! # kstar-yaml
//!
//! A mutable YAML document tree.
//!
//! Nodes are held through [`NodeRef`] handles so that a subtree can be
//! shared between a parent document and the projections built on top of
//! it: writing through one handle is visible through every other handle
//! to the same node. Mapping nodes keep their entries in document order
//! as alternating key/value children, the same shape a YAML parser
//! produces.
//!
//! ## Example
//!
//! ```rust
//! use kstar_yaml::{parse, Node};
//!
//! let doc = parse("title: My Document\nauthor: Jane").unwrap();
//! doc.borrow_mut()
//!     .set_entry("title", Node::string("Renamed").into_ref())
//!     .unwrap();
//!
//! let title = doc.borrow().get("title").unwrap();
//! assert_eq!(title.borrow().scalar_text().as_deref(), Some("Renamed"));
//! ```

mod emit;
mod error;
mod node;
mod parser;

pub use emit::{to_yaml, to_yaml_string};
pub use error::{Error, Result};
pub use node::{is_nil_or_empty, Node, NodeKind, NodeRef};
pub use parser::parse;

// Re-export for convenience
pub use yaml_rust2::Yaml;
