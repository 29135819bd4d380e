//! YAML parser that builds [`NodeRef`] trees.

use crate::{Error, Node, NodeKind, NodeRef, Result};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};
use yaml_rust2::Yaml;

/// Parse YAML from a string, producing a document tree.
///
/// This parses a single YAML document. If the input contains multiple documents,
/// only the first one will be parsed.
///
/// # Example
///
/// ```rust
/// use kstar_yaml::parse;
///
/// let doc = parse("title: My Document").unwrap();
/// assert!(doc.borrow().is_mapping());
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid or if the input holds no document.
pub fn parse(content: &str) -> Result<NodeRef> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = TreeBuilder::default();

    parser
        .load(&mut builder, false) // false = single document only
        .map_err(Error::from)?;

    builder.result()
}

/// Builder that implements MarkedEventReceiver to construct a node tree.
#[derive(Default)]
struct TreeBuilder {
    /// Stack of collections being constructed
    stack: Vec<Node>,

    /// The completed root node
    root: Option<NodeRef>,

    /// First structural problem seen (events cannot return errors)
    error: Option<Error>,
}

impl TreeBuilder {
    fn result(self) -> Result<NodeRef> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.root.ok_or_else(|| Error::Parse {
            message: "No YAML document found".into(),
        })
    }

    fn push_complete(&mut self, node: Node) {
        match self.stack.last_mut() {
            // Keys and values alternate naturally in event order
            Some(parent) => parent.content.push(node.into_ref()),
            None => {
                if self.root.is_none() {
                    self.root = Some(node.into_ref());
                }
            }
        }
    }

    fn finish_collection(&mut self, expected: NodeKind) {
        let Some(node) = self.stack.pop() else {
            self.fail(format!("{:?} end without a matching start", expected));
            return;
        };

        if node.kind != expected {
            self.fail(format!("expected {:?} end, found {:?} end", node.kind, expected));
            return;
        }

        if node.kind == NodeKind::Mapping && node.content.len() % 2 != 0 {
            self.fail("mapping entry without value".to_string());
            return;
        }

        self.push_complete(node);
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidStructure { message });
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, _marker: Marker) {
        match ev {
            Event::Nothing => {}

            Event::StreamStart => {}
            Event::StreamEnd => {}
            Event::DocumentStart => {}
            Event::DocumentEnd => {}

            Event::Scalar(value, style, _anchor_id, tag) => {
                let tag = tag.map(|tag| format!("{}{}", tag.handle, tag.suffix));
                let yaml = if style == TScalarStyle::Plain && tag.is_none() {
                    parse_scalar_value(&value)
                } else {
                    tagged_scalar_value(value, tag.as_deref())
                };

                let mut node = Node::scalar(yaml);
                node.tag = tag;
                self.push_complete(node);
            }

            Event::SequenceStart(_anchor_id, tag) => {
                let mut node = Node::sequence(Vec::new());
                node.tag = tag.map(|tag| format!("{}{}", tag.handle, tag.suffix));
                self.stack.push(node);
            }

            Event::SequenceEnd => self.finish_collection(NodeKind::Sequence),

            Event::MappingStart(_anchor_id, tag) => {
                let mut node = Node::mapping();
                node.tag = tag.map(|tag| format!("{}{}", tag.handle, tag.suffix));
                self.stack.push(node);
            }

            Event::MappingEnd => self.finish_collection(NodeKind::Mapping),

            Event::Alias(_anchor_id) => {
                // Aliases are not tracked; they read as null
                self.push_complete(Node::null());
            }
        }
    }
}

/// Parse a plain scalar string value into the appropriate Yaml type.
///
/// This handles type inference: integers, floats, booleans, null, and strings.
fn parse_scalar_value(value: &str) -> Yaml {
    if let Ok(i) = value.parse::<i64>() {
        return Yaml::Integer(i);
    }

    match value {
        "true" | "True" | "TRUE" => return Yaml::Boolean(true),
        "false" | "False" | "FALSE" => return Yaml::Boolean(false),
        "null" | "Null" | "NULL" | "~" | "" => return Yaml::Null,
        ".inf" | ".Inf" | ".INF" | "+.inf" | "-.inf" | ".nan" | ".NaN" | ".NAN" => {
            return Yaml::Real(value.to_string());
        }
        _ => {}
    }

    // `inf`/`nan` are words, not numbers, in YAML
    if value.parse::<f64>().is_ok() && value.chars().any(|c| c.is_ascii_digit()) {
        return Yaml::Real(value.to_string());
    }

    Yaml::String(value.to_string())
}

/// Resolve a quoted, block, or explicitly tagged scalar.
///
/// Core-schema tags (`!!int`, `!!bool`, ...) still get typed values; any
/// other tag keeps the text as a string.
fn tagged_scalar_value(value: String, tag: Option<&str>) -> Yaml {
    let core = tag.and_then(|tag| {
        tag.strip_prefix("tag:yaml.org,2002:")
            .or_else(|| tag.strip_prefix("!!"))
    });

    match core {
        Some("int") | Some("float") | Some("bool") | Some("null") => {
            match parse_scalar_value(&value) {
                Yaml::String(s) => Yaml::String(s),
                typed => typed,
            }
        }
        _ => Yaml::String(value),
    }
}
