//! Rendering document trees back to YAML.

use crate::{Error, Node, NodeKind, Result};
use yaml_rust2::{Yaml, YamlEmitter};

/// Convert a node tree into an owned `yaml_rust2::Yaml` value.
///
/// Tags are not carried over; `Yaml` has no place for them.
pub fn to_yaml(node: &Node) -> Yaml {
    match node.kind {
        NodeKind::Scalar => node.scalar.clone(),
        NodeKind::Sequence => Yaml::Array(
            node.content
                .iter()
                .map(|item| to_yaml(&item.borrow()))
                .collect(),
        ),
        NodeKind::Mapping => Yaml::Hash(
            node.pairs()
                .map(|(key, value)| (to_yaml(&key.borrow()), to_yaml(&value.borrow())))
                .collect(),
        ),
    }
}

/// Render a node tree as YAML text (without the leading `---` marker).
pub fn to_yaml_string(node: &Node) -> Result<String> {
    let yaml = to_yaml(node);
    let mut out = String::new();
    YamlEmitter::new(&mut out)
        .dump(&yaml)
        .map_err(|err| Error::Emit {
            message: err.to_string(),
        })?;

    Ok(match out.strip_prefix("---\n") {
        Some(body) => body.to_string(),
        None => out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_emit_keeps_document_order() {
        let doc = parse("zeta: 1\nalpha: two\nnested:\n  x: true").unwrap();
        let text = to_yaml_string(&doc.borrow()).unwrap();

        insta::assert_snapshot!(text, @r"
        zeta: 1
        alpha: two
        nested:
          x: true
        ");
    }

    #[test]
    fn test_emit_sequence() {
        let doc = parse("items:\n  - a\n  - b").unwrap();
        let text = to_yaml_string(&doc.borrow()).unwrap();

        insta::assert_snapshot!(text, @r"
        items:
          - a
          - b
        ");
    }

    #[test]
    fn test_to_yaml_empty_mapping() {
        assert_eq!(to_yaml(&Node::mapping()), Yaml::Hash(Default::default()));
    }
}
