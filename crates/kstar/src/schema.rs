//! Structural merge hints.
//!
//! A [`Schema`] is the small subset of an OpenAPI/JSON schema that the
//! merge walk consults: nested `properties`, sequence `items`, and the
//! patch-strategy extensions that pick between key-wise merge and
//! whole-value replacement.
//!
//! # Recognized keywords
//!
//! - `properties`, `items`
//! - `x-kubernetes-patch-strategy` (alias `x-merge-strategy`):
//!   `merge`, `replace`, `append`; comma-separated lists such as
//!   `merge,retainKeys` take the first known entry
//! - `x-kubernetes-patch-merge-key` (alias `x-merge-key`)
//! - `x-kubernetes-list-type`: `map` (with `x-kubernetes-list-map-keys`,
//!   all of which together identify an item), `set`, `atomic`
//!
//! Anything else (`type`, `description`, ...) is ignored.

use indexmap::IndexMap;
use kstar_yaml::{Node, NodeKind};
use serde::Deserialize;
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;
use yaml_rust2::Yaml;

/// How two values at the same path are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Mappings merge key-wise; sequences merge by `merge_keys`, or as a
    /// set union when there is no key.
    #[default]
    Merge,

    /// The source value replaces the destination value wholesale.
    Replace,

    /// Sequences: destination items followed by source items.
    Append,
}

impl FromStr for MergeStrategy {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .find_map(|part| match part {
                "merge" => Some(MergeStrategy::Merge),
                "replace" => Some(MergeStrategy::Replace),
                "append" => Some(MergeStrategy::Append),
                _ => None,
            })
            .ok_or_else(|| SchemaError::UnknownStrategy(s.to_string()))
    }
}

/// Errors from loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema JSON")]
    Json(#[from] serde_json::Error),

    #[error("invalid schema YAML")]
    Yaml(#[from] kstar_yaml::Error),

    #[error("unknown merge strategy {0:?}")]
    UnknownStrategy(String),
}

/// Merge hints for one level of a document.
///
/// Shared by reference (`Rc`) between a mapping node, its copies, and
/// the child nodes projected from it. Never mutated after loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    properties: IndexMap<String, Rc<Schema>>,
    items: Option<Rc<Schema>>,
    strategy: Option<MergeStrategy>,
    merge_keys: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from an OpenAPI-style JSON document.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let raw: RawSchema = serde_json::from_str(text)?;
        raw.try_into()
    }

    /// Load from a YAML document with the same keywords as the JSON form.
    pub fn from_yaml(text: &str) -> Result<Self, SchemaError> {
        let doc = kstar_yaml::parse(text)?;
        let json = node_to_json(&doc.borrow());
        let raw: RawSchema = serde_json::from_value(json)?;
        raw.try_into()
    }

    /// Sub-schema for the mapping entry `name`.
    pub fn property(&self, name: &str) -> Option<Rc<Schema>> {
        self.properties.get(name).cloned()
    }

    /// Sub-schema for sequence items.
    pub fn items(&self) -> Option<Rc<Schema>> {
        self.items.clone()
    }

    pub fn strategy(&self) -> Option<MergeStrategy> {
        self.strategy
    }

    /// Keys that together identify items of an associative sequence.
    ///
    /// Empty when the sequence is not associative.
    pub fn merge_keys(&self) -> &[String] {
        &self.merge_keys
    }

    pub fn with_property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.insert(name.into(), Rc::new(schema));
        self
    }

    pub fn with_items(mut self, schema: Schema) -> Self {
        self.items = Some(Rc::new(schema));
        self
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Add a key to the set identifying associative sequence items.
    pub fn with_merge_key(mut self, key: impl Into<String>) -> Self {
        self.merge_keys.push(key.into());
        self
    }
}

/// Wire form of a schema, as found in OpenAPI documents.
#[derive(Debug, Default, Deserialize)]
struct RawSchema {
    #[serde(default)]
    properties: IndexMap<String, RawSchema>,

    #[serde(default)]
    items: Option<Box<RawSchema>>,

    #[serde(
        default,
        rename = "x-kubernetes-patch-strategy",
        alias = "x-merge-strategy"
    )]
    strategy: Option<String>,

    #[serde(
        default,
        rename = "x-kubernetes-patch-merge-key",
        alias = "x-merge-key"
    )]
    merge_key: Option<String>,

    #[serde(default, rename = "x-kubernetes-list-type")]
    list_type: Option<String>,

    #[serde(default, rename = "x-kubernetes-list-map-keys")]
    list_map_keys: Vec<String>,
}

impl TryFrom<RawSchema> for Schema {
    type Error = SchemaError;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        let mut strategy = raw
            .strategy
            .as_deref()
            .map(str::parse::<MergeStrategy>)
            .transpose()?;
        let mut merge_keys: Vec<String> = raw.merge_key.into_iter().collect();

        match raw.list_type.as_deref() {
            Some("map") => {
                strategy = strategy.or(Some(MergeStrategy::Merge));
                if merge_keys.is_empty() {
                    merge_keys = raw.list_map_keys;
                }
            }
            Some("set") => strategy = strategy.or(Some(MergeStrategy::Merge)),
            Some("atomic") => strategy = strategy.or(Some(MergeStrategy::Replace)),
            _ => {}
        }

        let properties = raw
            .properties
            .into_iter()
            .map(|(name, raw)| Ok((name, Rc::new(Schema::try_from(raw)?))))
            .collect::<Result<_, SchemaError>>()?;

        let items = raw
            .items
            .map(|raw| Schema::try_from(*raw).map(Rc::new))
            .transpose()?;

        Ok(Schema {
            properties,
            items,
            strategy,
            merge_keys,
        })
    }
}

fn node_to_json(node: &Node) -> serde_json::Value {
    match node.kind {
        NodeKind::Mapping => serde_json::Value::Object(
            node.pairs()
                .filter_map(|(key, value)| {
                    let key = key.borrow().scalar_text()?;
                    Some((key, node_to_json(&value.borrow())))
                })
                .collect(),
        ),
        NodeKind::Sequence => serde_json::Value::Array(
            node.content
                .iter()
                .map(|item| node_to_json(&item.borrow()))
                .collect(),
        ),
        NodeKind::Scalar => match &node.scalar {
            Yaml::String(s) => serde_json::Value::String(s.clone()),
            Yaml::Integer(i) => serde_json::Value::from(*i),
            Yaml::Real(s) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or_else(|| serde_json::Value::String(s.clone()), serde_json::Value::Number),
            Yaml::Boolean(b) => serde_json::Value::Bool(*b),
            _ => serde_json::Value::Null,
        },
    }
}
