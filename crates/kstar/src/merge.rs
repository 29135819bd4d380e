//! Structural merge of two document trees.
//!
//! The walk visits both trees together and builds a brand-new result;
//! neither input is touched. Callers install the result only when the
//! whole walk succeeds, so a failed merge leaves the destination as it was.
//!
//! # Rules
//!
//! - A key present on one side only is copied as-is.
//! - A null source value removes the key from the result.
//! - Each key is written once; the first occurrence on each side counts.
//! - Mapping vs mapping merges recursively, unless the schema asks for
//!   [`MergeStrategy::Replace`].
//! - Sequence vs sequence follows the schema's strategy:
//!   - `Merge` with merge keys: associative merge by those keys
//!   - `Merge` without keys: set union
//!   - `Append`: destination items, then source items
//!   - `Replace`: source items
//!
//!   Without a schema strategy, lists of mappings that all carry one of
//!   the well-known identifying fields (`name`, `containerPort`, ...) merge
//!   associatively by it; anything else uses
//!   [`MergeOptions::sequence_strategy`].
//! - Every other combination: the source wins.
//!
//! Merging is therefore "destination, then source; later source wins on
//! leaf conflicts", and repeated merges stack left to right.

use crate::schema::{MergeStrategy, Schema};
use kstar_yaml::{Node, NodeKind, NodeRef};
use std::collections::HashSet;
use thiserror::Error;

/// Fields tried, in order, to identify items of lists the schema says
/// nothing about.
const INFERRED_MERGE_KEYS: &[&str] = &[
    "name",
    "containerPort",
    "mountPath",
    "devicePath",
    "ip",
    "type",
    "topologyKey",
];

/// Options for the merge walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Maximum nesting depth (default: 256).
    ///
    /// Merging fails with `MergeError::NestingTooDeep` past this depth.
    pub max_depth: usize,

    /// Strategy for sequences the schema says nothing about (default: `Replace`).
    pub sequence_strategy: MergeStrategy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            sequence_strategy: MergeStrategy::Replace,
        }
    }
}

impl MergeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_sequence_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.sequence_strategy = strategy;
        self
    }
}

/// Errors from the merge walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("merge nesting too deep (max depth: {max_depth}) at path: {}", .path.join("."))]
    NestingTooDeep { max_depth: usize, path: Vec<String> },

    #[error("list item at {} has no merge key {key:?}", .path.join("."))]
    MissingMergeKey { path: Vec<String>, key: String },

    #[error("list item at {} is not a mapping", .path.join("."))]
    NotAMapping { path: Vec<String> },
}

/// Merge `src` into `dest`, producing a new tree.
///
/// An absent side contributes nothing; two absent sides give an empty mapping.
pub fn merge_nodes(
    dest: Option<&Node>,
    src: Option<&Node>,
    schema: Option<&Schema>,
    options: &MergeOptions,
) -> Result<Node, MergeError> {
    match (dest, src) {
        (None, None) => Ok(Node::mapping()),
        (Some(dest), None) => Ok(dest.deep_copy()),
        (None, Some(src)) => Ok(src.deep_copy()),
        (Some(dest), Some(src)) => {
            let mut walker = Walker {
                options,
                path: Vec::new(),
            };
            walker.merge(dest, src, schema, 0)
        }
    }
}

struct Walker<'a> {
    options: &'a MergeOptions,
    path: Vec<String>,
}

impl Walker<'_> {
    fn merge(
        &mut self,
        dest: &Node,
        src: &Node,
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Node, MergeError> {
        if depth > self.options.max_depth {
            return Err(MergeError::NestingTooDeep {
                max_depth: self.options.max_depth,
                path: self.path.clone(),
            });
        }

        match (dest.kind, src.kind) {
            (NodeKind::Mapping, NodeKind::Mapping) => {
                if schema.and_then(Schema::strategy) == Some(MergeStrategy::Replace) {
                    Ok(src.deep_copy())
                } else {
                    self.merge_mappings(dest, src, schema, depth)
                }
            }
            (NodeKind::Sequence, NodeKind::Sequence) => {
                self.merge_sequences(dest, src, schema, depth)
            }
            _ => Ok(src.deep_copy()),
        }
    }

    fn merge_mappings(
        &mut self,
        dest: &Node,
        src: &Node,
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Node, MergeError> {
        let mut out = Node::mapping();
        out.tag = src.tag.clone().or_else(|| dest.tag.clone());
        let mut written: HashSet<String> = HashSet::new();

        for (key, dest_value) in dest.pairs() {
            let name = key.borrow().scalar_text();
            if let Some(name) = &name
                && !written.insert(name.clone())
            {
                continue;
            }
            let src_value = name.as_deref().and_then(|name| src.get(name));
            if src_value.as_ref().is_some_and(|value| value.borrow().is_null()) {
                tracing::trace!(path = %self.path.join("."), ?name, "removing key");
                continue;
            }

            let value = match (name, src_value) {
                (Some(name), Some(src_value)) => {
                    let field_schema = schema.and_then(|schema| schema.property(&name));
                    self.path.push(name);
                    let merged = self.merge(
                        &dest_value.borrow(),
                        &src_value.borrow(),
                        field_schema.as_deref(),
                        depth + 1,
                    )?;
                    self.path.pop();
                    merged.into_ref()
                }
                _ => dest_value.deep_copy(),
            };

            out.content.push(key.deep_copy());
            out.content.push(value);
        }

        for (key, src_value) in src.pairs() {
            let name = key.borrow().scalar_text();
            if let Some(name) = name
                && !written.insert(name)
            {
                continue;
            }
            if src_value.borrow().is_null() {
                continue;
            }
            out.content.push(key.deep_copy());
            out.content.push(src_value.deep_copy());
        }

        Ok(out)
    }

    fn merge_sequences(
        &mut self,
        dest: &Node,
        src: &Node,
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Node, MergeError> {
        let schema_keys: Vec<&str> = schema
            .map(|schema| schema.merge_keys().iter().map(String::as_str).collect())
            .unwrap_or_default();
        let (strategy, keys) = match schema.and_then(Schema::strategy) {
            Some(strategy) => (strategy, schema_keys),
            None if !schema_keys.is_empty() => (MergeStrategy::Merge, schema_keys),
            None => match inferred_merge_key(dest, src) {
                Some(key) => (MergeStrategy::Merge, vec![key]),
                None => (self.options.sequence_strategy, schema_keys),
            },
        };
        tracing::trace!(path = %self.path.join("."), ?strategy, ?keys, "merging sequence");

        let items = match strategy {
            MergeStrategy::Replace => return Ok(src.deep_copy()),
            MergeStrategy::Append => dest
                .content
                .iter()
                .chain(&src.content)
                .map(NodeRef::deep_copy)
                .collect(),
            MergeStrategy::Merge if !keys.is_empty() => {
                self.merge_associative(dest, src, &keys, schema, depth)?
            }
            MergeStrategy::Merge => {
                let mut items: Vec<NodeRef> =
                    dest.content.iter().map(NodeRef::deep_copy).collect();
                for item in &src.content {
                    if !dest.content.contains(item) {
                        items.push(item.deep_copy());
                    }
                }
                items
            }
        };

        let mut out = Node::sequence(items);
        out.tag = src.tag.clone().or_else(|| dest.tag.clone());
        Ok(out)
    }

    /// Merge sequences of mappings identified by the values of `keys`.
    ///
    /// Two items match when they agree on every key. Destination order is
    /// kept; matching source items merge into their destination item, and
    /// new source items are appended in source order.
    fn merge_associative(
        &mut self,
        dest: &Node,
        src: &Node,
        keys: &[&str],
        schema: Option<&Schema>,
        depth: usize,
    ) -> Result<Vec<NodeRef>, MergeError> {
        let item_schema = schema.and_then(Schema::items);
        let dest_keys = self.item_keys(dest, keys)?;
        let src_keys = self.item_keys(src, keys)?;

        let mut items = Vec::with_capacity(dest.content.len() + src.content.len());
        for (item, item_key) in dest.content.iter().zip(&dest_keys) {
            match src_keys.iter().position(|k| k == item_key) {
                Some(idx) => {
                    self.path.push(key_segment(keys, item_key));
                    let merged = self.merge(
                        &item.borrow(),
                        &src.content[idx].borrow(),
                        item_schema.as_deref(),
                        depth + 1,
                    )?;
                    self.path.pop();
                    items.push(merged.into_ref());
                }
                None => items.push(item.deep_copy()),
            }
        }

        for (item, item_key) in src.content.iter().zip(&src_keys) {
            if !dest_keys.contains(item_key) {
                items.push(item.deep_copy());
            }
        }

        Ok(items)
    }

    fn item_keys(
        &self,
        sequence: &Node,
        keys: &[&str],
    ) -> Result<Vec<Vec<String>>, MergeError> {
        sequence
            .content
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let item = item.borrow();
                let path = || {
                    let mut path = self.path.clone();
                    path.push(index.to_string());
                    path
                };

                if !item.is_mapping() {
                    return Err(MergeError::NotAMapping { path: path() });
                }
                keys.iter()
                    .map(|key| {
                        item.get(key)
                            .and_then(|value| value.borrow().scalar_text())
                            .ok_or_else(|| MergeError::MissingMergeKey {
                                path: path(),
                                key: key.to_string(),
                            })
                    })
                    .collect()
            })
            .collect()
    }
}

/// Path segment naming an associative item, e.g. `[port=53,protocol=TCP]`.
fn key_segment(keys: &[&str], values: &[String]) -> String {
    let parts: Vec<String> = keys
        .iter()
        .zip(values)
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!("[{}]", parts.join(","))
}

/// First well-known field carried as a scalar by every item of both lists.
fn inferred_merge_key(dest: &Node, src: &Node) -> Option<&'static str> {
    if dest.is_empty() && src.is_empty() {
        return None;
    }
    INFERRED_MERGE_KEYS.iter().copied().find(|key| {
        dest.content.iter().chain(&src.content).all(|item| {
            let item = item.borrow();
            item.is_mapping()
                && item
                    .get(key)
                    .is_some_and(|value| value.borrow().scalar_text().is_some())
        })
    })
}
