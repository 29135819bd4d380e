//! Field cache: a lazily built projection of a mapping's entries.

use crate::convert::from_node;
use crate::merge::MergeOptions;
use crate::schema::Schema;
use crate::value::Value;
use indexmap::IndexMap;
use kstar_yaml::NodeRef;
use std::rc::Rc;

/// Field name to projected value, in document order.
///
/// Never authoritative: the backing document is. The owning
/// [`MappingNode`](crate::MappingNode) drops the cache whenever the
/// document is replaced, and writes go to the document first.
#[derive(Debug, Default)]
pub(crate) struct FieldCache {
    fields: IndexMap<String, Value>,
}

impl FieldCache {
    /// Project every entry of `node`.
    ///
    /// Mapping values alias the document subtree and receive the matching
    /// sub-schema. Entries with non-scalar keys are skipped; for duplicate
    /// keys the first entry wins, as it does for lookups in the document.
    pub(crate) fn load(
        node: Option<&NodeRef>,
        schema: Option<&Rc<Schema>>,
        options: &MergeOptions,
    ) -> Self {
        let Some(node) = node else {
            return Self::default();
        };

        let node = node.borrow();
        let mut fields = IndexMap::with_capacity(node.len());
        for (key, value) in node.pairs() {
            let Some(name) = key.borrow().scalar_text() else {
                continue;
            };
            if fields.contains_key(&name) {
                continue;
            }
            let field_schema = schema.and_then(|schema| schema.property(&name));
            let value = from_node(value.clone(), field_schema, options);
            fields.insert(name, value);
        }

        tracing::trace!(fields = fields.len(), "loaded field cache");
        Self { fields }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Record a value just written to the document.
    ///
    /// New names are appended, matching where the document appends them.
    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Field names, sorted.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fields.keys().cloned().collect();
        names.sort();
        names
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }
}
