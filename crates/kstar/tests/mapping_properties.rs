//! Property tests for field access and merging over generated documents.

use kstar::{MappingNode, Value};
use proptest::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

/// Build a mapping node from entries; later duplicates overwrite earlier ones.
fn mapping_from(entries: &[(String, i64)]) -> MappingNode {
    let dict: Value = entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
    MappingNode::from_value(&dict).unwrap().unwrap()
}

fn entries(prefix: &'static str) -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(
        ("[a-z]{1,6}".prop_map(move |k| format!("{prefix}{k}")), any::<i64>()),
        0..10,
    )
}

/// Expected final value per key: last write wins, position of first write.
fn expected(entries: &[(String, i64)]) -> indexmap::IndexMap<String, i64> {
    let mut map = indexmap::IndexMap::new();
    for (k, v) in entries {
        map.insert(k.clone(), *v);
    }
    map
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn names_are_sorted(entries in entries("")) {
        let node = mapping_from(&entries);

        let mut keys: Vec<String> = expected(&entries).into_keys().collect();
        keys.sort();
        prop_assert_eq!(node.names(), keys);
    }

    #[test]
    fn reads_match_document_before_and_after_caching(entries in entries("")) {
        let node = mapping_from(&entries);
        let expected = expected(&entries);

        // First read populates the cache; the second is served from it.
        for (k, v) in &expected {
            prop_assert_eq!(node.field(k), Value::Int(*v));
        }
        for (k, v) in &expected {
            prop_assert_eq!(node.field(k), Value::Int(*v));
        }
    }

    #[test]
    fn read_after_write(entries in entries(""), name in "[a-z]{1,6}", value in any::<i64>()) {
        let node = mapping_from(&entries);
        node.names();

        node.set_field(&name, Value::Int(value)).unwrap();
        prop_assert_eq!(node.field(&name), Value::Int(value));

        // A fresh projection of the same document agrees with the cache.
        let reloaded = MappingNode::from_node(node.node().unwrap().deep_copy()).unwrap();
        prop_assert_eq!(reloaded.field(&name), Value::Int(value));
    }

    #[test]
    fn disjoint_merge_is_a_union(left in entries("l_"), right in entries("r_")) {
        let dest = mapping_from(&left);
        let src = mapping_from(&right);

        dest.merge(&src).unwrap();

        let (left, right) = (expected(&left), expected(&right));
        let mut keys: Vec<String> = left.keys().chain(right.keys()).cloned().collect();
        keys.sort();
        prop_assert_eq!(dest.names(), keys);

        for (k, v) in left.iter().chain(right.iter()) {
            prop_assert_eq!(dest.field(k), Value::Int(*v));
        }
    }

    #[test]
    fn source_wins_on_shared_keys(left in entries(""), right in entries("")) {
        let dest = mapping_from(&left);
        let src = mapping_from(&right);

        dest.merge(&src).unwrap();

        let mut merged = expected(&left);
        merged.extend(expected(&right));
        for (k, v) in &merged {
            prop_assert_eq!(dest.field(k), Value::Int(*v));
        }
    }
}
