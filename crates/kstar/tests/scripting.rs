//! End-to-end scenarios, driven the way an interpreter drives node values:
//! through the protocol traits and the binary dispatcher only.

use kstar::protocol::binary;
use kstar::{
    BinaryOp, Error, HasAttrs, HasSetKey, MappingNode, MergeError, Schema, ScriptValue,
    Value,
};
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn render(node: &MappingNode) -> String {
    kstar_yaml::to_yaml_string(&node.node().unwrap().borrow()).unwrap()
}

const DEPLOYMENT: &str = r#"
metadata:
  name: web
  labels:
    app: web
spec:
  replicas: 1
  containers:
    - name: app
      image: app-v1
    - name: proxy
      image: proxy-v1
"#;

const SCHEMA: &str = r#"{
    "properties": {
        "spec": {
            "properties": {
                "containers": {
                    "x-kubernetes-patch-strategy": "merge",
                    "x-kubernetes-patch-merge-key": "name",
                    "items": {}
                }
            }
        }
    }
}"#;

fn deployment() -> MappingNode {
    let schema = Rc::new(Schema::from_json(SCHEMA).unwrap());
    MappingNode::from_yaml(DEPLOYMENT).unwrap().with_schema(schema)
}

#[test]
fn test_patch_nested_field_in_place() {
    init_tracing();
    let doc = deployment();
    let patch = MappingNode::from_yaml(
        "replicas: 3\ncontainers:\n  - name: app\n    image: app-v2\n  - name: log\n    image: log-v1",
    )
    .unwrap();

    // doc.spec = doc.spec + patch
    let spec = doc.attr("spec").unwrap();
    let expr = binary(BinaryOp::Plus, &spec, &patch.into()).unwrap();
    doc.set_field("spec", expr).unwrap();

    insta::assert_snapshot!(render(&doc), @r"
    metadata:
      name: web
      labels:
        app: web
    spec:
      replicas: 3
      containers:
        - name: app
          image: app-v2
        - name: proxy
          image: proxy-v1
        - name: log
          image: log-v1
    ");
}

#[test]
fn test_uncommitted_expression_changes_nothing() {
    init_tracing();
    let doc = deployment();
    let before = render(&doc);

    let labels = doc
        .attr("metadata")
        .unwrap()
        .as_mapping()
        .unwrap()
        .attr("labels")
        .unwrap();
    let patch: Value = [("tier", "frontend")].into_iter().collect();
    let _pending = binary(BinaryOp::Plus, &labels, &patch).unwrap();

    assert_eq!(render(&doc), before);
}

#[test]
fn test_copy_then_combine_into_new_field() {
    init_tracing();
    let doc = deployment();

    let labels = doc.attr("metadata").unwrap().as_mapping().unwrap().attr("labels").unwrap();
    let extra: Value = [("tier", "frontend")].into_iter().collect();
    let combined = binary(BinaryOp::Plus, &labels, &extra).unwrap();

    let selector = MappingNode::new();
    selector.set_key(&Value::from("matchLabels"), combined).unwrap();

    insta::assert_snapshot!(render(&selector), @r"
    matchLabels:
      app: web
      tier: frontend
    ");
    let labels = labels.as_mapping().unwrap();
    assert_eq!(labels.attr_names(), vec!["app"]);
}

#[test]
fn test_self_assignment_matches_direct_merge() {
    init_tracing();
    let patch = MappingNode::from_yaml("labels:\n  tier: frontend").unwrap();

    let via_field = deployment();
    let metadata = via_field.attr("metadata").unwrap();
    let expr = binary(BinaryOp::Plus, &metadata, &patch.clone().into()).unwrap();
    via_field.set_field("metadata", expr).unwrap();

    let direct = deployment();
    direct
        .attr("metadata")
        .unwrap()
        .as_mapping()
        .unwrap()
        .merge(&patch)
        .unwrap();

    assert_eq!(render(&via_field), render(&direct));
    assert!(via_field.attr("metadata").unwrap().same_as(&metadata));
}

#[test]
fn test_failed_commit_keeps_document() {
    init_tracing();
    let doc = deployment();
    let before = render(&doc);
    let patch = MappingNode::from_yaml("containers:\n  - image: nameless").unwrap();

    let spec = doc.attr("spec").unwrap();
    let expr = binary(BinaryOp::Plus, &spec, &patch.into()).unwrap();
    let err = doc.set_field("spec", expr).unwrap_err();

    assert!(matches!(
        err,
        Error::Merge(MergeError::MissingMergeKey { ref key, .. }) if key == "name"
    ));
    assert_eq!(render(&doc), before);
}

#[test]
fn test_truth_and_type_errors() {
    init_tracing();
    assert!(!MappingNode::new().truth());
    assert!(deployment().truth());

    let doc = deployment();
    let err = doc.get(&Value::Float(1.5)).unwrap_err();
    assert_eq!(err.to_string(), "unsupported field type: \"float\"");

    let err = binary(BinaryOp::Minus, &doc.clone().into(), &Value::from(doc)).unwrap_err();
    assert!(err.is_not_implemented());
}
