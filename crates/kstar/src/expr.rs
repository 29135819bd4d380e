//! Deferred node expressions.
//!
//! `node + other` does not merge anything. It returns a [`NodeExpr`]
//! holding the target and a queue of steps; the steps run only when the
//! expression is evaluated, which normally happens when the result is
//! assigned back into a field:
//!
//! ```text
//! node.spec = node.spec + patch   # merges into node.spec in place
//! copy = node.spec + patch        # nothing happens yet
//! other.spec = copy               # runs against a copy of node.spec
//! ```

use crate::error::{Error, Feature, Result};
use crate::mapping::MappingNode;
use crate::protocol::{BinaryOp, HasBinary, ScriptValue, Side};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// One queued step: takes the in-flight target, returns the next one.
pub type ExprOp = Rc<dyn Fn(ExprTarget) -> Result<ExprTarget>>;

/// The operation an expression was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// `+`: structural merge, source wins on conflicts
    Combine,
}

/// A value an expression can operate on.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ExprTarget {
    Mapping(MappingNode),
}

impl ExprTarget {
    pub fn type_name(&self) -> &'static str {
        match self {
            ExprTarget::Mapping(node) => node.type_name(),
        }
    }

    pub fn as_mapping(&self) -> Option<&MappingNode> {
        match self {
            ExprTarget::Mapping(node) => Some(node),
        }
    }

    /// True when `value` is this very target (not an equal copy).
    pub fn same_as(&self, value: &Value) -> bool {
        match (self, value) {
            (ExprTarget::Mapping(node), Value::Mapping(other)) => node.ptr_eq(other),
            _ => false,
        }
    }

    /// An independent copy to run steps against without touching the original.
    pub fn copy_for_combination(&self) -> ExprTarget {
        match self {
            ExprTarget::Mapping(node) => ExprTarget::Mapping(node.deep_copy()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ExprTarget::Mapping(node) => Value::Mapping(node),
        }
    }
}

/// An uncommitted sequence of operations on one target.
///
/// Cloning shares the expression; chaining builds a new one.
#[derive(Clone)]
pub struct NodeExpr {
    inner: Rc<ExprInner>,
}

struct ExprInner {
    kind: ExprKind,
    target: ExprTarget,
    ops: Vec<ExprOp>,
}

impl NodeExpr {
    pub const TYPE_NAME: &'static str = "NodeExpr";

    pub fn new(kind: ExprKind, target: ExprTarget, op: ExprOp) -> Self {
        Self {
            inner: Rc::new(ExprInner {
                kind,
                target,
                ops: vec![op],
            }),
        }
    }

    pub fn kind(&self) -> ExprKind {
        self.inner.kind
    }

    pub fn target(&self) -> &ExprTarget {
        &self.inner.target
    }

    /// Number of queued steps.
    pub fn len(&self) -> usize {
        self.inner.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.ops.is_empty()
    }

    pub fn ptr_eq(&self, other: &NodeExpr) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A new expression with `op` queued after the existing steps.
    pub fn then(&self, op: ExprOp) -> NodeExpr {
        let mut ops = self.inner.ops.clone();
        ops.push(op);
        Self {
            inner: Rc::new(ExprInner {
                kind: self.inner.kind,
                target: self.inner.target.clone(),
                ops,
            }),
        }
    }

    /// Run the steps against the target itself.
    ///
    /// Steps run left to right; the first error stops the chain.
    pub fn evaluate(&self) -> Result<ExprTarget> {
        self.apply(self.inner.target.clone())
    }

    /// Run the steps against a copy of the target, leaving it untouched.
    pub fn materialize(&self) -> Result<ExprTarget> {
        self.apply(self.inner.target.copy_for_combination())
    }

    fn apply(&self, target: ExprTarget) -> Result<ExprTarget> {
        tracing::debug!(
            kind = ?self.inner.kind,
            steps = self.inner.ops.len(),
            "evaluating node expression"
        );
        self.inner.ops.iter().try_fold(target, |target, op| op(target))
    }
}

impl fmt::Debug for NodeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeExpr")
            .field("kind", &self.inner.kind)
            .field("target", &self.inner.target)
            .field("steps", &self.inner.ops.len())
            .finish()
    }
}

/// The `+` step: merge `source` into the in-flight target.
pub(crate) fn combine_op(source: MappingNode) -> ExprOp {
    Rc::new(move |target: ExprTarget| -> Result<ExprTarget> {
        match &target {
            ExprTarget::Mapping(node) => node.merge(&source)?,
        }
        Ok(target)
    })
}

impl ScriptValue for NodeExpr {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn truth(&self) -> bool {
        true
    }

    fn hash(&self) -> Result<u32> {
        Err(Error::NotImplemented(Feature::Hashing))
    }

    fn to_str(&self) -> Result<String> {
        Err(Error::NotImplemented(Feature::StringRendering))
    }
}

impl HasBinary for NodeExpr {
    fn binary(&self, op: BinaryOp, other: &Value, side: Side) -> Result<Option<Value>> {
        if side != Side::Left {
            return Ok(None);
        }
        let Some(source) = MappingNode::from_value(other)? else {
            return Ok(None);
        };

        match op {
            BinaryOp::Plus => Ok(Some(Value::Expr(self.then(combine_op(source))))),
            BinaryOp::Minus => Err(Error::NotImplemented(Feature::Subtraction)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeError;
    use crate::protocol::binary;
    use kstar_yaml::{parse, to_yaml_string};
    use std::cell::Cell;

    fn mapping(text: &str) -> MappingNode {
        MappingNode::wrap(parse(text).unwrap())
    }

    fn render(node: &MappingNode) -> String {
        to_yaml_string(&node.node().unwrap().borrow()).unwrap()
    }

    #[test]
    fn test_construction_does_not_mutate() {
        let left = mapping("a: 1");
        let expr = binary(BinaryOp::Plus, &left.clone().into(), &mapping("b: 2").into()).unwrap();

        assert!(matches!(expr, Value::Expr(_)));
        assert_eq!(render(&left), "a: 1");
    }

    #[test]
    fn test_evaluate_mutates_target_in_place() {
        let left = mapping("a: 1");
        let expr = NodeExpr::new(
            ExprKind::Combine,
            ExprTarget::Mapping(left.clone()),
            combine_op(mapping("b: 2")),
        );

        let result = expr.evaluate().unwrap();
        assert!(result.same_as(&Value::Mapping(left.clone())));
        insta::assert_snapshot!(render(&left), @r"
        a: 1
        b: 2
        ");
    }

    #[test]
    fn test_materialize_leaves_target_alone() {
        let left = mapping("a: 1");
        let expr = NodeExpr::new(
            ExprKind::Combine,
            ExprTarget::Mapping(left.clone()),
            combine_op(mapping("a: 2")),
        );

        let result = expr.materialize().unwrap();
        assert!(!result.same_as(&Value::Mapping(left.clone())));
        assert_eq!(render(&left), "a: 1");
        assert_eq!(render(result.as_mapping().unwrap()), "a: 2");
    }

    #[test]
    fn test_steps_run_in_order_and_stop_at_first_error() {
        let calls = Rc::new(Cell::new(0));
        let counter = |calls: Rc<Cell<u32>>| -> ExprOp {
            Rc::new(move |target: ExprTarget| -> Result<ExprTarget> {
                calls.set(calls.get() + 1);
                Ok(target)
            })
        };
        let failing: ExprOp = Rc::new(|_: ExprTarget| -> Result<ExprTarget> {
            Err(Error::Merge(MergeError::NotAMapping { path: vec![] }))
        });

        let expr = NodeExpr::new(
            ExprKind::Combine,
            ExprTarget::Mapping(MappingNode::new()),
            counter(calls.clone()),
        )
        .then(failing)
        .then(counter(calls.clone()));

        assert_eq!(expr.len(), 3);
        assert!(matches!(expr.evaluate(), Err(Error::Merge(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_chaining_queues_another_step() {
        let left = mapping("a: 1");
        let first = binary(BinaryOp::Plus, &left.clone().into(), &mapping("b: 2").into()).unwrap();
        let second = binary(BinaryOp::Plus, &first, &mapping("c: 3").into()).unwrap();

        let second = second.as_expr().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(first.as_expr().unwrap().len(), 1);

        second.evaluate().unwrap();
        insta::assert_snapshot!(render(&left), @r"
        a: 1
        b: 2
        c: 3
        ");
    }

    #[test]
    fn test_expression_operators() {
        let expr = binary(BinaryOp::Plus, &mapping("a: 1").into(), &mapping("b: 2").into()).unwrap();
        let expr = expr.as_expr().unwrap();

        let err = expr
            .binary(BinaryOp::Minus, &mapping("b: 2").into(), Side::Left)
            .unwrap_err();
        assert!(err.is_not_implemented());

        assert!(expr
            .binary(BinaryOp::Star, &mapping("b: 2").into(), Side::Left)
            .unwrap()
            .is_none());
        assert!(expr
            .binary(BinaryOp::Plus, &Value::Int(1), Side::Left)
            .unwrap()
            .is_none());
        assert!(expr
            .binary(BinaryOp::Plus, &mapping("b: 2").into(), Side::Right)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_chaining_a_failing_expression_reports_its_error() {
        use crate::schema::{MergeStrategy, Schema};

        let schema = Schema::new().with_property(
            "items",
            Schema::new()
                .with_strategy(MergeStrategy::Merge)
                .with_merge_key("name"),
        );
        let inner = mapping("items:\n  - name: a").with_schema(Rc::new(schema));
        let pending = binary(BinaryOp::Plus, &inner.into(), &mapping("items:\n  - other: b").into())
            .unwrap();

        let expr = binary(BinaryOp::Plus, &mapping("a: 1").into(), &mapping("b: 2").into()).unwrap();
        let err = expr
            .as_expr()
            .unwrap()
            .binary(BinaryOp::Plus, &pending, Side::Left)
            .unwrap_err();
        assert!(matches!(err, Error::Merge(MergeError::MissingMergeKey { .. })));
    }

    #[test]
    fn test_protocol_members() {
        let expr = NodeExpr::new(
            ExprKind::Combine,
            ExprTarget::Mapping(MappingNode::new()),
            combine_op(MappingNode::new()),
        );
        assert_eq!(expr.type_name(), "NodeExpr");
        assert_eq!(expr.kind(), ExprKind::Combine);
        assert!(expr.truth());
        assert!(expr.hash().unwrap_err().is_not_implemented());
        assert!(expr.to_str().unwrap_err().is_not_implemented());
    }
}
