//! The scripting value protocol.
//!
//! An embedding interpreter talks to node values only through these
//! capability traits. A value implements the ones it supports; the
//! interpreter asks a [`Value`] for a capability with `as_binary()` and
//! friends instead of reflecting over concrete types.

use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt;

/// Binary operator tokens the interpreter can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pipe,
    Ampersand,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Star => "*",
            BinaryOp::Slash => "/",
            BinaryOp::Percent => "%",
            BinaryOp::Pipe => "|",
            BinaryOp::Ampersand => "&",
        };
        f.write_str(token)
    }
}

/// Which operand of a binary expression the receiver is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Members every script-visible value has.
pub trait ScriptValue {
    /// Type name shown to script authors.
    fn type_name(&self) -> &'static str;

    fn truth(&self) -> bool;

    fn hash(&self) -> Result<u32>;

    /// Textual rendering (`str(x)`).
    fn to_str(&self) -> Result<String>;

    /// Make the value immutable. Values without a frozen state ignore it.
    fn freeze(&self) {}
}

/// `x.name` reads and `dir(x)`.
pub trait HasAttrs: ScriptValue {
    /// Read an attribute. A missing attribute reads as `None`.
    fn attr(&self, name: &str) -> Result<Value>;

    /// Attribute names, sorted.
    fn attr_names(&self) -> Vec<String>;
}

/// `x.name = value`.
pub trait HasSetField: HasAttrs {
    fn set_field(&self, name: &str, value: Value) -> Result<()>;
}

/// `x[key]` and `x[key] = value`.
pub trait HasSetKey: ScriptValue {
    fn get(&self, key: &Value) -> Result<Value>;

    fn set_key(&self, key: &Value, value: Value) -> Result<()>;
}

/// Operator overloading.
pub trait HasBinary: ScriptValue {
    /// Apply `op` with the receiver on `side` and `other` as the other operand.
    ///
    /// `Ok(None)` means "not applicable": the interpreter should try the
    /// other operand or report a type error.
    fn binary(&self, op: BinaryOp, other: &Value, side: Side) -> Result<Option<Value>>;
}

/// Dispatch `left op right` the way the interpreter does.
///
/// The left operand's handler is asked first, then the right operand's.
/// If neither applies, the result is [`Error::UnsupportedOperation`].
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    if let Some(handler) = left.as_binary() {
        if let Some(result) = handler.binary(op, right, Side::Left)? {
            return Ok(result);
        }
    }

    if let Some(handler) = right.as_binary() {
        if let Some(result) = handler.binary(op, left, Side::Right)? {
            return Ok(result);
        }
    }

    Err(Error::UnsupportedOperation {
        op,
        left: left.type_name(),
        right: right.type_name(),
    })
}
