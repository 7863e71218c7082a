//! Runtime values.
//!
//! Values are thread-confined: strings, arrays and objects use `Rc`, so a
//! `Value` never crosses an execution context. Classes are the exception;
//! they are `Arc`-shared because method tables are process-wide.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use garnet_ir::BinaryOp;

use crate::errors::{binary_type_mismatch, EvalError};
use crate::object::{ClassRef, RObject};
use crate::Block;

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Proc(Block),
    Class(ClassRef),
    Object(Rc<RObject>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Rc::new(values))
    }

    /// Everything except `nil` and `false` is truthy.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_proc(&self) -> Option<&Block> {
        match self {
            Value::Proc(block) => Some(block),
            _ => None,
        }
    }

    /// Name of the value's class.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Nil => "NilClass",
            Value::Bool(true) => "TrueClass",
            Value::Bool(false) => "FalseClass",
            Value::Int(_) => "Integer",
            Value::Str(_) => "String",
            Value::Array(_) => "Array",
            Value::Proc(_) => "Proc",
            Value::Class(class) if class.is_module() => "Module",
            Value::Class(_) => "Class",
            Value::Object(object) => object.class().name().as_str(),
        }
    }

    /// Developer-facing representation (`Object#inspect`).
    pub fn inspect(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Str(s) => format!("{s:?}"),
            Value::Array(values) => {
                let items: Vec<String> = values.iter().map(Value::inspect).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Proc(block) if block.is_lambda() => "#<Proc (lambda)>".to_string(),
            Value::Proc(_) => "#<Proc>".to_string(),
            Value::Object(object) => format!("#<{}>", object.class().name()),
            other => other.to_string(),
        }
    }

    /// `inspect:Class`, as used in `NoMethodError` messages.
    pub fn describe(&self) -> String {
        format!("{}:{}", self.inspect(), self.type_name())
    }

    /// Apply a binary operator. Integers support arithmetic and comparison;
    /// `+` concatenates strings and arrays; equality works on every value.
    pub fn binary_op(&self, op: BinaryOp, rhs: &Value) -> Result<Value, EvalError> {
        match (op, self, rhs) {
            (BinaryOp::Eq, l, r) => Ok(Value::Bool(l == r)),
            (BinaryOp::NotEq, l, r) => Ok(Value::Bool(l != r)),
            (BinaryOp::Add, Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_add(*r))),
            (BinaryOp::Sub, Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_sub(*r))),
            (BinaryOp::Mul, Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_mul(*r))),
            (BinaryOp::Lt, Value::Int(l), Value::Int(r)) => Ok(Value::Bool(l < r)),
            (BinaryOp::Gt, Value::Int(l), Value::Int(r)) => Ok(Value::Bool(l > r)),
            (BinaryOp::Add, Value::Str(l), Value::Str(r)) => {
                Ok(Value::Str(Rc::from(format!("{l}{r}").as_str())))
            }
            (BinaryOp::Add, Value::Array(l), Value::Array(r)) => {
                let mut joined = Vec::with_capacity(l.len() + r.len());
                joined.extend(l.iter().cloned());
                joined.extend(r.iter().cloned());
                Ok(Value::array(joined))
            }
            _ => Err(binary_type_mismatch(op, self, rhs)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Proc(a), Value::Proc(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// User-facing representation (`to_s`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Class(class) => write!(f, "{}", class.name()),
            other => f.write_str(&other.inspect()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
