//! Application-level errors raised by the execution core.
//!
//! # Structured Error Categories
//!
//! `EvalErrorKind` carries the structured data of each error condition and
//! names the user-visible exception class (`ArgumentError`, `LocalJumpError`,
//! ...). Factory functions are the public API; they populate both `kind` and
//! `message`.
//!
//! Non-local control flow is not an error and lives in [`crate::ControlAction`].

use std::fmt;

use garnet_ir::{ArityError, BinaryOp, Name};

use crate::Value;

/// Which construct a `LocalJumpError` failed to escape from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JumpReason {
    Return,
    Break,
    Next,
    Redo,
    Retry,
    NoReason,
}

impl JumpReason {
    pub fn as_str(self) -> &'static str {
        match self {
            JumpReason::Return => "return",
            JumpReason::Break => "break",
            JumpReason::Next => "next",
            JumpReason::Redo => "redo",
            JumpReason::Retry => "retry",
            JumpReason::NoReason => "noreason",
        }
    }
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    ArityMismatch {
        got: usize,
        expected: usize,
    },
    LocalJump {
        reason: JumpReason,
        message: String,
    },
    NoMethod {
        name: String,
        receiver: String,
        /// `Some("private")` when the method exists but is not callable here.
        visibility: Option<&'static str>,
    },
    NoSuperMethod {
        name: String,
    },
    UninitializedConstant {
        name: String,
    },
    /// A native method was invoked on a receiver of the wrong type.
    WrongReceiver {
        expected: &'static str,
        found: String,
    },
    BinaryTypeMismatch {
        op: BinaryOp,
        left: String,
        right: String,
    },
    /// `raise "message"`
    Runtime {
        message: String,
    },
    StackOverflow {
        depth: usize,
    },
    /// The thread was asked to stop via its interrupt handle.
    Interrupted,
}

impl EvalErrorKind {
    /// Exception class this error surfaces as.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::ArityMismatch { .. } => "ArgumentError",
            Self::LocalJump { .. } => "LocalJumpError",
            Self::NoMethod { .. } | Self::NoSuperMethod { .. } => "NoMethodError",
            Self::UninitializedConstant { .. } => "NameError",
            Self::WrongReceiver { .. } | Self::BinaryTypeMismatch { .. } => "TypeError",
            Self::Runtime { .. } => "RuntimeError",
            Self::StackOverflow { .. } => "SystemStackError",
            Self::Interrupted => "Interrupt",
        }
    }

    /// Whether a `rescue` clause may catch this error.
    pub fn is_rescuable(&self) -> bool {
        !matches!(self, Self::Interrupted | Self::StackOverflow { .. })
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArityMismatch { got, expected } => {
                write!(f, "wrong number of arguments ({got} for {expected})")
            }
            Self::LocalJump { message, .. } | Self::Runtime { message } => f.write_str(message),
            Self::NoMethod {
                name,
                receiver,
                visibility,
            } => match visibility {
                Some(visibility) => {
                    write!(f, "{visibility} method `{name}' called for {receiver}")
                }
                None => write!(f, "undefined method `{name}' for {receiver}"),
            },
            Self::NoSuperMethod { name } => write!(f, "super: no superclass method `{name}'"),
            Self::UninitializedConstant { name } => write!(f, "uninitialized constant {name}"),
            Self::WrongReceiver { expected, found } => {
                write!(f, "wrong receiver type {found} (expected {expected})")
            }
            Self::BinaryTypeMismatch { op, left, right } => write!(
                f,
                "operator `{}` cannot be applied to {left} and {right}",
                op.as_symbol()
            ),
            Self::StackOverflow { depth } => {
                write!(f, "stack level too deep (limit: {depth})")
            }
            Self::Interrupted => write!(f, "thread interrupted"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()`.
    pub message: String,
    /// Value carried by a `LocalJumpError` (the `return`/`break` payload).
    pub exit_value: Option<Value>,
    /// Method names on the frame stack where the error surfaced, innermost first.
    pub backtrace: Vec<Name>,
}

impl EvalError {
    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        EvalError {
            kind,
            message,
            exit_value: None,
            backtrace: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_exit_value(mut self, value: Value) -> Self {
        self.exit_value = Some(value);
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Vec<Name>) -> Self {
        self.backtrace = backtrace;
        self
    }

    #[inline]
    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.class_name())
    }
}

impl std::error::Error for EvalError {}

/// Argument count mismatch.
#[cold]
pub fn wrong_number_of_arguments(err: ArityError) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        got: err.got,
        expected: err.expected,
    })
}

/// A control-flow signal escaped the construct it belongs to.
#[cold]
pub fn local_jump_error(reason: JumpReason, value: Value, message: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::LocalJump {
        reason,
        message: message.to_string(),
    })
    .with_exit_value(value)
}

#[cold]
pub fn no_block_given() -> EvalError {
    local_jump_error(JumpReason::NoReason, Value::Nil, "no block given")
}

#[cold]
pub fn no_method_error(name: &Name, receiver: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoMethod {
        name: name.to_string(),
        receiver: receiver.describe(),
        visibility: None,
    })
}

#[cold]
pub fn private_method_called(name: &Name, receiver: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoMethod {
        name: name.to_string(),
        receiver: receiver.describe(),
        visibility: Some("private"),
    })
}

#[cold]
pub fn protected_method_called(name: &Name, receiver: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoMethod {
        name: name.to_string(),
        receiver: receiver.describe(),
        visibility: Some("protected"),
    })
}

#[cold]
pub fn no_super_method(name: &Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoSuperMethod {
        name: name.to_string(),
    })
}

#[cold]
pub fn uninitialized_constant(name: &Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UninitializedConstant {
        name: name.to_string(),
    })
}

#[cold]
pub fn wrong_receiver(expected: &'static str, found: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::WrongReceiver {
        expected,
        found: found.type_name().to_string(),
    })
}

#[cold]
pub fn binary_type_mismatch(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::BinaryTypeMismatch {
        op,
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    })
}

#[cold]
pub fn runtime_error(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Runtime {
        message: message.into(),
    })
}

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

#[cold]
pub fn interrupted() -> EvalError {
    EvalError::from_kind(EvalErrorKind::Interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arity_mismatch_message_names_counts() {
        let err = wrong_number_of_arguments(ArityError {
            got: 0,
            expected: 1,
        });
        assert_eq!(err.message, "wrong number of arguments (0 for 1)");
        assert_eq!(err.class_name(), "ArgumentError");
    }

    #[test]
    fn local_jump_error_carries_value() {
        let err = local_jump_error(JumpReason::Break, Value::Int(7), "unexpected break");
        assert_eq!(
            err.kind,
            EvalErrorKind::LocalJump {
                reason: JumpReason::Break,
                message: "unexpected break".to_string()
            }
        );
        assert_eq!(err.exit_value, Some(Value::Int(7)));
        assert_eq!(err.to_string(), "unexpected break (LocalJumpError)");
    }

    #[test]
    fn private_method_message() {
        let err = private_method_called(&Name::new("secret"), &Value::Int(1));
        assert_eq!(err.message, "private method `secret' called for 1:Integer");
    }

    #[test]
    fn interrupt_is_not_rescuable() {
        assert!(!interrupted().kind.is_rescuable());
        assert!(runtime_error("boom").kind.is_rescuable());
    }
}
