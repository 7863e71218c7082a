//! Non-local control flow.
//!
//! Signals travel in the error channel of [`EvalResult`] so that `?` unwinds
//! them through ordinary Rust call frames. Each construct that can catch a
//! signal inspects the variant (and, for `Return`/`Break`, the target) and
//! either consumes it or lets it keep propagating.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::{local_jump_error, EvalError, JumpReason};
use crate::Value;

/// Opaque identity of a method or closure instance that can catch a signal.
///
/// Compared by value only; two structurally identical methods never share an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetId(NonZeroU64);

static NEXT_TARGET: AtomicU64 = AtomicU64::new(1);

impl TargetId {
    pub fn fresh() -> Self {
        let raw = NEXT_TARGET.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and u64 does not wrap in practice.
        TargetId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

/// A value propagating out of an evaluation step instead of a result.
#[derive(Clone, Debug)]
pub enum ControlAction {
    /// Application-level error; caught only by `rescue`.
    Error(Box<EvalError>),
    /// `return`: caught by the method (or lambda) whose id matches `target`.
    Return { target: TargetId, value: Value },
    /// `break`: unset target means "not yet claimed by a closure".
    Break {
        target: Option<TargetId>,
        value: Value,
    },
    /// `next`: always consumed by the nearest closure invocation or loop.
    Next(Value),
    Redo,
    Retry,
}

pub type EvalResult = Result<Value, ControlAction>;

impl From<EvalError> for ControlAction {
    #[inline]
    fn from(err: EvalError) -> Self {
        ControlAction::Error(Box::new(err))
    }
}

impl ControlAction {
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, ControlAction::Error(_))
    }

    /// Convert a signal that escaped every handler into the error user code sees.
    pub fn into_eval_error(self) -> EvalError {
        match self {
            ControlAction::Error(err) => *err,
            ControlAction::Return { value, .. } => {
                local_jump_error(JumpReason::Return, value, "unexpected return")
            }
            ControlAction::Break { value, .. } => {
                local_jump_error(JumpReason::Break, value, "unexpected break")
            }
            ControlAction::Next(value) => {
                local_jump_error(JumpReason::Next, value, "unexpected next")
            }
            ControlAction::Redo => local_jump_error(JumpReason::Redo, Value::Nil, "unexpected redo"),
            ControlAction::Retry => local_jump_error(
                JumpReason::Retry,
                Value::Nil,
                "retry outside of rescue clause",
            ),
        }
    }
}
