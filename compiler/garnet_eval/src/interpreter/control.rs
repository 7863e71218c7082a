//! Loop and rescue constructs.
//!
//! Generic over how the condition and body are evaluated so the interpreter
//! and compiled bodies share one implementation of the signal rules.

use garnet_ir::Name;

use crate::{ControlAction, EvalResult, ExecutionContext, Value};

/// `while cond; body; end`
///
/// Consumes unclaimed `break` (the loop's value), `next` (next iteration) and
/// `redo` (rerun the body without re-testing the condition). Everything else
/// propagates.
pub fn run_while<C, B>(ctx: &mut ExecutionContext, mut cond: C, mut body: B) -> EvalResult
where
    C: FnMut(&mut ExecutionContext) -> EvalResult,
    B: FnMut(&mut ExecutionContext) -> EvalResult,
{
    loop {
        ctx.poll_interrupts()?;
        if !cond(ctx)?.is_truthy() {
            return Ok(Value::Nil);
        }
        loop {
            match body(ctx) {
                Ok(_) | Err(ControlAction::Next(_)) => break,
                Err(ControlAction::Redo) => ctx.poll_interrupts()?,
                Err(ControlAction::Break {
                    target: None,
                    value,
                }) => return Ok(value),
                Err(other) => return Err(other),
            }
        }
    }
}

/// `begin body rescue handler end`
///
/// Only rescuable application errors reach the handler; signals pass through.
/// The error message is visible to the handler as `$!`. A `retry` raised by
/// the handler re-runs the protected body.
pub fn run_rescue<B, H>(ctx: &mut ExecutionContext, mut body: B, mut handler: H) -> EvalResult
where
    B: FnMut(&mut ExecutionContext) -> EvalResult,
    H: FnMut(&mut ExecutionContext) -> EvalResult,
{
    loop {
        match body(ctx) {
            Err(ControlAction::Error(err)) if err.kind.is_rescuable() => {
                tracing::trace!(class = err.class_name(), "rescued");
                ctx.set_global(Name::new("$!"), Value::str(&err.message));
                match handler(ctx) {
                    Err(ControlAction::Retry) => ctx.poll_interrupts()?,
                    other => return other,
                }
            }
            other => return other,
        }
    }
}
