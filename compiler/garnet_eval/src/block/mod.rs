//! Closures.
//!
//! A [`Block`] is a body plus the [`Binding`] captured where it was written.
//! It is invoked either by `yield` from the method it was passed to, or by
//! `Proc#call` on a first-class proc value.
//!
//! # Signals at the closure boundary
//!
//! - `next v` ends this invocation with `v`.
//! - `redo` restarts the body in place, polling for interrupts each time.
//! - An unclaimed `break` is claimed by this closure (its target becomes the
//!   closure's id) and keeps propagating; the call site that created the
//!   closure literal consumes it.
//! - `return` targets the method that created the closure and passes through.
//! - A lambda ends its own invocation on `return` or `break`, however it was
//!   invoked.

mod args;

use std::rc::Rc;
use std::sync::Arc;

use garnet_ir::{Arity, IterNode, Name};

use crate::binding::Binding;
use crate::call_config::CallConfiguration;
use crate::errors::{local_jump_error, wrong_number_of_arguments, JumpReason};
use crate::frame::Frame;
use crate::method::MethodRef;
use crate::object::ClassRef;
use crate::scope::DynamicScope;
use crate::signal::TargetId;
use crate::{ControlAction, EvalResult, ExecutionContext, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Closure literal attached to a call.
    Normal,
    /// `proc { }`
    Proc,
    /// `lambda { }`: strict arity; `return` and `break` leave the lambda.
    Lambda,
}

#[derive(Clone)]
pub enum BlockBody {
    Interpreted(Arc<IterNode>),
    Method(MethodBlock),
}

/// A method converted to a closure (`method(:name)`).
#[derive(Clone)]
pub struct MethodBlock {
    method: MethodRef,
    name: Name,
}

impl MethodBlock {
    pub fn new(method: MethodRef, name: Name) -> Self {
        MethodBlock { method, name }
    }

    pub fn method(&self) -> &MethodRef {
        &self.method
    }
}

#[derive(Clone)]
pub struct Block(Rc<BlockInner>);

struct BlockInner {
    body: BlockBody,
    binding: Binding,
    id: TargetId,
    kind: BlockKind,
}

impl Block {
    fn from_parts(body: BlockBody, mut binding: Binding, kind: BlockKind) -> Block {
        let id = TargetId::fresh();
        if kind == BlockKind::Lambda {
            binding.frame.jump_target = Some(id);
        }
        Block(Rc::new(BlockInner {
            body,
            binding,
            id,
            kind,
        }))
    }

    /// Close over the current frame and scope of `ctx`.
    pub fn from_iter(ctx: &ExecutionContext, iter: &Arc<IterNode>, kind: BlockKind) -> Block {
        Block::from_parts(
            BlockBody::Interpreted(Arc::clone(iter)),
            Binding::capture(ctx),
            kind,
        )
    }

    /// Wrap a method as a closure whose `self` is the current `self`.
    pub fn from_method(ctx: &ExecutionContext, method: MethodRef, name: Name) -> Block {
        Block::from_parts(
            BlockBody::Method(MethodBlock::new(method, name)),
            Binding::capture(ctx),
            BlockKind::Lambda,
        )
    }

    #[inline]
    pub fn id(&self) -> TargetId {
        self.0.id
    }

    #[inline]
    pub fn kind(&self) -> BlockKind {
        self.0.kind
    }

    #[inline]
    pub fn is_lambda(&self) -> bool {
        self.0.kind == BlockKind::Lambda
    }

    #[inline]
    pub fn body(&self) -> &BlockBody {
        &self.0.body
    }

    #[inline]
    pub fn binding(&self) -> &Binding {
        &self.0.binding
    }

    pub fn arity(&self) -> Arity {
        match &self.0.body {
            BlockBody::Interpreted(iter) => iter.params.arity(),
            BlockBody::Method(method_block) => method_block.method.arity(),
        }
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Block) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Copy with a duplicated frame and an independent scope chain. The body
    /// and arity are shared; the copy gets its own identity.
    #[must_use]
    pub fn clone_block(&self) -> Block {
        Block::from_parts(
            self.0.body.clone(),
            self.0.binding.deep_clone(),
            self.0.kind,
        )
    }

    /// `Proc#call`: the argument list is the yielded value, arrayified.
    pub fn call(&self, ctx: &mut ExecutionContext, args: &[Value]) -> EvalResult {
        if self.is_lambda() {
            self.arity()
                .check(args.len())
                .map_err(wrong_number_of_arguments)?;
        }
        let result = self.yield_value(ctx, Value::array(args.to_vec()), None, None, true);
        self.finish_call(ctx, result)
    }

    fn finish_call(&self, ctx: &ExecutionContext, result: EvalResult) -> EvalResult {
        let id = self.id();
        match (self.kind(), result) {
            (
                kind,
                Err(ControlAction::Break {
                    target: Some(target),
                    value,
                }),
            ) if target == id && (kind == BlockKind::Proc || !ctx.is_iter_active(id)) => {
                Err(break_from_proc_closure(value))
            }
            (_, result) => result,
        }
    }

    /// Run the body with `value` bound through the closure's argument strategy.
    ///
    /// `self_override` and `class_override` replace the captured `self` and
    /// class for this invocation only (`instance_eval`-style yields).
    pub fn yield_value(
        &self,
        ctx: &mut ExecutionContext,
        value: Value,
        self_override: Option<Value>,
        class_override: Option<ClassRef>,
        arrayify: bool,
    ) -> EvalResult {
        match &self.0.body {
            BlockBody::Interpreted(iter) => {
                self.yield_interpreted(ctx, iter, value, self_override, class_override, arrayify)
            }
            BlockBody::Method(method_block) => {
                let args = match (&value, arrayify) {
                    (Value::Array(items), true) => items.to_vec(),
                    _ => vec![value],
                };
                let receiver = self_override.unwrap_or_else(|| self.0.binding.self_value.clone());
                method_block
                    .method
                    .call(ctx, &receiver, &method_block.name, &args, None)
            }
        }
    }

    fn yield_interpreted(
        &self,
        ctx: &mut ExecutionContext,
        iter: &IterNode,
        value: Value,
        self_override: Option<Value>,
        class_override: Option<ClassRef>,
        arrayify: bool,
    ) -> EvalResult {
        let binding = &self.0.binding;
        let scope = DynamicScope::new(Arc::clone(&iter.scope), Some(binding.scope.clone()));
        let frame = self.invocation_frame(self_override, class_override);
        let mut guard = CallConfiguration::pre_yield(ctx, frame, scope.clone())?;
        args::assign(&scope, &iter.params, value, arrayify);

        let id = self.0.id;
        let lambda = self.is_lambda();
        loop {
            match guard.eval(&iter.body) {
                Err(ControlAction::Redo) => {
                    guard.poll_interrupts()?;
                }
                Err(ControlAction::Next(value)) => return Ok(value),
                Err(ControlAction::Return { target, value }) if lambda && target == id => {
                    return Ok(value)
                }
                Err(ControlAction::Break {
                    target: None,
                    value,
                }) if lambda => return Ok(value),
                Err(ControlAction::Break {
                    target: None,
                    value,
                }) => {
                    return Err(ControlAction::Break {
                        target: Some(id),
                        value,
                    })
                }
                other => return other,
            }
        }
    }

    fn invocation_frame(
        &self,
        self_override: Option<Value>,
        class_override: Option<ClassRef>,
    ) -> Frame {
        let binding = &self.0.binding;
        let mut frame = binding.frame.duplicate();
        frame.self_value = self_override.unwrap_or_else(|| binding.self_value.clone());
        frame.class = class_override.or_else(|| binding.class.clone());
        frame.visibility = binding.visibility;
        if self.is_lambda() {
            frame.activation = Some(self.0.id);
        }
        frame
    }
}

#[cold]
fn break_from_proc_closure(value: Value) -> ControlAction {
    local_jump_error(JumpReason::Break, value, "break from proc-closure").into()
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
