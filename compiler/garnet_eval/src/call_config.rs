//! Call configurations: the setup and teardown bracketing every body.
//!
//! [`CallConfiguration::pre`] checks arity, pushes the frame(s) and the
//! dynamic scope a body needs, and fires the call event. It returns a
//! [`CallGuard`]; dropping the guard is `post`. Because teardown lives in
//! `Drop`, it runs on every exit path: normal return, a propagating signal
//! (`?`), or a panic unwinding through the body.
//!
//! The guard holds `&mut ExecutionContext` and implements `Deref`/`DerefMut`,
//! so the body runs against the guard exactly as it would against the context.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use garnet_ir::{Arity, Name, StaticScope};

use crate::errors::{wrong_number_of_arguments, EvalError};
use crate::frame::{Frame, Visibility};
use crate::hooks::{EventKind, TraceEvent};
use crate::object::ClassRef;
use crate::scope::DynamicScope;
use crate::signal::TargetId;
use crate::{Block, ExecutionContext, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallConfiguration {
    /// Ordinary method with local variables.
    #[default]
    FrameAndScope,
    /// Native method, or a body that never touches its own scope.
    FrameOnly,
    /// Trivial native that runs in its caller's frame (`private`, `Array#size`).
    NoFrameNoScope,
    /// Singleton copy made by `module_function`; also pushes a synthetic
    /// frame whose `self` is the module.
    ModuleFunction,
    /// Closure body; arity is handled by the argument strategy.
    Block,
}

impl CallConfiguration {
    #[inline]
    pub fn pushes_frame(self) -> bool {
        !matches!(self, CallConfiguration::NoFrameNoScope)
    }

    #[inline]
    pub fn pushes_scope(self) -> bool {
        matches!(
            self,
            CallConfiguration::FrameAndScope
                | CallConfiguration::ModuleFunction
                | CallConfiguration::Block
        )
    }

    #[inline]
    pub fn checks_arity(self) -> bool {
        !matches!(self, CallConfiguration::Block)
    }

    /// Enter a method body.
    pub fn pre<'ctx>(
        self,
        ctx: &'ctx mut ExecutionContext,
        call: &Invocation<'_>,
    ) -> Result<CallGuard<'ctx>, EvalError> {
        if self.checks_arity() {
            call.arity
                .check(call.arg_count)
                .map_err(wrong_number_of_arguments)?;
        }

        let mut guard = CallGuard::new(ctx);
        if self == CallConfiguration::ModuleFunction {
            if let Some(module) = call.owner {
                let synthetic = Frame::new(
                    Value::Class(Arc::clone(module)),
                    Some(Arc::clone(module)),
                    Visibility::Public,
                );
                guard.push_frame(synthetic)?;
            }
        }
        if self.pushes_frame() {
            guard.push_frame(Frame {
                name: Some(call.name.clone()),
                block: call.block.cloned(),
                jump_target: call.target,
                activation: call.target,
                ..Frame::new(call.self_value.clone(), call.owner.cloned(), Visibility::Public)
            })?;
        }
        if self.pushes_scope() {
            if let Some(static_scope) = call.static_scope {
                guard.push_scope(DynamicScope::new(Arc::clone(static_scope), None));
            }
        }
        if guard.runtime().hooks().is_active() {
            guard.trace_call(call);
        }
        Ok(guard)
    }

    /// Enter a closure body with `frame` (derived from the closure's binding)
    /// and a fresh scope chained to the binding's scope.
    pub fn pre_yield<'ctx>(
        ctx: &'ctx mut ExecutionContext,
        frame: Frame,
        scope: DynamicScope,
    ) -> Result<CallGuard<'ctx>, EvalError> {
        CallGuard::enter(ctx, frame, Some(scope))
    }
}

/// Everything [`CallConfiguration::pre`] needs to know about one call.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    pub self_value: &'a Value,
    pub owner: Option<&'a ClassRef>,
    pub name: &'a Name,
    pub arity: Arity,
    pub arg_count: usize,
    pub block: Option<&'a Block>,
    pub static_scope: Option<&'a Arc<StaticScope>>,
    /// Identity that `return` in this body targets.
    pub target: Option<TargetId>,
    pub native: bool,
}

/// RAII guard returned by `pre`; dropping it performs `post`.
pub struct CallGuard<'ctx> {
    ctx: &'ctx mut ExecutionContext,
    frames: usize,
    scope: bool,
    return_event: Option<TraceEvent>,
}

impl<'ctx> CallGuard<'ctx> {
    fn new(ctx: &'ctx mut ExecutionContext) -> Self {
        CallGuard {
            ctx,
            frames: 0,
            scope: false,
            return_event: None,
        }
    }

    /// Push `frame` and optionally `scope`; both are popped when the guard drops.
    pub fn enter(
        ctx: &'ctx mut ExecutionContext,
        frame: Frame,
        scope: Option<DynamicScope>,
    ) -> Result<Self, EvalError> {
        let mut guard = CallGuard::new(ctx);
        guard.push_frame(frame)?;
        if let Some(scope) = scope {
            guard.push_scope(scope);
        }
        Ok(guard)
    }

    fn push_frame(&mut self, frame: Frame) -> Result<(), EvalError> {
        self.ctx.push_frame(frame)?;
        self.frames += 1;
        Ok(())
    }

    fn push_scope(&mut self, scope: DynamicScope) {
        self.ctx.push_scope(scope);
        self.scope = true;
    }

    fn trace_call(&mut self, call: &Invocation<'_>) {
        let (call_kind, return_kind) = if call.native {
            (EventKind::CCall, EventKind::CReturn)
        } else {
            (EventKind::Call, EventKind::Return)
        };
        let event = TraceEvent {
            kind: call_kind,
            name: call.name.clone(),
            class_name: call.owner.map(|owner| owner.name().clone()),
            depth: self.ctx.frames().depth(),
        };
        self.ctx.runtime().hooks().fire(&event);
        self.return_event = Some(TraceEvent {
            kind: return_kind,
            ..event
        });
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if self.scope {
            self.ctx.pop_scope();
        }
        for _ in 0..self.frames {
            self.ctx.pop_frame();
        }
        if let Some(event) = self.return_event.take() {
            self.ctx.runtime().hooks().fire(&event);
        }
    }
}

impl Deref for CallGuard<'_> {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for CallGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}
