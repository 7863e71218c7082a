//! Methods: the closed set of dispatch targets.
//!
//! A [`DynamicMethod`] pairs dispatch metadata (owner, visibility, call
//! configuration, return-target identity) with one of three bodies:
//!
//! - [`InterpretedMethod`]: a body tree walked by the interpreter, promoted to
//!   a compiled form once it becomes hot
//! - [`CompiledMethod`]: a body produced by the compilation backend
//! - [`NativeMethod`]: a Rust function (core library glue)
//!
//! All three share one `call` contract. Method bodies are `Send + Sync`; one
//! definition serves every thread.

mod args;
mod compiled;
mod interpreted;
mod native;
mod promotion;

use std::sync::{Arc, Weak};

use garnet_ir::{Arity, ArgsNode, Name, Node, StaticScope};

use crate::call_config::{CallConfiguration, Invocation};
use crate::frame::Visibility;
use crate::object::{ClassRef, RClass};
use crate::signal::TargetId;
use crate::stack::ensure_sufficient_stack;
use crate::{Block, ControlAction, EvalResult, ExecutionContext, Value};

pub use compiled::CompiledMethod;
pub use interpreted::InterpretedMethod;
pub use native::{NativeFn, NativeMethod};
pub use promotion::PromotionState;

pub type MethodRef = Arc<DynamicMethod>;

pub enum MethodKind {
    Interpreted(InterpretedMethod),
    Compiled(Arc<CompiledMethod>),
    Native(NativeMethod),
}

pub struct DynamicMethod {
    owner: Weak<RClass>,
    visibility: Visibility,
    call_config: CallConfiguration,
    target: TargetId,
    kind: MethodKind,
}

impl DynamicMethod {
    pub fn interpreted(
        owner: &ClassRef,
        visibility: Visibility,
        scope: Arc<StaticScope>,
        args: Arc<ArgsNode>,
        body: Arc<Node>,
    ) -> DynamicMethod {
        Self::with_kind(
            owner,
            visibility,
            CallConfiguration::FrameAndScope,
            MethodKind::Interpreted(InterpretedMethod::new(scope, args, body)),
        )
    }

    /// A method whose only body is an already compiled form.
    pub fn compiled(
        owner: &ClassRef,
        visibility: Visibility,
        compiled: Arc<CompiledMethod>,
    ) -> DynamicMethod {
        Self::with_kind(
            owner,
            visibility,
            CallConfiguration::FrameAndScope,
            MethodKind::Compiled(compiled),
        )
    }

    pub fn native(
        owner: &ClassRef,
        arity: Arity,
        call_config: CallConfiguration,
        func: NativeFn,
    ) -> DynamicMethod {
        Self::with_kind(
            owner,
            Visibility::Public,
            call_config,
            MethodKind::Native(NativeMethod::new(func, arity)),
        )
    }

    fn with_kind(
        owner: &ClassRef,
        visibility: Visibility,
        call_config: CallConfiguration,
        kind: MethodKind,
    ) -> DynamicMethod {
        DynamicMethod {
            owner: Arc::downgrade(owner),
            visibility,
            call_config,
            target: TargetId::fresh(),
            kind,
        }
    }

    /// Independent copy for aliasing or re-owning: shares the body tree and
    /// static scope, but has its own identity, call counter and promotion state.
    #[must_use]
    pub fn dup(&self) -> DynamicMethod {
        let kind = match &self.kind {
            MethodKind::Interpreted(method) => MethodKind::Interpreted(method.dup()),
            MethodKind::Compiled(method) => MethodKind::Compiled(Arc::clone(method)),
            MethodKind::Native(method) => MethodKind::Native(method.clone()),
        };
        DynamicMethod {
            owner: self.owner.clone(),
            visibility: self.visibility,
            call_config: self.call_config,
            target: TargetId::fresh(),
            kind,
        }
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_call_config(mut self, call_config: CallConfiguration) -> Self {
        self.call_config = call_config;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: &ClassRef) -> Self {
        self.owner = Arc::downgrade(owner);
        self
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub fn call_config(&self) -> CallConfiguration {
        self.call_config
    }

    /// Identity that a `return` inside this method's body targets.
    #[inline]
    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn owner(&self) -> Option<ClassRef> {
        self.owner.upgrade()
    }

    #[inline]
    pub fn kind(&self) -> &MethodKind {
        &self.kind
    }

    pub fn arity(&self) -> Arity {
        match &self.kind {
            MethodKind::Interpreted(method) => method.arity(),
            MethodKind::Compiled(method) => method.arity(),
            MethodKind::Native(method) => method.arity(),
        }
    }

    /// Promotion state of an interpreted method; `None` for other kinds.
    pub fn promotion_state(&self) -> Option<PromotionState> {
        match &self.kind {
            MethodKind::Interpreted(method) => Some(method.promotion_state()),
            _ => None,
        }
    }

    /// Invoke this method with `self_value` as the receiver.
    #[tracing::instrument(level = "trace", skip_all, fields(method = %name))]
    pub fn call(
        &self,
        ctx: &mut ExecutionContext,
        self_value: &Value,
        name: &Name,
        args: &[Value],
        block: Option<&Block>,
    ) -> EvalResult {
        let call = CallArgs {
            self_value,
            name,
            args,
            block,
        };
        ensure_sufficient_stack(|| match &self.kind {
            MethodKind::Interpreted(method) => method.invoke(ctx, self, &call),
            MethodKind::Compiled(method) => method.invoke(ctx, self, &call),
            MethodKind::Native(method) => method.invoke(ctx, self, &call),
        })
    }
}

impl std::fmt::Debug for DynamicMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            MethodKind::Interpreted(_) => "interpreted",
            MethodKind::Compiled(_) => "compiled",
            MethodKind::Native(_) => "native",
        };
        f.debug_struct("DynamicMethod")
            .field("kind", &kind)
            .field("visibility", &self.visibility)
            .field("call_config", &self.call_config)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// The per-call half of the invoke contract.
pub(crate) struct CallArgs<'a> {
    pub self_value: &'a Value,
    pub name: &'a Name,
    pub args: &'a [Value],
    pub block: Option<&'a Block>,
}

/// Run a body tree or compiled body as a method: `pre`, argument binding,
/// body, method-boundary signal handling, `post`.
fn run_body(
    ctx: &mut ExecutionContext,
    method: &DynamicMethod,
    scope: &Arc<StaticScope>,
    params: &ArgsNode,
    call: &CallArgs<'_>,
    body: impl FnOnce(&mut ExecutionContext) -> EvalResult,
) -> EvalResult {
    let owner = method.owner();
    let invocation = Invocation {
        self_value: call.self_value,
        owner: owner.as_ref(),
        name: call.name,
        arity: params.arity(),
        arg_count: call.args.len(),
        block: call.block,
        static_scope: Some(scope),
        target: Some(method.target),
        native: false,
    };
    let mut guard = method.call_config.pre(ctx, &invocation)?;
    let result = args::prepare_arguments(&mut guard, params, call.args, call.block)
        .and_then(|()| body(&mut *guard));
    method_boundary(result, method.target).map_err(|action| attach_backtrace(action, &guard))
}

/// Consume a `return` aimed at this method; turn signals that cannot leave a
/// method body into `LocalJumpError`.
fn method_boundary(result: EvalResult, target: TargetId) -> EvalResult {
    match result {
        Err(ControlAction::Return { target: t, value }) if t == target => Ok(value),
        Err(
            action @ (ControlAction::Break { target: None, .. }
            | ControlAction::Next(_)
            | ControlAction::Redo
            | ControlAction::Retry),
        ) => Err(action.into_eval_error().into()),
        other => other,
    }
}

fn attach_backtrace(action: ControlAction, ctx: &ExecutionContext) -> ControlAction {
    match action {
        ControlAction::Error(mut err) if err.backtrace.is_empty() => {
            err.backtrace = ctx.frames().backtrace();
            ControlAction::Error(err)
        }
        other => other,
    }
}
