//! Runtime helpers shared by the interpreter and compiled bodies.
//!
//! Both execution modes route calls, yields, closure creation and `return`
//! through these functions, so observable behavior cannot drift between them.

use std::sync::Arc;

use garnet_ir::{ArgsNode, IterNode, Name, Node, StaticScope};

use crate::block::{Block, BlockKind};
use crate::call_config::CallGuard;
use crate::errors::{
    local_jump_error, no_block_given, no_method_error, no_super_method, private_method_called,
    protected_method_called, runtime_error, JumpReason,
};
use crate::frame::{Frame, Visibility};
use crate::method::{DynamicMethod, MethodRef};
use crate::scope::DynamicScope;
use crate::{CallConfiguration, CallType, ControlAction, EvalResult, ExecutionContext, Value};

/// Where a call site's block comes from.
pub enum BlockSource<'a> {
    Absent,
    /// Closure literal written at the call site.
    Iter(&'a Arc<IterNode>),
    /// `&expr`
    Pass(Value),
}

/// Call `name` on `receiver`, supplying the call site's block.
///
/// A closure literal created here is live for the duration of the call; a
/// `break` that the literal claimed is consumed here and becomes the call's
/// value.
pub fn dispatch_call(
    ctx: &mut ExecutionContext,
    receiver: &Value,
    name: &Name,
    args: &[Value],
    block: BlockSource<'_>,
    call_type: CallType,
) -> EvalResult {
    match block {
        BlockSource::Absent => call_method(ctx, receiver, name, args, None, call_type),
        BlockSource::Iter(iter) => {
            let block = Block::from_iter(ctx, iter, BlockKind::Normal);
            ctx.enter_iter(block.id());
            let result = call_method(ctx, receiver, name, args, Some(&block), call_type);
            ctx.leave_iter(block.id());
            match result {
                Err(ControlAction::Break {
                    target: Some(target),
                    value,
                }) if target == block.id() => Ok(value),
                other => other,
            }
        }
        BlockSource::Pass(value) => {
            let block = block_from_value(&value)?;
            let result = call_method(ctx, receiver, name, args, block, call_type);
            match (block, result) {
                (
                    Some(block),
                    Err(ControlAction::Break {
                        target: Some(target),
                        value,
                    }),
                ) if target == block.id() && block.kind() == BlockKind::Proc => Err(
                    local_jump_error(JumpReason::Break, value, "break from proc-closure").into(),
                ),
                // A literal passed along is consumed at its own call site.
                (_, result) => result,
            }
        }
    }
}

fn block_from_value(value: &Value) -> Result<Option<&Block>, ControlAction> {
    match value {
        Value::Nil => Ok(None),
        Value::Proc(block) => Ok(Some(block)),
        other => Err(runtime_error(format!(
            "wrong argument type {} (expected Proc)",
            other.type_name()
        ))
        .into()),
    }
}

/// Look up `name` on `receiver`: singleton methods of a class value first,
/// then the receiver's class chain.
pub fn find_method(ctx: &ExecutionContext, receiver: &Value, name: &Name) -> Option<MethodRef> {
    if let Value::Class(class) = receiver {
        if let Some(method) = class.search_singleton_method(name) {
            return Some(method);
        }
    }
    ctx.runtime().class_of(receiver).search_method(name)
}

/// Method dispatch with visibility checking.
pub fn call_method(
    ctx: &mut ExecutionContext,
    receiver: &Value,
    name: &Name,
    args: &[Value],
    block: Option<&Block>,
    call_type: CallType,
) -> EvalResult {
    let Some(method) = find_method(ctx, receiver, name) else {
        return Err(no_method_error(name, receiver).into());
    };
    match method.visibility() {
        Visibility::Private if !call_type.allows_private() => {
            return Err(private_method_called(name, receiver).into());
        }
        Visibility::Protected if !call_type.allows_private() => {
            let caller = ctx.runtime().class_of(&ctx.self_value());
            let allowed = method
                .owner()
                .is_some_and(|owner| caller.is_subclass_of(&owner));
            if !allowed {
                return Err(protected_method_called(name, receiver).into());
            }
        }
        _ => {}
    }
    ctx.set_last_call_type(call_type);
    method.call(ctx, receiver, name, args, block)
}

/// `yield`: one argument is yielded as itself, several (or none) as an
/// argument list.
pub fn yield_to_frame_block(ctx: &mut ExecutionContext, mut args: Vec<Value>) -> EvalResult {
    let Some(block) = ctx.current_frame().block.clone() else {
        return Err(no_block_given().into());
    };
    if args.len() == 1 {
        let value = args.pop().unwrap_or_default();
        block.yield_value(ctx, value, None, None, false)
    } else {
        block.yield_value(ctx, Value::array(args), None, None, true)
    }
}

/// `return value`: unwind to the method (or lambda) this frame returns from.
pub fn eval_return(ctx: &ExecutionContext, value: Value) -> EvalResult {
    let frame = ctx.current_frame();
    match frame.jump_target {
        Some(target) if frame.activation == Some(target) || ctx.is_target_active(target) => {
            Err(ControlAction::Return { target, value })
        }
        _ => Err(local_jump_error(JumpReason::Return, value, "unexpected return").into()),
    }
}

pub fn make_closure(ctx: &ExecutionContext, iter: &Arc<IterNode>, kind: BlockKind) -> Value {
    Value::Proc(Block::from_iter(ctx, iter, kind))
}

/// `method(:name)` on the current self, as a proc.
pub fn method_to_proc(ctx: &ExecutionContext, name: &Name) -> EvalResult {
    let receiver = ctx.self_value();
    match find_method(ctx, &receiver, name) {
        Some(method) => Ok(Value::Proc(Block::from_method(ctx, method, name.clone()))),
        None => Err(no_method_error(name, &receiver).into()),
    }
}

pub fn block_given(ctx: &ExecutionContext) -> Value {
    Value::Bool(ctx.current_frame().block.is_some())
}

/// `def name(args) body end` in the current class, honoring the frame's
/// default visibility.
pub fn define_method(
    ctx: &ExecutionContext,
    name: &Name,
    scope: &Arc<StaticScope>,
    args: &Arc<ArgsNode>,
    body: &Arc<Node>,
) -> EvalResult {
    let frame = ctx.current_frame();
    let class = frame
        .class
        .clone()
        .unwrap_or_else(|| Arc::clone(&ctx.runtime().classes().object));
    let make = |visibility| {
        DynamicMethod::interpreted(
            &class,
            visibility,
            Arc::clone(scope),
            Arc::clone(args),
            Arc::clone(body),
        )
    };

    tracing::debug!(class = %class.name(), method = %name, "define method");
    match frame.visibility {
        Visibility::ModuleFunction => {
            let instance = make(Visibility::Private);
            let singleton = instance
                .dup()
                .with_visibility(Visibility::Public)
                .with_call_config(CallConfiguration::ModuleFunction);
            class.define_method(name.clone(), Arc::new(instance));
            class.define_singleton_method(name.clone(), Arc::new(singleton));
        }
        visibility => class.define_method(name.clone(), Arc::new(make(visibility))),
    }
    Ok(Value::Nil)
}

/// `class Name < Super ... end` / `module Name ... end`
pub fn class_body(
    ctx: &mut ExecutionContext,
    name: &Name,
    superclass: Option<&Name>,
    is_module: bool,
    scope: &Arc<StaticScope>,
    body: &Node,
) -> EvalResult {
    let class = ctx.runtime().open_class(name, superclass, is_module)?;
    let frame = Frame::new(
        Value::Class(Arc::clone(&class)),
        Some(class),
        Visibility::Public,
    );
    let dynamic = DynamicScope::new(Arc::clone(scope), None);
    let mut guard = CallGuard::enter(ctx, frame, Some(dynamic))?;
    guard.eval(body)
}

/// Zero-argument `super`: re-send the current method's original arguments
/// and block to the superclass implementation.
pub fn zsuper(ctx: &mut ExecutionContext) -> EvalResult {
    let frame = ctx.current_frame();
    let (Some(class), Some(name)) = (frame.class.clone(), frame.name.clone()) else {
        return Err(runtime_error("super called outside of method").into());
    };
    let self_value = frame.self_value.clone();
    let block = frame.block.clone();
    let args = ctx.current_scope().get_arg_values();

    let Some(method) = class.superclass().and_then(|parent| parent.search_method(&name)) else {
        return Err(no_super_method(&name).into());
    };
    ctx.set_last_call_type(CallType::Super);
    method.call(ctx, &self_value, &name, &args, block.as_ref())
}
