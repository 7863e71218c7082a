//! Native methods installed on the core classes.
//!
//! Just enough of a core library to drive closures and dispatch: iteration
//! (`each`, `times`, `loop`), `Proc#call`, object construction, and the
//! visibility switches used inside class bodies.

use std::rc::Rc;
use std::sync::Arc;

use garnet_ir::{Arity, ArityError, Name};

use crate::errors::{no_block_given, no_method_error, wrong_number_of_arguments, wrong_receiver};
use crate::frame::Visibility;
use crate::method::DynamicMethod;
use crate::object::{ClassRef, RObject};
use crate::runtime::CoreClasses;
use crate::{Block, CallConfiguration, ControlAction, EvalResult, ExecutionContext, NativeFn, Value};

use crate::call_config::CallConfiguration::{FrameOnly, NoFrameNoScope};

pub(crate) fn install(classes: &CoreClasses) {
    let object = &classes.object;
    define(object, "inspect", Arity::NO_ARGUMENTS, FrameOnly, object_inspect);
    define_private(object, "loop", Arity::NO_ARGUMENTS, FrameOnly, kernel_loop);
    // Visibility switches run in the caller's frame.
    define_private(object, "public", Arity::OPTIONAL, NoFrameNoScope, set_public);
    define_private(object, "private", Arity::OPTIONAL, NoFrameNoScope, set_private);
    define_private(object, "protected", Arity::OPTIONAL, NoFrameNoScope, set_protected);
    define_private(
        object,
        "module_function",
        Arity::OPTIONAL,
        NoFrameNoScope,
        set_module_function,
    );

    define(&classes.module, "new", Arity::OPTIONAL, FrameOnly, module_new);

    let array = &classes.array;
    define(array, "each", Arity::NO_ARGUMENTS, FrameOnly, array_each);
    define(array, "size", Arity::NO_ARGUMENTS, NoFrameNoScope, array_size);

    define(&classes.integer, "times", Arity::NO_ARGUMENTS, FrameOnly, integer_times);

    let proc_class = &classes.proc_class;
    define(proc_class, "call", Arity::OPTIONAL, FrameOnly, proc_call);
    define(proc_class, "arity", Arity::NO_ARGUMENTS, NoFrameNoScope, proc_arity);
    define(proc_class, "lambda?", Arity::NO_ARGUMENTS, NoFrameNoScope, proc_is_lambda);
}

fn define(class: &ClassRef, name: &str, arity: Arity, config: CallConfiguration, func: NativeFn) {
    let method = DynamicMethod::native(class, arity, config, func);
    class.define_method(Name::new(name), Arc::new(method));
}

fn define_private(
    class: &ClassRef,
    name: &str,
    arity: Arity,
    config: CallConfiguration,
    func: NativeFn,
) {
    let method =
        DynamicMethod::native(class, arity, config, func).with_visibility(Visibility::Private);
    class.define_method(Name::new(name), Arc::new(method));
}

fn require_block(block: Option<&Block>) -> Result<&Block, ControlAction> {
    block.ok_or_else(|| no_block_given().into())
}

fn object_inspect(
    _: &mut ExecutionContext,
    recv: &Value,
    _: &[Value],
    _: Option<&Block>,
) -> EvalResult {
    Ok(Value::str(&recv.inspect()))
}

/// `loop { ... }`: runs until a `break` (consumed at the call site) or an error.
fn kernel_loop(
    ctx: &mut ExecutionContext,
    _: &Value,
    _: &[Value],
    block: Option<&Block>,
) -> EvalResult {
    let block = require_block(block)?;
    loop {
        ctx.poll_interrupts()?;
        block.yield_value(ctx, Value::Nil, None, None, false)?;
    }
}

/// `Class#new`: allocate, then run `initialize` if the class defines one.
fn module_new(
    ctx: &mut ExecutionContext,
    recv: &Value,
    args: &[Value],
    block: Option<&Block>,
) -> EvalResult {
    let class = match recv {
        Value::Class(class) if !class.is_module() => class,
        other => return Err(wrong_receiver("Class", other).into()),
    };
    let object = Value::Object(Rc::new(RObject::new(Arc::clone(class))));
    let initialize = Name::new("initialize");
    match class.search_method(&initialize) {
        Some(method) => {
            method.call(ctx, &object, &initialize, args, block)?;
        }
        None if !args.is_empty() => {
            return Err(wrong_number_of_arguments(ArityError {
                got: args.len(),
                expected: 0,
            })
            .into());
        }
        None => {}
    }
    Ok(object)
}

fn array_each(
    ctx: &mut ExecutionContext,
    recv: &Value,
    _: &[Value],
    block: Option<&Block>,
) -> EvalResult {
    let Value::Array(items) = recv else {
        return Err(wrong_receiver("Array", recv).into());
    };
    let block = require_block(block)?;
    let items = Rc::clone(items);
    for item in items.iter() {
        ctx.poll_interrupts()?;
        block.yield_value(ctx, item.clone(), None, None, false)?;
    }
    Ok(recv.clone())
}

fn array_size(_: &mut ExecutionContext, recv: &Value, _: &[Value], _: Option<&Block>) -> EvalResult {
    match recv.as_array() {
        Some(items) => Ok(Value::Int(i64::try_from(items.len()).unwrap_or(i64::MAX))),
        None => Err(wrong_receiver("Array", recv).into()),
    }
}

fn integer_times(
    ctx: &mut ExecutionContext,
    recv: &Value,
    _: &[Value],
    block: Option<&Block>,
) -> EvalResult {
    let Some(count) = recv.as_int() else {
        return Err(wrong_receiver("Integer", recv).into());
    };
    let block = require_block(block)?;
    for i in 0..count {
        ctx.poll_interrupts()?;
        block.yield_value(ctx, Value::Int(i), None, None, false)?;
    }
    Ok(recv.clone())
}

fn proc_call(
    ctx: &mut ExecutionContext,
    recv: &Value,
    args: &[Value],
    _: Option<&Block>,
) -> EvalResult {
    match recv.as_proc() {
        Some(block) => block.call(ctx, args),
        None => Err(wrong_receiver("Proc", recv).into()),
    }
}

fn proc_arity(_: &mut ExecutionContext, recv: &Value, _: &[Value], _: Option<&Block>) -> EvalResult {
    match recv.as_proc() {
        Some(block) => Ok(Value::Int(block.arity().value())),
        None => Err(wrong_receiver("Proc", recv).into()),
    }
}

fn proc_is_lambda(
    _: &mut ExecutionContext,
    recv: &Value,
    _: &[Value],
    _: Option<&Block>,
) -> EvalResult {
    match recv.as_proc() {
        Some(block) => Ok(Value::Bool(block.is_lambda())),
        None => Err(wrong_receiver("Proc", recv).into()),
    }
}

fn set_public(
    ctx: &mut ExecutionContext,
    _: &Value,
    args: &[Value],
    _: Option<&Block>,
) -> EvalResult {
    apply_visibility(ctx, args, Visibility::Public)
}

fn set_private(
    ctx: &mut ExecutionContext,
    _: &Value,
    args: &[Value],
    _: Option<&Block>,
) -> EvalResult {
    apply_visibility(ctx, args, Visibility::Private)
}

fn set_protected(
    ctx: &mut ExecutionContext,
    _: &Value,
    args: &[Value],
    _: Option<&Block>,
) -> EvalResult {
    apply_visibility(ctx, args, Visibility::Protected)
}

fn set_module_function(
    ctx: &mut ExecutionContext,
    _: &Value,
    args: &[Value],
    _: Option<&Block>,
) -> EvalResult {
    apply_visibility(ctx, args, Visibility::ModuleFunction)
}

/// Without arguments, switch the default visibility of later definitions in
/// the calling frame. With method names, redefine just those methods.
fn apply_visibility(
    ctx: &mut ExecutionContext,
    args: &[Value],
    visibility: Visibility,
) -> EvalResult {
    if args.is_empty() {
        ctx.current_frame_mut().visibility = visibility;
        return Ok(Value::Nil);
    }
    let class = ctx
        .current_frame()
        .class
        .clone()
        .unwrap_or_else(|| Arc::clone(&ctx.runtime().classes().object));
    for arg in args {
        let name = Name::new(&arg.to_string());
        let Some(method) = class.search_method(&name) else {
            return Err(no_method_error(&name, &Value::Class(class)).into());
        };
        let copy = method.dup().with_owner(&class);
        if visibility == Visibility::ModuleFunction {
            let singleton = method
                .dup()
                .with_owner(&class)
                .with_visibility(Visibility::Public)
                .with_call_config(CallConfiguration::ModuleFunction);
            class.define_singleton_method(name.clone(), Arc::new(singleton));
            class.define_method(name, Arc::new(copy.with_visibility(Visibility::Private)));
        } else {
            class.define_method(name, Arc::new(copy.with_visibility(visibility)));
        }
    }
    Ok(Value::Nil)
}
