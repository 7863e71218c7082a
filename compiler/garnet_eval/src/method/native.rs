use garnet_ir::Arity;

use super::{CallArgs, DynamicMethod};
use crate::call_config::Invocation;
use crate::{Block, EvalResult, ExecutionContext, Value};

/// Signature of a core-library method: context, receiver, arguments, block.
pub type NativeFn = fn(&mut ExecutionContext, &Value, &[Value], Option<&Block>) -> EvalResult;

/// A method implemented in Rust.
///
/// Natives do not catch signals: a `break` or `return` raised by a block they
/// yield to passes straight through to the caller.
#[derive(Clone)]
pub struct NativeMethod {
    func: NativeFn,
    arity: Arity,
}

impl NativeMethod {
    pub fn new(func: NativeFn, arity: Arity) -> Self {
        NativeMethod { func, arity }
    }

    #[inline]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub(super) fn invoke(
        &self,
        ctx: &mut ExecutionContext,
        method: &DynamicMethod,
        call: &CallArgs<'_>,
    ) -> EvalResult {
        let owner = method.owner();
        let invocation = Invocation {
            self_value: call.self_value,
            owner: owner.as_ref(),
            name: call.name,
            arity: self.arity,
            arg_count: call.args.len(),
            block: call.block,
            static_scope: None,
            target: None,
            native: true,
        };
        let mut guard = method.call_config().pre(ctx, &invocation)?;
        (self.func)(&mut *guard, call.self_value, call.args, call.block)
    }
}
