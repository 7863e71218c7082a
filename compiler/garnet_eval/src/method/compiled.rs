use std::sync::Arc;

use garnet_ir::{Arity, ArgsNode, StaticScope};

use super::{run_body, CallArgs, DynamicMethod};
use crate::jit::CompiledBody;
use crate::{EvalResult, ExecutionContext};

/// A body produced by the compilation backend.
///
/// Invoked through the same call configuration, argument binding and
/// method-boundary handling as the interpreted form it replaces, so callers
/// cannot tell the two apart.
pub struct CompiledMethod {
    body: CompiledBody,
    scope: Arc<StaticScope>,
    args: Arc<ArgsNode>,
}

impl CompiledMethod {
    pub fn new(body: CompiledBody, scope: Arc<StaticScope>, args: Arc<ArgsNode>) -> Self {
        CompiledMethod { body, scope, args }
    }

    pub fn arity(&self) -> Arity {
        self.args.arity()
    }

    pub(super) fn invoke(
        &self,
        ctx: &mut ExecutionContext,
        method: &DynamicMethod,
        call: &CallArgs<'_>,
    ) -> EvalResult {
        let body = &self.body;
        run_body(ctx, method, &self.scope, &self.args, call, |ctx| body(ctx))
    }
}

impl std::fmt::Debug for CompiledMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledMethod")
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}
