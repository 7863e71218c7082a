use std::sync::Arc;

use garnet_ir::{Arity, ArgsNode, Node, StaticScope};

use super::promotion::{Promotion, PromotionState};
use super::{run_body, CallArgs, DynamicMethod};
use crate::{EvalResult, ExecutionContext};

/// A method body walked by the interpreter until it is promoted.
pub struct InterpretedMethod {
    scope: Arc<StaticScope>,
    args: Arc<ArgsNode>,
    body: Arc<Node>,
    promotion: Promotion,
}

impl InterpretedMethod {
    pub fn new(scope: Arc<StaticScope>, args: Arc<ArgsNode>, body: Arc<Node>) -> Self {
        InterpretedMethod {
            scope,
            args,
            body,
            promotion: Promotion::default(),
        }
    }

    pub(super) fn dup(&self) -> Self {
        InterpretedMethod::new(
            Arc::clone(&self.scope),
            Arc::clone(&self.args),
            Arc::clone(&self.body),
        )
    }

    pub fn arity(&self) -> Arity {
        self.args.arity()
    }

    pub fn static_scope(&self) -> &Arc<StaticScope> {
        &self.scope
    }

    pub fn body(&self) -> &Arc<Node> {
        &self.body
    }

    pub fn promotion_state(&self) -> PromotionState {
        self.promotion.state()
    }

    pub(super) fn invoke(
        &self,
        ctx: &mut ExecutionContext,
        method: &DynamicMethod,
        call: &CallArgs<'_>,
    ) -> EvalResult {
        let runtime = Arc::clone(ctx.runtime());
        let promoted = self.promotion.promote(
            &runtime,
            &self.scope,
            &self.args,
            &self.body,
            call.name,
        );
        // Compiled bodies carry no trace instrumentation.
        if let Some(compiled) = promoted {
            if !runtime.hooks().is_active() {
                return compiled.invoke(ctx, method, call);
            }
        }

        let body = Arc::clone(&self.body);
        run_body(ctx, method, &self.scope, &self.args, call, |ctx| {
            ctx.eval(&body)
        })
    }
}
