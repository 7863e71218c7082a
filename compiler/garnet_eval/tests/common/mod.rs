//! Shared builders for the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;

use garnet_eval::{CompileMode, EvalError, ExecutionContext, Runtime, RuntimeConfig, Value};
use garnet_ir::{ArgsNode, BinaryOp, BlockParams, IterNode, Name, Node, StaticScope};

/// Interpreter only, and every method compiled on its first call.
pub const MODES: [CompileMode; 2] = [CompileMode::Off, CompileMode::Force];

pub fn runtime(config: RuntimeConfig) -> Arc<Runtime> {
    garnet_eval::init_tracing();
    Runtime::builder().config(config).build()
}

pub fn context(mode: CompileMode) -> ExecutionContext {
    ExecutionContext::new(runtime(RuntimeConfig::default().with_compile_mode(mode)))
}

/// Run `body` at top level with a scope holding `vars`.
pub fn run(
    ctx: &mut ExecutionContext,
    vars: &[&str],
    body: impl FnOnce(&Arc<StaticScope>) -> Node,
) -> Result<Value, EvalError> {
    let scope = Arc::new(StaticScope::local(vars));
    let body = body(&scope);
    ctx.run_toplevel(&scope, &body)
}

/// Method scope whose first `required` variables are its parameters.
pub fn method_scope(vars: &[&str], required: usize) -> Arc<StaticScope> {
    Arc::new(StaticScope::local(vars).with_args(required, 0, false))
}

/// `def name(...)` with `required` positional parameters taken from `vars`.
pub fn def(
    name: &str,
    vars: &[&str],
    required: usize,
    body: impl FnOnce(&Arc<StaticScope>) -> Node,
) -> Node {
    let scope = method_scope(vars, required);
    let body = body(&scope);
    Node::def(name, scope, ArgsNode::required(required), body)
}

pub fn closure(parent: &Arc<StaticScope>, vars: &[&str], params: BlockParams, body: Node) -> IterNode {
    IterNode::new(
        Arc::new(StaticScope::block(Arc::clone(parent), vars)),
        params,
        body,
    )
}

pub fn array(values: &[i64]) -> Node {
    Node::Array(values.iter().copied().map(Node::int).collect())
}

pub fn add(lhs: Node, rhs: Node) -> Node {
    Node::binop(BinaryOp::Add, lhs, rhs)
}

pub fn eq(lhs: Node, rhs: Node) -> Node {
    Node::binop(BinaryOp::Eq, lhs, rhs)
}

pub fn yield_values(args: Vec<Node>) -> Node {
    Node::Yield { args }
}

pub fn global(ctx: &ExecutionContext, name: &str) -> Value {
    ctx.global(&Name::new(name))
}

/// `(class name, message)` of a failed run.
pub fn failure(result: Result<Value, EvalError>) -> Option<(&'static str, String)> {
    result.err().map(|err| (err.class_name(), err.message))
}
