use std::sync::Arc;

use garnet_ir::{ArgsNode, BinaryOp, BlockParams, IterNode, Node, StaticScope};
use pretty_assertions::assert_eq;

use super::*;
use crate::call_config::CallGuard;
use crate::frame::Visibility;
use crate::method::DynamicMethod;
use crate::{EvalError, Runtime};

fn context() -> ExecutionContext {
    ExecutionContext::new(Runtime::new())
}

fn iter(vars: &[&str], params: BlockParams, body: Node) -> Arc<IterNode> {
    let parent = Arc::new(StaticScope::local(&[]));
    Arc::new(IterNode::new(
        Arc::new(StaticScope::block(parent, vars)),
        params,
        body,
    ))
}

fn expect_error(result: EvalResult) -> EvalError {
    match result {
        Err(ControlAction::Error(err)) => *err,
        other => panic!("expected an error, got {other:?}"),
    }
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

#[test]
fn lambda_checks_arity_strictly() {
    let mut ctx = context();
    let body = iter(&["a"], BlockParams::single(0), Node::local(0, 0));
    let lambda = Block::from_iter(&ctx, &body, BlockKind::Lambda);

    let err = expect_error(lambda.call(&mut ctx, &ints(&[1, 2])));
    assert_eq!(err.message, "wrong number of arguments (2 for 1)");
    assert_eq!(lambda.call(&mut ctx, &ints(&[9])).ok(), Some(Value::Int(9)));
}

#[test]
fn proc_is_lenient_about_arguments() {
    let mut ctx = context();
    let body = iter(&["a"], BlockParams::single(0), Node::local(0, 0));
    let proc_value = Block::from_iter(&ctx, &body, BlockKind::Proc);

    assert_eq!(proc_value.call(&mut ctx, &ints(&[5])).ok(), Some(Value::Int(5)));
    assert_eq!(
        proc_value.call(&mut ctx, &ints(&[1, 2])).ok(),
        Some(Value::array(ints(&[1, 2])))
    );
    assert_eq!(proc_value.call(&mut ctx, &[]).ok(), Some(Value::Nil));
}

#[test]
fn lambda_return_and_break_are_local() {
    let mut ctx = context();
    let returns = iter(&[], BlockParams::zero(), Node::ret(Some(Node::int(5))));
    let breaks = iter(&[], BlockParams::zero(), Node::brk(Some(Node::int(6))));
    let returning = Block::from_iter(&ctx, &returns, BlockKind::Lambda);
    let breaking = Block::from_iter(&ctx, &breaks, BlockKind::Lambda);

    assert_eq!(returning.call(&mut ctx, &[]).ok(), Some(Value::Int(5)));
    assert_eq!(breaking.call(&mut ctx, &[]).ok(), Some(Value::Int(6)));
}

#[test]
fn proc_break_is_local_jump_error() {
    let mut ctx = context();
    let body = iter(&[], BlockParams::zero(), Node::brk(Some(Node::int(1))));
    let proc_value = Block::from_iter(&ctx, &body, BlockKind::Proc);

    let err = expect_error(proc_value.call(&mut ctx, &[]));
    assert_eq!(err.message, "break from proc-closure");
    assert_eq!(err.exit_value, Some(Value::Int(1)));
}

#[test]
fn proc_return_outside_a_method_is_local_jump_error() {
    let mut ctx = context();
    let body = iter(&[], BlockParams::zero(), Node::ret(Some(Node::int(1))));
    let proc_value = Block::from_iter(&ctx, &body, BlockKind::Proc);

    let err = expect_error(proc_value.call(&mut ctx, &[]));
    assert_eq!(err.message, "unexpected return");
    assert_eq!(err.class_name(), "LocalJumpError");
}

#[test]
fn next_ends_the_invocation_with_its_value() {
    let mut ctx = context();
    let body = iter(
        &[],
        BlockParams::zero(),
        Node::Seq(vec![Node::next(Some(Node::int(7))), Node::int(0)]),
    );
    let proc_value = Block::from_iter(&ctx, &body, BlockKind::Proc);
    assert_eq!(proc_value.call(&mut ctx, &[]).ok(), Some(Value::Int(7)));
}

#[test]
fn redo_polls_for_interrupts() {
    let mut ctx = context();
    let body = iter(&[], BlockParams::zero(), Node::Redo);
    let proc_value = Block::from_iter(&ctx, &body, BlockKind::Proc);

    ctx.interrupt_handle().interrupt();
    let err = expect_error(proc_value.call(&mut ctx, &[]));
    assert_eq!(err.class_name(), "Interrupt");
    assert!(!ctx.interrupt_handle().is_pending());
}

#[test]
fn yield_can_override_self() {
    let mut ctx = context();
    let body = iter(&[], BlockParams::zero(), Node::SelfRef);
    let block = Block::from_iter(&ctx, &body, BlockKind::Normal);

    let own = block.yield_value(&mut ctx, Value::Nil, None, None, false);
    assert_eq!(own.ok(), Some(ctx.main_object().clone()));
    let overridden = block.yield_value(&mut ctx, Value::Nil, Some(Value::Int(3)), None, false);
    assert_eq!(overridden.ok(), Some(Value::Int(3)));
}

#[test]
fn clone_block_gets_an_independent_scope_chain() {
    let mut ctx = context();
    let outer = Arc::new(StaticScope::local(&["count"]));
    let captured = DynamicScope::new(Arc::clone(&outer), None);
    captured.set(0, 0, Value::Int(0));
    let body = Arc::new(IterNode::new(
        Arc::new(StaticScope::block(outer, &[])),
        BlockParams::zero(),
        Node::assign(
            0,
            1,
            Node::binop(BinaryOp::Add, Node::local(0, 1), Node::int(1)),
        ),
    ));

    let frame = Frame::new(Value::Nil, None, Visibility::Public);
    let original = {
        let Ok(guard) = CallGuard::enter(&mut ctx, frame, Some(captured.clone())) else {
            panic!("entering a frame failed");
        };
        Block::from_iter(&guard, &body, BlockKind::Proc)
    };

    original.call(&mut ctx, &[]).ok();
    original.call(&mut ctx, &[]).ok();
    assert_eq!(captured.get(0, 0), Value::Int(2));

    let copy = original.clone_block();
    assert_ne!(copy.id(), original.id());
    assert_eq!(copy.kind(), BlockKind::Proc);
    assert_eq!(copy.call(&mut ctx, &[]).ok(), Some(Value::Int(3)));
    assert_eq!(copy.call(&mut ctx, &[]).ok(), Some(Value::Int(4)));
    assert_eq!(captured.get(0, 0), Value::Int(2));
    assert_eq!(copy.binding().scope.get(0, 0), Value::Int(4));

    // Shared invocations of one closure see each other's writes.
    assert_eq!(original.call(&mut ctx, &[]).ok(), Some(Value::Int(3)));
}

#[test]
fn method_block_spreads_arguments() {
    let mut ctx = context();
    let object = Arc::clone(&ctx.runtime().classes().object);
    let method = Arc::new(DynamicMethod::interpreted(
        &object,
        Visibility::Public,
        Arc::new(StaticScope::local(&["a", "b"]).with_args(2, 0, false)),
        Arc::new(ArgsNode::required(2)),
        Arc::new(Node::binop(BinaryOp::Add, Node::local(0, 0), Node::local(1, 0))),
    ));
    let block = Block::from_method(&ctx, method, Name::new("add"));

    assert!(block.is_lambda());
    assert_eq!(block.arity().value(), 2);
    assert_eq!(block.call(&mut ctx, &ints(&[2, 3])).ok(), Some(Value::Int(5)));
    let err = expect_error(block.call(&mut ctx, &ints(&[2])));
    assert_eq!(err.message, "wrong number of arguments (1 for 2)");
}
