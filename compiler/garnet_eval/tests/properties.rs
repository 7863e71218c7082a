//! Compiled bodies must be observably identical to interpreted ones.
//!
//! Random method bodies run once with the interpreter only and once with
//! every method compiled on first call; return values, errors and global
//! side effects have to match.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::needless_pass_by_value,
    reason = "Proptest macros generate code with these patterns"
)]

mod common;

use std::sync::Arc;

use garnet_eval::{CompileMode, Value};
use garnet_ir::{BinaryOp, BlockParams, Node, StaticScope};
use proptest::prelude::*;

use common::{array, closure, context, def, global, run};

fn arith_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![Just(BinaryOp::Add), Just(BinaryOp::Sub), Just(BinaryOp::Mul)]
}

/// Integer expressions over slot 0 of the innermost scope and `$g`.
fn expr() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        (-50i64..50).prop_map(Node::int),
        Just(Node::local(0, 0)),
        Just(Node::global("$g")),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (arith_op(), inner.clone(), inner.clone())
                .prop_map(|(op, lhs, rhs)| Node::binop(op, lhs, rhs)),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(cond, then, other)| {
                Node::if_else(
                    Node::binop(BinaryOp::Lt, cond, Node::int(0)),
                    then,
                    Some(other),
                )
            }),
            inner.prop_map(|value| Node::global_assign("$g", value)),
        ]
    })
}

/// What one call left behind: its value or error message.
type Outcome = Result<Value, String>;

/// Define `f(n)` with `body`, call it once per input, and report every
/// outcome plus the final `$g`.
fn run_program(
    mode: CompileMode,
    body: impl Fn(&Arc<StaticScope>) -> Node,
    inputs: &[i64],
) -> (Vec<Outcome>, Value) {
    let mut ctx = context(mode);
    run(&mut ctx, &[], |_| {
        Node::Seq(vec![
            Node::global_assign("$g", Node::int(0)),
            def("f", &["n"], 1, &body),
        ])
    })
    .unwrap();

    let outcomes = inputs
        .iter()
        .map(|&n| {
            run(&mut ctx, &[], |_| Node::fcall("f", vec![Node::int(n)]))
                .map_err(|err| err.to_string())
        })
        .collect();
    (outcomes, global(&ctx, "$g"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn compiled_method_matches_interpreter(
        body in expr(),
        inputs in prop::collection::vec(-20i64..20, 1..6),
    ) {
        let interpreted = run_program(CompileMode::Off, |_| body.clone(), &inputs);
        let compiled = run_program(CompileMode::Force, |_| body.clone(), &inputs);
        prop_assert_eq!(interpreted, compiled);
    }

    #[test]
    fn compiled_block_caller_matches_interpreter(
        body in expr(),
        items in prop::collection::vec(-20i64..20, 0..6),
        stop_below in -30i64..30,
    ) {
        // `items.each { |x| break x if x < stop_below; $g = body }`
        let method = |ms: &Arc<StaticScope>| {
            let each = closure(
                ms,
                &["x"],
                BlockParams::single(0),
                Node::Seq(vec![
                    Node::if_else(
                        Node::binop(BinaryOp::Lt, Node::local(0, 0), Node::int(stop_below)),
                        Node::brk(Some(Node::local(0, 0))),
                        None,
                    ),
                    Node::global_assign("$g", body.clone()),
                ]),
            );
            Node::call(array(&items), "each", vec![]).with_iter(each)
        };
        let interpreted = run_program(CompileMode::Off, method, &[0, 1]);
        let compiled = run_program(CompileMode::Force, method, &[0, 1]);
        prop_assert_eq!(interpreted, compiled);
    }
}
