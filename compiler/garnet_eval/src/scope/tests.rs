use std::sync::Arc;

use garnet_ir::StaticScope;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::DynamicScope;
use crate::Value;

fn method_scope(vars: &[&str]) -> DynamicScope {
    DynamicScope::new(Arc::new(StaticScope::local(vars)), None)
}

fn block_scope(parent: &DynamicScope, vars: &[&str]) -> DynamicScope {
    let static_scope = StaticScope::block(Arc::clone(parent.static_scope()), vars);
    DynamicScope::new(Arc::new(static_scope), Some(parent.clone()))
}

#[test]
fn depth_zero_round_trip() {
    let scope = method_scope(&["a", "b"]);
    scope.set(1, 0, Value::Int(5));
    assert_eq!(scope.get(1, 0), Value::Int(5));
    assert_eq!(scope.get(0, 0), Value::Nil);
}

#[test]
fn no_vars_scope_forwards_to_parent() {
    let method = method_scope(&["x"]);
    let block = block_scope(&method, &[]);
    assert!(!block.has_vars());

    block.set(0, 1, Value::Int(9));
    assert_eq!(method.get(0, 0), Value::Int(9));
    assert_eq!(block.get(0, 1), Value::Int(9));
}

#[test]
#[should_panic(expected = "depth-zero access on a scope with no variables")]
fn no_vars_depth_zero_read_faults() {
    let method = method_scope(&["x"]);
    let block = block_scope(&method, &[]);
    let _ = block.get(0, 0);
}

#[test]
#[should_panic(expected = "depth-zero access on a scope with no variables")]
fn no_vars_depth_zero_write_faults() {
    let method = method_scope(&["x"]);
    let block = block_scope(&method, &[]);
    block.set(0, 0, Value::Nil);
}

#[test]
#[should_panic(expected = "out of range")]
fn offset_past_declared_count_faults() {
    let scope = method_scope(&["x"]);
    scope.set(3, 0, Value::Int(1));
}

#[test]
#[should_panic(expected = "exceeds the dynamic scope chain")]
fn depth_past_root_faults() {
    let scope = method_scope(&["x"]);
    let _ = scope.get(0, 1);
}

#[test]
fn lazily_declared_variable_reads_nil_then_grows_on_write() {
    let static_scope = Arc::new(StaticScope::local(&["a"]));
    let scope = DynamicScope::new(Arc::clone(&static_scope), None);
    scope.set(0, 0, Value::Int(1));

    let late = static_scope.add_variable("late");
    assert_eq!(scope.get(late, 0), Value::Nil);
    scope.set(late, 0, Value::Int(2));
    assert_eq!(scope.get(late, 0), Value::Int(2));
    assert_eq!(scope.get(0, 0), Value::Int(1));
}

#[test]
fn grow_preserves_existing_slots() {
    let static_scope = Arc::new(StaticScope::local(&["a"]));
    let scope = DynamicScope::new(Arc::clone(&static_scope), None);
    scope.set(0, 0, Value::str("kept"));
    static_scope.add_variable("b");
    scope.grow_if_needed();
    assert_eq!(scope.get(0, 0), Value::str("kept"));
    assert_eq!(scope.get(1, 0), Value::Nil);
}

#[test]
#[should_panic(expected = "cannot grow")]
fn growing_a_no_vars_scope_faults() {
    let static_scope = Arc::new(StaticScope::local(&[]));
    let scope = DynamicScope::new(Arc::clone(&static_scope), None);
    static_scope.add_variable("late");
    scope.grow_if_needed();
}

#[test]
fn arg_values_round_trip_through_method_scope() {
    let static_scope = StaticScope::local(&["a", "b", "rest", "local"]).with_args(1, 1, true);
    let scope = DynamicScope::new(Arc::new(static_scope), None);
    scope.set_arg_values(&[Value::Int(1), Value::Int(2)], 2);
    scope.set(2, 0, Value::array(vec![Value::Int(3), Value::Int(4)]));
    scope.set(3, 0, Value::str("not an argument"));

    assert_eq!(
        scope.get_arg_values(),
        vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]
    );
}

#[test]
fn arg_values_forward_from_block_scopes() {
    let static_scope = StaticScope::local(&["x"]).with_args(1, 0, false);
    let method = DynamicScope::new(Arc::new(static_scope), None);
    method.set_arg_values(&[Value::Int(7)], 1);
    let inner = block_scope(&block_scope(&method, &[]), &["y"]);
    assert_eq!(inner.get_arg_values(), vec![Value::Int(7)]);
}

#[test]
fn deep_clone_is_independent() {
    let method = method_scope(&["x"]);
    let block = block_scope(&method, &["y"]);
    method.set(0, 0, Value::Int(1));
    block.set(0, 0, Value::Int(2));

    let copy = block.deep_clone();
    copy.set(0, 1, Value::Int(100));
    copy.set(0, 0, Value::Int(200));

    assert_eq!(method.get(0, 0), Value::Int(1));
    assert_eq!(block.get(0, 0), Value::Int(2));
    assert_eq!(copy.get(0, 1), Value::Int(100));
    assert!(!copy.parent().is_some_and(|p| p.ptr_eq(&method)));
}

proptest! {
    /// Writes through one child are visible through every sibling that shares
    /// the ancestor at that depth.
    #[test]
    fn aliasing_through_shared_ancestor(
        depth in 1usize..5,
        offset in 0usize..3,
        n in any::<i64>(),
    ) {
        let root = method_scope(&["a", "b", "c"]);
        let mut left = root.clone();
        let mut right = root.clone();
        for level in 1..depth {
            let vars = if level % 2 == 0 { &[][..] } else { &["v"][..] };
            let shared = block_scope(&left, vars);
            left = shared.clone();
            right = shared;
        }
        // Diverge at the last level: two independent invocations of one closure.
        let left = block_scope(&left, &["own"]);
        let right = block_scope(&right, &["own"]);

        // `depth` levels above the leaf is always `root`.
        left.set(offset, depth, Value::Int(n));
        prop_assert_eq!(left.get(offset, depth), Value::Int(n));
        prop_assert_eq!(right.get(offset, depth), Value::Int(n));
        prop_assert_eq!(root.get(offset, 0), Value::Int(n));
    }
}
