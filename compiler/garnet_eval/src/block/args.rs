//! Binding a yielded value to closure parameters.
//!
//! `arrayify` means `value` is an argument list packed into an array (from
//! `Proc#call` or a multi-value `yield`) rather than a single yielded value.

use garnet_ir::{ArgStrategy, BlockParams};
use smallvec::SmallVec;

use crate::scope::DynamicScope;
use crate::Value;

pub(super) fn assign(scope: &DynamicScope, params: &BlockParams, value: Value, arrayify: bool) {
    match params.strategy {
        ArgStrategy::ZeroArgs => {}
        ArgStrategy::MultipleAssignment => multiple_assignment(scope, params, value, arrayify),
        ArgStrategy::Array => {
            if let Some(&slot) = params.params.first() {
                scope.set(slot, 0, single_value(value, arrayify));
            }
        }
        ArgStrategy::SingleRest => {
            if let Some(slot) = params.rest {
                scope.set(slot, 0, single_rest(value, arrayify));
            }
        }
    }
}

/// `|a, b, *rest|`: spread an array across the parameters; missing ones are nil.
fn multiple_assignment(scope: &DynamicScope, params: &BlockParams, value: Value, arrayify: bool) {
    let values: SmallVec<[Value; 4]> = match value {
        // `call([1, 2])` on `|a, b|` destructures the lone array argument.
        Value::Array(items) if arrayify && items.len() == 1 => match items.first() {
            Some(Value::Array(inner)) => inner.iter().cloned().collect(),
            _ => items.iter().cloned().collect(),
        },
        Value::Array(items) => items.iter().cloned().collect(),
        other => SmallVec::from_elem(other, 1),
    };

    for (index, &slot) in params.params.iter().enumerate() {
        scope.set(slot, 0, values.get(index).cloned().unwrap_or_default());
    }
    if let Some(slot) = params.rest {
        let rest = values.get(params.params.len()..).unwrap_or_default().to_vec();
        scope.set(slot, 0, Value::array(rest));
    }
}

/// `|a|`: one argument binds as itself, several bind as the whole list.
fn single_value(value: Value, arrayify: bool) -> Value {
    if !arrayify {
        return value;
    }
    match value {
        Value::Array(items) => match items.len() {
            0 => Value::Nil,
            1 => items.first().cloned().unwrap_or_default(),
            _ => Value::Array(items),
        },
        other => other,
    }
}

/// `|*rest|`: always an array, with one level of nesting unwrapped.
fn single_rest(value: Value, arrayify: bool) -> Value {
    match value {
        Value::Array(items) if arrayify && items.len() == 1 => {
            if let Some(inner @ Value::Array(_)) = items.first() {
                return inner.clone();
            }
            Value::Array(items)
        }
        array @ Value::Array(_) => array,
        other => Value::array(vec![other]),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use garnet_ir::StaticScope;
    use pretty_assertions::assert_eq;

    use super::*;

    fn scope(vars: &[&str]) -> DynamicScope {
        DynamicScope::new(Arc::new(StaticScope::local(vars)), None)
    }

    fn ints(values: &[i64]) -> Value {
        Value::array(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn multiple_assignment_destructures_yielded_array() {
        let s = scope(&["a", "b", "rest"]);
        let params = BlockParams::multiple(vec![0, 1], Some(2));
        assign(&s, &params, ints(&[1, 2, 3, 4]), false);
        assert_eq!(s.get(0, 0), Value::Int(1));
        assert_eq!(s.get(1, 0), Value::Int(2));
        assert_eq!(s.get(2, 0), ints(&[3, 4]));
    }

    #[test]
    fn multiple_assignment_pads_with_nil() {
        let s = scope(&["a", "b", "rest"]);
        let params = BlockParams::multiple(vec![0, 1], Some(2));
        assign(&s, &params, Value::Int(7), false);
        assert_eq!(s.get(0, 0), Value::Int(7));
        assert_eq!(s.get(1, 0), Value::Nil);
        assert_eq!(s.get(2, 0), ints(&[]));
    }

    #[test]
    fn multiple_assignment_unwraps_lone_array_argument() {
        let s = scope(&["a", "b"]);
        let params = BlockParams::multiple(vec![0, 1], None);
        assign(&s, &params, Value::array(vec![ints(&[5, 6])]), true);
        assert_eq!(s.get(0, 0), Value::Int(5));
        assert_eq!(s.get(1, 0), Value::Int(6));
    }

    #[test]
    fn array_strategy() {
        assert_eq!(single_value(ints(&[1, 2]), false), ints(&[1, 2]));
        assert_eq!(single_value(ints(&[1]), true), Value::Int(1));
        assert_eq!(single_value(ints(&[]), true), Value::Nil);
        assert_eq!(single_value(ints(&[1, 2]), true), ints(&[1, 2]));
    }

    #[test]
    fn single_rest_strategy() {
        assert_eq!(single_rest(Value::Int(1), false), ints(&[1]));
        assert_eq!(single_rest(ints(&[1, 2]), false), ints(&[1, 2]));
        assert_eq!(single_rest(ints(&[1, 2]), true), ints(&[1, 2]));
        assert_eq!(
            single_rest(Value::array(vec![ints(&[3, 4])]), true),
            ints(&[3, 4])
        );
    }

    #[test]
    fn zero_args_binds_nothing() {
        let s = scope(&["untouched"]);
        assign(&s, &BlockParams::zero(), Value::Int(1), false);
        assert_eq!(s.get(0, 0), Value::Nil);
    }
}
