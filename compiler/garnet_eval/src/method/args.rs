//! Binding call arguments into a method's fresh scope.

use garnet_ir::{ArgsNode, RestArg};

use crate::{Block, ControlAction, ExecutionContext, Value};

/// Bind `args` (already arity-checked) into the current scope.
///
/// The block parameter is bound first, so optional defaults may refer to it.
/// Optional parameters consume supplied values in order; the remainder
/// evaluate their default expressions in the callee's scope.
pub(super) fn prepare_arguments(
    ctx: &mut ExecutionContext,
    params: &ArgsNode,
    args: &[Value],
    block: Option<&Block>,
) -> Result<(), ControlAction> {
    let scope = ctx.current_scope();
    if let Some(slot) = params.block_arg {
        let value = block.map_or(Value::Nil, |block| Value::Proc(block.clone()));
        scope.set(slot, 0, value);
    }

    let required = params.required.min(args.len());
    scope.set_arg_values(args, required);

    let mut given = required;
    for opt in &params.optional {
        let value = match args.get(given) {
            Some(value) => {
                given += 1;
                value.clone()
            }
            None => ctx.eval(&opt.default)?,
        };
        scope.set(opt.offset, 0, value);
    }

    if let RestArg::Named(slot) = params.rest {
        let rest = args.get(given..).unwrap_or_default().to_vec();
        scope.set(slot, 0, Value::array(rest));
    }
    Ok(())
}
