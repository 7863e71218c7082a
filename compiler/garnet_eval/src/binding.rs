//! Captured environment of a closure.

use crate::frame::{Frame, Visibility};
use crate::object::ClassRef;
use crate::scope::DynamicScope;
use crate::{ExecutionContext, Value};

/// Snapshot taken when a closure is created.
///
/// The frame is a copy; the scope is shared with the creating invocation, so
/// writes from inside the closure are visible to the code that created it.
#[derive(Clone, Debug)]
pub struct Binding {
    pub self_value: Value,
    pub frame: Frame,
    pub visibility: Visibility,
    pub class: Option<ClassRef>,
    pub scope: DynamicScope,
}

impl Binding {
    /// Capture the current frame and scope of `ctx`.
    pub fn capture(ctx: &ExecutionContext) -> Binding {
        let frame = ctx.current_frame().duplicate();
        Binding {
            self_value: frame.self_value.clone(),
            visibility: frame.visibility,
            class: frame.class.clone(),
            scope: ctx.current_scope(),
            frame,
        }
    }

    /// Binding with an independent copy of the frame and scope chain.
    #[must_use]
    pub fn deep_clone(&self) -> Binding {
        Binding {
            self_value: self.self_value.clone(),
            frame: self.frame.duplicate(),
            visibility: self.visibility,
            class: self.class.clone(),
            scope: self.scope.deep_clone(),
        }
    }
}
