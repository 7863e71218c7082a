//! Call frames and the explicit, thread-confined frame stack.
//!
//! Every method call (and every closure invocation) pushes a [`Frame`]
//! holding `self`, the owning class, the visibility new definitions receive,
//! the passed block, and the identity that `return` inside this frame
//! targets. Frames are copied into closure bindings with [`Frame::duplicate`].

use garnet_ir::Name;

use crate::errors::{stack_overflow, EvalError};
use crate::object::ClassRef;
use crate::signal::TargetId;
use crate::{Block, Value};

/// Visibility applied to methods defined while this frame is current.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
    /// `module_function`: define a public singleton copy and a private
    /// instance copy.
    ModuleFunction,
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub self_value: Value,
    pub visibility: Visibility,
    /// Class whose method is executing; `super` searches above it.
    pub class: Option<ClassRef>,
    pub name: Option<Name>,
    pub block: Option<Block>,
    /// What a `return` evaluated in this frame unwinds to. `None` at the top
    /// level and in class bodies.
    pub jump_target: Option<TargetId>,
    /// Set only on the frame that actually catches returns for `jump_target`.
    pub activation: Option<TargetId>,
}

impl Frame {
    pub fn new(self_value: Value, class: Option<ClassRef>, visibility: Visibility) -> Self {
        Frame {
            self_value,
            visibility,
            class,
            name: None,
            block: None,
            jump_target: None,
            activation: None,
        }
    }

    /// Copy for capture into a binding. The copy can target the same method
    /// but never counts as that method's live activation.
    #[must_use]
    pub fn duplicate(&self) -> Frame {
        Frame {
            activation: None,
            ..self.clone()
        }
    }
}

/// Live frame stack of one execution context.
#[derive(Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
    max_depth: Option<usize>,
}

impl FrameStack {
    pub fn new(max_depth: Option<usize>) -> Self {
        FrameStack {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Stack holding `root`, which is never popped. The root counts toward `max_depth`.
    pub fn with_root(root: Frame, max_depth: Option<usize>) -> Self {
        FrameStack {
            frames: vec![root],
            max_depth,
        }
    }

    /// Push a frame, checking the depth limit. The frame is not pushed on overflow.
    pub fn push(&mut self, frame: Frame) -> Result<(), EvalError> {
        if let Some(max) = self.max_depth {
            if self.frames.len() >= max {
                return Err(stack_overflow(max));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        debug_assert!(
            !self.frames.is_empty(),
            "FrameStack::pop() called on empty stack"
        );
        self.frames.pop()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame.
    ///
    /// # Panics
    /// If the stack is empty; an execution context always holds its root frame.
    pub fn current(&self) -> &Frame {
        match self.frames.last() {
            Some(frame) => frame,
            None => panic!("frame stack is empty"),
        }
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => panic!("frame stack is empty"),
        }
    }

    /// Whether a frame catching returns for `target` is still on the stack.
    pub fn is_active(&self, target: TargetId) -> bool {
        self.frames
            .iter()
            .rev()
            .any(|frame| frame.activation == Some(target))
    }

    /// Method names on the stack, innermost first.
    pub fn backtrace(&self) -> Vec<Name> {
        self.frames
            .iter()
            .rev()
            .filter_map(|frame| frame.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvalErrorKind;
    use pretty_assertions::assert_eq;

    fn named(name: &str) -> Frame {
        Frame {
            name: Some(Name::new(name)),
            ..Frame::new(Value::Nil, None, Visibility::Public)
        }
    }

    #[test]
    fn push_respects_max_depth() {
        let mut stack = FrameStack::new(Some(2));
        assert!(stack.push(named("a")).is_ok());
        assert!(stack.push(named("b")).is_ok());
        let err = stack.push(named("c"));
        assert!(matches!(
            err,
            Err(e) if e.kind == EvalErrorKind::StackOverflow { depth: 2 }
        ));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn backtrace_is_innermost_first() {
        let mut stack = FrameStack::new(None);
        stack.push(Frame::new(Value::Nil, None, Visibility::Private)).ok();
        stack.push(named("outer")).ok();
        stack.push(named("inner")).ok();
        assert_eq!(
            stack.backtrace(),
            vec![Name::new("inner"), Name::new("outer")]
        );
    }

    #[test]
    fn duplicate_drops_activation() {
        let target = TargetId::fresh();
        let frame = Frame {
            jump_target: Some(target),
            activation: Some(target),
            ..named("m")
        };
        let copy = frame.duplicate();
        assert_eq!(copy.jump_target, Some(target));
        assert_eq!(copy.activation, None);

        let mut stack = FrameStack::new(None);
        stack.push(copy).ok();
        assert!(!stack.is_active(target));
        stack.push(frame).ok();
        assert!(stack.is_active(target));
    }
}
