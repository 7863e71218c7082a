//! Per-thread execution state.
//!
//! An `ExecutionContext` owns the frame stack, the dynamic scope stack, the
//! globals table and the interrupt flag of one thread. It is `!Send`: every
//! value it holds is `Rc`-based. The shared, thread-safe half of the runtime
//! is [`Runtime`], reached through `ctx.runtime()`.

use std::rc::Rc;
use std::sync::Arc;

use garnet_ir::{Name, Node, StaticScope};
use rustc_hash::FxHashMap;

use crate::call_config::CallGuard;
use crate::errors::{interrupted, EvalError};
use crate::frame::{Frame, FrameStack, Visibility};
use crate::interpreter::dispatch;
use crate::object::RObject;
use crate::scope::DynamicScope;
use crate::signal::TargetId;
use crate::{ControlAction, InterruptHandle, Runtime, Value};

/// How the most recent method call was written at its call site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallType {
    /// `recv.name(...)`
    #[default]
    Normal,
    /// `name(...)` with implicit self.
    Functional,
    /// Bare `name`.
    Variable,
    /// `super`
    Super,
}

impl CallType {
    /// Whether private methods may be called this way.
    #[inline]
    pub fn allows_private(self) -> bool {
        !matches!(self, CallType::Normal)
    }
}

pub struct ExecutionContext {
    runtime: Arc<Runtime>,
    frames: FrameStack,
    scopes: Vec<DynamicScope>,
    last_call: CallType,
    globals: FxHashMap<Name, Value>,
    interrupt: InterruptHandle,
    main: Value,
    /// Closure literals whose creating call is still running.
    live_iters: Vec<TargetId>,
}

impl ExecutionContext {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let object = Arc::clone(&runtime.classes().object);
        let main = Value::Object(Rc::new(RObject::new(Arc::clone(&object))));
        let root = Frame::new(main.clone(), Some(object), Visibility::Private);
        let root_scope = DynamicScope::new(Arc::new(StaticScope::local(&[])), None);
        let frames = FrameStack::with_root(root, runtime.config().max_call_depth);
        ExecutionContext {
            runtime,
            frames,
            scopes: vec![root_scope],
            last_call: CallType::Normal,
            globals: FxHashMap::default(),
            interrupt: InterruptHandle::new(),
            main,
            live_iters: Vec::new(),
        }
    }

    #[inline]
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// The top-level `self`.
    pub fn main_object(&self) -> &Value {
        &self.main
    }

    // Frames

    #[inline]
    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    #[inline]
    pub fn current_frame(&self) -> &Frame {
        self.frames.current()
    }

    #[inline]
    pub fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.current_mut()
    }

    pub fn self_value(&self) -> Value {
        self.current_frame().self_value.clone()
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) -> Result<(), EvalError> {
        self.frames.push(frame)
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Whether the method or lambda identified by `target` can still catch a `return`.
    pub fn is_target_active(&self, target: TargetId) -> bool {
        self.frames.is_active(target)
    }

    // Scopes

    /// The innermost dynamic scope.
    ///
    /// # Panics
    /// If the scope stack is empty; the context always holds its root scope.
    pub fn current_scope(&self) -> DynamicScope {
        match self.scopes.last() {
            Some(scope) => scope.clone(),
            None => panic!("dynamic scope stack is empty"),
        }
    }

    pub(crate) fn push_scope(&mut self, scope: DynamicScope) {
        self.scopes.push(scope);
    }

    pub(crate) fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "popped the root scope");
        self.scopes.pop();
    }

    // Call bookkeeping

    #[inline]
    pub fn last_call_type(&self) -> CallType {
        self.last_call
    }

    #[inline]
    pub(crate) fn set_last_call_type(&mut self, call_type: CallType) {
        self.last_call = call_type;
    }

    pub(crate) fn enter_iter(&mut self, id: TargetId) {
        self.live_iters.push(id);
    }

    pub(crate) fn leave_iter(&mut self, id: TargetId) {
        if let Some(pos) = self.live_iters.iter().rposition(|live| *live == id) {
            self.live_iters.remove(pos);
        }
    }

    /// Whether the call that created closure `id` is still running.
    pub fn is_iter_active(&self, id: TargetId) -> bool {
        self.live_iters.contains(&id)
    }

    // Globals

    pub fn global(&self, name: &Name) -> Value {
        self.globals.get(name).cloned().unwrap_or_default()
    }

    pub fn set_global(&mut self, name: Name, value: Value) {
        self.globals.insert(name, value);
    }

    // Interrupts

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Fail with `Interrupted` if another thread asked this one to stop.
    pub fn poll_interrupts(&self) -> Result<(), EvalError> {
        if self.interrupt.take() {
            tracing::debug!("interrupt observed");
            return Err(interrupted());
        }
        Ok(())
    }

    // Entry points

    /// Run a top-level body with `self` bound to the main object. Signals that
    /// escape every handler surface as `LocalJumpError`.
    pub fn run_toplevel(&mut self, scope: &Arc<StaticScope>, body: &Node) -> Result<Value, EvalError> {
        let object = Arc::clone(&self.runtime.classes().object);
        let frame = Frame::new(self.main.clone(), Some(object), Visibility::Private);
        let dynamic = DynamicScope::new(Arc::clone(scope), None);
        let mut guard = CallGuard::enter(self, frame, Some(dynamic))?;
        guard.eval(body).map_err(ControlAction::into_eval_error)
    }

    /// Send `name` to `receiver` as an explicit-receiver call.
    pub fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        dispatch::call_method(self, receiver, &Name::new(name), args, None, CallType::Normal)
            .map_err(ControlAction::into_eval_error)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("depth", &self.frames.depth())
            .field("scopes", &self.scopes.len())
            .field("last_call", &self.last_call)
            .finish_non_exhaustive()
    }
}
