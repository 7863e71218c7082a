//! Garnet Eval - method and closure execution core.
//!
//! This crate runs already-parsed method and closure bodies. It owns:
//! - method dispatch, with promotion of hot interpreted methods to a compiled form
//! - closures (`Block`) and the bindings they capture
//! - the dynamic scope chain that stores local variables
//! - non-local control flow (`return`, `break`, `next`, `redo`, `retry`)
//! - the call-configuration lifecycle bracketing every body
//!
//! # Architecture
//!
//! [`Runtime`] is shared by all threads (classes, configuration, backend,
//! hooks). Each thread runs code through its own [`ExecutionContext`], which
//! holds the frame stack and scope stack and is never shared.
//!
//! Evaluation returns [`EvalResult`]: `Ok(value)` or a [`ControlAction`] in
//! the error channel. Application errors and control-flow signals both
//! propagate with `?`; the constructs that catch them match on the variant.

mod binding;
mod block;
mod call_config;
mod config;
mod context;
mod core_methods;
pub mod errors;
mod frame;
mod hooks;
pub mod interpreter;
mod interrupt;
pub mod jit;
mod logging;
mod method;
mod object;
mod runtime;
mod scope;
mod signal;
mod stack;
mod value;

pub use binding::Binding;
pub use block::{Block, BlockBody, BlockKind, MethodBlock};
pub use call_config::{CallConfiguration, CallGuard, Invocation};
pub use config::{CompileMode, ParseCompileModeError, RuntimeConfig, DEFAULT_JIT_THRESHOLD};
pub use context::{CallType, ExecutionContext};
pub use errors::{EvalError, EvalErrorKind, JumpReason};
pub use frame::{Frame, FrameStack, Visibility};
pub use hooks::{EventHook, EventHooks, EventKind, EventMask, HookId, TraceEvent};
pub use interrupt::InterruptHandle;
pub use jit::{ClosureCompiler, CompilationBackend, CompileError, CompiledBody};
pub use logging::init_tracing;
pub use method::{
    CompiledMethod, DynamicMethod, InterpretedMethod, MethodKind, MethodRef, NativeFn,
    NativeMethod, PromotionState,
};
pub use object::{ClassRef, RClass, RObject};
pub use runtime::{CoreClasses, JitStats, Runtime, RuntimeBuilder};
pub use scope::DynamicScope;
pub use signal::{ControlAction, EvalResult, TargetId};
pub use stack::ensure_sufficient_stack;
pub use value::Value;
