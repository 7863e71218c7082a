//! Compilation backend contract.
//!
//! Promotion hands a method body to a [`CompilationBackend`] and wraps the
//! returned [`CompiledBody`] in a [`CompiledMethod`](crate::CompiledMethod).
//! The core never looks inside a compiled body; it only calls it with the
//! method's frame and scope already in place.

mod closure;

use std::sync::Arc;

use garnet_ir::{Arity, Node, StaticScope};

use crate::{EvalResult, ExecutionContext};

pub use closure::ClosureCompiler;

/// Directly executable method body.
pub type CompiledBody = Arc<dyn Fn(&mut ExecutionContext) -> EvalResult + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("cannot compile `{method}`: {construct} is not supported")]
    Unsupported {
        method: String,
        construct: &'static str,
    },
    #[error("compilation of `{method}` failed: {reason}")]
    Failed { method: String, reason: String },
}

pub trait CompilationBackend: Send + Sync {
    /// Compile a method body. Errors are absorbed by promotion; the method
    /// then stays interpreted.
    fn compile(
        &self,
        body: &Arc<Node>,
        scope: &Arc<StaticScope>,
        arity: Arity,
        name: &str,
    ) -> Result<CompiledBody, CompileError>;
}
