//! Hot-method promotion.
//!
//! Each interpreted method counts its invocations. When the runtime's
//! [`CompileMode`](crate::CompileMode) says the count is high enough, the body
//! is handed to the compilation backend and the result is published in one
//! store. Later calls dispatch to the compiled form.
//!
//! # Concurrency
//!
//! Several threads may cross the threshold together and compile the same
//! body. The backend is deterministic, so the duplicate work is harmless and
//! the last store wins. The slot only ever holds a fully built
//! `Arc<CompiledMethod>`. A call already running keeps its interpreted body.
//!
//! # Failure
//!
//! A backend error or panic is absorbed: the method is marked as not
//! compilable and stays interpreted for good.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use garnet_ir::{ArgsNode, Name, Node, StaticScope};
use parking_lot::RwLock;

use super::CompiledMethod;
use crate::Runtime;

/// `Fresh -> Warm(n) -> Promoted`. Never reverts once promoted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PromotionState {
    Fresh,
    Warm(u32),
    Promoted,
}

#[derive(Default)]
pub(super) struct Promotion {
    calls: AtomicU32,
    /// Set after a failed compile; no further attempts.
    disabled: AtomicBool,
    compiled: RwLock<Option<Arc<CompiledMethod>>>,
}

impl Promotion {
    pub(super) fn state(&self) -> PromotionState {
        if self.compiled.read().is_some() {
            return PromotionState::Promoted;
        }
        match self.calls.load(Ordering::Relaxed) {
            0 => PromotionState::Fresh,
            n => PromotionState::Warm(n),
        }
    }

    /// Count this call and return the compiled form if one exists or was
    /// just produced.
    pub(super) fn promote(
        &self,
        runtime: &Runtime,
        scope: &Arc<StaticScope>,
        args: &Arc<ArgsNode>,
        body: &Arc<Node>,
        name: &Name,
    ) -> Option<Arc<CompiledMethod>> {
        if let Some(compiled) = self.compiled.read().clone() {
            return Some(compiled);
        }

        // Saturates so a long-lived method never reads as `Fresh` again.
        let calls = self
            .calls
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .map_or(u32::MAX, |prev| prev + 1);
        if self.disabled.load(Ordering::Relaxed) {
            return None;
        }
        let config = runtime.config();
        if !config
            .compile_mode
            .should_compile(calls, config.jit_threshold)
        {
            return None;
        }
        if let Some(max) = config.jit_max {
            if runtime.jit_stats().compiled() >= max {
                tracing::debug!(method = %name, max, "jit max reached, staying interpreted");
                return None;
            }
        }

        tracing::debug!(method = %name, calls, "compiling hot method");
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            runtime
                .backend()
                .compile(body, scope, args.arity(), name.as_str())
        }));
        match outcome {
            Ok(Ok(compiled_body)) => {
                let compiled = Arc::new(CompiledMethod::new(
                    compiled_body,
                    Arc::clone(scope),
                    Arc::clone(args),
                ));
                *self.compiled.write() = Some(Arc::clone(&compiled));
                runtime.jit_stats().record_success();
                tracing::debug!(method = %name, "method promoted");
                Some(compiled)
            }
            Ok(Err(err)) => {
                self.disable(runtime, name, &err.to_string());
                None
            }
            Err(_) => {
                self.disable(runtime, name, "compilation backend panicked");
                None
            }
        }
    }

    fn disable(&self, runtime: &Runtime, name: &Name, reason: &str) {
        self.disabled.store(true, Ordering::Relaxed);
        runtime.jit_stats().record_failure();
        tracing::warn!(method = %name, reason, "compilation failed, method stays interpreted");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{CompileMode, RuntimeConfig};

    #[test]
    fn call_counter_saturates() {
        let config = RuntimeConfig::default().with_compile_mode(CompileMode::Off);
        let runtime = Runtime::builder().config(config).build();
        let scope = Arc::new(StaticScope::local(&[]));
        let args = Arc::new(ArgsNode::default());
        let body = Arc::new(Node::Nil);
        let name = Name::new("hot");

        let promotion = Promotion {
            calls: AtomicU32::new(u32::MAX - 1),
            ..Promotion::default()
        };
        for _ in 0..3 {
            assert!(promotion.promote(&runtime, &scope, &args, &body, &name).is_none());
            assert_eq!(promotion.state(), PromotionState::Warm(u32::MAX));
        }
    }
}
