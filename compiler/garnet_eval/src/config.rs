//! Runtime configuration.
//!
//! Policy lives in [`CompileMode`] (enum dispatch, like the evaluator's modes);
//! numeric knobs live in [`RuntimeConfig`]. Both can be overridden from the
//! environment:
//!
//! | Variable | Effect |
//! |---|---|
//! | `GARNET_COMPILE_MODE` | `off`, `jit` or `force` |
//! | `GARNET_JIT_THRESHOLD` | calls before a method is promoted |
//! | `GARNET_JIT_MAX` | cap on methods compiled per runtime |
//! | `GARNET_MAX_CALL_DEPTH` | frame limit per execution context |

use std::str::FromStr;

/// When interpreted methods are handed to the compilation backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompileMode {
    /// Never compile.
    Off,
    /// Compile once the call count reaches the threshold.
    #[default]
    Jit,
    /// Compile on the first call.
    Force,
}

impl CompileMode {
    /// Whether a method with `calls` invocations so far should be compiled.
    #[inline]
    pub fn should_compile(self, calls: u32, threshold: u32) -> bool {
        match self {
            CompileMode::Off => false,
            CompileMode::Jit => calls >= threshold,
            CompileMode::Force => calls >= 1,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown compile mode `{0}` (expected off, jit or force)")]
pub struct ParseCompileModeError(String);

impl FromStr for CompileMode {
    type Err = ParseCompileModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(CompileMode::Off),
            "jit" => Ok(CompileMode::Jit),
            "force" => Ok(CompileMode::Force),
            _ => Err(ParseCompileModeError(s.to_string())),
        }
    }
}

pub const DEFAULT_JIT_THRESHOLD: u32 = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub compile_mode: CompileMode,
    pub jit_threshold: u32,
    /// Stop compiling once this many methods have been promoted.
    pub jit_max: Option<usize>,
    /// `None` leaves recursion bounded only by `stacker`.
    pub max_call_depth: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            compile_mode: CompileMode::Jit,
            jit_threshold: DEFAULT_JIT_THRESHOLD,
            jit_max: None,
            max_call_depth: None,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `GARNET_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparseable values are logged and ignored.
    #[must_use]
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("GARNET_COMPILE_MODE") {
            match raw.parse() {
                Ok(mode) => self.compile_mode = mode,
                Err(err) => tracing::warn!(%err, "ignoring GARNET_COMPILE_MODE"),
            }
        }
        if let Some(threshold) = parse_var(&lookup, "GARNET_JIT_THRESHOLD") {
            self.jit_threshold = threshold;
        }
        if let Some(max) = parse_var(&lookup, "GARNET_JIT_MAX") {
            self.jit_max = Some(max);
        }
        if let Some(depth) = parse_var(&lookup, "GARNET_MAX_CALL_DEPTH") {
            self.max_call_depth = Some(depth);
        }
        self
    }

    #[must_use]
    pub fn with_compile_mode(mut self, mode: CompileMode) -> Self {
        self.compile_mode = mode;
        self
    }

    #[must_use]
    pub fn with_jit_threshold(mut self, threshold: u32) -> Self {
        self.jit_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_jit_max(mut self, max: usize) -> Self {
        self.jit_max = Some(max);
        self
    }

    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = Some(depth);
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}
