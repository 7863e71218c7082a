//! The shared, thread-safe half of the runtime.
//!
//! A [`Runtime`] holds everything that execution contexts on different
//! threads have in common: configuration, the compilation backend, trace
//! hooks, JIT counters, and the class table. Build one with
//! [`RuntimeBuilder`] and hand an `Arc` of it to each [`ExecutionContext`].
//!
//! [`ExecutionContext`]: crate::ExecutionContext

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use garnet_ir::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{runtime_error, uninitialized_constant, EvalError};
use crate::hooks::{EventHook, EventHooks};
use crate::jit::{ClosureCompiler, CompilationBackend};
use crate::object::{ClassRef, RClass};
use crate::{core_methods, RuntimeConfig, Value};

/// Process-wide promotion counters.
#[derive(Debug, Default)]
pub struct JitStats {
    compiled: AtomicUsize,
    failed: AtomicUsize,
}

impl JitStats {
    /// Methods promoted so far.
    pub fn compiled(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    /// Compile attempts that were absorbed as failures.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub(crate) fn record_success(&self) {
        self.compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Built-in classes every runtime starts with.
#[derive(Debug)]
pub struct CoreClasses {
    pub object: ClassRef,
    /// Class of every class and module value.
    pub module: ClassRef,
    pub integer: ClassRef,
    pub string: ClassRef,
    pub array: ClassRef,
    pub proc_class: ClassRef,
    pub nil: ClassRef,
    pub true_class: ClassRef,
    pub false_class: ClassRef,
}

impl CoreClasses {
    fn new() -> Self {
        let object = RClass::new_class("Object", None);
        let subclass = |name: &str| RClass::new_class(name, Some(Arc::clone(&object)));
        CoreClasses {
            module: subclass("Module"),
            integer: subclass("Integer"),
            string: subclass("String"),
            array: subclass("Array"),
            proc_class: subclass("Proc"),
            nil: subclass("NilClass"),
            true_class: subclass("TrueClass"),
            false_class: subclass("FalseClass"),
            object,
        }
    }

    fn all(&self) -> [&ClassRef; 9] {
        [
            &self.object,
            &self.module,
            &self.integer,
            &self.string,
            &self.array,
            &self.proc_class,
            &self.nil,
            &self.true_class,
            &self.false_class,
        ]
    }
}

pub struct Runtime {
    config: RuntimeConfig,
    hooks: EventHooks,
    backend: Arc<dyn CompilationBackend>,
    jit: JitStats,
    classes: CoreClasses,
    constants: RwLock<FxHashMap<Name, ClassRef>>,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Runtime with default configuration and the closure-compiling backend.
    pub fn new() -> Arc<Runtime> {
        RuntimeBuilder::new().build()
    }

    /// Runtime configured from `GARNET_*` environment variables.
    pub fn from_env() -> Arc<Runtime> {
        RuntimeBuilder::new().config(RuntimeConfig::from_env()).build()
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Trace hooks. Hooks may be added and removed while code runs.
    #[inline]
    pub fn hooks(&self) -> &EventHooks {
        &self.hooks
    }

    #[inline]
    pub fn backend(&self) -> &dyn CompilationBackend {
        &*self.backend
    }

    #[inline]
    pub fn jit_stats(&self) -> &JitStats {
        &self.jit
    }

    #[inline]
    pub fn classes(&self) -> &CoreClasses {
        &self.classes
    }

    pub fn class_of(&self, value: &Value) -> ClassRef {
        let classes = &self.classes;
        let class = match value {
            Value::Nil => &classes.nil,
            Value::Bool(true) => &classes.true_class,
            Value::Bool(false) => &classes.false_class,
            Value::Int(_) => &classes.integer,
            Value::Str(_) => &classes.string,
            Value::Array(_) => &classes.array,
            Value::Proc(_) => &classes.proc_class,
            Value::Class(_) => &classes.module,
            Value::Object(object) => object.class(),
        };
        Arc::clone(class)
    }

    pub fn lookup_constant(&self, name: &Name) -> Result<ClassRef, EvalError> {
        self.constants
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| uninitialized_constant(name))
    }

    /// Create and register a class. `None` inherits from `Object`.
    pub fn define_class(&self, name: &str, superclass: Option<ClassRef>) -> ClassRef {
        let superclass = superclass.unwrap_or_else(|| Arc::clone(&self.classes.object));
        let class = RClass::new_class(name, Some(superclass));
        self.register(Arc::clone(&class));
        class
    }

    pub fn define_module(&self, name: &str) -> ClassRef {
        let module = RClass::new_module(name);
        self.register(Arc::clone(&module));
        module
    }

    /// Class or module named `name`, created on first use and reopened after.
    pub fn open_class(
        &self,
        name: &Name,
        superclass: Option<&Name>,
        is_module: bool,
    ) -> Result<ClassRef, EvalError> {
        if let Some(existing) = self.constants.read().get(name).cloned() {
            if existing.is_module() != is_module {
                let expected = if is_module { "module" } else { "class" };
                return Err(runtime_error(format!("{name} is not a {expected}")));
            }
            return Ok(existing);
        }
        if is_module {
            return Ok(self.define_module(name.as_str()));
        }
        let superclass = superclass
            .map(|parent| self.lookup_constant(parent))
            .transpose()?;
        Ok(self.define_class(name.as_str(), superclass))
    }

    fn register(&self, class: ClassRef) {
        tracing::debug!(class = %class.name(), module = class.is_module(), "register constant");
        self.constants.write().insert(class.name().clone(), class);
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .field("jit", &self.jit)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Runtime`].
///
/// Defaults: [`RuntimeConfig::default`], the [`ClosureCompiler`] backend and
/// no hooks.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    backend: Option<Arc<dyn CompilationBackend>>,
    hooks: Vec<Arc<dyn EventHook>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        RuntimeBuilder {
            config: RuntimeConfig::default(),
            backend: None,
            hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the compilation backend.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn CompilationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Register a trace hook from the start.
    #[must_use]
    pub fn hook(mut self, hook: Arc<dyn EventHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn build(self) -> Arc<Runtime> {
        let classes = CoreClasses::new();
        core_methods::install(&classes);

        let runtime = Runtime {
            config: self.config,
            hooks: EventHooks::default(),
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(ClosureCompiler)),
            jit: JitStats::default(),
            classes,
            constants: RwLock::new(FxHashMap::default()),
        };
        for class in runtime.classes.all() {
            runtime.register(Arc::clone(class));
        }
        for hook in self.hooks {
            runtime.hooks.add(hook);
        }
        tracing::debug!(config = ?runtime.config, "runtime built");
        Arc::new(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompileMode, EvalErrorKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn core_classes_are_registered() {
        let runtime = Runtime::new();
        let object = runtime.lookup_constant(&Name::new("Object"));
        assert!(matches!(object, Ok(class) if Arc::ptr_eq(&class, &runtime.classes().object)));
        assert!(runtime.lookup_constant(&Name::new("Array")).is_ok());
    }

    #[test]
    fn missing_constant_is_name_error() {
        let runtime = Runtime::new();
        let err = runtime.lookup_constant(&Name::new("Nope"));
        assert!(matches!(
            err,
            Err(e) if e.kind == EvalErrorKind::UninitializedConstant { name: "Nope".into() }
        ));
    }

    #[test]
    fn class_of_maps_values() {
        let runtime = Runtime::new();
        let classes = runtime.classes();
        assert!(Arc::ptr_eq(&runtime.class_of(&Value::Int(1)), &classes.integer));
        assert!(Arc::ptr_eq(&runtime.class_of(&Value::Nil), &classes.nil));
        let class_value = Value::Class(Arc::clone(&classes.array));
        assert!(Arc::ptr_eq(&runtime.class_of(&class_value), &classes.module));
    }

    #[test]
    fn open_class_reopens_and_checks_kind() {
        let runtime = Runtime::new();
        let name = Name::new("Widget");
        let first = runtime.open_class(&name, None, false);
        let second = runtime.open_class(&name, None, false);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                assert!(Arc::ptr_eq(&a, &b));
                assert!(a.is_subclass_of(&runtime.classes().object));
            }
            other => panic!("expected the same class twice, got {other:?}"),
        }
        assert!(runtime.open_class(&name, None, true).is_err());
    }

    #[test]
    fn open_class_resolves_superclass() {
        let runtime = Runtime::new();
        let base = runtime.define_class("Base", None);
        let derived = runtime.open_class(&Name::new("Derived"), Some(&Name::new("Base")), false);
        assert!(matches!(derived, Ok(class) if class.is_subclass_of(&base)));
        let orphan = runtime.open_class(&Name::new("Orphan"), Some(&Name::new("Missing")), false);
        assert!(orphan.is_err());
    }

    #[test]
    fn builder_applies_config() {
        let runtime = Runtime::builder()
            .config(RuntimeConfig::default().with_compile_mode(CompileMode::Off))
            .build();
        assert_eq!(runtime.config().compile_mode, CompileMode::Off);
        assert_eq!(runtime.jit_stats().compiled(), 0);
        assert!(!runtime.hooks().is_active());
    }
}
