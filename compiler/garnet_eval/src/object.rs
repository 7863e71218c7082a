//! Classes, modules and plain objects.
//!
//! A class is shared by every thread that calls into it. Method tables are
//! guarded by `RwLock`; lookups clone the `MethodRef` out of the table so no
//! lock is held while a method body runs.

use std::fmt;
use std::sync::Arc;

use garnet_ir::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::method::MethodRef;

pub type ClassRef = Arc<RClass>;

pub struct RClass {
    name: Name,
    superclass: Option<ClassRef>,
    is_module: bool,
    methods: RwLock<FxHashMap<Name, MethodRef>>,
    /// Methods callable on the class value itself (`Util.helper`, `Foo.new`).
    singleton_methods: RwLock<FxHashMap<Name, MethodRef>>,
}

impl RClass {
    pub fn new_class(name: &str, superclass: Option<ClassRef>) -> ClassRef {
        Arc::new(Self::build(name, superclass, false))
    }

    pub fn new_module(name: &str) -> ClassRef {
        Arc::new(Self::build(name, None, true))
    }

    fn build(name: &str, superclass: Option<ClassRef>, is_module: bool) -> Self {
        RClass {
            name: Name::new(name),
            superclass,
            is_module,
            methods: RwLock::new(FxHashMap::default()),
            singleton_methods: RwLock::new(FxHashMap::default()),
        }
    }

    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn superclass(&self) -> Option<&ClassRef> {
        self.superclass.as_ref()
    }

    #[inline]
    pub fn is_module(&self) -> bool {
        self.is_module
    }

    /// Add or replace an instance method.
    pub fn define_method(&self, name: Name, method: MethodRef) {
        self.methods.write().insert(name, method);
    }

    pub fn define_singleton_method(&self, name: Name, method: MethodRef) {
        self.singleton_methods.write().insert(name, method);
    }

    /// Method defined directly on this class, ignoring ancestors.
    pub fn own_method(&self, name: &Name) -> Option<MethodRef> {
        self.methods.read().get(name).cloned()
    }

    /// Instance method lookup along the superclass chain.
    pub fn search_method(&self, name: &Name) -> Option<MethodRef> {
        let mut class = self;
        loop {
            if let Some(method) = class.own_method(name) {
                return Some(method);
            }
            class = class.superclass.as_deref()?;
        }
    }

    /// Singleton lookup; class methods are inherited by subclasses.
    pub fn search_singleton_method(&self, name: &Name) -> Option<MethodRef> {
        let mut class = self;
        loop {
            if let Some(method) = class.singleton_methods.read().get(name).cloned() {
                return Some(method);
            }
            class = class.superclass.as_deref()?;
        }
    }

    /// Whether `self` is `other` or inherits from it.
    pub fn is_subclass_of(&self, other: &RClass) -> bool {
        let mut class = self;
        loop {
            if std::ptr::eq(class, other) {
                return true;
            }
            match class.superclass.as_deref() {
                Some(parent) => class = parent,
                None => return false,
            }
        }
    }
}

impl fmt::Debug for RClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RClass")
            .field("name", &self.name)
            .field("is_module", &self.is_module)
            .finish_non_exhaustive()
    }
}

/// An instance of a user-defined class. Instance variables are out of scope
/// for the execution core.
#[derive(Debug)]
pub struct RObject {
    class: ClassRef,
}

impl RObject {
    pub fn new(class: ClassRef) -> Self {
        RObject { class }
    }

    #[inline]
    pub fn class(&self) -> &ClassRef {
        &self.class
    }
}
