//! Per-invocation storage for lexical variables.
//!
//! A `DynamicScope` is created for every method or closure invocation and
//! chained to its lexical parent. Closures keep their defining scope alive
//! through their binding, so scopes are reference counted rather than stack
//! allocated.
//!
//! # Shape faults
//!
//! The dynamic shape must match the [`StaticScope`] the body was resolved
//! against. A mismatch (depth-zero access on a scope with no variables,
//! offset past the declared count, depth past the chain root) is an internal
//! invariant violation and panics.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use garnet_ir::StaticScope;

use crate::Value;

#[derive(Clone)]
pub struct DynamicScope(Rc<ScopeData>);

struct ScopeData {
    static_scope: Arc<StaticScope>,
    parent: Option<DynamicScope>,
    storage: Storage,
}

enum Storage {
    /// Zero declared variables: every access is forwarded to the parent.
    NoVars,
    Vars(RefCell<Vec<Value>>),
}

impl DynamicScope {
    /// Allocate a scope sized to `static_scope`'s current variable count.
    pub fn new(static_scope: Arc<StaticScope>, parent: Option<DynamicScope>) -> Self {
        let count = static_scope.number_of_variables();
        let storage = if count == 0 {
            Storage::NoVars
        } else {
            Storage::Vars(RefCell::new(vec![Value::Nil; count]))
        };
        DynamicScope(Rc::new(ScopeData {
            static_scope,
            parent,
            storage,
        }))
    }

    #[inline]
    pub fn static_scope(&self) -> &Arc<StaticScope> {
        &self.0.static_scope
    }

    #[inline]
    pub fn parent(&self) -> Option<&DynamicScope> {
        self.0.parent.as_ref()
    }

    /// Whether this scope carries slot storage.
    #[inline]
    pub fn has_vars(&self) -> bool {
        matches!(self.0.storage, Storage::Vars(_))
    }

    /// Whether both handles name the same scope instance.
    #[inline]
    pub fn ptr_eq(&self, other: &DynamicScope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn ancestor(&self, depth: usize) -> &DynamicScope {
        let mut scope = self;
        for _ in 0..depth {
            scope = match scope.parent() {
                Some(parent) => parent,
                None => panic!("scope depth {depth} exceeds the dynamic scope chain"),
            };
        }
        scope
    }

    fn slots(&self) -> &RefCell<Vec<Value>> {
        match &self.0.storage {
            Storage::Vars(slots) => slots,
            Storage::NoVars => panic!("depth-zero access on a scope with no variables"),
        }
    }

    fn check_offset(&self, offset: usize) {
        let declared = self.0.static_scope.number_of_variables();
        assert!(
            offset < declared,
            "variable offset {offset} out of range for a scope with {declared} variables"
        );
    }

    pub fn get(&self, offset: usize, depth: usize) -> Value {
        let scope = self.ancestor(depth);
        let slots = scope.slots().borrow();
        match slots.get(offset) {
            Some(value) => value.clone(),
            None => {
                // Declared after this scope was allocated and not yet written.
                scope.check_offset(offset);
                Value::Nil
            }
        }
    }

    pub fn set(&self, offset: usize, depth: usize, value: Value) {
        let scope = self.ancestor(depth);
        let mut slots = scope.slots().borrow_mut();
        if offset >= slots.len() {
            scope.check_offset(offset);
            let declared = scope.0.static_scope.number_of_variables();
            slots.resize(declared, Value::Nil);
        }
        slots[offset] = value;
    }

    /// The parameters bound when this method scope was entered, with a named
    /// rest parameter spread back out. Closure scopes forward to their parent.
    pub fn get_arg_values(&self) -> Vec<Value> {
        let static_scope = &self.0.static_scope;
        if !static_scope.is_argument_scope() {
            return match self.parent() {
                Some(parent) => parent.get_arg_values(),
                None => Vec::new(),
            };
        }
        let positional = static_scope.required_args() + static_scope.optional_args();
        let Storage::Vars(slots) = &self.0.storage else {
            return Vec::new();
        };
        let slots = slots.borrow();
        let mut values: Vec<Value> = slots.iter().take(positional).cloned().collect();
        if static_scope.has_rest_arg() {
            if let Some(Value::Array(rest)) = slots.get(positional) {
                values.extend(rest.iter().cloned());
            }
        }
        values
    }

    /// Copy the first `count` values into slots `0..count`.
    pub fn set_arg_values(&self, values: &[Value], count: usize) {
        if count == 0 {
            return;
        }
        let mut slots = self.slots().borrow_mut();
        for (slot, value) in slots.iter_mut().zip(values.iter().take(count)) {
            *slot = value.clone();
        }
    }

    /// Extend slot storage after the static scope gained variables.
    pub fn grow_if_needed(&self) {
        let declared = self.0.static_scope.number_of_variables();
        match &self.0.storage {
            Storage::Vars(slots) => {
                let mut slots = slots.borrow_mut();
                if slots.len() < declared {
                    slots.resize(declared, Value::Nil);
                }
            }
            Storage::NoVars => assert!(
                declared == 0,
                "a scope allocated without variables cannot grow"
            ),
        }
    }

    /// Independent copy of the whole chain. Later writes to the copy are not
    /// visible through the original and vice versa.
    pub fn deep_clone(&self) -> DynamicScope {
        let storage = match &self.0.storage {
            Storage::NoVars => Storage::NoVars,
            Storage::Vars(slots) => Storage::Vars(RefCell::new(slots.borrow().clone())),
        };
        DynamicScope(Rc::new(ScopeData {
            static_scope: Arc::clone(&self.0.static_scope),
            parent: self.parent().map(DynamicScope::deep_clone),
            storage,
        }))
    }
}

impl fmt::Debug for DynamicScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DynamicScope");
        s.field("kind", &self.0.static_scope.kind());
        if let Storage::Vars(slots) = &self.0.storage {
            s.field("slots", &slots.borrow());
        }
        s.field("parent", &self.0.parent).finish()
    }
}

#[cfg(test)]
mod tests;
