//! Compile-time description of a lexical scope's variable layout.
//!
//! A `StaticScope` is shared (via `Arc`) by every invocation of the method or
//! closure body it describes. The parameter layout never changes; the variable
//! list is append-only so that locals discovered late during interpretation get
//! fresh offsets without disturbing existing ones.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Arity, Name};

/// Which construct introduced a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// Method body or top level. Variable lookup stops here; this scope holds
    /// the arguments re-sent by a zero-argument `super`.
    Local,
    /// Closure body. Variable lookup continues into the parent scope.
    Block,
}

#[derive(Debug)]
pub struct StaticScope {
    kind: ScopeKind,
    parent: Option<Arc<StaticScope>>,
    variables: RwLock<Vec<Name>>,
    required_args: usize,
    optional_args: usize,
    rest_arg: bool,
}

impl StaticScope {
    /// A method-body scope with the given variables and no parameters.
    pub fn local(variables: &[&str]) -> Self {
        Self::build(ScopeKind::Local, None, variables)
    }

    /// A closure-body scope nested in `parent`.
    pub fn block(parent: Arc<StaticScope>, variables: &[&str]) -> Self {
        Self::build(ScopeKind::Block, Some(parent), variables)
    }

    fn build(kind: ScopeKind, parent: Option<Arc<StaticScope>>, variables: &[&str]) -> Self {
        StaticScope {
            kind,
            parent,
            variables: RwLock::new(variables.iter().map(|v| Name::new(v)).collect()),
            required_args: 0,
            optional_args: 0,
            rest_arg: false,
        }
    }

    /// Declare the parameter layout. The first `required + optional` variables
    /// are the positional parameters, in order.
    #[must_use]
    pub fn with_args(mut self, required: usize, optional: usize, rest: bool) -> Self {
        debug_assert!(
            required.saturating_add(optional) <= self.variables.get_mut().len(),
            "parameters must be declared as variables"
        );
        self.required_args = required;
        self.optional_args = optional;
        self.rest_arg = rest;
        self
    }

    #[inline]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    #[inline]
    pub fn parent(&self) -> Option<&Arc<StaticScope>> {
        self.parent.as_ref()
    }

    #[inline]
    pub fn is_argument_scope(&self) -> bool {
        self.kind == ScopeKind::Local
    }

    #[inline]
    pub fn required_args(&self) -> usize {
        self.required_args
    }

    #[inline]
    pub fn optional_args(&self) -> usize {
        self.optional_args
    }

    #[inline]
    pub fn has_rest_arg(&self) -> bool {
        self.rest_arg
    }

    pub fn arity(&self) -> Arity {
        Arity::new(self.required_args, self.optional_args, self.rest_arg)
    }

    /// Current number of declared variables.
    pub fn number_of_variables(&self) -> usize {
        self.variables.read().len()
    }

    pub fn variable_names(&self) -> Vec<Name> {
        self.variables.read().clone()
    }

    /// Append a variable and return its offset, or the existing offset if the
    /// name is already declared in this scope.
    pub fn add_variable(&self, name: &str) -> usize {
        let mut variables = self.variables.write();
        if let Some(offset) = variables.iter().position(|v| v.as_str() == name) {
            return offset;
        }
        variables.push(Name::new(name));
        variables.len() - 1
    }

    /// Resolve a variable to `(offset, depth)`, walking outward through
    /// enclosing closure scopes. Lookup stops at the nearest `Local` scope.
    pub fn find_variable(&self, name: &str) -> Option<(usize, usize)> {
        let mut scope = self;
        let mut depth = 0usize;
        loop {
            if let Some(offset) = scope.variables.read().iter().position(|v| v.as_str() == name) {
                return Some((offset, depth));
            }
            match (scope.kind, scope.parent.as_deref()) {
                (ScopeKind::Block, Some(parent)) => {
                    scope = parent;
                    depth = depth.saturating_add(1);
                }
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn find_variable_tunnels_through_block_scopes() {
        let method = Arc::new(StaticScope::local(&["a", "b"]));
        let outer_block = Arc::new(StaticScope::block(Arc::clone(&method), &["c"]));
        let inner_block = StaticScope::block(Arc::clone(&outer_block), &["d"]);

        assert_eq!(inner_block.find_variable("d"), Some((0, 0)));
        assert_eq!(inner_block.find_variable("c"), Some((0, 1)));
        assert_eq!(inner_block.find_variable("b"), Some((1, 2)));
        assert_eq!(inner_block.find_variable("zz"), None);
    }

    #[test]
    fn find_variable_stops_at_local_scope() {
        let top = Arc::new(StaticScope::local(&["outer"]));
        let child = StaticScope::build(ScopeKind::Local, Some(top), &[]);
        assert_eq!(child.find_variable("outer"), None);
    }

    #[test]
    fn add_variable_is_append_only() {
        let scope = StaticScope::local(&["x"]);
        assert_eq!(scope.add_variable("y"), 1);
        assert_eq!(scope.add_variable("x"), 0);
        assert_eq!(scope.number_of_variables(), 2);
        assert_eq!(
            scope.variable_names(),
            vec![Name::new("x"), Name::new("y")]
        );
    }

    #[test]
    fn argument_layout() {
        let scope = StaticScope::local(&["a", "b", "rest"]).with_args(1, 1, true);
        assert!(scope.is_argument_scope());
        assert_eq!(scope.arity(), Arity::new(1, 1, true));
        let block = StaticScope::block(Arc::new(scope), &[]);
        assert!(!block.is_argument_scope());
    }
}
