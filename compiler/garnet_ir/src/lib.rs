//! Garnet IR - the parsed-body representation handed to the execution core.
//!
//! The execution core never parses source. It receives:
//! - [`Node`] trees for method and closure bodies
//! - [`StaticScope`] descriptors describing each scope's variable layout
//! - [`Arity`] contracts for methods and closures
//!
//! All types here are `Send + Sync` so that a method definition can be shared
//! by every thread that calls it.

mod arity;
mod ast;
mod name;
mod static_scope;

pub use arity::{Arity, ArityError};
pub use ast::{
    ArgStrategy, ArgsNode, BinaryOp, BlockArg, BlockParams, IterNode, Node, OptArg, RestArg,
};
pub use name::Name;
pub use static_scope::{ScopeKind, StaticScope};
