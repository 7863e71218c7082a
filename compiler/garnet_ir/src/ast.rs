//! Body tree consumed by the interpreter and the compilation backend.
//!
//! Variable references are already resolved to `(offset, depth)` pairs against
//! the enclosing [`StaticScope`] chain; names survive only for methods and
//! globals.

use std::sync::Arc;

use crate::{Arity, Name, StaticScope};

/// Binary operators understood by the core's value layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Lt,
    Gt,
    Eq,
    NotEq,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
        }
    }
}

/// How a call site supplies its block.
#[derive(Clone, Debug)]
pub enum BlockArg {
    /// `foo { |x| ... }` - a closure literal evaluated at the call site.
    Iter(Arc<IterNode>),
    /// `foo(&expr)` - an existing proc value.
    Pass(Box<Node>),
}

#[derive(Clone, Debug)]
pub enum Node {
    Nil,
    True,
    False,
    Int(i64),
    Str(Arc<str>),
    Array(Vec<Node>),
    SelfRef,
    LocalVar {
        offset: usize,
        depth: usize,
    },
    LocalAsgn {
        offset: usize,
        depth: usize,
        value: Box<Node>,
    },
    GlobalVar(Name),
    GlobalAsgn {
        name: Name,
        value: Box<Node>,
    },
    Seq(Vec<Node>),
    If {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    BinOp {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    /// Method call. `receiver: None` is a functional call on `self`.
    Call {
        receiver: Option<Box<Node>>,
        name: Name,
        args: Vec<Node>,
        block: Option<BlockArg>,
    },
    /// Bare identifier that resolved to a method call (`foo` with no receiver,
    /// arguments or parentheses).
    VCall(Name),
    Yield {
        args: Vec<Node>,
    },
    /// `proc { ... }` - a first-class non-lambda closure.
    ProcNew(Arc<IterNode>),
    /// `lambda { ... }`
    Lambda(Arc<IterNode>),
    /// `method(:name).to_proc` on the current `self`.
    MethodRef(Name),
    Return(Option<Box<Node>>),
    Break(Option<Box<Node>>),
    Next(Option<Box<Node>>),
    Redo,
    Retry,
    While {
        cond: Box<Node>,
        body: Box<Node>,
    },
    /// `begin body rescue handler end`
    Rescue {
        body: Box<Node>,
        handler: Box<Node>,
    },
    /// `raise message` - raises a `RuntimeError`.
    Raise(Box<Node>),
    Def {
        name: Name,
        scope: Arc<StaticScope>,
        args: Arc<ArgsNode>,
        body: Arc<Node>,
    },
    /// `class Name < Super ... end` or `module Name ... end`; reopens an
    /// existing class of the same name.
    ClassBody {
        name: Name,
        superclass: Option<Name>,
        is_module: bool,
        scope: Arc<StaticScope>,
        body: Box<Node>,
    },
    /// Constant reference to a class or module.
    Const(Name),
    /// `super` with no argument list: re-sends the current method's arguments.
    ZSuper,
    BlockGiven,
}

impl Node {
    pub fn int(n: i64) -> Node {
        Node::Int(n)
    }

    pub fn str(s: &str) -> Node {
        Node::Str(Arc::from(s))
    }

    pub fn local(offset: usize, depth: usize) -> Node {
        Node::LocalVar { offset, depth }
    }

    pub fn assign(offset: usize, depth: usize, value: Node) -> Node {
        Node::LocalAsgn {
            offset,
            depth,
            value: Box::new(value),
        }
    }

    pub fn global(name: &str) -> Node {
        Node::GlobalVar(Name::new(name))
    }

    pub fn global_assign(name: &str, value: Node) -> Node {
        Node::GlobalAsgn {
            name: Name::new(name),
            value: Box::new(value),
        }
    }

    pub fn binop(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
        Node::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn if_else(cond: Node, then_branch: Node, else_branch: Option<Node>) -> Node {
        Node::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    /// Functional call (`name(args)` on self).
    pub fn fcall(name: &str, args: Vec<Node>) -> Node {
        Node::Call {
            receiver: None,
            name: Name::new(name),
            args,
            block: None,
        }
    }

    pub fn call(receiver: Node, name: &str, args: Vec<Node>) -> Node {
        Node::Call {
            receiver: Some(Box::new(receiver)),
            name: Name::new(name),
            args,
            block: None,
        }
    }

    /// Attach a closure literal to a call node. Non-call nodes are returned unchanged.
    #[must_use]
    pub fn with_iter(self, iter: IterNode) -> Node {
        self.with_block(BlockArg::Iter(Arc::new(iter)))
    }

    #[must_use]
    pub fn with_block(self, block_arg: BlockArg) -> Node {
        match self {
            Node::Call {
                receiver,
                name,
                args,
                ..
            } => Node::Call {
                receiver,
                name,
                args,
                block: Some(block_arg),
            },
            other => other,
        }
    }

    pub fn vcall(name: &str) -> Node {
        Node::VCall(Name::new(name))
    }

    pub fn constant(name: &str) -> Node {
        Node::Const(Name::new(name))
    }

    pub fn class_body(name: &str, superclass: Option<&str>, body: Node) -> Node {
        Node::ClassBody {
            name: Name::new(name),
            superclass: superclass.map(Name::new),
            is_module: false,
            scope: Arc::new(StaticScope::local(&[])),
            body: Box::new(body),
        }
    }

    pub fn module_body(name: &str, body: Node) -> Node {
        Node::ClassBody {
            name: Name::new(name),
            superclass: None,
            is_module: true,
            scope: Arc::new(StaticScope::local(&[])),
            body: Box::new(body),
        }
    }

    pub fn ret(value: Option<Node>) -> Node {
        Node::Return(value.map(Box::new))
    }

    pub fn brk(value: Option<Node>) -> Node {
        Node::Break(value.map(Box::new))
    }

    pub fn next(value: Option<Node>) -> Node {
        Node::Next(value.map(Box::new))
    }

    pub fn while_loop(cond: Node, body: Node) -> Node {
        Node::While {
            cond: Box::new(cond),
            body: Box::new(body),
        }
    }

    pub fn rescue(body: Node, handler: Node) -> Node {
        Node::Rescue {
            body: Box::new(body),
            handler: Box::new(handler),
        }
    }

    pub fn raise(message: &str) -> Node {
        Node::Raise(Box::new(Node::str(message)))
    }

    pub fn def(name: &str, scope: Arc<StaticScope>, args: ArgsNode, body: Node) -> Node {
        Node::Def {
            name: Name::new(name),
            scope,
            args: Arc::new(args),
            body: Arc::new(body),
        }
    }

    /// Short kind label used in diagnostics and compile errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Nil => "nil",
            Node::True => "true",
            Node::False => "false",
            Node::Int(_) => "integer",
            Node::Str(_) => "string",
            Node::Array(_) => "array",
            Node::SelfRef => "self",
            Node::LocalVar { .. } => "local variable",
            Node::LocalAsgn { .. } => "local assignment",
            Node::GlobalVar(_) => "global variable",
            Node::GlobalAsgn { .. } => "global assignment",
            Node::Seq(_) => "sequence",
            Node::If { .. } => "if",
            Node::BinOp { .. } => "binary operation",
            Node::Call { .. } => "call",
            Node::VCall(_) => "variable call",
            Node::Yield { .. } => "yield",
            Node::ProcNew(_) => "proc",
            Node::Lambda(_) => "lambda",
            Node::MethodRef(_) => "method reference",
            Node::Return(_) => "return",
            Node::Break(_) => "break",
            Node::Next(_) => "next",
            Node::Redo => "redo",
            Node::Retry => "retry",
            Node::While { .. } => "while",
            Node::Rescue { .. } => "rescue",
            Node::Raise(_) => "raise",
            Node::Def { .. } => "def",
            Node::ClassBody { is_module: true, .. } => "module",
            Node::ClassBody { .. } => "class",
            Node::Const(_) => "constant",
            Node::ZSuper => "super",
            Node::BlockGiven => "block_given?",
        }
    }
}

/// One optional parameter: the slot it binds and its default expression.
#[derive(Clone, Debug)]
pub struct OptArg {
    pub offset: usize,
    pub default: Node,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestArg {
    #[default]
    None,
    /// `*` - extra arguments are accepted and discarded.
    Anonymous,
    /// `*name` - extra arguments are collected into an array in this slot.
    Named(usize),
}

/// Parameter list of a method definition.
///
/// Required parameters occupy slots `0..required`.
#[derive(Clone, Debug, Default)]
pub struct ArgsNode {
    pub required: usize,
    pub optional: Vec<OptArg>,
    pub rest: RestArg,
    /// Slot receiving the passed block as a proc (`&blk`).
    pub block_arg: Option<usize>,
}

impl ArgsNode {
    pub fn required(count: usize) -> Self {
        ArgsNode {
            required: count,
            ..ArgsNode::default()
        }
    }

    #[must_use]
    pub fn with_optional(mut self, offset: usize, default: Node) -> Self {
        self.optional.push(OptArg { offset, default });
        self
    }

    #[must_use]
    pub fn with_rest(mut self, rest: RestArg) -> Self {
        self.rest = rest;
        self
    }

    #[must_use]
    pub fn with_block_arg(mut self, offset: usize) -> Self {
        self.block_arg = Some(offset);
        self
    }

    pub fn arity(&self) -> Arity {
        Arity::new(
            self.required,
            self.optional.len(),
            !matches!(self.rest, RestArg::None),
        )
    }
}

/// Argument-binding strategy of a closure, fixed at its definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgStrategy {
    /// `{ ... }` or `{ || ... }`
    ZeroArgs,
    /// `{ |a, b, *c| ... }` - destructure an array-like value across parameters.
    MultipleAssignment,
    /// `{ |a| ... }` - bind the argument list as one parameter.
    Array,
    /// `{ |*a| ... }` - bind a single value, unwrapping one level of array nesting.
    SingleRest,
}

/// Parameter slots of a closure, all at depth zero of the closure's scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockParams {
    pub strategy: ArgStrategy,
    pub params: Vec<usize>,
    pub rest: Option<usize>,
}

impl BlockParams {
    pub fn zero() -> Self {
        BlockParams {
            strategy: ArgStrategy::ZeroArgs,
            params: Vec::new(),
            rest: None,
        }
    }

    pub fn single(offset: usize) -> Self {
        BlockParams {
            strategy: ArgStrategy::Array,
            params: vec![offset],
            rest: None,
        }
    }

    pub fn multiple(params: Vec<usize>, rest: Option<usize>) -> Self {
        BlockParams {
            strategy: ArgStrategy::MultipleAssignment,
            params,
            rest,
        }
    }

    pub fn splat(offset: usize) -> Self {
        BlockParams {
            strategy: ArgStrategy::SingleRest,
            params: Vec::new(),
            rest: Some(offset),
        }
    }

    pub fn arity(&self) -> Arity {
        match self.strategy {
            ArgStrategy::ZeroArgs | ArgStrategy::SingleRest => Arity::OPTIONAL,
            ArgStrategy::Array => Arity::ONE_ARGUMENT,
            ArgStrategy::MultipleAssignment => {
                Arity::new(self.params.len(), 0, self.rest.is_some())
            }
        }
    }
}

/// A closure literal: its scope, parameters and body.
#[derive(Debug)]
pub struct IterNode {
    pub scope: Arc<StaticScope>,
    pub params: BlockParams,
    pub body: Node,
}

impl IterNode {
    pub fn new(scope: Arc<StaticScope>, params: BlockParams, body: Node) -> Self {
        IterNode {
            scope,
            params,
            body,
        }
    }
}
