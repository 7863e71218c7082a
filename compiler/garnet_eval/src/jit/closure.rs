//! Reference backend: compiles a body tree into nested Rust closures.
//!
//! Each node becomes one boxed closure; dispatch on node kind happens once,
//! at compile time, instead of on every evaluation. Runtime behavior is
//! delegated to the same helpers the interpreter uses. Closure literals keep
//! interpreted bodies. Constructs that need unwinding state the closures do
//! not model (`rescue`, `retry`, `def`, class bodies, zero-argument `super`)
//! are rejected, and the method stays interpreted.

use std::sync::Arc;

use garnet_ir::{Arity, BinaryOp, BlockArg, IterNode, Name, Node, StaticScope};

use super::{CompilationBackend, CompileError, CompiledBody};
use crate::block::BlockKind;
use crate::errors::runtime_error;
use crate::interpreter::control::run_while;
use crate::interpreter::dispatch::{self, BlockSource};
use crate::{CallType, ControlAction, EvalResult, ExecutionContext, Value};

type Code = Box<dyn Fn(&mut ExecutionContext) -> EvalResult + Send + Sync>;

fn code(f: impl Fn(&mut ExecutionContext) -> EvalResult + Send + Sync + 'static) -> Code {
    Box::new(f)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ClosureCompiler;

impl CompilationBackend for ClosureCompiler {
    fn compile(
        &self,
        body: &Arc<Node>,
        _scope: &Arc<StaticScope>,
        _arity: Arity,
        name: &str,
    ) -> Result<CompiledBody, CompileError> {
        let translator = Translator { method: name };
        let compiled = translator.translate(body)?;
        tracing::trace!(method = name, "closure compilation finished");
        Ok(Arc::from(compiled))
    }
}

enum CompiledBlock {
    Absent,
    Iter(Arc<IterNode>),
    Pass(Code),
}

struct Translator<'a> {
    method: &'a str,
}

impl Translator<'_> {
    fn unsupported(&self, node: &Node) -> CompileError {
        CompileError::Unsupported {
            method: self.method.to_string(),
            construct: node.kind_name(),
        }
    }

    fn translate_all(&self, nodes: &[Node]) -> Result<Vec<Code>, CompileError> {
        nodes.iter().map(|node| self.translate(node)).collect()
    }

    fn translate_opt(&self, node: Option<&Node>) -> Result<Option<Code>, CompileError> {
        node.map(|node| self.translate(node)).transpose()
    }

    fn translate(&self, node: &Node) -> Result<Code, CompileError> {
        let compiled = match node {
            Node::Nil => code(|_| Ok(Value::Nil)),
            Node::True => code(|_| Ok(Value::Bool(true))),
            Node::False => code(|_| Ok(Value::Bool(false))),
            &Node::Int(n) => code(move |_| Ok(Value::Int(n))),
            Node::Str(s) => {
                let s = Arc::clone(s);
                code(move |_| Ok(Value::str(&s)))
            }
            Node::Array(items) => {
                let items = self.translate_all(items)?;
                code(move |ctx| Ok(Value::array(run_all(ctx, &items)?)))
            }
            Node::SelfRef => code(|ctx| Ok(ctx.self_value())),

            &Node::LocalVar { offset, depth } => {
                code(move |ctx| Ok(ctx.current_scope().get(offset, depth)))
            }
            Node::LocalAsgn {
                offset,
                depth,
                value,
            } => {
                let (offset, depth) = (*offset, *depth);
                let value = self.translate(value)?;
                code(move |ctx| {
                    let value = value(ctx)?;
                    ctx.current_scope().set(offset, depth, value.clone());
                    Ok(value)
                })
            }
            Node::GlobalVar(name) => {
                let name = name.clone();
                code(move |ctx| Ok(ctx.global(&name)))
            }
            Node::GlobalAsgn { name, value } => {
                let name = name.clone();
                let value = self.translate(value)?;
                code(move |ctx| {
                    let value = value(ctx)?;
                    ctx.set_global(name.clone(), value.clone());
                    Ok(value)
                })
            }

            Node::Seq(nodes) => {
                let nodes = self.translate_all(nodes)?;
                code(move |ctx| {
                    let mut last = Value::Nil;
                    for node in &nodes {
                        last = node(ctx)?;
                    }
                    Ok(last)
                })
            }
            Node::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.translate(cond)?;
                let then_branch = self.translate(then_branch)?;
                let else_branch = self.translate_opt(else_branch.as_deref())?;
                code(move |ctx| {
                    if cond(ctx)?.is_truthy() {
                        then_branch(ctx)
                    } else if let Some(else_branch) = &else_branch {
                        else_branch(ctx)
                    } else {
                        Ok(Value::Nil)
                    }
                })
            }
            Node::BinOp { op, lhs, rhs } => self.binary(*op, lhs, rhs)?,

            Node::Call {
                receiver,
                name,
                args,
                block,
            } => self.call(receiver.as_deref(), name, args, block.as_ref())?,
            Node::VCall(name) => {
                let name = name.clone();
                code(move |ctx| {
                    let receiver = ctx.self_value();
                    dispatch::call_method(ctx, &receiver, &name, &[], None, CallType::Variable)
                })
            }
            Node::Yield { args } => {
                let args = self.translate_all(args)?;
                code(move |ctx| {
                    let args = run_all(ctx, &args)?;
                    dispatch::yield_to_frame_block(ctx, args)
                })
            }
            Node::BlockGiven => code(|ctx| Ok(dispatch::block_given(ctx))),

            Node::ProcNew(iter) => {
                let iter = Arc::clone(iter);
                code(move |ctx| Ok(dispatch::make_closure(ctx, &iter, BlockKind::Proc)))
            }
            Node::Lambda(iter) => {
                let iter = Arc::clone(iter);
                code(move |ctx| Ok(dispatch::make_closure(ctx, &iter, BlockKind::Lambda)))
            }
            Node::MethodRef(name) => {
                let name = name.clone();
                code(move |ctx| dispatch::method_to_proc(ctx, &name))
            }

            Node::Return(value) => {
                let value = self.translate_opt(value.as_deref())?;
                code(move |ctx| {
                    let value = run_opt(ctx, value.as_ref())?;
                    dispatch::eval_return(ctx, value)
                })
            }
            Node::Break(value) => {
                let value = self.translate_opt(value.as_deref())?;
                code(move |ctx| {
                    let value = run_opt(ctx, value.as_ref())?;
                    Err(ControlAction::Break {
                        target: None,
                        value,
                    })
                })
            }
            Node::Next(value) => {
                let value = self.translate_opt(value.as_deref())?;
                code(move |ctx| Err(ControlAction::Next(run_opt(ctx, value.as_ref())?)))
            }
            Node::Redo => code(|_| Err(ControlAction::Redo)),

            Node::While { cond, body } => {
                let cond = self.translate(cond)?;
                let body = self.translate(body)?;
                code(move |ctx| run_while(ctx, |ctx| cond(ctx), |ctx| body(ctx)))
            }
            Node::Raise(message) => {
                let message = self.translate(message)?;
                code(move |ctx| {
                    let message = message(ctx)?;
                    Err(runtime_error(message.to_string()).into())
                })
            }
            Node::Const(name) => {
                let name = name.clone();
                code(move |ctx| Ok(Value::Class(ctx.runtime().lookup_constant(&name)?)))
            }

            Node::Retry
            | Node::Rescue { .. }
            | Node::Def { .. }
            | Node::ClassBody { .. }
            | Node::ZSuper => return Err(self.unsupported(node)),
        };
        Ok(compiled)
    }

    fn binary(&self, op: BinaryOp, lhs: &Node, rhs: &Node) -> Result<Code, CompileError> {
        let lhs = self.translate(lhs)?;
        let rhs = self.translate(rhs)?;
        Ok(code(move |ctx| {
            let lhs = lhs(ctx)?;
            let rhs = rhs(ctx)?;
            Ok(lhs.binary_op(op, &rhs)?)
        }))
    }

    fn call(
        &self,
        receiver: Option<&Node>,
        name: &Name,
        args: &[Node],
        block: Option<&BlockArg>,
    ) -> Result<Code, CompileError> {
        let receiver = self.translate_opt(receiver)?;
        let args = self.translate_all(args)?;
        let block = match block {
            None => CompiledBlock::Absent,
            Some(BlockArg::Iter(iter)) => CompiledBlock::Iter(Arc::clone(iter)),
            Some(BlockArg::Pass(expr)) => CompiledBlock::Pass(self.translate(expr)?),
        };
        let name = name.clone();
        Ok(code(move |ctx| {
            let (receiver, call_type) = match &receiver {
                Some(receiver) => (receiver(ctx)?, CallType::Normal),
                None => (ctx.self_value(), CallType::Functional),
            };
            let args = run_all(ctx, &args)?;
            let source = match &block {
                CompiledBlock::Absent => BlockSource::Absent,
                CompiledBlock::Iter(iter) => BlockSource::Iter(iter),
                CompiledBlock::Pass(expr) => BlockSource::Pass(expr(ctx)?),
            };
            dispatch::dispatch_call(ctx, &receiver, &name, &args, source, call_type)
        }))
    }
}

fn run_all(ctx: &mut ExecutionContext, codes: &[Code]) -> Result<Vec<Value>, ControlAction> {
    codes.iter().map(|code| code(ctx)).collect()
}

fn run_opt(ctx: &mut ExecutionContext, code: Option<&Code>) -> EvalResult {
    match code {
        Some(code) => code(ctx),
        None => Ok(Value::Nil),
    }
}
