//! Tree-walking evaluation of method and closure bodies.
//!
//! `eval` is the reference semantics; the compilation backend must agree
//! with it on every construct it accepts. Both go through [`dispatch`] for
//! anything that crosses a call, yield or closure boundary, and through
//! [`control`] for loops and rescue.

pub mod control;
pub mod dispatch;

use garnet_ir::{BlockArg, Node};

use crate::block::BlockKind;
use crate::errors::runtime_error;
use crate::{CallType, ControlAction, EvalResult, ExecutionContext, Value};

use dispatch::BlockSource;

impl ExecutionContext {
    pub fn eval(&mut self, node: &Node) -> EvalResult {
        match node {
            Node::Nil => Ok(Value::Nil),
            Node::True => Ok(Value::Bool(true)),
            Node::False => Ok(Value::Bool(false)),
            Node::Int(n) => Ok(Value::Int(*n)),
            Node::Str(s) => Ok(Value::str(s)),
            Node::Array(items) => Ok(Value::array(self.eval_all(items)?)),
            Node::SelfRef => Ok(self.self_value()),

            Node::LocalVar { offset, depth } => Ok(self.current_scope().get(*offset, *depth)),
            Node::LocalAsgn {
                offset,
                depth,
                value,
            } => {
                let value = self.eval(value)?;
                self.current_scope().set(*offset, *depth, value.clone());
                Ok(value)
            }
            Node::GlobalVar(name) => Ok(self.global(name)),
            Node::GlobalAsgn { name, value } => {
                let value = self.eval(value)?;
                self.set_global(name.clone(), value.clone());
                Ok(value)
            }

            Node::Seq(nodes) => {
                let mut last = Value::Nil;
                for node in nodes {
                    last = self.eval(node)?;
                }
                Ok(last)
            }
            Node::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.eval(else_branch)
                } else {
                    Ok(Value::Nil)
                }
            }
            Node::BinOp { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Ok(lhs.binary_op(*op, &rhs)?)
            }

            Node::Call {
                receiver,
                name,
                args,
                block,
            } => {
                let (receiver, call_type) = match receiver {
                    Some(receiver) => (self.eval(receiver)?, CallType::Normal),
                    None => (self.self_value(), CallType::Functional),
                };
                let args = self.eval_all(args)?;
                let source = match block {
                    None => BlockSource::Absent,
                    Some(BlockArg::Iter(iter)) => BlockSource::Iter(iter),
                    Some(BlockArg::Pass(expr)) => BlockSource::Pass(self.eval(expr)?),
                };
                dispatch::dispatch_call(self, &receiver, name, &args, source, call_type)
            }
            Node::VCall(name) => {
                let receiver = self.self_value();
                dispatch::call_method(self, &receiver, name, &[], None, CallType::Variable)
            }
            Node::Yield { args } => {
                let args = self.eval_all(args)?;
                dispatch::yield_to_frame_block(self, args)
            }
            Node::ZSuper => dispatch::zsuper(self),
            Node::BlockGiven => Ok(dispatch::block_given(self)),

            Node::ProcNew(iter) => Ok(dispatch::make_closure(self, iter, BlockKind::Proc)),
            Node::Lambda(iter) => Ok(dispatch::make_closure(self, iter, BlockKind::Lambda)),
            Node::MethodRef(name) => dispatch::method_to_proc(self, name),

            Node::Return(value) => {
                let value = self.eval_opt(value.as_deref())?;
                dispatch::eval_return(self, value)
            }
            Node::Break(value) => {
                let value = self.eval_opt(value.as_deref())?;
                Err(ControlAction::Break {
                    target: None,
                    value,
                })
            }
            Node::Next(value) => {
                let value = self.eval_opt(value.as_deref())?;
                Err(ControlAction::Next(value))
            }
            Node::Redo => Err(ControlAction::Redo),
            Node::Retry => Err(ControlAction::Retry),

            Node::While { cond, body } => control::run_while(
                self,
                |ctx: &mut ExecutionContext| ctx.eval(cond),
                |ctx: &mut ExecutionContext| ctx.eval(body),
            ),
            Node::Rescue { body, handler } => control::run_rescue(
                self,
                |ctx: &mut ExecutionContext| ctx.eval(body),
                |ctx: &mut ExecutionContext| ctx.eval(handler),
            ),
            Node::Raise(message) => {
                let message = self.eval(message)?;
                Err(runtime_error(message.to_string()).into())
            }

            Node::Def {
                name,
                scope,
                args,
                body,
            } => dispatch::define_method(self, name, scope, args, body),
            Node::ClassBody {
                name,
                superclass,
                is_module,
                scope,
                body,
            } => dispatch::class_body(self, name, superclass.as_ref(), *is_module, scope, body),
            Node::Const(name) => Ok(Value::Class(self.runtime().lookup_constant(name)?)),
        }
    }

    fn eval_all(&mut self, nodes: &[Node]) -> Result<Vec<Value>, ControlAction> {
        nodes.iter().map(|node| self.eval(node)).collect()
    }

    fn eval_opt(&mut self, node: Option<&Node>) -> EvalResult {
        match node {
            Some(node) => self.eval(node),
            None => Ok(Value::Nil),
        }
    }
}
