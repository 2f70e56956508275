//! Incremental, bottom-up evaluation of a parsed line.
//!
//! Children are evaluated in post-order (left to right, arguments and index
//! components in order) before the node's own operation is applied. The first
//! operation whose failure the classifier marks as shape-related stops the
//! walk with an [`IncrEvalTrap`] naming that node and its evaluated operands.

use log::{debug, trace};

use crate::ast::{Atom, IndexItem, Node, Slice};
use crate::host::{Environment, FailureClassifier, IndexValue, Operations};

pub mod error;

pub use error::{EvalError, EvalResult, IncrEvalTrap, Operands};

/// Walks trees with borrowed host capabilities. Holds no state of its own, so
/// one evaluator (and one tree) can serve any number of environments.
pub struct Evaluator<'h, O: ?Sized, C: ?Sized> {
    ops: &'h O,
    classifier: &'h C,
}

impl<'h, O, C> Evaluator<'h, O, C>
where
    O: Operations + ?Sized,
    O::Value: std::fmt::Debug,
    C: FailureClassifier<O::Error> + ?Sized,
{
    pub fn new(ops: &'h O, classifier: &'h C) -> Self {
        Self { ops, classifier }
    }

    /// Evaluates `node` against `env`. Assignments yield the right-hand value
    /// without storing it anywhere.
    pub fn evaluate<'n, Env>(
        &self,
        node: &'n Node,
        env: &Env,
    ) -> EvalResult<'n, O::Value, O::Error>
    where
        Env: Environment<O::Value> + ?Sized,
    {
        trace!("evaluating `{node}`");
        self.eval(node, env)
    }

    fn eval<'n, Env>(&self, node: &'n Node, env: &Env) -> EvalResult<'n, O::Value, O::Error>
    where
        Env: Environment<O::Value> + ?Sized,
    {
        match node {
            Node::Atom(Atom::Name(name)) => env
                .lookup(name)
                .ok_or_else(|| EvalError::Name { name: name.clone() }),
            Node::Atom(Atom::Literal(literal)) => {
                self.ops.literal(literal).map_err(EvalError::Host)
            }
            Node::UnaryOp { op, operand } => {
                let operand = self.eval(operand, env)?;
                let result = self.ops.unary(*op, &operand);
                self.trap(node, result, || Operands::Unary(operand))
            }
            Node::BinaryOp { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                let result = self.ops.binary(*op, &left, &right);
                self.trap(node, result, || Operands::Binary(left, right))
            }
            Node::Assign { value, .. } => self.eval(value, env),
            Node::Member { object, member } => {
                let object = self.eval(object, env)?;
                self.ops.member(&object, member).map_err(EvalError::Host)
            }
            Node::Call { callee, args } => {
                let callee = self.eval(callee, env)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = self.ops.call(&callee, &args);
                self.trap(node, result, || Operands::Call { callee, args })
            }
            Node::Index { array, indices } => {
                let array = self.eval(array, env)?;
                let indices = indices
                    .iter()
                    .map(|item| self.eval_index_item(item, env))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = self.ops.index(&array, &indices);
                self.trap(node, result, || Operands::Index { array, indices })
            }
            Node::ListLiteral { elems } => {
                let values = elems
                    .iter()
                    .map(|elem| self.eval(elem, env))
                    .collect::<Result<Vec<_>, _>>()?;
                self.ops.list(values).map_err(EvalError::Host)
            }
            Node::SubExpr { inner } => self.eval(inner, env),
        }
    }

    fn eval_index_item<'n, Env>(
        &self,
        item: &'n IndexItem,
        env: &Env,
    ) -> Result<IndexValue<O::Value>, EvalError<'n, O::Value, O::Error>>
    where
        Env: Environment<O::Value> + ?Sized,
    {
        match item {
            IndexItem::Expr(node) => Ok(IndexValue::Value(self.eval(node, env)?)),
            IndexItem::Slice(Slice {
                start, stop, step, ..
            }) => {
                let bound = |node: &'n Option<Box<Node>>| {
                    node.as_deref().map(|node| self.eval(node, env)).transpose()
                };
                Ok(IndexValue::Slice {
                    start: bound(start)?,
                    stop: bound(stop)?,
                    step: bound(step)?,
                })
            }
            IndexItem::Full => Ok(IndexValue::Full),
            IndexItem::Ellipsis => Ok(IndexValue::Ellipsis),
        }
    }

    /// Turns a shape-class failure of `node`'s own operation into a trap;
    /// other failures pass through as host errors.
    fn trap<'n>(
        &self,
        node: &'n Node,
        result: Result<O::Value, O::Error>,
        operands: impl FnOnce() -> Operands<O::Value>,
    ) -> EvalResult<'n, O::Value, O::Error> {
        match result {
            Ok(value) => Ok(value),
            Err(cause) if self.classifier.is_shape_failure(&cause) => {
                debug!("trapped shape failure at `{node}`: {cause}");
                Err(EvalError::Trap(IncrEvalTrap {
                    node,
                    operands: operands(),
                    cause,
                }))
            }
            Err(cause) => Err(EvalError::Host(cause)),
        }
    }
}

/// One-shot form of [`Evaluator::evaluate`].
pub fn evaluate<'n, O, C, Env>(
    node: &'n Node,
    env: &Env,
    ops: &O,
    classifier: &C,
) -> EvalResult<'n, O::Value, O::Error>
where
    O: Operations + ?Sized,
    O::Value: std::fmt::Debug,
    C: FailureClassifier<O::Error> + ?Sized,
    Env: Environment<O::Value> + ?Sized,
{
    Evaluator::new(ops, classifier).evaluate(node, env)
}
