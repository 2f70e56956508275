use std::fmt::Debug;

use thiserror::Error;

use crate::ast::Node;
use crate::host::IndexValue;

/// Operand values that were already computed when a node's own operation
/// failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Operands<V> {
    Unary(V),
    Binary(V, V),
    Call { callee: V, args: Vec<V> },
    Index { array: V, indices: Vec<IndexValue<V>> },
}

/// A shape-class failure pinned to the smallest sub-expression whose own
/// operation failed. Every operand feeding it evaluated successfully.
#[derive(Debug, Error)]
#[error("shape mismatch in `{node}`: {cause}")]
pub struct IncrEvalTrap<'n, V, E>
where
    V: Debug,
    E: std::error::Error + 'static,
{
    pub node: &'n Node,
    pub operands: Operands<V>,
    #[source]
    pub cause: E,
}

#[derive(Debug, Error)]
pub enum EvalError<'n, V, E>
where
    V: Debug,
    E: std::error::Error + 'static,
{
    #[error("name '{name}' is not defined")]
    Name { name: String },
    #[error(transparent)]
    Trap(IncrEvalTrap<'n, V, E>),
    /// Any other host failure, passed through untouched.
    #[error(transparent)]
    Host(E),
}

impl<'n, V, E> EvalError<'n, V, E>
where
    V: Debug,
    E: std::error::Error + 'static,
{
    pub fn as_trap(&self) -> Option<&IncrEvalTrap<'n, V, E>> {
        match self {
            EvalError::Trap(trap) => Some(trap),
            EvalError::Name { .. } | EvalError::Host(_) => None,
        }
    }

    pub fn into_trap(self) -> Option<IncrEvalTrap<'n, V, E>> {
        match self {
            EvalError::Trap(trap) => Some(trap),
            EvalError::Name { .. } | EvalError::Host(_) => None,
        }
    }
}

pub type EvalResult<'n, V, E> = Result<V, EvalError<'n, V, E>>;
