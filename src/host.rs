//! Capabilities the host environment injects into the evaluator.
//!
//! The core never looks inside values. Arithmetic, indexing, calls and member
//! lookup are delegated to an [`Operations`] implementation, failures are
//! sorted by a [`FailureClassifier`], shapes come from a [`ShapeAccessor`] and
//! names resolve through an [`Environment`].

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::hash::BuildHasher;

use crate::ast::{BinaryOperator, Literal, UnaryOperator};

/// Evaluated index component handed to [`Operations::index`].
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue<V> {
    Value(V),
    /// Absent bounds stay `None`.
    Slice {
        start: Option<V>,
        stop: Option<V>,
        step: Option<V>,
    },
    Full,
    Ellipsis,
}

pub trait Operations {
    type Value: Clone;
    type Error: std::error::Error + 'static;

    fn literal(&self, literal: &Literal) -> Result<Self::Value, Self::Error>;

    fn unary(&self, op: UnaryOperator, operand: &Self::Value) -> Result<Self::Value, Self::Error>;

    fn binary(
        &self,
        op: BinaryOperator,
        left: &Self::Value,
        right: &Self::Value,
    ) -> Result<Self::Value, Self::Error>;

    fn member(&self, object: &Self::Value, name: &str) -> Result<Self::Value, Self::Error>;

    fn call(&self, callee: &Self::Value, args: &[Self::Value]) -> Result<Self::Value, Self::Error>;

    fn index(
        &self,
        array: &Self::Value,
        indices: &[IndexValue<Self::Value>],
    ) -> Result<Self::Value, Self::Error>;

    /// Aggregates evaluated list elements, e.g. for `[a, b]`.
    fn list(&self, elems: Vec<Self::Value>) -> Result<Self::Value, Self::Error>;
}

/// Decides which host failures are shape/dimension mismatches.
pub trait FailureClassifier<E: ?Sized> {
    fn is_shape_failure(&self, error: &E) -> bool;
}

pub trait ShapeAccessor<V> {
    /// `None` when the value carries no usable shape.
    fn shape(&self, value: &V) -> Option<Shape>;
}

pub trait Environment<V> {
    fn lookup(&self, name: &str) -> Option<V>;
}

impl<V: Clone, S: BuildHasher> Environment<V> for HashMap<String, V, S> {
    fn lookup(&self, name: &str) -> Option<V> {
        self.get(name).cloned()
    }
}

impl<V, E: Environment<V> + ?Sized> Environment<V> for &E {
    fn lookup(&self, name: &str) -> Option<V> {
        (**self).lookup(name)
    }
}

/// Dimension sizes of a tensor, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of elements, or `None` if it does not fit in a `usize`.
    pub fn element_count(&self) -> Option<usize> {
        checked_product(self.0.iter().copied())
    }
}

pub(crate) fn checked_product(dims: impl IntoIterator<Item = usize>) -> Option<usize> {
    dims.into_iter().try_fold(1usize, usize::checked_mul)
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "({single},)"),
            dims => {
                f.write_str("(")?;
                for (position, dim) in dims.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{dim}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;

    #[test]
    fn shape_display_matches_tuple_syntax() {
        assert_eq!(Shape::new([2, 3]).to_string(), "(2, 3)");
        assert_eq!(Shape::new([4]).to_string(), "(4,)");
        assert_eq!(Shape::default().to_string(), "()");
    }

    #[test]
    fn hash_maps_are_environments() {
        let mut env = FxHashMap::default();
        env.insert("x".to_string(), 1);
        assert_eq!(env.lookup("x"), Some(1));
        assert_eq!((&env).lookup("y"), None);
    }
}
