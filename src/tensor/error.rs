use thiserror::Error;

use crate::host::Shape;

/// Failures raised by the reference tensor host. Messages follow the wording
/// NumPy and PyTorch use for the same situations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("operands could not be broadcast together with shapes {left} {right}")]
    Broadcast { left: Shape, right: Shape },
    #[error(
        "matmul: Input operand {operand} has a mismatch in its core dimension 0 (size {found} is different from {expected})"
    )]
    CoreDimension {
        operand: usize,
        expected: usize,
        found: usize,
    },
    #[error("matmul: Input operand {operand} does not have enough dimensions")]
    MatMulScalar { operand: usize },
    #[error("shapes {left} and {right} not aligned: {left_size} (dim {left_dim}) != {right_size} (dim {right_dim})")]
    NotAligned {
        left: Shape,
        right: Shape,
        left_size: usize,
        left_dim: usize,
        right_size: usize,
        right_dim: usize,
    },
    #[error("too many indices for tensor: tensor is {rank}-dimensional, but {given} were indexed")]
    TooManyIndices { rank: usize, given: usize },
    #[error(
        "all the input arrays must have same number of dimensions, but the array at index 0 has {expected} dimension(s) and the array at index {index} has {found} dimension(s)"
    )]
    ConcatRank {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error(
        "all the input array dimensions except for the concatenation axis must match exactly, but along dimension {dim}, the array at index 0 has size {expected} and the array at index {index} has size {found}"
    )]
    ConcatSize {
        dim: usize,
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("cannot reshape tensor of shape {from} into shape {into}")]
    Reshape { from: Shape, into: String },
    #[error("setting an array element with a sequence. The requested array has an inhomogeneous shape after {depth} dimensions")]
    Inhomogeneous { depth: usize },

    #[error("index {index} is out of bounds for axis {axis} with size {size}")]
    OutOfBounds { index: i64, axis: usize, size: usize },
    #[error("list index out of range")]
    ListIndexOutOfRange,
    #[error("axis {axis} is out of bounds for tensor of rank {rank}")]
    AxisOutOfBounds { axis: i64, rank: usize },
    #[error("an index can only have a single ellipsis ('...')")]
    MultipleEllipsis,
    #[error("need at least one tensor to concatenate")]
    NothingToConcatenate,
    #[error("slice step cannot be zero")]
    ZeroStep,
    #[error("can only reshape with a single unknown size, got {count}")]
    MultipleUnknownSizes { count: usize },
    #[error("unsupported operand type(s) for {op}: '{left}' and '{right}'")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("bad operand type for unary {op}: '{operand}'")]
    BadUnaryOperand {
        op: &'static str,
        operand: &'static str,
    },
    #[error("The truth value of a tensor with more than one element is ambiguous")]
    AmbiguousTruth,
    #[error("'{type_name}' object has no attribute '{attribute}'")]
    NoAttribute {
        type_name: &'static str,
        attribute: String,
    },
    #[error("'{type_name}' object is not callable")]
    NotCallable { type_name: &'static str },
    #[error("'{type_name}' object is not subscriptable")]
    NotSubscriptable { type_name: &'static str },
    #[error("{function}() takes {expected} arguments ({found} given)")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("{function}() argument {position} must be {expected}, not '{found}'")]
    ArgumentType {
        function: &'static str,
        position: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
}

impl TensorError {
    /// Whether the failure is an incompatibility between operand shapes.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            TensorError::Broadcast { .. }
                | TensorError::CoreDimension { .. }
                | TensorError::MatMulScalar { .. }
                | TensorError::NotAligned { .. }
                | TensorError::TooManyIndices { .. }
                | TensorError::ConcatRank { .. }
                | TensorError::ConcatSize { .. }
                | TensorError::Reshape { .. }
                | TensorError::Inhomogeneous { .. }
        )
    }
}
