//! Shape algebra for the reference host: broadcasting, matrix products,
//! concatenation, reshaping and indexing, computed on shapes alone.

use crate::host::{Shape, checked_product};

use super::error::TensorError;

/// One axis selector after its bounds have been reduced to integers.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Int(i64),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    Full,
    Ellipsis,
    /// `None` in an index: inserts an axis of size one.
    NewAxis,
    /// Integer-array index of the given shape.
    Array(Shape),
}

/// NumPy broadcasting: dimensions are aligned from the right and must be
/// equal or one.
pub fn broadcast(left: &Shape, right: &Shape) -> Result<Shape, TensorError> {
    let rank = left.rank().max(right.rank());
    let mut dims = Vec::with_capacity(rank);
    for position in 0..rank {
        let l = dim_from_right(left, rank - position);
        let r = dim_from_right(right, rank - position);
        let dim = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => {
                return Err(TensorError::Broadcast {
                    left: left.clone(),
                    right: right.clone(),
                });
            }
        };
        dims.push(dim);
    }
    Ok(Shape(dims))
}

/// Size of the `offset`-th dimension counted from the right (1-based),
/// or one past the rank.
fn dim_from_right(shape: &Shape, offset: usize) -> usize {
    let dims = shape.dims();
    if offset > dims.len() {
        1
    } else {
        dims[dims.len() - offset]
    }
}

/// `a @ b` and `matmul(a, b)`: 1-D operands are promoted and the promoted
/// axis removed again; leading axes broadcast.
pub fn matmul(left: &Shape, right: &Shape) -> Result<Shape, TensorError> {
    if left.rank() == 0 {
        return Err(TensorError::MatMulScalar { operand: 0 });
    }
    if right.rank() == 0 {
        return Err(TensorError::MatMulScalar { operand: 1 });
    }

    let left_vector = left.rank() == 1;
    let right_vector = right.rank() == 1;
    let lhs = if left_vector {
        vec![1, left.dims()[0]]
    } else {
        left.dims().to_vec()
    };
    let rhs = if right_vector {
        vec![right.dims()[0], 1]
    } else {
        right.dims().to_vec()
    };

    let (lhs_batch, lhs_core) = lhs.split_at(lhs.len() - 2);
    let (rhs_batch, rhs_core) = rhs.split_at(rhs.len() - 2);
    if lhs_core[1] != rhs_core[0] {
        return Err(TensorError::CoreDimension {
            operand: 1,
            expected: lhs_core[1],
            found: rhs_core[0],
        });
    }

    let batch = broadcast(&Shape::new(lhs_batch), &Shape::new(rhs_batch)).map_err(|_| {
        TensorError::Broadcast {
            left: left.clone(),
            right: right.clone(),
        }
    })?;
    let mut dims = batch.0;
    if !left_vector {
        dims.push(lhs_core[0]);
    }
    if !right_vector {
        dims.push(rhs_core[1]);
    }
    Ok(Shape(dims))
}

/// NumPy `dot`: inner product of vectors, matrix product otherwise, and a
/// sum over the last axis of `left` and second-to-last of `right` for
/// higher ranks.
pub fn dot(left: &Shape, right: &Shape) -> Result<Shape, TensorError> {
    if left.rank() == 0 {
        return Ok(right.clone());
    }
    if right.rank() == 0 {
        return Ok(left.clone());
    }

    let left_dim = left.rank() - 1;
    let right_dim = right.rank().saturating_sub(2);
    let left_size = left.dims()[left_dim];
    let right_size = right.dims()[right_dim];
    if left_size != right_size {
        return Err(TensorError::NotAligned {
            left: left.clone(),
            right: right.clone(),
            left_size,
            left_dim,
            right_size,
            right_dim,
        });
    }

    let mut dims = left.dims()[..left_dim].to_vec();
    dims.extend(
        right
            .dims()
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != right_dim)
            .map(|(_, dim)| *dim),
    );
    Ok(Shape(dims))
}

pub fn transpose(shape: &Shape) -> Shape {
    Shape(shape.dims().iter().rev().copied().collect())
}

pub fn swap_axes(shape: &Shape, first: i64, second: i64) -> Result<Shape, TensorError> {
    let first = normalize_axis(first, shape.rank())?;
    let second = normalize_axis(second, shape.rank())?;
    let mut dims = shape.0.clone();
    dims.swap(first, second);
    Ok(Shape(dims))
}

pub fn normalize_axis(axis: i64, rank: usize) -> Result<usize, TensorError> {
    let signed_rank = rank as i64;
    let normalized = if axis < 0 { axis + signed_rank } else { axis };
    if (0..signed_rank).contains(&normalized) {
        Ok(normalized as usize)
    } else {
        Err(TensorError::AxisOutOfBounds { axis, rank })
    }
}

/// Removes `axis`, or every axis when `None`.
pub fn reduce(shape: &Shape, axis: Option<i64>) -> Result<Shape, TensorError> {
    match axis {
        None => Ok(Shape::default()),
        Some(axis) => {
            let axis = normalize_axis(axis, shape.rank())?;
            let mut dims = shape.0.clone();
            dims.remove(axis);
            Ok(Shape(dims))
        }
    }
}

/// Joins `shapes` along `axis`. Every other dimension must agree with the
/// first shape.
pub fn concat(shapes: &[Shape], axis: i64) -> Result<Shape, TensorError> {
    let Some(first) = shapes.first() else {
        return Err(TensorError::NothingToConcatenate);
    };
    let axis = normalize_axis(axis, first.rank())?;

    let mut dims = first.0.clone();
    for (index, shape) in shapes.iter().enumerate().skip(1) {
        if shape.rank() != first.rank() {
            return Err(TensorError::ConcatRank {
                index,
                expected: first.rank(),
                found: shape.rank(),
            });
        }
        for (dim, (expected, found)) in first.dims().iter().zip(shape.dims()).enumerate() {
            if dim != axis && expected != found {
                return Err(TensorError::ConcatSize {
                    dim,
                    index,
                    expected: *expected,
                    found: *found,
                });
            }
        }
        dims[axis] += shape.dims()[axis];
    }
    Ok(Shape(dims))
}

/// Resolves a requested shape that may contain a single `-1`.
pub fn reshape(shape: &Shape, requested: &[i64]) -> Result<Shape, TensorError> {
    let unknown = requested.iter().filter(|dim| **dim == -1).count();
    if unknown > 1 {
        return Err(TensorError::MultipleUnknownSizes { count: unknown });
    }

    let mismatch = || TensorError::Reshape {
        from: shape.clone(),
        into: format!(
            "({})",
            requested
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    if requested.iter().any(|dim| *dim < -1) {
        return Err(mismatch());
    }

    let size = shape.element_count().ok_or_else(mismatch)?;
    let known = checked_product(
        requested
            .iter()
            .filter_map(|dim| usize::try_from(*dim).ok()),
    )
    .ok_or_else(mismatch)?;
    let inferred = if unknown == 1 {
        if known == 0 || size % known != 0 {
            return Err(mismatch());
        }
        size / known
    } else {
        if known != size {
            return Err(mismatch());
        }
        0
    };

    Ok(Shape(
        requested
            .iter()
            .map(|dim| usize::try_from(*dim).unwrap_or(inferred))
            .collect(),
    ))
}

/// Number of elements a Python slice selects from an axis of `size`.
pub fn slice_len(
    size: usize,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<usize, TensorError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(TensorError::ZeroStep);
    }
    let size = size as i64;
    let clamp = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + size } else { bound };
        bound.clamp(low, high)
    };

    let len = if step > 0 {
        let start = start.map_or(0, |start| clamp(start, 0, size));
        let stop = stop.map_or(size, |stop| clamp(stop, 0, size));
        stepped_count(stop - start, step)
    } else {
        let start = start.map_or(size - 1, |start| clamp(start, -1, size - 1));
        let stop = stop.map_or(-1, |stop| clamp(stop, -1, size - 1));
        stepped_count(start - stop, step)
    };
    Ok(len)
}

/// Elements met when walking `span` positions in strides of `step`.
fn stepped_count(span: i64, step: i64) -> usize {
    if span <= 0 {
        return 0;
    }
    let span = span.unsigned_abs() as usize;
    (span - 1) / step.unsigned_abs() as usize + 1
}

/// Shape of `shape[selectors]`.
pub fn index(shape: &Shape, selectors: &[Selector]) -> Result<Shape, TensorError> {
    let ellipses = selectors
        .iter()
        .filter(|selector| matches!(selector, Selector::Ellipsis))
        .count();
    if ellipses > 1 {
        return Err(TensorError::MultipleEllipsis);
    }

    let consumed = selectors
        .iter()
        .filter(|selector| !matches!(selector, Selector::Ellipsis | Selector::NewAxis))
        .count();
    if consumed > shape.rank() {
        return Err(TensorError::TooManyIndices {
            rank: shape.rank(),
            given: consumed,
        });
    }

    let full = Selector::Full;
    let mut expanded = Vec::with_capacity(shape.rank() + selectors.len());
    for selector in selectors {
        if matches!(selector, Selector::Ellipsis) {
            expanded.extend(std::iter::repeat_n(&full, shape.rank() - consumed));
        } else {
            expanded.push(selector);
        }
    }

    let mut dims = Vec::new();
    let mut advanced: Option<(usize, Shape)> = None;
    let mut axes = shape.dims().iter().copied().enumerate();
    for selector in expanded {
        if matches!(selector, Selector::NewAxis) {
            dims.push(1);
            continue;
        }
        // `consumed` never exceeds the rank.
        let (axis, size) = axes.next().unwrap_or((shape.rank(), 1));
        match selector {
            Selector::Int(index) => {
                let signed_size = size as i64;
                let position = if *index < 0 { index + signed_size } else { *index };
                if !(0..signed_size).contains(&position) {
                    return Err(TensorError::OutOfBounds {
                        index: *index,
                        axis,
                        size,
                    });
                }
            }
            Selector::Slice { start, stop, step } => {
                dims.push(slice_len(size, *start, *stop, *step)?);
            }
            Selector::Full => dims.push(size),
            Selector::Array(index_shape) => {
                advanced = Some(match advanced {
                    None => (dims.len(), index_shape.clone()),
                    Some((at, joined)) => (at, broadcast(&joined, index_shape)?),
                });
            }
            Selector::Ellipsis | Selector::NewAxis => {}
        }
    }
    // Axes past the last selector are kept whole.
    dims.extend(axes.map(|(_, size)| size));

    if let Some((at, joined)) = advanced {
        let trailing = dims.split_off(at);
        dims.extend(joined.0);
        dims.extend(trailing);
    }
    Ok(Shape(dims))
}
