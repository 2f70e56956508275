//! Human-readable description of a trapped node's operands.

use std::fmt::Debug;

use crate::ast::Node;
use crate::eval::{IncrEvalTrap, Operands};
use crate::host::{IndexValue, Shape, ShapeAccessor};

/// Describes the operands of `trap`, or `None` when none of them exposes a
/// usable shape.
pub fn explain<V, E, S>(trap: &IncrEvalTrap<'_, V, E>, shapes: &S) -> Option<String>
where
    V: Debug,
    E: std::error::Error + 'static,
    S: ShapeAccessor<V> + ?Sized,
{
    explain_operands(trap.node, &trap.operands, shapes)
}

/// Same as [`explain`] for a node and operands that were not packaged as a
/// trap. A node/operand pairing that does not line up yields `None`.
pub fn explain_operands<V, S>(node: &Node, operands: &Operands<V>, shapes: &S) -> Option<String>
where
    S: ShapeAccessor<V> + ?Sized,
{
    // Scalars (rank 0) carry nothing worth reporting.
    let shape_of = |value: &V| shapes.shape(value).filter(|shape| shape.rank() > 0);
    let described = |role: String, value: &V| {
        shape_of(value).map(|shape| describe(&role, &shape))
    };

    match (node, operands) {
        (Node::UnaryOp { operand, .. }, Operands::Unary(value)) => {
            let part = described(format!("operand {operand}"), value)?;
            Some(format!("Cause: {node} on {part}"))
        }
        (Node::BinaryOp { left, right, .. }, Operands::Binary(left_value, right_value)) => {
            let parts = [
                described(format!("left operand {left}"), left_value),
                described(format!("right operand {right}"), right_value),
            ];
            let parts = parts.into_iter().flatten().collect::<Vec<_>>();
            (!parts.is_empty()).then(|| format!("Cause: {node} on {}", parts.join(" and ")))
        }
        (Node::Call { args, .. }, Operands::Call { args: values, .. }) => {
            if args.len() != values.len() {
                return None;
            }
            let parts = args
                .iter()
                .zip(values)
                .enumerate()
                .filter_map(|(position, (arg, value))| {
                    described(format!("argument #{position} {arg}"), value)
                })
                .collect::<Vec<_>>();
            (!parts.is_empty()).then(|| format!("Cause: {node} with {}", parts.join(", ")))
        }
        (
            Node::Index { array, indices },
            Operands::Index {
                array: array_value,
                indices: index_values,
            },
        ) => {
            if indices.len() != index_values.len() {
                return None;
            }
            let array_part = described(format!("array {array}"), array_value);
            let index_parts = indices
                .iter()
                .zip(index_values)
                .enumerate()
                .filter_map(|(position, (item, value))| match value {
                    IndexValue::Value(value) => {
                        described(format!("index #{position} {item}"), value)
                    }
                    IndexValue::Slice { .. } | IndexValue::Full | IndexValue::Ellipsis => None,
                })
                .collect::<Vec<_>>();

            let mut text = format!("Cause: {node}");
            if let Some(array_part) = &array_part {
                text.push_str(" on ");
                text.push_str(array_part);
            }
            if !index_parts.is_empty() {
                text.push_str(" with ");
                text.push_str(&index_parts.join(", "));
            }
            (array_part.is_some() || !index_parts.is_empty()).then_some(text)
        }
        _ => None,
    }
}

fn describe(role: &str, shape: &Shape) -> String {
    format!("{role} w/shape {shape}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    /// Values are `Some(dims)` for tensors and `None` for everything else.
    struct Dims;

    impl ShapeAccessor<Option<Vec<usize>>> for Dims {
        fn shape(&self, value: &Option<Vec<usize>>) -> Option<Shape> {
            value.clone().map(Shape)
        }
    }

    fn tensor(dims: &[usize]) -> Option<Vec<usize>> {
        Some(dims.to_vec())
    }

    fn tree(line: &str) -> Node {
        parse(line)
            .expect("parse should succeed")
            .expect("line should hold an expression")
    }

    #[test]
    fn names_both_binary_operands() {
        let node = tree("a @ b");
        let operands = Operands::Binary(tensor(&[2, 3]), tensor(&[4, 5]));
        assert_eq!(
            explain_operands(&node, &operands, &Dims).as_deref(),
            Some("Cause: a @ b on left operand a w/shape (2, 3) and right operand b w/shape (4, 5)")
        );
    }

    #[test]
    fn skips_shapeless_operands() {
        let node = tree("x + 1");
        let operands = Operands::Binary(tensor(&[3]), None);
        assert_eq!(
            explain_operands(&node, &operands, &Dims).as_deref(),
            Some("Cause: x + 1 on left operand x w/shape (3,)")
        );
    }

    #[test]
    fn zero_rank_counts_as_no_shape() {
        let node = tree("-s");
        assert_eq!(explain_operands(&node, &Operands::Unary(tensor(&[])), &Dims), None);
        assert_eq!(
            explain_operands(&node, &Operands::Unary(tensor(&[7, 1])), &Dims).as_deref(),
            Some("Cause: -s on operand s w/shape (7, 1)")
        );
    }

    #[test]
    fn numbers_call_arguments() {
        let node = tree("torch.cat(x, 0, y)");
        let operands = Operands::Call {
            callee: None,
            args: vec![tensor(&[2, 3]), None, tensor(&[4])],
        };
        assert_eq!(
            explain_operands(&node, &operands, &Dims).as_deref(),
            Some(
                "Cause: torch.cat(x, 0, y) with argument #0 x w/shape (2, 3), argument #2 y w/shape (4,)"
            )
        );
    }

    #[test]
    fn separates_array_from_indices() {
        let node = tree("a[i, :]");
        let operands = Operands::Index {
            array: tensor(&[2]),
            indices: vec![IndexValue::Value(tensor(&[3])), IndexValue::Full],
        };
        assert_eq!(
            explain_operands(&node, &operands, &Dims).as_deref(),
            Some("Cause: a[i, :] on array a w/shape (2,) with index #0 i w/shape (3,)")
        );

        let operands = Operands::Index {
            array: None,
            indices: vec![IndexValue::Value(tensor(&[3])), IndexValue::Full],
        };
        assert_eq!(
            explain_operands(&node, &operands, &Dims).as_deref(),
            Some("Cause: a[i, :] with index #0 i w/shape (3,)")
        );
    }

    #[test]
    fn nothing_to_say_without_shapes() {
        let node = tree("f(a, b)");
        let operands = Operands::Call {
            callee: None,
            args: vec![None, None],
        };
        assert_eq!(explain_operands(&node, &operands, &Dims), None);
    }

    #[test]
    fn mismatched_pairing_degrades_to_none() {
        let node = tree("a @ b");
        let operands = Operands::Unary(tensor(&[2, 3]));
        assert_eq!(explain_operands(&node, &operands, &Dims), None);

        let node = tree("f(a)");
        let operands = Operands::Call {
            callee: None,
            args: vec![tensor(&[1]), tensor(&[2])],
        };
        assert_eq!(explain_operands(&node, &operands, &Dims), None);
    }
}
