//! A reference host that tracks tensor shapes only.
//!
//! [`TensorHost`] implements every host capability with NumPy/PyTorch
//! semantics for shapes: broadcasting arithmetic, matrix products, indexing
//! and a handful of library functions. Element values are never computed;
//! plain numbers are, so index arithmetic like `x[n - 1]` works.

use rustc_hash::FxHashMap;

use crate::ast::{BinaryOperator, Literal, UnaryOperator};
use crate::host::{FailureClassifier, IndexValue, Operations, Shape, ShapeAccessor};

pub mod error;
pub mod ops;
pub mod value;

pub use error::TensorError;
pub use ops::Selector;
pub use value::{Builtin, Library, Method, Value, ValueParseError};

type TensorResult<T> = Result<T, TensorError>;

#[derive(Debug, Default, Clone, Copy)]
pub struct TensorHost;

impl TensorHost {
    pub fn new() -> Self {
        Self
    }

    /// Environment with `np`, `numpy` and `torch` bound.
    pub fn prelude() -> FxHashMap<String, Value> {
        let mut env = FxHashMap::default();
        env.insert("np".to_string(), Value::Module(Library::NumPy));
        env.insert("numpy".to_string(), Value::Module(Library::NumPy));
        env.insert("torch".to_string(), Value::Module(Library::Torch));
        env
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(value) => Some(Number::Int(*value)),
            Value::Bool(value) => Some(Number::Int(i64::from(*value))),
            Value::Float(value) => Some(Number::Float(*value)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(value) => value == 0,
            Number::Float(value) => value == 0.0,
        }
    }
}

fn int_or_float(int: Option<i64>, float: impl FnOnce() -> f64) -> Value {
    int.map_or_else(|| Value::Float(float()), Value::Int)
}

fn truthy(value: &Value) -> TensorResult<bool> {
    Ok(match value {
        Value::Int(value) => *value != 0,
        Value::Float(value) => *value != 0.0,
        Value::Bool(value) => *value,
        Value::Str(value) => !value.is_empty(),
        Value::None => false,
        Value::List(elems) => !elems.is_empty(),
        Value::Tensor(shape) => {
            if shape.element_count() != Some(1) {
                return Err(TensorError::AmbiguousTruth);
            }
            true
        }
        Value::Module(_) | Value::Object(_) | Value::Function(_) | Value::Method { .. } => true,
    })
}

/// `None` when `op` is not arithmetic.
fn arithmetic(op: BinaryOperator, left: Number, right: Number) -> TensorResult<Option<Value>> {
    use Number::Int;

    let float = |l: f64, r: f64| match op {
        BinaryOperator::Add => Some(l + r),
        BinaryOperator::Sub => Some(l - r),
        BinaryOperator::Mul => Some(l * r),
        BinaryOperator::Div => Some(l / r),
        BinaryOperator::FloorDiv => Some((l / r).floor()),
        BinaryOperator::Mod => Some(l - r * (l / r).floor()),
        BinaryOperator::Pow => Some(l.powf(r)),
        _ => None,
    };

    if matches!(
        op,
        BinaryOperator::Div | BinaryOperator::FloorDiv | BinaryOperator::Mod
    ) && right.is_zero()
    {
        return Err(TensorError::DivisionByZero);
    }

    Ok(match (left, right) {
        (Int(l), Int(r)) => {
            let as_float = || float(l as f64, r as f64).unwrap_or(f64::NAN);
            match op {
                BinaryOperator::Add => Some(int_or_float(l.checked_add(r), as_float)),
                BinaryOperator::Sub => Some(int_or_float(l.checked_sub(r), as_float)),
                BinaryOperator::Mul => Some(int_or_float(l.checked_mul(r), as_float)),
                BinaryOperator::FloorDiv => {
                    // Python rounds towards negative infinity.
                    let floor = l
                        .checked_div_euclid(r)
                        .zip(l.checked_rem_euclid(r))
                        .map(|(quotient, rem)| quotient - i64::from(r < 0 && rem != 0));
                    Some(int_or_float(floor, as_float))
                }
                BinaryOperator::Mod => {
                    let rem = l
                        .checked_rem_euclid(r)
                        .map(|rem| if r < 0 && rem != 0 { rem + r } else { rem });
                    Some(int_or_float(rem, as_float))
                }
                BinaryOperator::Pow => {
                    let exact = u32::try_from(r).ok().and_then(|r| l.checked_pow(r));
                    Some(int_or_float(exact, as_float))
                }
                _ => float(l as f64, r as f64).map(Value::Float),
            }
        }
        (l, r) => float(l.as_f64(), r.as_f64()).map(Value::Float),
    })
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Option<bool> {
    if let (Some(l), Some(r)) = (Number::of(left), Number::of(right)) {
        let ordering = match (l, r) {
            (Number::Int(l), Number::Int(r)) => l.partial_cmp(&r),
            (l, r) => l.as_f64().partial_cmp(&r.as_f64()),
        };
        return Some(match op {
            BinaryOperator::Eq => ordering == Some(std::cmp::Ordering::Equal),
            BinaryOperator::NotEq => ordering != Some(std::cmp::Ordering::Equal),
            BinaryOperator::Lt => ordering == Some(std::cmp::Ordering::Less),
            BinaryOperator::LtE => matches!(
                ordering,
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            ),
            BinaryOperator::Gt => ordering == Some(std::cmp::Ordering::Greater),
            BinaryOperator::GtE => matches!(
                ordering,
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            ),
            _ => return None,
        });
    }
    match op {
        BinaryOperator::Eq => Some(left == right),
        BinaryOperator::NotEq => Some(left != right),
        _ => None,
    }
}

/// Shape of a tensor operand, with scalars broadcasting as rank 0.
fn broadcast_shape(value: &Value) -> Option<Shape> {
    match value {
        Value::Tensor(shape) => Some(shape.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Some(Shape::default()),
        _ => None,
    }
}

fn expect_int(function: &'static str, position: usize, value: &Value) -> TensorResult<i64> {
    match value {
        Value::Int(value) => Ok(*value),
        Value::Bool(value) => Ok(i64::from(*value)),
        other => Err(TensorError::ArgumentType {
            function,
            position,
            expected: "int",
            found: other.type_name(),
        }),
    }
}

fn expect_tensor<'v>(
    function: &'static str,
    position: usize,
    value: &'v Value,
) -> TensorResult<&'v Shape> {
    match value {
        Value::Tensor(shape) => Ok(shape),
        other => Err(TensorError::ArgumentType {
            function,
            position,
            expected: "Tensor",
            found: other.type_name(),
        }),
    }
}

fn arity(function: &'static str, expected: &'static str, args: &[Value], ok: bool) -> TensorResult<()> {
    if ok {
        Ok(())
    } else {
        Err(TensorError::Arity {
            function,
            expected,
            found: args.len(),
        })
    }
}

/// Sizes given either as separate ints or as one list/tuple-like value.
fn sizes(function: &'static str, args: &[Value]) -> TensorResult<Vec<i64>> {
    match args {
        [Value::List(elems)] => elems
            .iter()
            .enumerate()
            .map(|(position, elem)| expect_int(function, position, elem))
            .collect(),
        _ => args
            .iter()
            .enumerate()
            .map(|(position, arg)| expect_int(function, position, arg))
            .collect(),
    }
}

/// Shape of a nested list of numbers and tensors, as `array(...)` sees it.
fn infer_shape(value: &Value, depth: usize) -> TensorResult<Shape> {
    match value {
        Value::Tensor(shape) => Ok(shape.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(Shape::default()),
        Value::List(elems) => {
            let mut inner: Option<Shape> = None;
            for elem in elems {
                let shape = infer_shape(elem, depth + 1)?;
                match &inner {
                    Some(expected) if *expected != shape => {
                        return Err(TensorError::Inhomogeneous { depth: depth + 1 });
                    }
                    Some(_) => {}
                    None => inner = Some(shape),
                }
            }
            let mut dims = vec![elems.len()];
            dims.extend(inner.unwrap_or_default().0);
            Ok(Shape(dims))
        }
        other => Err(TensorError::ArgumentType {
            function: "array",
            position: 0,
            expected: "a sequence of numbers",
            found: other.type_name(),
        }),
    }
}

impl TensorHost {
    fn call_builtin(&self, builtin: Builtin, args: &[Value]) -> TensorResult<Value> {
        let name = builtin.name();
        match builtin {
            Builtin::Tanh | Builtin::Exp | Builtin::Relu | Builtin::Sigmoid => {
                arity(name, "1 positional", args, args.len() == 1)?;
                match &args[0] {
                    Value::Tensor(shape) => Ok(Value::Tensor(shape.clone())),
                    other => {
                        let Some(x) = Number::of(other) else {
                            return Err(TensorError::ArgumentType {
                                function: name,
                                position: 0,
                                expected: "Tensor",
                                found: other.type_name(),
                            });
                        };
                        let x = x.as_f64();
                        Ok(Value::Float(match builtin {
                            Builtin::Tanh => x.tanh(),
                            Builtin::Exp => x.exp(),
                            Builtin::Relu => x.max(0.0),
                            _ => 1.0 / (1.0 + (-x).exp()),
                        }))
                    }
                }
            }
            Builtin::MatMul | Builtin::Dot => {
                arity(name, "2 positional", args, args.len() == 2)?;
                let left = expect_tensor(name, 0, &args[0])?;
                let right = expect_tensor(name, 1, &args[1])?;
                let shape = if builtin == Builtin::Dot {
                    ops::dot(left, right)?
                } else {
                    ops::matmul(left, right)?
                };
                Ok(Value::Tensor(shape))
            }
            Builtin::Transpose => {
                arity(name, "1 or 3 positional", args, matches!(args.len(), 1 | 3))?;
                let shape = expect_tensor(name, 0, &args[0])?;
                if let [_, first, second] = args {
                    let first = expect_int(name, 1, first)?;
                    let second = expect_int(name, 2, second)?;
                    return Ok(Value::Tensor(ops::swap_axes(shape, first, second)?));
                }
                Ok(Value::Tensor(ops::transpose(shape)))
            }
            Builtin::Zeros | Builtin::Ones => {
                arity(name, "at least 1 positional", args, !args.is_empty())?;
                let dims = sizes(name, args)?
                    .into_iter()
                    .enumerate()
                    .map(|(position, dim)| {
                        usize::try_from(dim).map_err(|_| TensorError::ArgumentType {
                            function: name,
                            position,
                            expected: "a non-negative size",
                            found: "int",
                        })
                    })
                    .collect::<TensorResult<Vec<_>>>()?;
                Ok(Value::Tensor(Shape(dims)))
            }
            Builtin::Concat => {
                arity(name, "1 or 2 positional", args, matches!(args.len(), 1 | 2))?;
                let Value::List(parts) = &args[0] else {
                    return Err(TensorError::ArgumentType {
                        function: name,
                        position: 0,
                        expected: "a list of tensors",
                        found: args[0].type_name(),
                    });
                };
                let shapes = parts
                    .iter()
                    .map(|part| expect_tensor(name, 0, part).cloned())
                    .collect::<TensorResult<Vec<_>>>()?;
                let axis = match args.get(1) {
                    Some(axis) => expect_int(name, 1, axis)?,
                    None => 0,
                };
                Ok(Value::Tensor(ops::concat(&shapes, axis)?))
            }
            Builtin::Array => {
                arity(name, "1 positional", args, args.len() == 1)?;
                Ok(Value::Tensor(infer_shape(&args[0], 0)?))
            }
        }
    }

    fn call_method(&self, receiver: &Shape, method: Method, args: &[Value]) -> TensorResult<Value> {
        let name = method.name();
        let shape = match method {
            Method::Reshape => {
                arity(name, "at least 1 positional", args, !args.is_empty())?;
                ops::reshape(receiver, &sizes(name, args)?)?
            }
            Method::Transpose => match args {
                [] => ops::transpose(receiver),
                [first, second] => ops::swap_axes(
                    receiver,
                    expect_int(name, 0, first)?,
                    expect_int(name, 1, second)?,
                )?,
                _ => {
                    return Err(TensorError::Arity {
                        function: name,
                        expected: "0 or 2 positional",
                        found: args.len(),
                    });
                }
            },
            Method::Sum => match args {
                [] => ops::reduce(receiver, None)?,
                [axis] => ops::reduce(receiver, Some(expect_int(name, 0, axis)?))?,
                _ => {
                    return Err(TensorError::Arity {
                        function: name,
                        expected: "0 or 1 positional",
                        found: args.len(),
                    });
                }
            },
        };
        Ok(Value::Tensor(shape))
    }

    fn selector(&self, index: &IndexValue<Value>) -> TensorResult<Selector> {
        let bound = |value: &Option<Value>, position: usize| match value {
            None | Some(Value::None) => Ok(None),
            Some(value) => expect_int("slice", position, value).map(Some),
        };
        Ok(match index {
            IndexValue::Value(Value::Int(value)) => Selector::Int(*value),
            IndexValue::Value(Value::Bool(value)) => Selector::Int(i64::from(*value)),
            IndexValue::Value(Value::None) => Selector::NewAxis,
            IndexValue::Value(Value::Tensor(shape)) => Selector::Array(shape.clone()),
            IndexValue::Value(list @ Value::List(_)) => Selector::Array(infer_shape(list, 0)?),
            IndexValue::Value(other) => {
                return Err(TensorError::ArgumentType {
                    function: "index",
                    position: 0,
                    expected: "an integer, slice, None, Ellipsis or integer tensor",
                    found: other.type_name(),
                });
            }
            IndexValue::Slice { start, stop, step } => Selector::Slice {
                start: bound(start, 0)?,
                stop: bound(stop, 1)?,
                step: bound(step, 2)?,
            },
            IndexValue::Full => Selector::Full,
            IndexValue::Ellipsis => Selector::Ellipsis,
        })
    }

    fn index_list(&self, elems: &[Value], indices: &[IndexValue<Value>]) -> TensorResult<Value> {
        let [index] = indices else {
            return Err(TensorError::ArgumentType {
                function: "list index",
                position: 0,
                expected: "an integer or slice",
                found: "tuple",
            });
        };
        match self.selector(index)? {
            Selector::Int(position) => {
                let len = elems.len() as i64;
                let position = if position < 0 { position + len } else { position };
                usize::try_from(position)
                    .ok()
                    .and_then(|position| elems.get(position))
                    .cloned()
                    .ok_or(TensorError::ListIndexOutOfRange)
            }
            Selector::Full => Ok(Value::List(elems.to_vec())),
            Selector::Slice { start, stop, step } => {
                let len = ops::slice_len(elems.len(), start, stop, step)?;
                let step = step.unwrap_or(1);
                let size = elems.len() as i64;
                let first = match start {
                    Some(start) if start < 0 => (start + size).max(if step > 0 { 0 } else { -1 }),
                    Some(start) => start.min(if step > 0 { size } else { size - 1 }),
                    None if step > 0 => 0,
                    None => size - 1,
                };
                Ok(Value::List(
                    (0..len as i64)
                        .map_while(|n| {
                            n.checked_mul(step)
                                .and_then(|offset| first.checked_add(offset))
                        })
                        .filter_map(|position| usize::try_from(position).ok())
                        .filter_map(|position| elems.get(position).cloned())
                        .collect(),
                ))
            }
            _ => Err(TensorError::ArgumentType {
                function: "list index",
                position: 0,
                expected: "an integer or slice",
                found: "NoneType",
            }),
        }
    }
}

impl Operations for TensorHost {
    type Value = Value;
    type Error = TensorError;

    fn literal(&self, literal: &Literal) -> TensorResult<Value> {
        Ok(match literal {
            Literal::Int { value, .. } => Value::Int(*value),
            Literal::Float { value, .. } => Value::Float(*value),
            Literal::Str { value, .. } => Value::Str(value.clone()),
            Literal::Bool(value) => Value::Bool(*value),
            Literal::None => Value::None,
        })
    }

    fn unary(&self, op: UnaryOperator, operand: &Value) -> TensorResult<Value> {
        match op {
            UnaryOperator::Not => Ok(Value::Bool(!truthy(operand)?)),
            UnaryOperator::Neg => match operand {
                Value::Tensor(shape) => Ok(Value::Tensor(shape.clone())),
                other => match Number::of(other) {
                    Some(Number::Int(value)) => Ok(int_or_float(value.checked_neg(), || {
                        -(value as f64)
                    })),
                    Some(Number::Float(value)) => Ok(Value::Float(-value)),
                    None => Err(TensorError::BadUnaryOperand {
                        op: "-",
                        operand: other.type_name(),
                    }),
                },
            },
        }
    }

    fn binary(&self, op: BinaryOperator, left: &Value, right: &Value) -> TensorResult<Value> {
        let unsupported = || TensorError::UnsupportedOperands {
            op: op.symbol(),
            left: left.type_name(),
            right: right.type_name(),
        };
        let tensor_operand =
            matches!(left, Value::Tensor(_)) || matches!(right, Value::Tensor(_));

        match op {
            BinaryOperator::And => {
                return Ok(if truthy(left)? { right.clone() } else { left.clone() });
            }
            BinaryOperator::Or => {
                return Ok(if truthy(left)? { left.clone() } else { right.clone() });
            }
            BinaryOperator::MatMul => {
                let (Value::Tensor(l), Value::Tensor(r)) = (left, right) else {
                    return Err(unsupported());
                };
                return Ok(Value::Tensor(ops::matmul(l, r)?));
            }
            _ => {}
        }

        if tensor_operand {
            let (Some(l), Some(r)) = (broadcast_shape(left), broadcast_shape(right)) else {
                return Err(unsupported());
            };
            return Ok(Value::Tensor(ops::broadcast(&l, &r)?));
        }

        match op {
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtE
            | BinaryOperator::Gt
            | BinaryOperator::GtE => compare(op, left, right)
                .map(Value::Bool)
                .ok_or_else(unsupported),
            _ => match (left, right) {
                (Value::Str(l), Value::Str(r)) if op == BinaryOperator::Add => {
                    Ok(Value::Str(format!("{l}{r}")))
                }
                (Value::List(l), Value::List(r)) if op == BinaryOperator::Add => {
                    Ok(Value::List(l.iter().chain(r).cloned().collect()))
                }
                _ => match (Number::of(left), Number::of(right)) {
                    (Some(l), Some(r)) => arithmetic(op, l, r)?.ok_or_else(unsupported),
                    _ => Err(unsupported()),
                },
            },
        }
    }

    fn member(&self, object: &Value, name: &str) -> TensorResult<Value> {
        let missing = || TensorError::NoAttribute {
            type_name: object.type_name(),
            attribute: name.to_string(),
        };
        match object {
            Value::Tensor(shape) => match name {
                "T" => Ok(Value::Tensor(ops::transpose(shape))),
                "shape" => Ok(Value::List(
                    shape
                        .dims()
                        .iter()
                        .map(|dim| Value::Int(*dim as i64))
                        .collect(),
                )),
                "ndim" => Ok(Value::Int(shape.rank() as i64)),
                _ => Method::lookup(name)
                    .map(|method| Value::Method {
                        receiver: shape.clone(),
                        method,
                    })
                    .ok_or_else(missing),
            },
            Value::Module(library) => library
                .function(name)
                .map(Value::Function)
                .ok_or_else(missing),
            Value::Object(attributes) => attributes.get(name).cloned().ok_or_else(missing),
            _ => Err(missing()),
        }
    }

    fn call(&self, callee: &Value, args: &[Value]) -> TensorResult<Value> {
        match callee {
            Value::Function(builtin) => self.call_builtin(*builtin, args),
            Value::Method { receiver, method } => self.call_method(receiver, *method, args),
            other => Err(TensorError::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }

    fn index(&self, array: &Value, indices: &[IndexValue<Value>]) -> TensorResult<Value> {
        match array {
            Value::Tensor(shape) => {
                let selectors = indices
                    .iter()
                    .map(|index| self.selector(index))
                    .collect::<TensorResult<Vec<_>>>()?;
                Ok(Value::Tensor(ops::index(shape, &selectors)?))
            }
            Value::List(elems) => self.index_list(elems, indices),
            other => Err(TensorError::NotSubscriptable {
                type_name: other.type_name(),
            }),
        }
    }

    fn list(&self, elems: Vec<Value>) -> TensorResult<Value> {
        Ok(Value::List(elems))
    }
}

impl FailureClassifier<TensorError> for TensorHost {
    fn is_shape_failure(&self, error: &TensorError) -> bool {
        error.is_shape_mismatch()
    }
}

impl ShapeAccessor<Value> for TensorHost {
    fn shape(&self, value: &Value) -> Option<Shape> {
        match value {
            Value::Tensor(shape) => Some(shape.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalError, evaluate};
    use crate::parser::parse;

    fn run(line: &str, bindings: &[(&str, Value)]) -> Result<Value, String> {
        let node = parse(line)
            .expect("parse should succeed")
            .expect("line should hold an expression");
        let mut env = TensorHost::prelude();
        for (name, value) in bindings {
            env.insert(name.to_string(), value.clone());
        }
        let host = TensorHost::new();
        evaluate(&node, &env, &host, &host).map_err(|err| match err {
            EvalError::Trap(trap) => format!("trap at `{}`: {}", trap.node, trap.cause),
            other => other.to_string(),
        })
    }

    #[test]
    fn plain_numbers_are_computed() {
        assert_eq!(run("1 + 2 * 3", &[]), Ok(Value::Int(7)));
        assert_eq!(run("7 // 2", &[]), Ok(Value::Int(3)));
        assert_eq!(run("-7 // 2", &[]), Ok(Value::Int(-4)));
        assert_eq!(run("-7 % 3", &[]), Ok(Value::Int(2)));
        assert_eq!(run("7 % -3", &[]), Ok(Value::Int(-2)));
        assert_eq!(run("2 ** 10", &[]), Ok(Value::Int(1024)));
        assert_eq!(run("1 / 4", &[]), Ok(Value::Float(0.25)));
        assert_eq!(run("3 < 4.5", &[]), Ok(Value::Bool(true)));
        assert_eq!(run("0 or 5", &[]), Ok(Value::Int(5)));
        assert_eq!(run("not 0", &[]), Ok(Value::Bool(true)));
    }

    #[test]
    fn division_by_zero_is_not_a_shape_failure() {
        assert_eq!(run("1 / 0", &[]), Err("division by zero".to_string()));
    }

    #[test]
    fn elementwise_ops_broadcast() {
        let bindings = [("x", Value::tensor([4, 3])), ("b", Value::tensor([3]))];
        assert_eq!(run("x + b", &bindings), Ok(Value::tensor([4, 3])));
        assert_eq!(run("x * 2 - 1", &bindings), Ok(Value::tensor([4, 3])));
        assert_eq!(run("x > 0", &bindings), Ok(Value::tensor([4, 3])));
        assert_eq!(
            run("x + b[:2]", &bindings),
            Err(
                "trap at `x + b[:2]`: operands could not be broadcast together with shapes (4, 3) (2,)"
                    .to_string()
            )
        );
    }

    #[test]
    fn matmul_and_library_functions() {
        let bindings = [
            ("x", Value::tensor([8, 3])),
            ("w", Value::tensor([3, 5])),
            ("v", Value::tensor([4])),
        ];
        assert_eq!(run("x @ w", &bindings), Ok(Value::tensor([8, 5])));
        assert_eq!(run("np.tanh(x @ w)", &bindings), Ok(Value::tensor([8, 5])));
        assert_eq!(run("torch.relu(x).T", &bindings), Ok(Value::tensor([3, 8])));
        assert_eq!(run("np.dot(x, w).shape", &bindings), Ok(Value::List(vec![Value::Int(8), Value::Int(5)])));
        assert_eq!(
            run("np.tanh(x @ w) @ v", &bindings),
            Err(
                "trap at `np.tanh(x @ w) @ v`: matmul: Input operand 1 has a mismatch in its core dimension 0 (size 4 is different from 5)"
                    .to_string()
            )
        );
    }

    #[test]
    fn methods_bind_their_receiver() {
        let bindings = [("x", Value::tensor([2, 6]))];
        assert_eq!(run("x.reshape(3, -1)", &bindings), Ok(Value::tensor([3, 4])));
        assert_eq!(run("x.view([12])", &bindings), Ok(Value::tensor([12])));
        assert_eq!(run("x.transpose()", &bindings), Ok(Value::tensor([6, 2])));
        assert_eq!(run("x.sum(1)", &bindings), Ok(Value::tensor([2])));
        assert_eq!(run("x.ndim", &bindings), Ok(Value::Int(2)));
        assert!(
            run("x.reshape(5, 5)", &bindings)
                .expect_err("expected reshape failure")
                .starts_with("trap at `x.reshape(5, 5)`")
        );
    }

    #[test]
    fn concatenation_and_array_construction() {
        let bindings = [("a", Value::tensor([2, 3])), ("b", Value::tensor([4, 3]))];
        assert_eq!(run("torch.cat([a, b])", &bindings), Ok(Value::tensor([6, 3])));
        assert_eq!(run("np.concatenate([a, b], 0)", &bindings), Ok(Value::tensor([6, 3])));
        assert!(
            run("torch.cat([a, b], 1)", &bindings)
                .expect_err("expected concat failure")
                .starts_with("trap at `torch.cat([a, b], 1)`")
        );
        assert_eq!(run("np.array([[1, 2, 3], [4, 5, 6]])", &[]), Ok(Value::tensor([2, 3])));
        assert!(
            run("np.array([[1, 2], [3]])", &[])
                .expect_err("expected ragged failure")
                .contains("inhomogeneous shape")
        );
        assert_eq!(run("np.zeros((3))", &[]), Ok(Value::tensor([3])));
        assert_eq!(run("torch.ones([2, 2])", &[]), Ok(Value::tensor([2, 2])));
    }

    #[test]
    fn indexing_tensors_and_lists() {
        let bindings = [("x", Value::tensor([4, 5, 6])), ("n", Value::Int(4))];
        assert_eq!(run("x[0]", &bindings), Ok(Value::tensor([5, 6])));
        assert_eq!(run("x[:, 1:3]", &bindings), Ok(Value::tensor([4, 2, 6])));
        assert_eq!(run("x[..., n - 1]", &bindings), Ok(Value::tensor([4, 5])));
        assert_eq!(run("x[None]", &bindings), Ok(Value::tensor([1, 4, 5, 6])));
        assert_eq!(run("x.shape[-1]", &bindings), Ok(Value::Int(6)));
        assert_eq!(
            run("x.shape[1:]", &bindings),
            Ok(Value::List(vec![Value::Int(5), Value::Int(6)]))
        );
        assert_eq!(
            run("x[0, 0, 0, 0]", &bindings),
            Err(
                "trap at `x[0, 0, 0, 0]`: too many indices for tensor: tensor is 3-dimensional, but 4 were indexed"
                    .to_string()
            )
        );
        assert_eq!(
            run("x[n]", &bindings),
            Err("index 4 is out of bounds for axis 0 with size 4".to_string())
        );
    }

    #[test]
    fn huge_steps_and_sizes_do_not_overflow() {
        let bindings = [
            ("x", Value::tensor([4, 6])),
            ("big", Value::tensor([1usize << 32, 1 << 32])),
        ];
        assert_eq!(run("x[::9223372036854775807]", &bindings), Ok(Value::tensor([1, 6])));
        assert_eq!(
            run("x.shape[::9223372036854775807]", &bindings),
            Ok(Value::List(vec![Value::Int(4)]))
        );
        assert_eq!(
            run("x.shape[::-9223372036854775807]", &bindings),
            Ok(Value::List(vec![Value::Int(6)]))
        );
        assert!(
            run("x.reshape(4294967296, 4294967296, -1)", &bindings)
                .expect_err("expected reshape failure")
                .starts_with("trap at `x.reshape(4294967296, 4294967296, -1)`")
        );
        assert_eq!(
            run("not big", &bindings),
            Err("The truth value of a tensor with more than one element is ambiguous".to_string())
        );
    }

    #[test]
    fn attribute_and_call_failures_are_host_errors() {
        let bindings = [("x", Value::tensor([2]))];
        assert_eq!(
            run("x.weight", &bindings),
            Err("'Tensor' object has no attribute 'weight'".to_string())
        );
        assert_eq!(
            run("np.softmax(x)", &bindings),
            Err("'module' object has no attribute 'softmax'".to_string())
        );
        assert_eq!(
            run("x(1)", &bindings),
            Err("'Tensor' object is not callable".to_string())
        );
    }

    #[test]
    fn objects_expose_their_attributes() {
        let mut attributes = FxHashMap::default();
        attributes.insert("weight".to_string(), Value::tensor([10, 20]));
        let bindings = [
            ("self", Value::Object(attributes)),
            ("h", Value::tensor([4, 10])),
        ];
        assert_eq!(run("h @ self.weight", &bindings), Ok(Value::tensor([4, 20])));
    }

    #[test]
    fn exposes_tensor_shapes_only() {
        let host = TensorHost::new();
        assert_eq!(host.shape(&Value::tensor([3, 1])), Some(Shape::new([3, 1])));
        assert_eq!(host.shape(&Value::Int(3)), None);
        assert_eq!(host.shape(&Value::List(vec![Value::tensor([3])])), None);
    }
}
