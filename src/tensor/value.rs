use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::host::Shape;

/// A value of the reference host. Tensors carry only their shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    None,
    Tensor(Shape),
    List(Vec<Value>),
    Module(Library),
    /// Attribute bag, e.g. a `self` with tensor fields.
    Object(FxHashMap<String, Value>),
    Function(Builtin),
    Method { receiver: Shape, method: Method },
}

impl Value {
    pub fn tensor(dims: impl Into<Vec<usize>>) -> Self {
        Value::Tensor(Shape::new(dims))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::None => "NoneType",
            Value::Tensor(_) => "Tensor",
            Value::List(_) => "list",
            Value::Module(_) => "module",
            Value::Object(_) => "object",
            Value::Function(_) => "builtin_function",
            Value::Method { .. } => "method",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Str(value) => write!(f, "'{value}'"),
            Value::None => f.write_str("None"),
            Value::Tensor(shape) => write!(f, "tensor of shape {shape}"),
            Value::List(elems) => {
                f.write_str("[")?;
                for (position, elem) in elems.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                f.write_str("]")
            }
            Value::Module(library) => write!(f, "<module '{}'>", library.name()),
            Value::Object(_) => f.write_str("<object>"),
            Value::Function(builtin) => write!(f, "<built-in function {}>", builtin.name()),
            Value::Method { method, .. } => write!(f, "<built-in method {}>", method.name()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot read `{text}` as a value")]
pub struct ValueParseError {
    pub text: String,
}

/// Reads a binding as given on the command line: a tuple of sizes is a
/// tensor of that shape, otherwise an int, float, bool or `None`.
impl FromStr for Value {
    type Err = ValueParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let invalid = || ValueParseError {
            text: text.to_string(),
        };

        if let Some(inner) = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let dims = inner
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<usize>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Value::Tensor(Shape(dims)));
        }

        match trimmed {
            "True" => return Ok(Value::Bool(true)),
            "False" => return Ok(Value::Bool(false)),
            "None" => return Ok(Value::None),
            _ => {}
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Ok(Value::Int(value));
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Ok(Value::Float(value));
        }
        Err(invalid())
    }
}

/// Array libraries reachable from the prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Library {
    NumPy,
    Torch,
}

impl Library {
    pub fn name(self) -> &'static str {
        match self {
            Library::NumPy => "numpy",
            Library::Torch => "torch",
        }
    }

    pub fn function(self, name: &str) -> Option<Builtin> {
        let builtin = match (self, name) {
            (_, "tanh") => Builtin::Tanh,
            (_, "exp") => Builtin::Exp,
            (_, "matmul") => Builtin::MatMul,
            (_, "dot") => Builtin::Dot,
            (_, "transpose") => Builtin::Transpose,
            (_, "zeros") => Builtin::Zeros,
            (_, "ones") => Builtin::Ones,
            (Library::NumPy, "concatenate") | (Library::Torch, "cat") => Builtin::Concat,
            (Library::NumPy, "array") | (Library::Torch, "tensor") => Builtin::Array,
            (Library::Torch, "relu") => Builtin::Relu,
            (Library::Torch, "sigmoid") => Builtin::Sigmoid,
            (Library::Torch, "mm") => Builtin::MatMul,
            _ => return None,
        };
        Some(builtin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Tanh,
    Exp,
    Relu,
    Sigmoid,
    MatMul,
    Dot,
    Transpose,
    Zeros,
    Ones,
    Concat,
    Array,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Tanh => "tanh",
            Builtin::Exp => "exp",
            Builtin::Relu => "relu",
            Builtin::Sigmoid => "sigmoid",
            Builtin::MatMul => "matmul",
            Builtin::Dot => "dot",
            Builtin::Transpose => "transpose",
            Builtin::Zeros => "zeros",
            Builtin::Ones => "ones",
            Builtin::Concat => "cat",
            Builtin::Array => "array",
        }
    }
}

/// Tensor methods, bound to their receiver's shape by member lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Reshape,
    Transpose,
    Sum,
}

impl Method {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "reshape" | "view" => Some(Method::Reshape),
            "transpose" => Some(Method::Transpose),
            "sum" => Some(Method::Sum),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Reshape => "reshape",
            Method::Transpose => "transpose",
            Method::Sum => "sum",
        }
    }
}
