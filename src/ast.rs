//! Syntax tree for a single line of tensor code.
//!
//! The parser builds these nodes once; the evaluator only ever borrows them,
//! so a tree can be re-evaluated against as many environments as needed.
//! `Display` renders the source form, `Node::repr` the fully named debug form.

use std::fmt::{self, Display, Formatter};

use crate::lexer::TokenKind;

#[derive(Debug, PartialEq, Clone)]
pub enum Node {
    Atom(Atom),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Node>,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Assign {
        op: AssignOperator,
        target: Box<Node>,
        value: Box<Node>,
    },
    Member {
        object: Box<Node>,
        member: String,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Index {
        array: Box<Node>,
        indices: Vec<IndexItem>,
    },
    ListLiteral {
        elems: Vec<Node>,
    },
    SubExpr {
        inner: Box<Node>,
    },
}

#[derive(Debug, PartialEq, Clone)]
pub enum Atom {
    Name(String),
    Literal(Literal),
}

/// Literal values keep their source text so rendering stays exact.
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Int { text: String, value: i64 },
    Float { text: String, value: f64 },
    Str { text: String, value: String },
    Bool(bool),
    None,
}

#[derive(Debug, PartialEq, Clone)]
pub enum IndexItem {
    Expr(Node),
    Slice(Slice),
    /// A bare `:` selecting a whole axis.
    Full,
    Ellipsis,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Slice {
    pub start: Option<Box<Node>>,
    pub stop: Option<Box<Node>>,
    pub step: Option<Box<Node>>,
    /// Whether the second `:` was written, as in `a[::2]` or `a[1::]`.
    pub stepped: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Neg,
    Not,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    MatMul,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AssignOperator {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    MatMul,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "not",
        }
    }

    pub fn token_kind(self) -> TokenKind {
        match self {
            UnaryOperator::Neg => TokenKind::Minus,
            UnaryOperator::Not => TokenKind::Not,
        }
    }
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::FloorDiv => "//",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "**",
            BinaryOperator::MatMul => "@",
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtE => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtE => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }

    pub fn token_kind(self) -> TokenKind {
        match self {
            BinaryOperator::Add => TokenKind::Plus,
            BinaryOperator::Sub => TokenKind::Minus,
            BinaryOperator::Mul => TokenKind::Star,
            BinaryOperator::Div => TokenKind::Slash,
            BinaryOperator::FloorDiv => TokenKind::DoubleSlash,
            BinaryOperator::Mod => TokenKind::Percent,
            BinaryOperator::Pow => TokenKind::DoubleStar,
            BinaryOperator::MatMul => TokenKind::At,
            BinaryOperator::Eq => TokenKind::EqEqual,
            BinaryOperator::NotEq => TokenKind::NotEqual,
            BinaryOperator::Lt => TokenKind::Less,
            BinaryOperator::LtE => TokenKind::LessEqual,
            BinaryOperator::Gt => TokenKind::Greater,
            BinaryOperator::GtE => TokenKind::GreaterEqual,
            BinaryOperator::And => TokenKind::And,
            BinaryOperator::Or => TokenKind::Or,
        }
    }
}

impl AssignOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOperator::Assign => "=",
            AssignOperator::Add => "+=",
            AssignOperator::Sub => "-=",
            AssignOperator::Mul => "*=",
            AssignOperator::Div => "/=",
            AssignOperator::Pow => "**=",
            AssignOperator::MatMul => "@=",
        }
    }

    pub fn token_kind(self) -> TokenKind {
        match self {
            AssignOperator::Assign => TokenKind::Equal,
            AssignOperator::Add => TokenKind::PlusEqual,
            AssignOperator::Sub => TokenKind::MinusEqual,
            AssignOperator::Mul => TokenKind::StarEqual,
            AssignOperator::Div => TokenKind::SlashEqual,
            AssignOperator::Pow => TokenKind::DoubleStarEqual,
            AssignOperator::MatMul => TokenKind::AtEqual,
        }
    }
}

impl Node {
    pub fn name(name: impl Into<String>) -> Self {
        Node::Atom(Atom::Name(name.into()))
    }

    /// Debug rendering that names every field, e.g.
    /// `BinaryOp(op=<PLUS:+>, lhs=a, rhs=b)`.
    pub fn repr(&self) -> Repr<'_> {
        Repr(self)
    }
}

impl Literal {
    pub fn text(&self) -> &str {
        match self {
            Literal::Int { text, .. } | Literal::Float { text, .. } | Literal::Str { text, .. } => {
                text
            }
            Literal::Bool(true) => "True",
            Literal::Bool(false) => "False",
            Literal::None => "None",
        }
    }
}

fn write_separated<T>(
    f: &mut Formatter<'_>,
    items: &[T],
    mut write_item: impl FnMut(&mut Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (position, item) in items.iter().enumerate() {
        if position > 0 {
            f.write_str(", ")?;
        }
        write_item(f, item)?;
    }
    Ok(())
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Name(name) => f.write_str(name),
            Atom::Literal(literal) => f.write_str(literal.text()),
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Node::Atom(atom) => write!(f, "{atom}"),
            Node::UnaryOp { op, operand } => match op {
                UnaryOperator::Neg => write!(f, "-{operand}"),
                UnaryOperator::Not => write!(f, "not {operand}"),
            },
            Node::BinaryOp { op, left, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
            Node::Assign { op, target, value } => {
                write!(f, "{target} {} {value}", op.symbol())
            }
            Node::Member { object, member } => write!(f, "{object}.{member}"),
            Node::Call { callee, args } => {
                write!(f, "{callee}(")?;
                write_separated(f, args, |f, arg| write!(f, "{arg}"))?;
                f.write_str(")")
            }
            Node::Index { array, indices } => {
                write!(f, "{array}[")?;
                write_separated(f, indices, |f, item| write!(f, "{item}"))?;
                f.write_str("]")
            }
            Node::ListLiteral { elems } => {
                f.write_str("[")?;
                write_separated(f, elems, |f, elem| write!(f, "{elem}"))?;
                f.write_str("]")
            }
            Node::SubExpr { inner } => write!(f, "({inner})"),
        }
    }
}

impl Display for IndexItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IndexItem::Expr(node) => write!(f, "{node}"),
            IndexItem::Slice(slice) => write!(f, "{slice}"),
            IndexItem::Full => f.write_str(":"),
            IndexItem::Ellipsis => f.write_str("..."),
        }
    }
}

impl Slice {
    fn write_with(
        &self,
        f: &mut Formatter<'_>,
        bound: impl Fn(&mut Formatter<'_>, &Node) -> fmt::Result,
    ) -> fmt::Result {
        if let Some(start) = &self.start {
            bound(f, start)?;
        }
        f.write_str(":")?;
        if let Some(stop) = &self.stop {
            bound(f, stop)?;
        }
        if self.stepped {
            f.write_str(":")?;
            if let Some(step) = &self.step {
                bound(f, step)?;
            }
        }
        Ok(())
    }
}

impl Display for Slice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write_with(f, |f, node| write!(f, "{node}"))
    }
}

/// Debug form of a [`Node`]; see [`Node::repr`].
pub struct Repr<'a>(&'a Node);

impl Display for Repr<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Node::Atom(atom) => write!(f, "{atom}"),
            Node::UnaryOp { op, operand } => write!(
                f,
                "UnaryOp(op=<{}:{}>, opnd={})",
                op.token_kind().name(),
                op.symbol(),
                operand.repr()
            ),
            Node::BinaryOp { op, left, right } => write!(
                f,
                "BinaryOp(op=<{}:{}>, lhs={}, rhs={})",
                op.token_kind().name(),
                op.symbol(),
                left.repr(),
                right.repr()
            ),
            Node::Assign { op, target, value } => write!(
                f,
                "Assign(op=<{}:{}>, lhs={}, rhs={})",
                op.token_kind().name(),
                op.symbol(),
                target.repr(),
                value.repr()
            ),
            Node::Member { object, member } => {
                write!(f, "Member(op=<DOT:.>, obj={}, member={member})", object.repr())
            }
            Node::Call { callee, args } => {
                write!(f, "Call(func={}, args=[", callee.repr())?;
                write_separated(f, args, |f, arg| write!(f, "{}", arg.repr()))?;
                f.write_str("])")
            }
            Node::Index { array, indices } => {
                write!(f, "Index(arr={}, index=[", array.repr())?;
                write_separated(f, indices, |f, item| match item {
                    IndexItem::Expr(node) => write!(f, "{}", node.repr()),
                    IndexItem::Slice(slice) => {
                        slice.write_with(f, |f, node| write!(f, "{}", node.repr()))
                    }
                    other => write!(f, "{other}"),
                })?;
                f.write_str("])")
            }
            Node::ListLiteral { elems } => {
                f.write_str("ListLiteral(elems=[")?;
                write_separated(f, elems, |f, elem| write!(f, "{}", elem.repr()))?;
                f.write_str("])")
            }
            Node::SubExpr { inner } => write!(f, "SubExpr(e={})", inner.repr()),
        }
    }
}
