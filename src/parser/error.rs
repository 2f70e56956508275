use thiserror::Error;

use crate::lexer::LexError;

/// Failure to turn a line into a tree. Parsing is all-or-nothing, so no
/// partial tree ever accompanies one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(
        "Syntax error at position {position}: expected {}, found {found}",
        .expected.join(" or ")
    )]
    Syntax {
        position: usize,
        expected: Vec<&'static str>,
        found: String,
    },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::Lex(error) => error.position(),
            ParseError::Syntax { position, .. } => *position,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
