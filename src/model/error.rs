use thiserror::Error;

use super::{ToLocated, Token};

macro_rules! located_error {
    ($arg:expr, $loc:expr) => {
        Err($arg.with_locate($loc))
    };
}

#[derive(PartialEq, Debug, Clone, Error)]
pub enum LexerError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unrecognized character {0:?}")]
    UnrecognizedCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("integer literal '{0}' does not fit in 64 bits")]
    IntegerOverflow(String),
}

impl ToLocated for LexerError {}

/// Failure to read an expression for the interpreter.
#[derive(PartialEq, Debug, Clone, Error)]
pub enum ParseError {
    #[error(transparent)]
    LexerError(#[from] LexerError),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected {0}")]
    UnexpectedToken(Token),
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

impl ToLocated for ParseError {}

/// Rejection by the literal-only evaluator.
#[derive(PartialEq, Debug, Clone, Error)]
pub enum LiteralError {
    #[error(transparent)]
    LexerError(#[from] LexerError),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("malformed node or string: {0} is not a literal")]
    Malformed(Token),
    #[error("unhashable type: '{0}'")]
    Unhashable(&'static str),
    #[error("literal nested deeper than {0} levels")]
    TooDeep(usize),
}

impl ToLocated for LiteralError {}

#[derive(PartialEq, Debug, Clone, Error)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),
    #[error("name '{0}' is not defined")]
    Name(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("value error: {0}")]
    Value(String),
    #[error("division by zero")]
    ZeroDivision,
    #[error("result of '{0}' is too large")]
    Overflow(&'static str),
    #[error("{0} index out of range")]
    Index(&'static str),
    #[error("key error: {0}")]
    Key(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl ToLocated for EvalError {}

impl EvalError {
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    pub fn value_error(msg: impl Into<String>) -> Self {
        Self::Value(msg.into())
    }
}
