#[macro_use]
mod model;
pub use model::*;

mod lexer;
pub use lexer::Lexer;

mod greeter;
pub use greeter::hello;

mod literal;
pub use literal::{safe_eval_literal, LiteralParser};

mod expression;
pub use expression::*;

mod parser;
pub use parser::{parse_expression, Parser};

mod ops;

mod builtins;
pub use builtins::Builtin;

mod environment;
pub use environment::Environment;

mod interpreter;
pub use interpreter::{insecure_eval, Interpreter};

/// Nesting limit applied by both parsers unless overridden.
pub const DEFAULT_MAX_DEPTH: usize = 100;
