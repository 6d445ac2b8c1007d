use super::{
    ops, parser::Parser, Environment, EvalError, Expression, Lexer, Located, Node, ToLocated, Value,
    DEFAULT_MAX_DEPTH,
};

use tracing::{debug, warn};

type Result<T> = std::result::Result<T, Located<EvalError>>;

/// Evaluates `user_input` as an arbitrary expression with every builtin in
/// scope, including the ones that touch the environment and the filesystem.
/// Nothing is validated: this is the unsafe counterpart of
/// [`safe_eval_literal`](crate::safe_eval_literal).
pub fn insecure_eval(user_input: &str) -> Result<Value> {
    Interpreter::new().eval_str(user_input)
}

pub struct Interpreter {
    environment: Environment,
    max_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            environment: Environment::with_builtins(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.environment.define(name, value);
    }

    pub fn eval_str(&self, text: &str) -> Result<Value> {
        warn!(input = text, "evaluating untrusted input as an expression");
        let node = Parser::from(Lexer::new(text.chars()))
            .with_max_depth(self.max_depth)
            .parse()
            .map_err(|e| e.map(EvalError::Syntax))?;
        let result = self.eval(&node);
        if let Err(e) = &result {
            debug!(error = %e, "evaluation failed");
        }
        result
    }

    pub fn eval(&self, node: &Node) -> Result<Value> {
        let location = node.location;
        let located = |e: EvalError| e.with_location(location);

        match &node.data {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::Name(name) => self.environment
                .lookup(name)
                .cloned()
                .ok_or_else(|| located(EvalError::Name(name.clone()))),

            Expression::List(items) => Ok(Value::List(self.eval_all(items)?)),
            Expression::Tuple(items) => Ok(Value::Tuple(self.eval_all(items)?)),
            Expression::Set(items) => {
                let mut members = Vec::with_capacity(items.len());
                for item in items {
                    members.push(self.eval_key(item)?);
                }
                Ok(Value::set_from(members))
            },
            Expression::Dict(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    entries.push((self.eval_key(key)?, self.eval(value)?));
                }
                Ok(Value::dict_from(entries))
            },

            Expression::Unary(op, operand) => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand).map_err(located)
            },
            Expression::Binary(left, op, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right).map_err(located)
            },
            // a < b < c is a < b and b < c, each operand evaluated once
            Expression::Compare(first, rest) => {
                let mut left = self.eval(first)?;
                for (op, node) in rest {
                    let right = self.eval(node)?;
                    if !ops::compare(*op, &left, &right).map_err(located)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            },
            Expression::And(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() { self.eval(right) } else { Ok(left) }
            },
            Expression::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() { Ok(left) } else { self.eval(right) }
            },
            Expression::Conditional { test, body, orelse } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            },

            Expression::Call(callee, args) => {
                let function = self.eval(callee)?;
                let args = self.eval_all(args)?;
                match function {
                    Value::Function(builtin) => builtin.call(args).map_err(located),
                    other => Err(located(EvalError::type_error(format!(
                        "'{}' object is not callable",
                        other.type_name()
                    )))),
                }
            },
            Expression::Subscript(container, index) => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                ops::subscript(&container, &index).map_err(located)
            },
        }
    }

    fn eval_all(&self, nodes: &[Node]) -> Result<Vec<Value>> {
        nodes.iter().map(|node| self.eval(node)).collect()
    }

    fn eval_key(&self, node: &Node) -> Result<Value> {
        let key = self.eval(node)?;
        ops::require_hashable(&key).map_err(|e| e.with_location(node.location))?;
        Ok(key)
    }
}

#[cfg(test)]
fn eval(text: &str) -> std::result::Result<Value, EvalError> {
    insecure_eval(text).map_err(|e| e.extract())
}

#[test]
fn arithmetic() {
    let tests = vec![
        ("1 + 1", Value::Int(2)),
        ("2 + 3 * 4", Value::Int(14)),
        ("(2 + 3) * 4", Value::Int(20)),
        ("7 / 2", Value::Float(3.5)),
        ("7 // 2", Value::Int(3)),
        ("-7 % 3", Value::Int(2)),
        ("2 ** 10", Value::Int(1024)),
        ("-2 ** 2", Value::Int(-4)),
        ("1 + 2.5", Value::Float(3.5)),
        ("True + True", Value::Int(2)),
        ("'ab' * 2 + 'c'", Value::Str("ababc".to_string())),
        ("[1] + [2]", Value::List(vec![Value::Int(1), Value::Int(2)])),
    ];

    for (text, expected) in tests {
        assert_eq!(eval(text), Ok(expected), "{}", text);
    }
}

#[test]
fn logic_and_comparison() {
    let tests = vec![
        ("1 < 2 < 3", Value::Bool(true)),
        ("1 < 3 < 2", Value::Bool(false)),
        ("1 == 1.0", Value::Bool(true)),
        ("2 in [1, 2]", Value::Bool(true)),
        ("'x' not in 'abc'", Value::Bool(true)),
        ("None is None", Value::Bool(true)),
        ("1 is not None", Value::Bool(true)),
        ("not 0", Value::Bool(true)),
        ("0 or 'fallback'", Value::Str("fallback".to_string())),
        ("[] and 1", Value::List(vec![])),
        ("'yes' if 1 > 0 else 'no'", Value::Str("yes".to_string())),
        // short-circuit skips the failing call
        ("True or undefined()", Value::Bool(true)),
    ];

    for (text, expected) in tests {
        assert_eq!(eval(text), Ok(expected), "{}", text);
    }
}

#[test]
fn calls_and_subscripts() {
    let tests = vec![
        ("len([1, 2, 3])", Value::Int(3)),
        ("max(1, 5, 3)", Value::Int(5)),
        ("sum(range(5))", Value::Int(10)),
        ("{'a': [10, 20]}['a'][-1]", Value::Int(20)),
        ("'abc'[1]", Value::Str("b".to_string())),
        ("str(1 + 1) + '!'", Value::Str("2!".to_string())),
        ("hello('World')", Value::Str("Hello, World!".to_string())),
        ("{1, 1, 2}", Value::Set(vec![Value::Int(1), Value::Int(2)])),
        ("(1, 2)", Value::Tuple(vec![Value::Int(1), Value::Int(2)])),
        ("1, 2", Value::Tuple(vec![Value::Int(1), Value::Int(2)])),
        ("len", Value::Function(crate::Builtin::Len)),
    ];

    for (text, expected) in tests {
        assert_eq!(eval(text), Ok(expected), "{}", text);
    }
}

#[test]
fn errors() {
    assert_eq!(eval("undefined"), Err(EvalError::Name("undefined".to_string())));
    assert_eq!(eval("1 / 0"), Err(EvalError::ZeroDivision));
    assert_eq!(eval("[1][5]"), Err(EvalError::Index("list")));
    assert_eq!(eval("{}['k']"), Err(EvalError::Key("'k'".to_string())));
    assert_eq!(eval("9223372036854775807 + 1"), Err(EvalError::Overflow("+")));
    assert_eq!(eval("1()"), Err(EvalError::type_error("'int' object is not callable")));
    assert_eq!(eval("{[1]: 2}"), Err(EvalError::type_error("unhashable type: 'list'")));
    assert!(matches!(eval("1 +"), Err(EvalError::Syntax(_))));
    assert!(matches!(eval("int('x')"), Err(EvalError::Value(_))));
}

#[test]
fn oversized_values_fail_cleanly() {
    assert_eq!(eval("'ab' * 9223372036854775807"), Err(EvalError::Overflow("*")));
    assert_eq!(eval("[0] * 10 ** 15"), Err(EvalError::Overflow("*")));
    assert_eq!(eval("len(range(10 ** 18))"), Err(EvalError::Overflow("range")));
    assert_eq!(eval("10.0 ** 400"), Err(EvalError::Overflow("**")));
    assert_eq!(eval("-9223372036854775808"), Ok(Value::Int(i64::MIN)));
    assert_eq!(eval("-9223372036854775808 // -1"), Err(EvalError::Overflow("//")));
}

#[test]
fn error_location() {
    let error = insecure_eval("1 +\n  nope").unwrap_err();
    assert_eq!(error.location, Some(crate::Location{row: 1, col: 2}));
    assert_eq!(error.to_string(), "name 'nope' is not defined at line 2, column 3");
}

#[test]
fn bound_names() {
    let mut interpreter = Interpreter::new();
    interpreter.bind("x", Value::Int(20));
    interpreter.bind("len", Value::Int(0));

    assert_eq!(interpreter.eval_str("x * 2 + 2"), Ok(Value::Int(42)));
    assert_eq!(
        interpreter.eval_str("len([])").map_err(|e| e.extract()),
        Err(EvalError::type_error("'int' object is not callable"))
    );
}
