use std::cmp::Ordering;

use tracing::debug;

use super::{ops, hello, BinaryOp, CompareOp, EvalError, Number, Value};

type Result<T> = std::result::Result<T, EvalError>;

/// Functions reachable by name from evaluated expressions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Builtin {
    Abs,
    Bool,
    Float,
    Int,
    Len,
    List,
    Max,
    Min,
    Print,
    Range,
    Repr,
    Set,
    Str,
    Sum,
    Tuple,

    // side effects reach outside the interpreter
    Hello,
    Getenv,
    ReadFile,
}

impl Builtin {
    pub const ALL: [Builtin; 18] = [
        Builtin::Abs,
        Builtin::Bool,
        Builtin::Float,
        Builtin::Int,
        Builtin::Len,
        Builtin::List,
        Builtin::Max,
        Builtin::Min,
        Builtin::Print,
        Builtin::Range,
        Builtin::Repr,
        Builtin::Set,
        Builtin::Str,
        Builtin::Sum,
        Builtin::Tuple,
        Builtin::Hello,
        Builtin::Getenv,
        Builtin::ReadFile,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Abs      => "abs",
            Builtin::Bool     => "bool",
            Builtin::Float    => "float",
            Builtin::Int      => "int",
            Builtin::Len      => "len",
            Builtin::List     => "list",
            Builtin::Max      => "max",
            Builtin::Min      => "min",
            Builtin::Print    => "print",
            Builtin::Range    => "range",
            Builtin::Repr     => "repr",
            Builtin::Set      => "set",
            Builtin::Str      => "str",
            Builtin::Sum      => "sum",
            Builtin::Tuple    => "tuple",
            Builtin::Hello    => "hello",
            Builtin::Getenv   => "getenv",
            Builtin::ReadFile => "read_file",
        }
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        debug!(function = self.name(), argc = args.len(), "calling builtin");
        match self {
            Builtin::Abs => {
                let [x] = self.exactly::<1>(args)?;
                match x.as_number() {
                    Some(Number::Int(i)) => i.checked_abs().map(Value::Int).ok_or(EvalError::Overflow("abs")),
                    Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
                    None => Err(bad_argument(self, &x)),
                }
            },
            Builtin::Bool => {
                let args = self.between(args, 0, 1)?;
                Ok(Value::Bool(args.first().map_or(false, Value::is_truthy)))
            },
            Builtin::Float => match self.between(args, 0, 1)?.pop() {
                None => Ok(Value::Float(0.0)),
                Some(x) => to_float(&x),
            },
            Builtin::Int => match self.between(args, 0, 1)?.pop() {
                None => Ok(Value::Int(0)),
                Some(x) => to_int(&x),
            },
            Builtin::Len => {
                let [x] = self.exactly::<1>(args)?;
                let len = match &x {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) | Value::Tuple(items) | Value::Set(items) => items.len(),
                    Value::Dict(pairs) => pairs.len(),
                    other => return Err(EvalError::type_error(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    ))),
                };
                Ok(Value::Int(len as i64))
            },
            Builtin::List => match self.between(args, 0, 1)?.pop() {
                None => Ok(Value::List(vec![])),
                Some(x) => Ok(Value::List(ops::iterate(&x)?)),
            },
            Builtin::Tuple => match self.between(args, 0, 1)?.pop() {
                None => Ok(Value::Tuple(vec![])),
                Some(x) => Ok(Value::Tuple(ops::iterate(&x)?)),
            },
            Builtin::Set => match self.between(args, 0, 1)?.pop() {
                None => Ok(Value::Set(vec![])),
                Some(x) => {
                    let items = ops::iterate(&x)?;
                    for item in &items {
                        ops::require_hashable(item)?;
                    }
                    Ok(Value::set_from(items))
                },
            },
            Builtin::Max => self.extreme(args, Ordering::Greater),
            Builtin::Min => self.extreme(args, Ordering::Less),
            Builtin::Print => {
                let line: Vec<String> = args.iter().map(Value::to_display_string).collect();
                println!("{}", line.join(" "));
                Ok(Value::None)
            },
            Builtin::Range => self.range(args),
            Builtin::Repr => {
                let [x] = self.exactly::<1>(args)?;
                Ok(Value::Str(x.to_string()))
            },
            Builtin::Str => match self.between(args, 0, 1)?.pop() {
                None => Ok(Value::Str(String::new())),
                Some(x) => Ok(Value::Str(x.to_display_string())),
            },
            Builtin::Sum => {
                let mut args = self.between(args, 1, 2)?;
                let start = if args.len() == 2 { args.pop().unwrap_or(Value::Int(0)) } else { Value::Int(0) };
                ops::iterate(&args[0])?
                    .iter()
                    .try_fold(start, |total, x| ops::binary(BinaryOp::Add, &total, x))
            },
            Builtin::Hello => {
                let [name] = self.exactly::<1>(args)?;
                Ok(Value::Str(hello(&name.to_display_string())))
            },
            Builtin::Getenv => {
                let mut args = self.between(args, 1, 2)?;
                let default = if args.len() == 2 { args.pop().unwrap_or(Value::None) } else { Value::None };
                let name = expect_str(self, &args[0])?;
                Ok(std::env::var(name).map(Value::Str).unwrap_or(default))
            },
            Builtin::ReadFile => {
                let [path] = self.exactly::<1>(args)?;
                let path = expect_str(self, &path)?;
                std::fs::read_to_string(path)
                    .map(Value::Str)
                    .map_err(|e| EvalError::Io(format!("{}: {}", path, e)))
            },
        }
    }

    fn exactly<const N: usize>(&self, args: Vec<Value>) -> Result<[Value; N]> {
        let given = args.len();
        args.try_into().map_err(|_| EvalError::type_error(format!(
            "{}() takes exactly {} argument{} ({} given)",
            self.name(),
            N,
            if N == 1 { "" } else { "s" },
            given
        )))
    }

    fn between(&self, args: Vec<Value>, min: usize, max: usize) -> Result<Vec<Value>> {
        if args.len() < min || args.len() > max {
            return Err(EvalError::type_error(format!(
                "{}() takes from {} to {} arguments ({} given)",
                self.name(),
                min,
                max,
                args.len()
            )));
        }
        Ok(args)
    }

    // max(iterable) or max(a, b, ...)
    fn extreme(&self, args: Vec<Value>, wanted: Ordering) -> Result<Value> {
        let candidates = match args.len() {
            0 => return Err(EvalError::type_error(format!("{} expected at least 1 argument, got 0", self.name()))),
            1 => ops::iterate(&args[0])?,
            _ => args,
        };

        let mut best: Option<Value> = None;
        for candidate in candidates {
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if ops::order(&candidate, &current, CompareOp::Gt)? == Some(wanted) {
                        candidate
                    } else {
                        current
                    }
                },
            });
        }
        best.ok_or_else(|| EvalError::value_error(format!("{}() arg is an empty sequence", self.name())))
    }

    // range(stop) / range(start, stop[, step]), materialized as a list
    fn range(&self, args: Vec<Value>) -> Result<Value> {
        let args = self.between(args, 1, 3)?;
        let mut bounds = Vec::with_capacity(3);
        for arg in &args {
            match arg {
                Value::Int(i) => bounds.push(*i),
                Value::Bool(b) => bounds.push(*b as i64),
                other => return Err(bad_argument(self, other)),
            }
        }
        let (start, stop, step) = match bounds.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            _ => unreachable!("arity checked above"),
        };
        if step == 0 {
            return Err(EvalError::value_error("range() arg 3 must not be zero"));
        }

        let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
        let len = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / -step + 1
        } else {
            0
        };
        if len > ops::MAX_SEQUENCE_LEN as i128 {
            return Err(EvalError::Overflow("range"));
        }

        // every element lies between start and stop, so each fits in i64
        let items = (0..len)
            .map(|k| Value::Int((start + k * step) as i64))
            .collect();
        Ok(Value::List(items))
    }
}

fn bad_argument(builtin: &Builtin, value: &Value) -> EvalError {
    EvalError::type_error(format!(
        "bad argument type for {}(): '{}'",
        builtin.name(),
        value.type_name()
    ))
}

fn expect_str<'a>(builtin: &Builtin, value: &'a Value) -> Result<&'a str> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::type_error(format!(
            "{}() argument must be str, not {}",
            builtin.name(),
            other.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> Result<Value> {
    match (value, value.as_number()) {
        (_, Some(n)) => Ok(Value::Float(n.to_f64())),
        (Value::Str(s), None) => {
            let text: String = s.trim().chars().filter(|c| *c != '_').collect();
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| EvalError::value_error(format!("could not convert string to float: {}", value)))
        },
        (other, None) => Err(EvalError::type_error(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_int(value: &Value) -> Result<Value> {
    match (value, value.as_number()) {
        (_, Some(Number::Int(i))) => Ok(Value::Int(i)),
        (_, Some(Number::Float(x))) => {
            if x.is_nan() {
                Err(EvalError::value_error("cannot convert float NaN to integer"))
            } else if x.is_infinite() || x.trunc() >= 9.223372036854775807e18 || x.trunc() < -9.223372036854775808e18 {
                Err(EvalError::Overflow("int"))
            } else {
                Ok(Value::Int(x.trunc() as i64))
            }
        },
        (Value::Str(s), None) => s.trim().parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EvalError::value_error(format!("invalid literal for int() with base 10: {}", value))),
        (other, None) => Err(EvalError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
fn call(builtin: Builtin, args: Vec<Value>) -> Result<Value> {
    builtin.call(args)
}

#[test]
fn conversions() {
    let s = |text: &str| Value::Str(text.to_string());

    assert_eq!(call(Builtin::Int, vec![s(" 42 ")]), Ok(Value::Int(42)));
    assert_eq!(call(Builtin::Int, vec![Value::Float(-2.7)]), Ok(Value::Int(-2)));
    assert_eq!(
        call(Builtin::Int, vec![s("x")]),
        Err(EvalError::value_error("invalid literal for int() with base 10: 'x'"))
    );
    assert_eq!(call(Builtin::Float, vec![s("1.5")]), Ok(Value::Float(1.5)));
    assert_eq!(call(Builtin::Float, vec![Value::Bool(true)]), Ok(Value::Float(1.0)));
    assert_eq!(call(Builtin::Str, vec![Value::List(vec![s("a")])]), Ok(s("['a']")));
    assert_eq!(call(Builtin::Str, vec![s("a")]), Ok(s("a")));
    assert_eq!(call(Builtin::Repr, vec![s("a")]), Ok(s("'a'")));
    assert_eq!(call(Builtin::Bool, vec![]), Ok(Value::Bool(false)));
    assert_eq!(call(Builtin::List, vec![s("ab")]), Ok(Value::List(vec![s("a"), s("b")])));
    assert_eq!(call(Builtin::Set, vec![Value::List(vec![Value::Int(1), Value::Int(1)])]), Ok(Value::Set(vec![Value::Int(1)])));
}

#[test]
fn aggregates() {
    let ints = |items: &[i64]| Value::List(items.iter().copied().map(Value::Int).collect());

    assert_eq!(call(Builtin::Len, vec![ints(&[1, 2, 3])]), Ok(Value::Int(3)));
    assert_eq!(call(Builtin::Max, vec![Value::Int(3), Value::Float(7.5), Value::Int(-1)]), Ok(Value::Float(7.5)));
    assert_eq!(call(Builtin::Min, vec![ints(&[4, 2, 9])]), Ok(Value::Int(2)));
    assert_eq!(call(Builtin::Sum, vec![ints(&[1, 2, 3])]), Ok(Value::Int(6)));
    assert_eq!(call(Builtin::Sum, vec![ints(&[1]), Value::Float(0.5)]), Ok(Value::Float(1.5)));
    assert_eq!(call(Builtin::Range, vec![Value::Int(3)]), Ok(ints(&[0, 1, 2])));
    assert_eq!(call(Builtin::Range, vec![Value::Int(5), Value::Int(0), Value::Int(-2)]), Ok(ints(&[5, 3, 1])));
    assert!(call(Builtin::Max, vec![ints(&[])]).is_err());
    assert_eq!(call(Builtin::Range, vec![Value::Int(i64::MAX - 1), Value::Int(i64::MAX)]), Ok(ints(&[i64::MAX - 1])));
    assert_eq!(call(Builtin::Range, vec![Value::Int(i64::MIN), Value::Int(i64::MAX), Value::Int(i64::MAX)]), Ok(ints(&[i64::MIN, -1, i64::MAX - 1])));
}

#[test]
fn oversized_range() {
    assert_eq!(
        call(Builtin::Range, vec![Value::Int(1_000_000_000_000_000_000)]),
        Err(EvalError::Overflow("range"))
    );
    assert_eq!(
        call(Builtin::Range, vec![Value::Int(i64::MAX), Value::Int(i64::MIN), Value::Int(-1)]),
        Err(EvalError::Overflow("range"))
    );
    assert_eq!(call(Builtin::Range, vec![Value::Int(0), Value::Int(i64::MAX), Value::Int(i64::MAX)]), Ok(Value::List(vec![Value::Int(0)])));
}

#[test]
fn arity_and_types() {
    assert_eq!(
        call(Builtin::Len, vec![]),
        Err(EvalError::type_error("len() takes exactly 1 argument (0 given)"))
    );
    assert_eq!(
        call(Builtin::Len, vec![Value::Int(1)]),
        Err(EvalError::type_error("object of type 'int' has no len()"))
    );
    assert_eq!(
        call(Builtin::Range, vec![Value::Int(1), Value::Int(2), Value::Int(0)]),
        Err(EvalError::value_error("range() arg 3 must not be zero"))
    );
}

#[test]
fn reaches_outside() {
    assert_eq!(
        call(Builtin::Hello, vec![Value::Str("Tester".to_string())]),
        Ok(Value::Str("Hello, Tester!".to_string()))
    );
    assert_eq!(
        call(Builtin::Getenv, vec![Value::Str("EVALDEMO_SURELY_UNSET".to_string()), Value::Int(0)]),
        Ok(Value::Int(0))
    );
    assert!(matches!(
        call(Builtin::ReadFile, vec![Value::Str("/nonexistent/evaldemo".to_string())]),
        Err(EvalError::Io(_))
    ));
}
