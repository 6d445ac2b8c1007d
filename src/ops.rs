use std::cmp::Ordering;

use super::{BinaryOp, CompareOp, EvalError, Number, UnaryOp, Value};

type Result<T> = std::result::Result<T, EvalError>;

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value> {
    match (op, operand.as_number()) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!operand.is_truthy())),
        (UnaryOp::Plus, Some(Number::Int(i))) => Ok(Value::Int(i)),
        (UnaryOp::Plus, Some(Number::Float(x))) => Ok(Value::Float(x)),
        (UnaryOp::Minus, Some(Number::Int(i))) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow("-")),
        (UnaryOp::Minus, Some(Number::Float(x))) => Ok(Value::Float(-x)),
        (op, None) => Err(EvalError::type_error(format!(
            "bad operand type for unary {}: '{}'",
            if op == UnaryOp::Plus { "+" } else { "-" },
            operand.type_name()
        ))),
    }
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match (left.as_number(), right.as_number()) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => return int_arithmetic(op, a, b),
        (Some(a), Some(b)) => return float_arithmetic(op, a.to_f64(), b.to_f64()),
        _ => (),
    }

    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => {
            check_len(op, a.len().checked_add(b.len()))?;
            Ok(Value::Str(format!("{}{}", a, b)))
        },
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            check_len(op, a.len().checked_add(b.len()))?;
            Ok(Value::List([a.as_slice(), b.as_slice()].concat()))
        },
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            check_len(op, a.len().checked_add(b.len()))?;
            Ok(Value::Tuple([a.as_slice(), b.as_slice()].concat()))
        },
        (BinaryOp::Mul, sequence, count) | (BinaryOp::Mul, count, sequence) if repeat_count(count).is_some() => {
            let n = repeat_count(count).unwrap_or(0);
            match sequence {
                Value::Str(s) => {
                    check_len(op, s.len().checked_mul(n))?;
                    Ok(Value::Str(s.repeat(n)))
                },
                Value::List(items) => Ok(Value::List(repeat_items(items, n)?)),
                Value::Tuple(items) => Ok(Value::Tuple(repeat_items(items, n)?)),
                _ => Err(unsupported(op, left, right)),
            }
        },
        _ => Err(unsupported(op, left, right)),
    }
}

/// Longest string (in bytes) or sequence (in elements) an expression may build.
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;

fn check_len(op: BinaryOp, len: Option<usize>) -> Result<()> {
    match len {
        Some(len) if len <= MAX_SEQUENCE_LEN => Ok(()),
        _ => Err(EvalError::Overflow(op.symbol())),
    }
}

fn repeat_count(value: &Value) -> Option<usize> {
    match value {
        Value::Int(n) => Some(usize::try_from((*n).max(0)).unwrap_or(usize::MAX)),
        Value::Bool(b) => Some(*b as usize),
        _ => None,
    }
}

fn repeat_items(items: &[Value], n: usize) -> Result<Vec<Value>> {
    if items.is_empty() {
        return Ok(vec![]);
    }
    check_len(BinaryOp::Mul, items.len().checked_mul(n))?;
    let mut repeated = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        repeated.extend_from_slice(items);
    }
    Ok(repeated)
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    let overflow = EvalError::Overflow(op.symbol());
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            Ok(Value::Float(a as f64 / b as f64))
        },
        // rounds toward negative infinity
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            let q = a.checked_div(b).ok_or(overflow)?;
            if a % b != 0 && (a < 0) != (b < 0) {
                Ok(Value::Int(q - 1))
            } else {
                Ok(Value::Int(q))
            }
        },
        // takes the sign of the divisor
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            let r = a.checked_rem(b).ok_or(overflow)?;
            if r != 0 && (r < 0) != (b < 0) {
                Ok(Value::Int(r + b))
            } else {
                Ok(Value::Int(r))
            }
        },
        BinaryOp::Pow => {
            if b < 0 {
                return float_arithmetic(op, a as f64, b as f64);
            }
            u32::try_from(b)
                .ok()
                .and_then(|e| a.checked_pow(e))
                .map(Value::Int)
                .ok_or(overflow)
        },
    }
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => return Err(EvalError::ZeroDivision),
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
        },
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(EvalError::ZeroDivision);
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Err(EvalError::value_error("negative number cannot be raised to a fractional power"));
            }
            let power = a.powf(b);
            if !power.is_finite() && a.is_finite() && b.is_finite() {
                return Err(EvalError::Overflow(op.symbol()));
            }
            power
        },
    };
    Ok(Value::Float(value))
}

pub fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool> {
    match op {
        CompareOp::Eq => Ok(left.loose_eq(right)),
        CompareOp::NotEq => Ok(!left.loose_eq(right)),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
        CompareOp::Is => Ok(is_same(left, right)),
        CompareOp::IsNot => Ok(!is_same(left, right)),
        CompareOp::Lt | CompareOp::LtE | CompareOp::Gt | CompareOp::GtE => {
            // unordered (NaN) compares false
            let ordering = match order(left, right, op)? {
                Some(ordering) => ordering,
                None => return Ok(false),
            };
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::LtE => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        },
    }
}

pub fn order(left: &Value, right: &Value, op: CompareOp) -> Result<Option<Ordering>> {
    match (left.as_number(), right.as_number()) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => return Ok(Some(a.cmp(&b))),
        (Some(a), Some(b)) => return Ok(a.to_f64().partial_cmp(&b.to_f64())),
        _ => (),
    }

    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            // lexicographic on the first differing element
            for (x, y) in a.iter().zip(b) {
                if !x.loose_eq(y) {
                    return order(x, y, op);
                }
            }
            Ok(Some(a.len().cmp(&b.len())))
        },
        _ => Err(EvalError::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn is_same(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => false,
    }
}

pub fn contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(EvalError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) | Value::Tuple(items) => Ok(items.iter().any(|x| x.loose_eq(item))),
        Value::Set(items) => {
            require_hashable(item)?;
            Ok(items.iter().any(|x| x.loose_eq(item)))
        },
        Value::Dict(pairs) => {
            require_hashable(item)?;
            Ok(pairs.iter().any(|(k, _)| k.loose_eq(item)))
        },
        other => Err(EvalError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

pub fn subscript(container: &Value, index: &Value) -> Result<Value> {
    match container {
        Value::List(items) => Ok(items[sequence_index(index, items.len(), "list")?].clone()),
        Value::Tuple(items) => Ok(items[sequence_index(index, items.len(), "tuple")?].clone()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = sequence_index(index, chars.len(), "string")?;
            Ok(Value::Str(chars[i].to_string()))
        },
        Value::Dict(pairs) => {
            require_hashable(index)?;
            pairs.iter()
                .find(|(k, _)| k.loose_eq(index))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| EvalError::Key(index.to_string()))
        },
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

// negative indices count from the end
fn sequence_index(index: &Value, len: usize, kind: &'static str) -> Result<usize> {
    let i = match index {
        Value::Int(i) => *i,
        Value::Bool(b) => *b as i64,
        _ => return Err(EvalError::type_error(format!(
            "{} indices must be integers, not {}",
            kind,
            index.type_name()
        ))),
    };
    let resolved = if i < 0 { i.checked_add(len as i64) } else { Some(i) };
    match resolved {
        Some(i) if i >= 0 && (i as usize) < len => Ok(i as usize),
        _ => Err(EvalError::Index(kind)),
    }
}

pub fn require_hashable(value: &Value) -> Result<()> {
    if value.is_hashable() {
        Ok(())
    } else {
        Err(EvalError::type_error(format!("unhashable type: '{}'", value.type_name())))
    }
}

/// Elements in iteration order: characters of a string, keys of a dict.
pub fn iterate(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.clone()),
        Value::Dict(pairs) => Ok(pairs.iter().map(|(k, _)| k.clone()).collect()),
        other => Err(EvalError::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

#[test]
fn python_division() {
    let int = |op, a, b| binary(op, &Value::Int(a), &Value::Int(b));

    assert_eq!(int(BinaryOp::FloorDiv, 7, 2), Ok(Value::Int(3)));
    assert_eq!(int(BinaryOp::FloorDiv, -7, 2), Ok(Value::Int(-4)));
    assert_eq!(int(BinaryOp::Mod, -7, 2), Ok(Value::Int(1)));
    assert_eq!(int(BinaryOp::Mod, 7, -2), Ok(Value::Int(-1)));
    assert_eq!(int(BinaryOp::Div, 1, 4), Ok(Value::Float(0.25)));
    assert_eq!(int(BinaryOp::Div, 1, 0), Err(EvalError::ZeroDivision));
    assert_eq!(int(BinaryOp::Pow, 2, -1), Ok(Value::Float(0.5)));
    assert_eq!(int(BinaryOp::Pow, 2, 64), Err(EvalError::Overflow("**")));
    assert_eq!(int(BinaryOp::Add, i64::MAX, 1), Err(EvalError::Overflow("+")));
    assert_eq!(
        binary(BinaryOp::Mod, &Value::Float(-1.0), &Value::Float(3.0)),
        Ok(Value::Float(2.0))
    );
}

#[test]
fn sequences() {
    let s = |text: &str| Value::Str(text.to_string());

    assert_eq!(binary(BinaryOp::Add, &s("ab"), &s("c")), Ok(s("abc")));
    assert_eq!(binary(BinaryOp::Mul, &Value::Int(2), &s("ab")), Ok(s("abab")));
    assert_eq!(
        binary(BinaryOp::Mul, &Value::List(vec![Value::Int(0)]), &Value::Int(3)),
        Ok(Value::List(vec![Value::Int(0), Value::Int(0), Value::Int(0)]))
    );
    assert_eq!(
        binary(BinaryOp::Add, &Value::Int(1), &s("a")),
        Err(EvalError::type_error("unsupported operand type(s) for +: 'int' and 'str'"))
    );
    assert_eq!(binary(BinaryOp::Mul, &s("ab"), &Value::Int(-3)), Ok(s("")));
    assert_eq!(subscript(&s("abc"), &Value::Int(-1)), Ok(s("c")));
    assert_eq!(subscript(&Value::List(vec![]), &Value::Int(0)), Err(EvalError::Index("list")));
    assert_eq!(
        subscript(&Value::Dict(vec![(s("k"), Value::None)]), &s("x")),
        Err(EvalError::Key("'x'".to_string()))
    );
}

#[test]
fn ordering() {
    let list = |items: Vec<i64>| Value::List(items.into_iter().map(Value::Int).collect());

    assert_eq!(compare(CompareOp::Lt, &list(vec![1, 2]), &list(vec![1, 3])), Ok(true));
    assert_eq!(compare(CompareOp::Lt, &list(vec![1, 2]), &list(vec![1])), Ok(false));
    assert_eq!(compare(CompareOp::GtE, &Value::Float(f64::NAN), &Value::Int(0)), Ok(false));
    assert_eq!(compare(CompareOp::In, &Value::Int(2), &list(vec![1, 2])), Ok(true));
    assert_eq!(compare(CompareOp::Is, &Value::None, &Value::None), Ok(true));
    assert!(compare(CompareOp::Lt, &Value::Int(1), &Value::Str("a".to_string())).is_err());
}

#[test]
fn oversized_results() {
    let s = |text: &str| Value::Str(text.to_string());
    let zero = Value::List(vec![Value::Int(0)]);

    assert_eq!(binary(BinaryOp::Mul, &s("ab"), &Value::Int(i64::MAX)), Err(EvalError::Overflow("*")));
    assert_eq!(binary(BinaryOp::Mul, &Value::Int(i64::MAX), &zero), Err(EvalError::Overflow("*")));
    assert_eq!(binary(BinaryOp::Mul, &zero, &Value::Int(1_000_000_000_000_000)), Err(EvalError::Overflow("*")));
    assert_eq!(
        binary(BinaryOp::Mul, &Value::Tuple(vec![]), &Value::Int(i64::MAX)),
        Ok(Value::Tuple(vec![]))
    );

    assert_eq!(check_len(BinaryOp::Add, Some(MAX_SEQUENCE_LEN)), Ok(()));
    assert_eq!(check_len(BinaryOp::Add, Some(MAX_SEQUENCE_LEN + 1)), Err(EvalError::Overflow("+")));
    assert_eq!(check_len(BinaryOp::Add, None), Err(EvalError::Overflow("+")));
}

#[test]
fn float_power_overflow() {
    let power = |a: f64, b: f64| binary(BinaryOp::Pow, &Value::Float(a), &Value::Float(b));

    assert_eq!(power(10.0, 400.0), Err(EvalError::Overflow("**")));
    assert_eq!(binary(BinaryOp::Pow, &Value::Float(10.0), &Value::Int(400)), Err(EvalError::Overflow("**")));
    assert_eq!(power(2.0, 0.5).map(|v| v == Value::Float(2f64.sqrt())), Ok(true));
    assert_eq!(power(f64::INFINITY, 2.0), Ok(Value::Float(f64::INFINITY)));
    assert_eq!(power(10.0, -400.0), Ok(Value::Float(0.0)));
}
