use std::fmt;

use crate::Builtin;

/// A dynamically-typed value produced by either evaluator.
#[derive(PartialEq, Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),

    List(Vec<Value>),
    Tuple(Vec<Value>),
    // insertion order, members unique under `loose_eq`
    Set(Vec<Value>),
    // insertion order, keys unique under `loose_eq`
    Dict(Vec<(Value, Value)>),

    Function(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None        => "NoneType",
            Value::Bool(_)     => "bool",
            Value::Int(_)      => "int",
            Value::Float(_)    => "float",
            Value::Str(_)      => "str",
            Value::List(_)     => "list",
            Value::Tuple(_)    => "tuple",
            Value::Set(_)      => "set",
            Value::Dict(_)     => "dict",
            Value::Function(_) => "builtin_function_or_method",
        }
    }

    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Set(_) | Value::Dict(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => !items.is_empty(),
            Value::Dict(pairs) => !pairs.is_empty(),
            Value::Function(_) => true,
        }
    }

    /// Equality where `1 == 1.0 == True` and sets/dicts ignore order.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a.loose_eq(b);
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            },
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.loose_eq(y)))
            },
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| {
                    b.iter().any(|(k2, v2)| k.loose_eq(k2) && v.loose_eq(v2))
                })
            },
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(x) => Some(Number::Float(*x)),
            _ => None,
        }
    }

    /// Builds a set, dropping members equal to an earlier one.
    pub fn set_from(items: Vec<Value>) -> Value {
        let mut members: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !members.iter().any(|m| m.loose_eq(&item)) {
                members.push(item);
            }
        }
        Value::Set(members)
    }

    /// Builds a dict; a repeated key keeps its first position and its last value.
    pub fn dict_from(pairs: Vec<(Value, Value)>) -> Value {
        let mut entries: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            match entries.iter_mut().find(|(k, _)| k.loose_eq(&key)) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
        Value::Dict(entries)
    }

    /// The `str()` form: strings unquoted, everything else as its repr.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(x) => x,
        }
    }

    fn loose_eq(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => a.to_f64() == b.to_f64(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", float_repr(*x)),
            Value::Str(s) => write!(f, "{}", string_repr(s)),
            Value::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            },
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            },
            Value::Set(items) if items.is_empty() => write!(f, "set()"),
            Value::Set(items) => {
                write!(f, "{{")?;
                write_items(f, items)?;
                write!(f, "}}")
            },
            Value::Dict(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            },
            Value::Function(builtin) => write!(f, "<built-in function {}>", builtin.name()),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = x.abs();
    if abs != 0.0 && (abs >= 1e16 || abs < 1e-4) {
        // 1e16 -> 1e+16, 1.5e-5 -> 1.5e-05
        let repr = format!("{:e}", x);
        let (mantissa, exponent) = repr.split_at(repr.find('e').unwrap_or(repr.len()));
        let exponent = exponent.trim_start_matches('e');
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        format!("{}e{}{:0>2}", mantissa, sign, digits)
    } else if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

fn string_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };

    let mut repr = String::with_capacity(s.len() + 2);
    repr.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => repr.push_str("\\\\"),
            '\n' => repr.push_str("\\n"),
            '\r' => repr.push_str("\\r"),
            '\t' => repr.push_str("\\t"),
            c if c == quote => {
                repr.push('\\');
                repr.push(c);
            },
            c if (c as u32) < 0x20 || c as u32 == 0x7f => repr.push_str(&format!("\\x{:02x}", c as u32)),
            c => repr.push(c),
        }
    }
    repr.push(quote);
    repr
}

#[test]
fn repr() {
    let tests = vec![
        (Value::None, "None"),
        (Value::Bool(true), "True"),
        (Value::Int(-7), "-7"),
        (Value::Float(2.0), "2.0"),
        (Value::Float(0.1), "0.1"),
        (Value::Float(1e16), "1e+16"),
        (Value::Float(1.5e-5), "1.5e-05"),
        (Value::Float(f64::NEG_INFINITY), "-inf"),
        (Value::Str("it's".to_string()), "\"it's\""),
        (Value::Str("a\nb".to_string()), "'a\\nb'"),
        (Value::List(vec![Value::Int(1), Value::Int(2)]), "[1, 2]"),
        (Value::Tuple(vec![Value::Int(1)]), "(1,)"),
        (Value::Tuple(vec![]), "()"),
        (Value::Set(vec![]), "set()"),
        (Value::Set(vec![Value::Int(1), Value::Int(2)]), "{1, 2}"),
        (Value::Dict(vec![(Value::Str("a".to_string()), Value::None)]), "{'a': None}"),
        (Value::Function(Builtin::Len), "<built-in function len>"),
    ];

    for (value, expected) in tests {
        assert_eq!(value.to_string(), expected);
    }
}

#[test]
fn numeric_equality() {
    assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
    assert!(Value::Bool(true).loose_eq(&Value::Int(1)));
    assert!(!Value::Int(1).loose_eq(&Value::Str("1".to_string())));
    assert!(Value::Set(vec![Value::Int(1), Value::Int(2)])
        .loose_eq(&Value::Set(vec![Value::Int(2), Value::Int(1)])));
}

#[test]
fn collapse_duplicates() {
    assert_eq!(
        Value::set_from(vec![Value::Int(1), Value::Bool(true), Value::Int(2)]),
        Value::Set(vec![Value::Int(1), Value::Int(2)])
    );
    assert_eq!(
        Value::dict_from(vec![
            (Value::Int(1), Value::Str("a".to_string())),
            (Value::Int(2), Value::Str("b".to_string())),
            (Value::Int(1), Value::Str("c".to_string())),
        ]),
        Value::Dict(vec![
            (Value::Int(1), Value::Str("c".to_string())),
            (Value::Int(2), Value::Str("b".to_string())),
        ])
    );
}
