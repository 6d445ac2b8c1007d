use super::{
    Lexer, Token, Primitive, Operator, Located, Location, LexerError, LiteralError, ToLocated, Value,
    DEFAULT_MAX_DEPTH,
};

use peekmore::{PeekMore, PeekMoreIterator};
use tracing::{debug, trace};

type Result<T> = std::result::Result<T, Located<LiteralError>>;

type TResult = std::result::Result<Located<Token>, Located<LexerError>>;

/// Parses a literal: numbers, strings, booleans, `None` and lists, tuples,
/// sets and dicts built from those. Nothing is ever evaluated.
pub fn safe_eval_literal(expr: &str) -> Result<Value> {
    trace!(expr, "parsing literal");
    let result = LiteralParser::from(Lexer::new(expr.chars())).parse();
    if let Err(e) = &result {
        debug!(error = %e, "input rejected as non-literal");
    }
    result
}

pub struct LiteralParser<TokenIter: Iterator<Item = TResult>> {
    tokens: PeekMoreIterator<TokenIter>,
    last_location: Option<Location>,
    max_depth: usize,
}

impl<TokenIter: Iterator<Item = TResult>> LiteralParser<TokenIter> {
    pub fn from(tokens: TokenIter) -> LiteralParser<TokenIter> {
        Self {
            tokens: tokens.peekmore(),
            last_location: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reads exactly one literal; anything after it is rejected.
    pub fn parse(&mut self) -> Result<Value> {
        let value = self.get_literal(0)?;
        match self.advance()? {
            None => Ok(value),
            Some(Located{data: token, location}) => Err(LiteralError::Malformed(token).with_location(location)),
        }
    }

    fn advance(&mut self) -> Result<Option<Located<Token>>> {
        match self.tokens.next() {
            None => Ok(None),
            Some(Err(e)) => Err(e.map(LiteralError::LexerError)),
            Some(Ok(token)) => {
                self.last_location = token.location;
                Ok(Some(token))
            },
        }
    }

    fn expect_next(&mut self) -> Result<Located<Token>> {
        match self.advance()? {
            Some(token) => Ok(token),
            None => Err(LiteralError::UnexpectedEnd.with_location(self.last_location)),
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>> {
        match self.tokens.peek() {
            None => Ok(None),
            Some(Ok(token)) => Ok(Some(&token.data)),
            Some(Err(e)) => Err(e.clone().map(LiteralError::LexerError)),
        }
    }

    fn next_is(&mut self, expected: &Token) -> Result<bool> {
        Ok(self.peek()? == Some(expected))
    }

    fn get_literal(&mut self, depth: usize) -> Result<Value> {
        let Located{data: token, location} = self.expect_next()?;
        if depth > self.max_depth {
            return Err(LiteralError::TooDeep(self.max_depth).with_location(location));
        }

        match token {
            Token::Primitive(Primitive::String(s)) => self.get_strings(s),
            Token::Primitive(p) => primitive_value(p).map_err(|e| LiteralError::LexerError(e).with_location(location)),
            Token::Operator(op) if op == Operator::Plus || op == Operator::Minus => self.get_signed(op, location),
            Token::LeftBracket => Ok(Value::List(self.get_sequence(depth, Token::RightBracket)?)),
            Token::LeftParen => self.get_tuple(depth),
            Token::LeftBrace => self.get_brace(depth),
            // `set()` is the only way to spell an empty set
            Token::Name(name) if name == "set" => {
                let empty_call = self.advance()?.map(|t| t.data) == Some(Token::LeftParen)
                    && self.advance()?.map(|t| t.data) == Some(Token::RightParen);
                if empty_call {
                    Ok(Value::Set(vec![]))
                } else {
                    Err(LiteralError::Malformed(Token::Name(name)).with_location(location))
                }
            },
            token => Err(LiteralError::Malformed(token).with_location(location)),
        }
    }

    // adjacent string literals concatenate
    fn get_strings(&mut self, first: String) -> Result<Value> {
        let mut string = first;
        while matches!(self.peek()?, Some(Token::Primitive(Primitive::String(_)))) {
            if let Some(Located{data: Token::Primitive(Primitive::String(next)), ..}) = self.advance()? {
                string.push_str(&next);
            }
        }
        Ok(Value::Str(string))
    }

    // a single sign may prefix a number, nothing else
    fn get_signed(&mut self, op: Operator, location: Option<Location>) -> Result<Value> {
        let Located{data: token, location: operand_location} = self.expect_next()?;
        let negate = op == Operator::Minus;
        match token {
            Token::Primitive(Primitive::Integer(n)) => {
                let signed = if negate { -i128::from(n) } else { i128::from(n) };
                i64::try_from(signed).map(Value::Int).map_err(|_| {
                    LiteralError::LexerError(LexerError::IntegerOverflow(n.to_string())).with_location(operand_location)
                })
            },
            Token::Primitive(Primitive::Float(x)) => Ok(Value::Float(if negate { -x } else { x })),
            Token::Primitive(Primitive::Boolean(_)) | Token::Operator(_) => {
                Err(LiteralError::Malformed(Token::Operator(op)).with_location(location))
            },
            token => Err(LiteralError::Malformed(token).with_location(operand_location)),
        }
    }

    // elements up to `close`, comma separated, trailing comma allowed
    fn get_sequence(&mut self, depth: usize, close: Token) -> Result<Vec<Value>> {
        let mut items = vec![];
        loop {
            if self.next_is(&close)? {
                self.advance()?;
                return Ok(items);
            }

            items.push(self.get_literal(depth + 1)?);

            let Located{data: token, location} = self.expect_next()?;
            match token {
                t if t == close => return Ok(items),
                Token::Comma => continue,
                t => return Err(LiteralError::Malformed(t).with_location(location)),
            }
        }
    }

    fn get_tuple(&mut self, depth: usize) -> Result<Value> {
        if self.next_is(&Token::RightParen)? {
            self.advance()?;
            return Ok(Value::Tuple(vec![]));
        }

        let first = self.get_literal(depth + 1)?;
        let Located{data: token, location} = self.expect_next()?;
        match token {
            // only parenthesized, not a tuple
            Token::RightParen => Ok(first),
            Token::Comma => {
                let mut items = vec![first];
                items.extend(self.get_sequence(depth, Token::RightParen)?);
                Ok(Value::Tuple(items))
            },
            t => Err(LiteralError::Malformed(t).with_location(location)),
        }
    }

    // `{}` is a dict; `{a: b}` a dict; `{a, b}` a set
    fn get_brace(&mut self, depth: usize) -> Result<Value> {
        if self.next_is(&Token::RightBrace)? {
            self.advance()?;
            return Ok(Value::Dict(vec![]));
        }

        let first = self.get_key(depth)?;
        let Located{data: token, location} = self.expect_next()?;
        match token {
            Token::Colon => {
                let value = self.get_literal(depth + 1)?;
                self.get_dict_rest(depth, vec![(first, value)])
            },
            Token::Comma => {
                let mut members = vec![first];
                loop {
                    if self.next_is(&Token::RightBrace)? {
                        self.advance()?;
                        break;
                    }
                    members.push(self.get_key(depth)?);
                    let Located{data: token, location} = self.expect_next()?;
                    match token {
                        Token::RightBrace => break,
                        Token::Comma => continue,
                        t => return Err(LiteralError::Malformed(t).with_location(location)),
                    }
                }
                Ok(Value::set_from(members))
            },
            Token::RightBrace => Ok(Value::Set(vec![first])),
            t => Err(LiteralError::Malformed(t).with_location(location)),
        }
    }

    fn get_dict_rest(&mut self, depth: usize, mut pairs: Vec<(Value, Value)>) -> Result<Value> {
        loop {
            let Located{data: token, location} = self.expect_next()?;
            match token {
                Token::RightBrace => break,
                Token::Comma => {
                    if self.next_is(&Token::RightBrace)? {
                        self.advance()?;
                        break;
                    }
                    let key = self.get_key(depth)?;
                    let Located{data: token, location} = self.expect_next()?;
                    if token != Token::Colon {
                        return Err(LiteralError::Malformed(token).with_location(location));
                    }
                    let value = self.get_literal(depth + 1)?;
                    pairs.push((key, value));
                },
                t => return Err(LiteralError::Malformed(t).with_location(location)),
            }
        }
        Ok(Value::dict_from(pairs))
    }

    fn get_key(&mut self, depth: usize) -> Result<Value> {
        let location = match self.tokens.peek() {
            Some(Ok(token)) => token.location,
            _ => self.last_location,
        };
        let key = self.get_literal(depth + 1)?;
        if !key.is_hashable() {
            return Err(LiteralError::Unhashable(key.type_name()).with_location(location));
        }
        Ok(key)
    }
}

// an unsigned integer of 2**63 only fits once negated
pub(crate) fn primitive_value(primitive: Primitive) -> std::result::Result<Value, LexerError> {
    Ok(match primitive {
        Primitive::None => Value::None,
        Primitive::Boolean(b) => Value::Bool(b),
        Primitive::Integer(n) => match i64::try_from(n) {
            Ok(i) => Value::Int(i),
            Err(_) => return Err(LexerError::IntegerOverflow(n.to_string())),
        },
        Primitive::Float(x) => Value::Float(x),
        Primitive::String(s) => Value::Str(s),
    })
}

#[cfg(test)]
fn literal(text: &str) -> std::result::Result<Value, LiteralError> {
    safe_eval_literal(text).map_err(|e| e.extract())
}

#[cfg(test)]
fn s(text: &str) -> Value {
    Value::Str(text.to_string())
}

#[test]
fn scalars() {
    let tests = vec![
        ("2", Value::Int(2)),
        ("  -17", Value::Int(-17)),
        ("+3", Value::Int(3)),
        ("1.5", Value::Float(1.5)),
        ("-0.25", Value::Float(-0.25)),
        ("0xff", Value::Int(255)),
        ("9223372036854775807", Value::Int(i64::MAX)),
        ("-9223372036854775808", Value::Int(i64::MIN)),
        ("[-0x8000000000000000]", Value::List(vec![Value::Int(i64::MIN)])),
        ("'hi'", s("hi")),
        ("'a' \"b\" '''c'''", s("abc")),
        ("True", Value::Bool(true)),
        ("False", Value::Bool(false)),
        ("None", Value::None),
        ("(7)", Value::Int(7)),
    ];

    for (text, expected) in tests {
        assert_eq!(literal(text), Ok(expected), "{}", text);
    }
}

#[test]
fn containers() {
    let tests = vec![
        ("[1,2]", Value::List(vec![Value::Int(1), Value::Int(2)])),
        ("[]", Value::List(vec![])),
        ("[1, [2, []],]", Value::List(vec![
            Value::Int(1),
            Value::List(vec![Value::Int(2), Value::List(vec![])]),
        ])),
        ("()", Value::Tuple(vec![])),
        ("(1,)", Value::Tuple(vec![Value::Int(1)])),
        ("(1, 'a', None)", Value::Tuple(vec![Value::Int(1), s("a"), Value::None])),
        ("{}", Value::Dict(vec![])),
        ("{'a': 1, 'b': [True]}", Value::Dict(vec![
            (s("a"), Value::Int(1)),
            (s("b"), Value::List(vec![Value::Bool(true)])),
        ])),
        ("{1: 'x', 1: 'y',}", Value::Dict(vec![(Value::Int(1), s("y"))])),
        ("{(1, 2): 3}", Value::Dict(vec![
            (Value::Tuple(vec![Value::Int(1), Value::Int(2)]), Value::Int(3)),
        ])),
        ("{1, 2, 1}", Value::Set(vec![Value::Int(1), Value::Int(2)])),
        ("{'only'}", Value::Set(vec![s("only")])),
        ("set()", Value::Set(vec![])),
    ];

    for (text, expected) in tests {
        assert_eq!(literal(text), Ok(expected), "{}", text);
    }
}

#[test]
fn rejects_expressions() {
    let tests = vec![
        ("1 + 1", LiteralError::Malformed(Token::Operator(Operator::Plus))),
        ("x", LiteralError::Malformed(Token::Name("x".to_string()))),
        ("len([1])", LiteralError::Malformed(Token::Name("len".to_string()))),
        ("set([1])", LiteralError::Malformed(Token::Name("set".to_string()))),
        ("[1](0)", LiteralError::Malformed(Token::LeftParen)),
        ("--1", LiteralError::Malformed(Token::Operator(Operator::Minus))),
        ("-True", LiteralError::Malformed(Token::Operator(Operator::Minus))),
        ("-'a'", LiteralError::Malformed(Token::Primitive(Primitive::String("a".to_string())))),
        ("[1 2]", LiteralError::Malformed(Token::Primitive(Primitive::Integer(2)))),
        ("{1: 2, 3}", LiteralError::Malformed(Token::RightBrace)),
        ("[,]", LiteralError::Malformed(Token::Comma)),
        ("1 if True else 2", LiteralError::Malformed(Token::Keyword(crate::Keyword::If))),
    ];

    for (text, expected) in tests {
        assert_eq!(literal(text), Err(expected), "{}", text);
    }
}

#[test]
fn other_failures() {
    assert_eq!(literal(""), Err(LiteralError::UnexpectedEnd));
    assert_eq!(literal("[1, 2"), Err(LiteralError::UnexpectedEnd));
    assert_eq!(literal("{[1]: 2}"), Err(LiteralError::Unhashable("list")));
    assert_eq!(literal("{{1}}"), Err(LiteralError::Unhashable("set")));
    assert_eq!(literal("'open"), Err(LiteralError::LexerError(LexerError::UnterminatedString)));

    let deep = format!("{}{}", "[".repeat(5), "]".repeat(5));
    let parsed = LiteralParser::from(Lexer::new(deep.chars())).with_max_depth(3).parse();
    assert_eq!(parsed.map_err(|e| e.extract()), Err(LiteralError::TooDeep(3)));

    let too_big = LiteralError::LexerError(LexerError::IntegerOverflow(String::from("9223372036854775808")));
    for text in ["9223372036854775808", "+9223372036854775808", "[9223372036854775808]"] {
        assert_eq!(literal(text), Err(too_big.clone()), "{}", text);
    }
}

#[test]
fn error_location() {
    let error = safe_eval_literal("[1,\n 2 * 3]").unwrap_err();
    assert_eq!(error.location, Some(Location{row: 1, col: 3}));
    assert_eq!(
        error.to_string(),
        "malformed node or string: '*' is not a literal at line 2, column 4"
    );
}
