use super::{
    Lexer, Token, Primitive, Keyword, Operator, Located, Location, LexerError, ParseError, ToLocated,
    Expression, Node, UnaryOp, BinaryOp, CompareOp, Value, DEFAULT_MAX_DEPTH,
};
use super::literal::primitive_value;

use peekmore::{PeekMore, PeekMoreIterator};

type Result<T> = std::result::Result<T, Located<ParseError>>;

type TResult = std::result::Result<Located<Token>, Located<LexerError>>;

pub fn parse_expression(text: &str) -> Result<Node> {
    Parser::from(Lexer::new(text.chars())).parse()
}

/// Recursive descent over the full expression grammar, loosest binding first:
/// conditional, `or`, `and`, `not`, comparisons, `+ -`, `* / // %`, unary
/// sign, `**`, calls and subscripts, atoms.
pub struct Parser<TokenIter: Iterator<Item = TResult>> {
    tokens: PeekMoreIterator<TokenIter>,
    last_location: Option<Location>,
    depth: usize,
    max_depth: usize,
}

impl<TokenIter: Iterator<Item = TResult>> Parser<TokenIter> {
    pub fn from(tokens: TokenIter) -> Parser<TokenIter> {
        Self {
            tokens: tokens.peekmore(),
            last_location: None,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reads the whole input as one expression. A bare top-level comma
    /// list (`1, 2`) is a tuple.
    pub fn parse(&mut self) -> Result<Node> {
        let first = self.get_expression()?;
        let location = first.location;

        let node = if self.next_is(&Token::Comma)? {
            let mut items = vec![first];
            while self.next_is(&Token::Comma)? {
                self.advance()?;
                if self.peek()?.is_none() {
                    break;
                }
                items.push(self.get_expression()?);
            }
            Expression::Tuple(items).with_location(location)
        } else {
            first
        };

        match self.advance()? {
            None => Ok(node),
            Some(Located{data: token, location}) => Err(ParseError::UnexpectedToken(token).with_location(location)),
        }
    }

    fn advance(&mut self) -> Result<Option<Located<Token>>> {
        self.tokens.reset_cursor();
        match self.tokens.next() {
            None => Ok(None),
            Some(Err(e)) => Err(e.map(ParseError::LexerError)),
            Some(Ok(token)) => {
                self.last_location = token.location;
                Ok(Some(token))
            },
        }
    }

    fn expect_next(&mut self) -> Result<Located<Token>> {
        match self.advance()? {
            Some(token) => Ok(token),
            None => Err(ParseError::UnexpectedEnd.with_location(self.last_location)),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let Located{data: token, location} = self.expect_next()?;
        if token == expected {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(token).with_location(location))
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>> {
        self.tokens.reset_cursor();
        match self.tokens.peek() {
            None => Ok(None),
            Some(Ok(token)) => Ok(Some(&token.data)),
            Some(Err(e)) => Err(e.clone().map(ParseError::LexerError)),
        }
    }

    fn peek_second(&mut self) -> Option<Token> {
        self.tokens.reset_cursor();
        self.tokens.advance_cursor();
        let token = match self.tokens.peek() {
            Some(Ok(token)) => Some(token.data.clone()),
            _ => None,
        };
        self.tokens.reset_cursor();
        token
    }

    fn next_is(&mut self, expected: &Token) -> Result<bool> {
        Ok(self.peek()? == Some(expected))
    }

    fn next_location(&mut self) -> Option<Location> {
        self.tokens.reset_cursor();
        match self.tokens.peek() {
            Some(Ok(token)) => token.location,
            _ => self.last_location,
        }
    }

    // <expression> -> <disjunction> [if <disjunction> else <expression>]
    fn get_expression(&mut self) -> Result<Node> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::TooDeep(self.max_depth).with_location(self.next_location()));
        }

        let body = self.get_disjunction()?;
        let node = if self.next_is(&Token::Keyword(Keyword::If))? {
            self.advance()?;
            let test = self.get_disjunction()?;
            self.expect(Token::Keyword(Keyword::Else))?;
            let orelse = self.get_expression()?;
            let location = body.location;
            Expression::Conditional {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            }.with_location(location)
        } else {
            body
        };

        self.depth -= 1;
        Ok(node)
    }

    fn get_disjunction(&mut self) -> Result<Node> {
        let mut left = self.get_conjunction()?;
        while self.next_is(&Token::Keyword(Keyword::Or))? {
            self.advance()?;
            let right = self.get_conjunction()?;
            let location = left.location;
            left = Expression::Or(Box::new(left), Box::new(right)).with_location(location);
        }
        Ok(left)
    }

    fn get_conjunction(&mut self) -> Result<Node> {
        let mut left = self.get_inversion()?;
        while self.next_is(&Token::Keyword(Keyword::And))? {
            self.advance()?;
            let right = self.get_inversion()?;
            let location = left.location;
            left = Expression::And(Box::new(left), Box::new(right)).with_location(location);
        }
        Ok(left)
    }

    fn get_inversion(&mut self) -> Result<Node> {
        if self.next_is(&Token::Keyword(Keyword::Not))? {
            let location = self.next_location();
            self.advance()?;
            let operand = self.nested(Self::get_inversion)?;
            return Ok(Expression::Unary(UnaryOp::Not, Box::new(operand)).with_location(location));
        }
        self.get_comparison()
    }

    fn get_comparison(&mut self) -> Result<Node> {
        let left = self.get_sum()?;
        let location = left.location;

        let mut comparisons = vec![];
        while let Some(op) = self.get_compare_op()? {
            comparisons.push((op, self.get_sum()?));
        }

        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Expression::Compare(Box::new(left), comparisons).with_location(location))
        }
    }

    // consumes the operator if one is next
    fn get_compare_op(&mut self) -> Result<Option<CompareOp>> {
        let op = match self.peek()? {
            Some(Token::Operator(Operator::Equal))        => CompareOp::Eq,
            Some(Token::Operator(Operator::NotEqual))     => CompareOp::NotEq,
            Some(Token::Operator(Operator::Less))         => CompareOp::Lt,
            Some(Token::Operator(Operator::LessEqual))    => CompareOp::LtE,
            Some(Token::Operator(Operator::Greater))      => CompareOp::Gt,
            Some(Token::Operator(Operator::GreaterEqual)) => CompareOp::GtE,
            Some(Token::Keyword(Keyword::In))             => CompareOp::In,
            Some(Token::Keyword(Keyword::Is))             => CompareOp::Is,
            Some(Token::Keyword(Keyword::Not)) => {
                if self.peek_second() != Some(Token::Keyword(Keyword::In)) {
                    return Ok(None);
                }
                self.advance()?;
                CompareOp::NotIn
            },
            _ => return Ok(None),
        };
        self.advance()?;

        if op == CompareOp::Is && self.next_is(&Token::Keyword(Keyword::Not))? {
            self.advance()?;
            return Ok(Some(CompareOp::IsNot));
        }
        Ok(Some(op))
    }

    fn get_sum(&mut self) -> Result<Node> {
        let mut left = self.get_term()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Operator(Operator::Plus))  => BinaryOp::Add,
                Some(Token::Operator(Operator::Minus)) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.get_term()?;
            let location = left.location;
            left = Expression::Binary(Box::new(left), op, Box::new(right)).with_location(location);
        }
    }

    fn get_term(&mut self) -> Result<Node> {
        let mut left = self.get_factor()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Operator(Operator::Star))        => BinaryOp::Mul,
                Some(Token::Operator(Operator::Slash))       => BinaryOp::Div,
                Some(Token::Operator(Operator::DoubleSlash)) => BinaryOp::FloorDiv,
                Some(Token::Operator(Operator::Percent))     => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.get_factor()?;
            let location = left.location;
            left = Expression::Binary(Box::new(left), op, Box::new(right)).with_location(location);
        }
    }

    fn get_factor(&mut self) -> Result<Node> {
        let op = match self.peek()? {
            Some(Token::Operator(Operator::Plus))  => UnaryOp::Plus,
            Some(Token::Operator(Operator::Minus)) => UnaryOp::Minus,
            _ => return self.get_power(),
        };
        let location = self.next_location();
        self.advance()?;

        // -9223372036854775808 is the one literal whose magnitude alone overflows
        if op == UnaryOp::Minus && self.next_is(&Token::Primitive(Primitive::Integer(i64::MIN.unsigned_abs())))? {
            let followed_by_postfix = matches!(
                self.peek_second(),
                Some(Token::Operator(Operator::DoubleStar)) | Some(Token::LeftParen) | Some(Token::LeftBracket)
            );
            if !followed_by_postfix {
                self.advance()?;
                return Ok(Expression::Constant(Value::Int(i64::MIN)).with_location(location));
            }
        }

        let operand = self.nested(Self::get_factor)?;
        Ok(Expression::Unary(op, Box::new(operand)).with_location(location))
    }

    // `**` binds tighter than a unary sign on its left, looser on its right: -2 ** -1
    fn get_power(&mut self) -> Result<Node> {
        let base = self.get_primary()?;
        if self.next_is(&Token::Operator(Operator::DoubleStar))? {
            self.advance()?;
            let exponent = self.nested(Self::get_factor)?;
            let location = base.location;
            return Ok(Expression::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)).with_location(location));
        }
        Ok(base)
    }

    fn get_primary(&mut self) -> Result<Node> {
        let mut node = self.get_atom()?;
        loop {
            let location = node.location;
            if self.next_is(&Token::LeftParen)? {
                self.advance()?;
                let args = self.get_items(Token::RightParen)?;
                node = Expression::Call(Box::new(node), args).with_location(location);
            } else if self.next_is(&Token::LeftBracket)? {
                self.advance()?;
                let index = self.get_expression()?;
                self.expect(Token::RightBracket)?;
                node = Expression::Subscript(Box::new(node), Box::new(index)).with_location(location);
            } else {
                return Ok(node);
            }
        }
    }

    fn get_atom(&mut self) -> Result<Node> {
        let Located{data: token, location} = self.expect_next()?;
        let expression = match token {
            Token::Name(name) => Expression::Name(name),
            Token::Primitive(Primitive::String(mut string)) => {
                while matches!(self.peek()?, Some(Token::Primitive(Primitive::String(_)))) {
                    if let Some(Located{data: Token::Primitive(Primitive::String(next)), ..}) = self.advance()? {
                        string.push_str(&next);
                    }
                }
                Expression::Constant(Value::Str(string))
            },
            Token::Primitive(p) => Expression::Constant(
                primitive_value(p).map_err(|e| ParseError::LexerError(e).with_location(location))?
            ),
            Token::LeftParen => return self.get_parenthesized(location),
            Token::LeftBracket => Expression::List(self.get_items(Token::RightBracket)?),
            Token::LeftBrace => self.get_brace()?,
            token => return Err(ParseError::UnexpectedToken(token).with_location(location)),
        };
        Ok(expression.with_location(location))
    }

    fn get_parenthesized(&mut self, location: Option<Location>) -> Result<Node> {
        if self.next_is(&Token::RightParen)? {
            self.advance()?;
            return Ok(Expression::Tuple(vec![]).with_location(location));
        }

        let first = self.get_expression()?;
        let Located{data: token, location: token_location} = self.expect_next()?;
        match token {
            Token::RightParen => Ok(first),
            Token::Comma => {
                let mut items = vec![first];
                items.extend(self.get_items(Token::RightParen)?);
                Ok(Expression::Tuple(items).with_location(location))
            },
            t => Err(ParseError::UnexpectedToken(t).with_location(token_location)),
        }
    }

    // comma separated expressions up to `close`, trailing comma allowed
    fn get_items(&mut self, close: Token) -> Result<Vec<Node>> {
        let mut items = vec![];
        loop {
            if self.next_is(&close)? {
                self.advance()?;
                return Ok(items);
            }

            items.push(self.get_expression()?);

            let Located{data: token, location} = self.expect_next()?;
            match token {
                t if t == close => return Ok(items),
                Token::Comma => continue,
                t => return Err(ParseError::UnexpectedToken(t).with_location(location)),
            }
        }
    }

    fn get_brace(&mut self) -> Result<Expression> {
        if self.next_is(&Token::RightBrace)? {
            self.advance()?;
            return Ok(Expression::Dict(vec![]));
        }

        let first = self.get_expression()?;
        if !self.next_is(&Token::Colon)? {
            let Located{data: token, location} = self.expect_next()?;
            return match token {
                Token::RightBrace => Ok(Expression::Set(vec![first])),
                Token::Comma => {
                    let mut items = vec![first];
                    items.extend(self.get_items(Token::RightBrace)?);
                    Ok(Expression::Set(items))
                },
                t => Err(ParseError::UnexpectedToken(t).with_location(location)),
            };
        }

        self.advance()?;
        let mut pairs = vec![(first, self.get_expression()?)];
        loop {
            let Located{data: token, location} = self.expect_next()?;
            match token {
                Token::RightBrace => return Ok(Expression::Dict(pairs)),
                Token::Comma => {
                    if self.next_is(&Token::RightBrace)? {
                        self.advance()?;
                        return Ok(Expression::Dict(pairs));
                    }
                    let key = self.get_expression()?;
                    self.expect(Token::Colon)?;
                    let value = self.get_expression()?;
                    pairs.push((key, value));
                },
                t => return Err(ParseError::UnexpectedToken(t).with_location(location)),
            }
        }
    }

    // unary chains recurse without passing through `get_expression`
    fn nested(&mut self, rule: fn(&mut Self) -> Result<Node>) -> Result<Node> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::TooDeep(self.max_depth).with_location(self.next_location()));
        }
        let node = rule(self)?;
        self.depth -= 1;
        Ok(node)
    }
}

#[cfg(test)]
fn parse(text: &str) -> std::result::Result<Expression, ParseError> {
    parse_expression(text).map(|n| n.extract()).map_err(|e| e.extract())
}

#[cfg(test)]
fn node(expression: Expression, row: u32, col: u32) -> Node {
    expression.with_locate(Location{row, col})
}

#[cfg(test)]
fn int(i: i64, col: u32) -> Node {
    node(Expression::Constant(Value::Int(i)), 0, col)
}

#[test]
fn precedence() {
    // 1 + 2 * 3
    assert_eq!(
        parse("1 + 2 * 3"),
        Ok(Expression::Binary(
            Box::new(int(1, 0)),
            BinaryOp::Add,
            Box::new(node(Expression::Binary(Box::new(int(2, 4)), BinaryOp::Mul, Box::new(int(3, 8))), 0, 4)),
        ))
    );

    // -2 ** 2 is -(2 ** 2)
    assert_eq!(
        parse("-2 ** 2"),
        Ok(Expression::Unary(
            UnaryOp::Minus,
            Box::new(node(Expression::Binary(Box::new(int(2, 1)), BinaryOp::Pow, Box::new(int(2, 6))), 0, 1)),
        ))
    );

    // 2 ** 3 ** 2 is 2 ** (3 ** 2)
    assert_eq!(
        parse("2**3**2"),
        Ok(Expression::Binary(
            Box::new(int(2, 0)),
            BinaryOp::Pow,
            Box::new(node(Expression::Binary(Box::new(int(3, 3)), BinaryOp::Pow, Box::new(int(2, 6))), 0, 3)),
        ))
    );
}

#[test]
fn comparisons() {
    assert_eq!(
        parse("1 < 2 <= 3"),
        Ok(Expression::Compare(
            Box::new(int(1, 0)),
            vec![(CompareOp::Lt, int(2, 4)), (CompareOp::LtE, int(3, 9))],
        ))
    );

    let ops = |text: &str| match parse(text) {
        Ok(Expression::Compare(_, rest)) => rest.into_iter().map(|(op, _)| op).collect::<Vec<_>>(),
        other => panic!("not a comparison: {:?}", other),
    };
    assert_eq!(ops("a not in b"), vec![CompareOp::NotIn]);
    assert_eq!(ops("a is not b"), vec![CompareOp::IsNot]);
    assert_eq!(ops("a in b is c != d"), vec![CompareOp::In, CompareOp::Is, CompareOp::NotEq]);
}

#[test]
fn calls_and_displays() {
    let name = |n: &str, col: u32| node(Expression::Name(n.to_string()), 0, col);

    assert_eq!(
        parse("f(1, x)[0]"),
        Ok(Expression::Subscript(
            Box::new(node(Expression::Call(Box::new(name("f", 0)), vec![int(1, 2), name("x", 5)]), 0, 0)),
            Box::new(int(0, 8)),
        ))
    );

    assert!(matches!(parse("[1, 2,]"), Ok(Expression::List(items)) if items.len() == 2));
    assert!(matches!(parse("(1,)"), Ok(Expression::Tuple(items)) if items.len() == 1));
    assert!(matches!(parse("1, 2"), Ok(Expression::Tuple(items)) if items.len() == 2));
    assert!(matches!(parse("()"), Ok(Expression::Tuple(items)) if items.is_empty()));
    assert!(matches!(parse("{}"), Ok(Expression::Dict(pairs)) if pairs.is_empty()));
    assert!(matches!(parse("{1: 2, 3: 4}"), Ok(Expression::Dict(pairs)) if pairs.len() == 2));
    assert!(matches!(parse("{1, 2}"), Ok(Expression::Set(items)) if items.len() == 2));
    assert_eq!(parse("(7)"), Ok(Expression::Constant(Value::Int(7))));
    assert_eq!(parse("'a' 'b'"), Ok(Expression::Constant(Value::Str("ab".to_string()))));
    assert_eq!(parse("-9223372036854775808"), Ok(Expression::Constant(Value::Int(i64::MIN))));
    assert!(matches!(parse("-9223372036854775808 ** 2"), Err(ParseError::LexerError(LexerError::IntegerOverflow(_)))));
    assert!(matches!(parse("9223372036854775808"), Err(ParseError::LexerError(LexerError::IntegerOverflow(_)))));
}

#[test]
fn boolean_and_conditional() {
    assert!(matches!(parse("a or b and not c"), Ok(Expression::Or(_, right))
        if matches!(right.data, Expression::And(_, _))));
    assert!(matches!(parse("1 if x else 2 if y else 3"), Ok(Expression::Conditional { orelse, .. })
        if matches!(orelse.data, Expression::Conditional { .. })));
}

#[test]
fn syntax_errors() {
    assert_eq!(parse(""), Err(ParseError::UnexpectedEnd));
    assert_eq!(parse("1 +"), Err(ParseError::UnexpectedEnd));
    assert_eq!(parse("(1"), Err(ParseError::UnexpectedEnd));
    assert_eq!(parse("1 2"), Err(ParseError::UnexpectedToken(Token::Primitive(Primitive::Integer(2)))));
    assert_eq!(parse("1 if 2"), Err(ParseError::UnexpectedEnd));
    assert_eq!(parse("a not b"), Err(ParseError::UnexpectedToken(Token::Keyword(Keyword::Not))));
    assert_eq!(parse(")"), Err(ParseError::UnexpectedToken(Token::RightParen)));
    assert_eq!(parse("1 = 1"), Err(ParseError::LexerError(LexerError::UnrecognizedCharacter('='))));

    let deep = format!("{}1{}", "(".repeat(50), ")".repeat(50));
    let parsed = Parser::from(Lexer::new(deep.chars())).with_max_depth(10).parse();
    assert_eq!(parsed.map_err(|e| e.extract()), Err(ParseError::TooDeep(10)));

    let deep = "-".repeat(50) + "1";
    let parsed = Parser::from(Lexer::new(deep.chars())).with_max_depth(10).parse();
    assert_eq!(parsed.map_err(|e| e.extract()), Err(ParseError::TooDeep(10)));
}
