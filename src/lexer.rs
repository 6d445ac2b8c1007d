use std::iter::Iterator;
use peekmore::{PeekMore, PeekMoreIterator};

use super::{Token, Primitive, Keyword, Operator, Located, Location, LexerError, ToLocated};

pub struct Lexer<CharIter: Iterator<Item = char>> {
    char_stream: PeekMoreIterator<CharIter>,
    advance_location: Location,
    peek_location: Location,
}

type Result<T> = std::result::Result<T, Located<LexerError>>;

impl<CharIter: Iterator<Item = char>> Iterator for Lexer<CharIter> {
    type Item = Result<Located<Token>>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.get_next_token() {
            Ok(None) => None,
            Ok(Some(token)) => Some(Ok(token)),
            Err(e) => Some(Err(e)),
        }
    }
}

impl<CharIter: Iterator<Item = char>> Lexer<CharIter> {
    pub fn new(char_stream: CharIter) -> Self {
        Self {
            char_stream: char_stream.peekmore(),
            advance_location: Location{row: 0, col: 0},
            peek_location: Location{row: 0, col: 0},
        }
    }

    fn get_next_token(&mut self) -> Result<Option<Located<Token>>> {
        while let (Some(ch), location) = self.peek_with_location() {
            return Ok(Some(match ch {
                _ if is_whitespace(ch) => {self.advance(); continue},
                '#' => {self.reset(); self.skip_line_comment(); continue},
                '(' => {self.advance(); Token::LeftParen},
                ')' => {self.advance(); Token::RightParen},
                '[' => {self.advance(); Token::LeftBracket},
                ']' => {self.advance(); Token::RightBracket},
                '{' => {self.advance(); Token::LeftBrace},
                '}' => {self.advance(); Token::RightBrace},
                ',' => {self.advance(); Token::Comma},
                ':' => {self.advance(); Token::Colon},
                '+' => {self.advance(); Token::Operator(Operator::Plus)},
                '-' => {self.advance(); Token::Operator(Operator::Minus)},
                '%' => {self.advance(); Token::Operator(Operator::Percent)},
                '*' => match self.peek() {
                    Some('*') => {self.advance_n(2); Token::Operator(Operator::DoubleStar)},
                    _         => {self.advance();    Token::Operator(Operator::Star)},
                },
                '/' => match self.peek() {
                    Some('/') => {self.advance_n(2); Token::Operator(Operator::DoubleSlash)},
                    _         => {self.advance();    Token::Operator(Operator::Slash)},
                },
                '<' => match self.peek() {
                    Some('=') => {self.advance_n(2); Token::Operator(Operator::LessEqual)},
                    _         => {self.advance();    Token::Operator(Operator::Less)},
                },
                '>' => match self.peek() {
                    Some('=') => {self.advance_n(2); Token::Operator(Operator::GreaterEqual)},
                    _         => {self.advance();    Token::Operator(Operator::Greater)},
                },
                '=' => match self.peek() {
                    Some('=') => {self.advance_n(2); Token::Operator(Operator::Equal)},
                    _         => return located_error!(LexerError::UnrecognizedCharacter('='), location),
                },
                '!' => match self.peek() {
                    Some('=') => {self.advance_n(2); Token::Operator(Operator::NotEqual)},
                    _         => return located_error!(LexerError::UnrecognizedCharacter('!'), location),
                },
                '.' => match self.peek() {
                    Some('0'..='9') => {self.reset(); self.get_number(location)?},
                    _ => return located_error!(LexerError::UnrecognizedCharacter('.'), location),
                },
                '0'..='9' => {self.reset(); self.get_number(location)?},
                '\'' | '"' => {self.reset(); self.get_string(location)?},
                ch if is_name_initial(ch) => {self.reset(); self.get_name()},
                ch => return located_error!(LexerError::UnrecognizedCharacter(ch), location),
            }.with_locate(location)))
        }

        Ok(None)
    }

    // <number> -> <integer> | <float>
    // <integer> -> 0x<hex> | 0o<oct> | 0b<bin> | <decimal>
    fn get_number(&mut self, location: Location) -> Result<Token> {
        let (first, second) = (self.peek(), self.peek());
        self.reset();
        if first == Some('0') {
            let radix = match second {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                return self.get_radix_integer(radix, location);
            }
        }

        let mut text = String::new();
        let mut is_float = false;
        self.take_while(&mut text, |c| c.is_ascii_digit() || c == '_');

        if self.peek() == Some('.') {
            self.advance();
            is_float = true;
            text.push('.');
            self.take_while(&mut text, |c| c.is_ascii_digit() || c == '_');
        } else {
            self.reset();
        }

        match (self.peek(), self.peek()) {
            (Some(e @ 'e'), next) | (Some(e @ 'E'), next) => {
                let has_sign = next == Some('+') || next == Some('-');
                self.reset();
                self.advance();
                is_float = true;
                text.push(e);
                if has_sign {
                    if let Some(sign) = self.advance() {
                        text.push(sign);
                    }
                }
                let before = text.len();
                self.take_while(&mut text, |c| c.is_ascii_digit() || c == '_');
                if text.len() == before {
                    return located_error!(LexerError::InvalidNumber(text), location);
                }
            },
            _ => self.reset(),
        }

        self.reject_name_suffix(&mut text, location)?;
        if !has_valid_underscores(&text, |c| c.is_ascii_digit()) {
            return located_error!(LexerError::InvalidNumber(text), location);
        }

        let digits: String = text.chars().filter(|c| *c != '_').collect();
        if is_float {
            let normalized = normalize_float(&digits);
            match normalized.parse::<f64>() {
                Ok(x) => Ok(Token::Primitive(Primitive::Float(x))),
                Err(_) => located_error!(LexerError::InvalidNumber(text), location),
            }
        } else {
            // only zero may have leading zeros
            if digits.len() > 1 && digits.starts_with('0') && digits.chars().any(|c| c != '0') {
                return located_error!(LexerError::InvalidNumber(text), location);
            }
            match digits.parse::<u64>() {
                Ok(i) if i <= i64::MIN.unsigned_abs() => Ok(Token::Primitive(Primitive::Integer(i))),
                _ => located_error!(LexerError::IntegerOverflow(text), location),
            }
        }
    }

    fn get_radix_integer(&mut self, radix: u32, location: Location) -> Result<Token> {
        let mut text = String::new();
        for _ in 0..2 {
            if let Some(ch) = self.advance() {
                text.push(ch);
            }
        }

        let prefix_len = text.len();
        self.take_while(&mut text, |c| c.is_digit(radix) || c == '_');
        self.reject_name_suffix(&mut text, location)?;

        let body = &text[prefix_len..];
        // an underscore may also follow the prefix directly: 0x_ff
        let body_ok = !body.is_empty() && has_valid_underscores(&format!("0{}", body), |c| c.is_digit(radix));
        if !body_ok {
            return located_error!(LexerError::InvalidNumber(text), location);
        }

        let digits: String = body.chars().filter(|c| *c != '_').collect();
        match u64::from_str_radix(&digits, radix) {
            Ok(i) if i <= i64::MIN.unsigned_abs() => Ok(Token::Primitive(Primitive::Integer(i))),
            _ => located_error!(LexerError::IntegerOverflow(text), location),
        }
    }

    fn reject_name_suffix(&mut self, text: &mut String, location: Location) -> Result<()> {
        match self.peek() {
            Some(ch) if is_name_subsequent(ch) => {
                text.push(ch);
                located_error!(LexerError::InvalidNumber(text.clone()), location)
            },
            _ => {
                self.reset();
                Ok(())
            },
        }
    }

    fn get_string(&mut self, location: Location) -> Result<Token> {
        let quote = match self.advance() {
            Some(ch) => ch,
            None => return located_error!(LexerError::UnexpectedEnd, location),
        };
        debug_assert!(quote == '\'' || quote == '"');

        let triple = match (self.peek(), self.peek()) {
            (Some(a), Some(b)) if a == quote && b == quote => {self.advance_n(2); true},
            (Some(a), _) if a == quote => {
                self.advance();
                return Ok(Token::Primitive(Primitive::String(String::new())));
            },
            _ => {self.reset(); false},
        };

        let mut string_literal = String::new();
        while let Some(ch) = self.advance() {
            match ch {
                c if c == quote && !triple => return Ok(Token::Primitive(Primitive::String(string_literal))),
                c if c == quote => match (self.peek(), self.peek()) {
                    (Some(a), Some(b)) if a == quote && b == quote => {
                        self.advance_n(2);
                        return Ok(Token::Primitive(Primitive::String(string_literal)));
                    },
                    _ => {self.reset(); string_literal.push(c)},
                },
                '\n' if !triple => return located_error!(LexerError::UnterminatedString, location),
                '\\' => self.get_escape(&mut string_literal, location)?,
                _ => string_literal.push(ch),
            }
        }

        located_error!(LexerError::UnterminatedString, location)
    }

    fn get_escape(&mut self, string_literal: &mut String, location: Location) -> Result<()> {
        let escape_location = self.advance_location;
        let ec = match self.advance() {
            Some(ec) => ec,
            None => return located_error!(LexerError::UnterminatedString, location),
        };

        match ec {
            '\n' => (),
            '\\' => string_literal.push('\\'),
            '\'' => string_literal.push('\''),
            '"'  => string_literal.push('"'),
            'a'  => string_literal.push('\u{007}'),
            'b'  => string_literal.push('\u{008}'),
            'f'  => string_literal.push('\u{00c}'),
            'v'  => string_literal.push('\u{00b}'),
            't'  => string_literal.push('\t'),
            'n'  => string_literal.push('\n'),
            'r'  => string_literal.push('\r'),
            '0'..='7' => {
                let mut digits = ec.to_string();
                self.take_while_max(&mut digits, 2, |c| c.is_digit(8));
                let code = u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32);
                match code {
                    Some(c) => string_literal.push(c),
                    None => return located_error!(LexerError::InvalidEscape(ec), escape_location),
                }
            },
            'x' | 'u' | 'U' => {
                let width = match ec {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut digits = String::new();
                self.take_while_max(&mut digits, width, |c| c.is_ascii_hexdigit());
                let code = if digits.len() == width {
                    u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
                } else {
                    None
                };
                match code {
                    Some(c) => string_literal.push(c),
                    None => return located_error!(LexerError::InvalidEscape(ec), escape_location),
                }
            },
            // unknown escapes are kept verbatim
            _ => {
                string_literal.push('\\');
                string_literal.push(ec);
            },
        }
        Ok(())
    }

    fn get_name(&mut self) -> Token {
        let mut name = String::new();
        self.take_while(&mut name, is_name_subsequent);

        match name.as_str() {
            "True"  => Token::Primitive(Primitive::Boolean(true)),
            "False" => Token::Primitive(Primitive::Boolean(false)),
            "None"  => Token::Primitive(Primitive::None),
            _ => match Keyword::from_name(&name) {
                Some(keyword) => Token::Keyword(keyword),
                None => Token::Name(name),
            },
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, text: &mut String, pred: F) {
        self.take_while_max(text, usize::MAX, pred)
    }

    fn take_while_max<F: Fn(char) -> bool>(&mut self, text: &mut String, max: usize, pred: F) {
        let mut taken = 0;
        while taken < max {
            match self.peek() {
                Some(ch) if pred(ch) => {
                    self.advance();
                    text.push(ch);
                    taken += 1;
                },
                _ => break,
            }
        }
        self.reset();
    }

    fn peek_with_location(&mut self) -> (Option<char>, Location) {
        let location = self.peek_location;
        let ch = self.char_stream.peek().copied();
        self.char_stream.advance_cursor();
        if let Some(ch) = ch {
            move_location(ch, &mut self.peek_location)
        }
        (ch, location)
    }

    fn peek(&mut self) -> Option<char> {
        self.peek_with_location().0
    }

    fn reset(&mut self) {
        self.char_stream.reset_cursor();
        self.peek_location = self.advance_location;
    }

    fn advance(&mut self) -> Option<char> {
        self.char_stream.reset_cursor();
        let ch = self.char_stream.next();

        if let Some(ch) = ch {
            move_location(ch, &mut self.advance_location)
        }
        self.peek_location = self.advance_location;
        ch
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        let start = self.advance();
        debug_assert_eq!(Some('#'), start);

        while let Some(ch) = self.advance() {
            match ch {
                '\n' | '\r'  => break,
                _ => (),
            }
        }
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{00c}')
}

fn is_name_initial(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_subsequent(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn move_location(ch: char, location: &mut Location) {
    match ch {
        '\n' => {
            location.row += 1;
            location.col = 0;
        },
        _ => location.col += 1,
    }
}

// every '_' sits between two digits
fn has_valid_underscores<F: Fn(char) -> bool>(text: &str, is_digit: F) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars.iter().enumerate().all(|(i, c)| {
        *c != '_' || (
            i > 0 && is_digit(chars[i - 1]) &&
            chars.get(i + 1).map_or(false, |n| is_digit(*n))
        )
    })
}

// "1." -> "1.0", ".5" -> "0.5", "1.e3" -> "1.0e3"
fn normalize_float(digits: &str) -> String {
    let mut normalized = String::with_capacity(digits.len() + 2);
    let mut previous = None;
    for ch in digits.chars() {
        if ch == '.' && previous.map_or(true, |p: char| !p.is_ascii_digit()) {
            normalized.push('0');
        }
        if previous == Some('.') && !ch.is_ascii_digit() {
            normalized.push('0');
        }
        normalized.push(ch);
        previous = Some(ch);
    }
    if previous == Some('.') {
        normalized.push('0');
    }
    normalized
}

#[cfg(test)]
fn tokenize(text: &str) -> Result<Vec<Token>> {
    let c = Lexer::new(text.chars());
    Ok(c.collect::<Result<Vec<_>>>()?
        .into_iter()
        .map(|l| l.extract())
        .collect())
}

#[test]
fn names_and_keywords() -> Result<()> {
    assert_eq!(
        tokenize("x _tmp len2 True False None and or not in is if else Nonesuch")?,
        vec![
            Token::Name(String::from("x")),
            Token::Name(String::from("_tmp")),
            Token::Name(String::from("len2")),
            Token::Primitive(Primitive::Boolean(true)),
            Token::Primitive(Primitive::Boolean(false)),
            Token::Primitive(Primitive::None),
            Token::Keyword(Keyword::And),
            Token::Keyword(Keyword::Or),
            Token::Keyword(Keyword::Not),
            Token::Keyword(Keyword::In),
            Token::Keyword(Keyword::Is),
            Token::Keyword(Keyword::If),
            Token::Keyword(Keyword::Else),
            Token::Name(String::from("Nonesuch")),
        ]
    );
    Ok(())
}

#[test]
fn number() -> Result<()> {
    assert_eq!(
        tokenize("0 00 123 1_000 0x_ff 0o17 0b101 1.5 1. .25 3e-3 3.3E+3 1.e2")?,
        vec![
            Token::Primitive(Primitive::Integer(0)),
            Token::Primitive(Primitive::Integer(0)),
            Token::Primitive(Primitive::Integer(123)),
            Token::Primitive(Primitive::Integer(1000)),
            Token::Primitive(Primitive::Integer(255)),
            Token::Primitive(Primitive::Integer(15)),
            Token::Primitive(Primitive::Integer(5)),
            Token::Primitive(Primitive::Float(1.5)),
            Token::Primitive(Primitive::Float(1.0)),
            Token::Primitive(Primitive::Float(0.25)),
            Token::Primitive(Primitive::Float(0.003)),
            Token::Primitive(Primitive::Float(3300.0)),
            Token::Primitive(Primitive::Float(100.0)),
        ]
    );
    // one past i64::MAX is left for a leading '-' to claim
    assert_eq!(
        tokenize("9223372036854775808 0x8000000000000000")?,
        vec![Token::Primitive(Primitive::Integer(1 << 63)); 2]
    );
    Ok(())
}

#[test]
fn bad_number() {
    let tests = vec![
        ("012", LexerError::InvalidNumber(String::from("012"))),
        ("1__0", LexerError::InvalidNumber(String::from("1__0"))),
        ("10_", LexerError::InvalidNumber(String::from("10_"))),
        ("1abc", LexerError::InvalidNumber(String::from("1a"))),
        ("0x", LexerError::InvalidNumber(String::from("0x"))),
        ("1e", LexerError::InvalidNumber(String::from("1e"))),
        ("1_e5", LexerError::InvalidNumber(String::from("1_e5"))),
        ("1.5_e2", LexerError::InvalidNumber(String::from("1.5_e2"))),
        ("1e_5", LexerError::InvalidNumber(String::from("1e_5"))),
        ("1_.5", LexerError::InvalidNumber(String::from("1_.5"))),
        ("9223372036854775809", LexerError::IntegerOverflow(String::from("9223372036854775809"))),
        ("18446744073709551616", LexerError::IntegerOverflow(String::from("18446744073709551616"))),
        ("0x8000000000000001", LexerError::IntegerOverflow(String::from("0x8000000000000001"))),
    ];

    for (text, expected) in tests {
        assert_eq!(tokenize(text).map_err(|e| e.extract()), Err(expected), "{}", text);
    }
}

#[test]
fn string() -> Result<()> {
    assert_eq!(
        tokenize(r#"'a' "b" '' "it's" 'q\'\"' '\x41é\101' '\n\t\\' '\d' '''x'y''' """two
lines""""#)?,
        vec![
            Token::Primitive(Primitive::String(String::from("a"))),
            Token::Primitive(Primitive::String(String::from("b"))),
            Token::Primitive(Primitive::String(String::from(""))),
            Token::Primitive(Primitive::String(String::from("it's"))),
            Token::Primitive(Primitive::String(String::from("q'\""))),
            Token::Primitive(Primitive::String(String::from("A\u{e9}A"))),
            Token::Primitive(Primitive::String(String::from("\n\t\\"))),
            Token::Primitive(Primitive::String(String::from("\\d"))),
            Token::Primitive(Primitive::String(String::from("x'y"))),
            Token::Primitive(Primitive::String(String::from("two\nlines"))),
        ]
    );
    Ok(())
}

#[test]
fn bad_string() {
    assert_eq!(tokenize("'abc").map_err(|e| e.extract()), Err(LexerError::UnterminatedString));
    assert_eq!(tokenize("'a\nb'").map_err(|e| e.extract()), Err(LexerError::UnterminatedString));
    assert_eq!(tokenize(r"'\x4'").map_err(|e| e.extract()), Err(LexerError::InvalidEscape('x')));
}

#[test]
fn operators() -> Result<()> {
    assert_eq!(
        tokenize("+-***///%==!=<<=>>=()[]{},:")?,
        vec![
            Token::Operator(Operator::Plus),
            Token::Operator(Operator::Minus),
            Token::Operator(Operator::DoubleStar),
            Token::Operator(Operator::Star),
            Token::Operator(Operator::DoubleSlash),
            Token::Operator(Operator::Slash),
            Token::Operator(Operator::Percent),
            Token::Operator(Operator::Equal),
            Token::Operator(Operator::NotEqual),
            Token::Operator(Operator::Less),
            Token::Operator(Operator::LessEqual),
            Token::Operator(Operator::Greater),
            Token::Operator(Operator::GreaterEqual),
            Token::LeftParen,
            Token::RightParen,
            Token::LeftBracket,
            Token::RightBracket,
            Token::LeftBrace,
            Token::RightBrace,
            Token::Comma,
            Token::Colon,
        ]
    );
    Ok(())
}

#[test]
fn whitespace_and_comments() -> Result<()> {
    assert_eq!(
        tokenize(" \t1 # one\n\r+ 2 # two")?,
        vec![
            Token::Primitive(Primitive::Integer(1)),
            Token::Operator(Operator::Plus),
            Token::Primitive(Primitive::Integer(2)),
        ]
    );
    Ok(())
}

#[test]
fn location() -> Result<()> {
    let tokens = Lexer::new("[1,\n  'x']".chars()).collect::<Result<Vec<_>>>()?;
    let locations: Vec<_> = tokens.iter().map(|t| t.location.unwrap()).collect();
    assert_eq!(
        locations,
        vec![
            Location{row: 0, col: 0},
            Location{row: 0, col: 1},
            Location{row: 0, col: 2},
            Location{row: 1, col: 2},
            Location{row: 1, col: 5},
        ]
    );

    let error = tokenize("1 = 2").unwrap_err();
    assert_eq!(error.location, Some(Location{row: 0, col: 2}));
    assert_eq!(error.data, LexerError::UnrecognizedCharacter('='));
    Ok(())
}
