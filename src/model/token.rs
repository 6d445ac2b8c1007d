use std::fmt;

use super::ToLocated;

#[derive(PartialEq, Debug, Clone)]
pub enum Token {
    Name(String),
    Keyword(Keyword),

    Primitive(Primitive),

    Operator(Operator),

    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }
    Comma,        // ,
    Colon,        // :
}

impl ToLocated for Token {}

#[derive(PartialEq, Debug, Clone)]
pub enum Primitive {
    None,
    Boolean(bool),
    // magnitude only; up to 2**63 so that a leading '-' can reach i64::MIN
    Integer(u64),
    Float(f64),
    String(String),
}

#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Keyword {
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Else,
}

impl Keyword {
    pub fn from_name(name: &str) -> Option<Keyword> {
        match name {
            "and"  => Some(Keyword::And),
            "or"   => Some(Keyword::Or),
            "not"  => Some(Keyword::Not),
            "in"   => Some(Keyword::In),
            "is"   => Some(Keyword::Is),
            "if"   => Some(Keyword::If),
            "else" => Some(Keyword::Else),
            _      => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::And  => "and",
            Keyword::Or   => "or",
            Keyword::Not  => "not",
            Keyword::In   => "in",
            Keyword::Is   => "is",
            Keyword::If   => "if",
            Keyword::Else => "else",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Operator {
    Plus,         // +
    Minus,        // -
    Star,         // *
    DoubleStar,   // **
    Slash,        // /
    DoubleSlash,  // //
    Percent,      // %
    Equal,        // ==
    NotEqual,     // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Plus         => "+",
            Operator::Minus        => "-",
            Operator::Star         => "*",
            Operator::DoubleStar   => "**",
            Operator::Slash        => "/",
            Operator::DoubleSlash  => "//",
            Operator::Percent      => "%",
            Operator::Equal        => "==",
            Operator::NotEqual     => "!=",
            Operator::Less         => "<",
            Operator::LessEqual    => "<=",
            Operator::Greater      => ">",
            Operator::GreaterEqual => ">=",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "name '{}'", name),
            Token::Keyword(keyword) => write!(f, "keyword '{}'", keyword.as_str()),
            Token::Primitive(Primitive::None) => write!(f, "'None'"),
            Token::Primitive(Primitive::Boolean(true)) => write!(f, "'True'"),
            Token::Primitive(Primitive::Boolean(false)) => write!(f, "'False'"),
            Token::Primitive(Primitive::Integer(i)) => write!(f, "number {}", i),
            Token::Primitive(Primitive::Float(x)) => write!(f, "number {}", x),
            Token::Primitive(Primitive::String(s)) => write!(f, "string {:?}", s),
            Token::Operator(op) => write!(f, "'{}'", op.as_str()),
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
            Token::LeftBracket => write!(f, "'['"),
            Token::RightBracket => write!(f, "']'"),
            Token::LeftBrace => write!(f, "'{{'"),
            Token::RightBrace => write!(f, "'}}'"),
            Token::Comma => write!(f, "','"),
            Token::Colon => write!(f, "':'"),
        }
    }
}
