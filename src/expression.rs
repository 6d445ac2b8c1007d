use super::{Located, ToLocated, Value};

pub type Node = Located<Expression>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Value),
    Name(String),

    List(Vec<Node>),
    Tuple(Vec<Node>),
    Set(Vec<Node>),
    Dict(Vec<(Node, Node)>),

    Unary(UnaryOp, Box<Node>),
    Binary(Box<Node>, BinaryOp, Box<Node>),
    // a < b <= c
    Compare(Box<Node>, Vec<(CompareOp, Node)>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    // body if test else orelse
    Conditional {
        test: Box<Node>,
        body: Box<Node>,
        orelse: Box<Node>,
    },

    Call(Box<Node>, Vec<Node>),
    Subscript(Box<Node>, Box<Node>),
}

impl ToLocated for Expression {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add      => "+",
            BinaryOp::Sub      => "-",
            BinaryOp::Mul      => "*",
            BinaryOp::Div      => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod      => "%",
            BinaryOp::Pow      => "**",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq    => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt    => "<",
            CompareOp::LtE   => "<=",
            CompareOp::Gt    => ">",
            CompareOp::GtE   => ">=",
            CompareOp::In    => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is    => "is",
            CompareOp::IsNot => "is not",
        }
    }
}
