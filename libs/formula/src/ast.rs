//! Abstract Syntax Tree (AST) representation
//!
//! One formula parses into one tree rooted at a single [`Expr`]. The node
//! kinds form a closed set so that every consumer matches them exhaustively:
//!
//! - `Literal`: string, integer, decimal or boolean constant
//! - `Variable`: a bare identifier such as `PI` or `left`
//! - `Unary`: prefix operator applied to one operand
//! - `Binary`: arithmetic or bitwise infix operator
//! - `Logical`: comparison or boolean infix operator
//! - `Function`: named call with an ordered argument list
//!
//! Arity is not checked here; that is a concern of whoever compiles the tree.

use rust_decimal::Decimal;
use std::fmt;

/// AST node representing a formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),

    Variable(String),

    Unary {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },

    Binary {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
    },

    Logical {
        left: Box<Expr>,
        operator: LogicalOperator,
        right: Box<Expr>,
    },

    Function {
        name: String,
        arguments: Vec<Expr>,
    },
}

/// Literal constants
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,       // +
    Minus,      // -
    Not,        // !
    BitwiseNot, // ~
    /// Reciprocal. Produced by the parser for the right-hand side of `/`.
    Inverse,
}

/// Arithmetic and bitwise infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,        // +
    Subtract,   // -
    Multiply,   // *
    Modulo,     // %
    Power,      // **
    BitwiseAnd, // &
    BitwiseOr,  // |
    BitwiseXor, // ^
    ShiftLeft,  // <<
    ShiftRight, // >>
}

/// Comparison and boolean infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    Equal,              // = or ==
    NotEqual,           // !=
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    And,                // && or and
    Or,                 // || or or
}

impl Expr {
    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        Expr::Literal(Literal::Integer(value))
    }
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::Inverse => "1/",
        }
    }
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        }
    }
}

impl LogicalOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOperator::Equal => "==",
            LogicalOperator::NotEqual => "!=",
            LogicalOperator::LessThan => "<",
            LogicalOperator::LessThanOrEqual => "<=",
            LogicalOperator::GreaterThan => ">",
            LogicalOperator::GreaterThanOrEqual => ">=",
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Decimal(d) => write!(f, "{}", d),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Renders the tree back into fully parenthesised formula syntax.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Unary {
                operator: UnaryOperator::Inverse,
                operand,
            } => write!(f, "(1 / {})", operand),
            Expr::Unary { operator, operand } => write!(f, "{}{}", operator.symbol(), operand),
            Expr::Binary {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
            Expr::Logical {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
            Expr::Function { name, arguments } => {
                write!(f, "{}(", name)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ")")
            }
        }
    }
}
