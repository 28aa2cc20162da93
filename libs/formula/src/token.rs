//! Token types for the formula lexer

/// Token types for the formula lexer
#[derive(Debug, PartialEq, Clone, Eq)]
pub enum TokenType {
    // Literals
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,

    // Identifiers
    Identifier,

    // Keywords
    And, // and
    Or,  // or

    // Arithmetic operators
    Plus,     // +
    Minus,    // -
    Multiply, // *
    Divide,   // /
    Percent,  // %
    Power,    // **

    // Bitwise operators
    Ampersand,  // &
    Pipe,       // |
    Caret,      // ^
    Tilde,      // ~
    ShiftLeft,  // <<
    ShiftRight, // >>

    // Logical operators
    DoubleAmpersand,    // &&
    DoublePipe,         // ||
    Bang,               // !
    Equal,              // = or ==
    NotEqual,           // !=
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=

    // Delimiters
    OpenParen,  // (
    CloseParen, // )
    Comma,      // ,

    // End of input
    Eof,

    // Error
    Error,
}

/// A token in a formula
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: String,
        position: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value,
            position,
            line,
            column,
        }
    }

    pub fn eof(position: usize, line: usize, column: usize) -> Self {
        Self::new(TokenType::Eof, String::new(), position, line, column)
    }

    pub fn error(message: String, position: usize, line: usize, column: usize) -> Self {
        Self::new(TokenType::Error, message, position, line, column)
    }
}
