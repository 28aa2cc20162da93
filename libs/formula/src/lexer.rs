//! Formula lexer - tokenizes input strings
//!
//! Converts formula strings into a stream of tokens. Tokenization never fails
//! outright: malformed input yields a `TokenType::Error` token whose value
//! carries the message, and the parser reports it with its position.

use crate::error::{Error, Result};
use crate::token::{Token, TokenType};

/// The formula lexer
pub struct Lexer {
    position: usize,
    line: usize,
    column: usize,
    chars: Vec<char>,
    current_char: Option<char>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            position: 0,
            line: 1,
            column: 1,
            chars,
            current_char,
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(c) = self.current_char {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an identifier: [A-Za-z_][A-Za-z0-9_]*
    fn read_identifier(&mut self) -> String {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        self.chars[start_pos..self.position].iter().collect()
    }

    /// Read a string literal delimited by `quote` (either `'` or `"`)
    fn read_string(&mut self, quote: char) -> Result<String> {
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(c) = self.current_char {
            if c == quote {
                self.advance(); // Skip closing quote
                return Ok(value);
            } else if c == '\\' {
                self.advance(); // Skip backslash
                let Some(escaped) = self.current_char else {
                    return Err(Error::ParseError(
                        "Incomplete escape sequence in string literal".into(),
                    ));
                };
                match escaped {
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    // \\, \", \' and any other escaped character stand for themselves
                    other => value.push(other),
                }
                self.advance();
            } else {
                value.push(c);
                self.advance();
            }
        }

        Err(Error::ParseError("Unterminated string literal".into()))
    }

    /// Read a number: digits with an optional fractional part
    fn read_number(&mut self) -> String {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Only consume the dot when digits follow it
        if self.current_char == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(); // Skip '.'
            while let Some(c) = self.current_char {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.chars[start_pos..self.position].iter().collect()
    }

    /// Consume the current character plus an optional second one, producing
    /// `double` when the second character matches and `single` otherwise.
    fn one_or_two(
        &mut self,
        second: char,
        double: (TokenType, &str),
        single: (TokenType, &str),
    ) -> Token {
        let (position, line, column) = (self.position, self.line, self.column);
        self.advance();
        if self.current_char == Some(second) {
            self.advance();
            Token::new(double.0, double.1.into(), position, line, column)
        } else {
            Token::new(single.0, single.1.into(), position, line, column)
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.position;
        let line = self.line;
        let column = self.column;

        let Some(c) = self.current_char else {
            return Token::eof(position, line, column);
        };

        let single = |lexer: &mut Lexer, token_type: TokenType, text: &str| {
            lexer.advance();
            Token::new(token_type, text.into(), position, line, column)
        };

        match c {
            '(' => single(self, TokenType::OpenParen, "("),
            ')' => single(self, TokenType::CloseParen, ")"),
            ',' => single(self, TokenType::Comma, ","),
            '+' => single(self, TokenType::Plus, "+"),
            '-' => single(self, TokenType::Minus, "-"),
            '/' => single(self, TokenType::Divide, "/"),
            '%' => single(self, TokenType::Percent, "%"),
            '^' => single(self, TokenType::Caret, "^"),
            '~' => single(self, TokenType::Tilde, "~"),
            '*' => self.one_or_two(
                '*',
                (TokenType::Power, "**"),
                (TokenType::Multiply, "*"),
            ),
            '&' => self.one_or_two(
                '&',
                (TokenType::DoubleAmpersand, "&&"),
                (TokenType::Ampersand, "&"),
            ),
            '|' => self.one_or_two(
                '|',
                (TokenType::DoublePipe, "||"),
                (TokenType::Pipe, "|"),
            ),
            '=' => self.one_or_two('=', (TokenType::Equal, "=="), (TokenType::Equal, "=")),
            '!' => self.one_or_two('=', (TokenType::NotEqual, "!="), (TokenType::Bang, "!")),
            '<' => {
                self.advance();
                match self.current_char {
                    Some('=') => {
                        self.advance();
                        Token::new(TokenType::LessThanOrEqual, "<=".into(), position, line, column)
                    }
                    Some('<') => {
                        self.advance();
                        Token::new(TokenType::ShiftLeft, "<<".into(), position, line, column)
                    }
                    _ => Token::new(TokenType::LessThan, "<".into(), position, line, column),
                }
            }
            '>' => {
                self.advance();
                match self.current_char {
                    Some('=') => {
                        self.advance();
                        Token::new(
                            TokenType::GreaterThanOrEqual,
                            ">=".into(),
                            position,
                            line,
                            column,
                        )
                    }
                    Some('>') => {
                        self.advance();
                        Token::new(TokenType::ShiftRight, ">>".into(), position, line, column)
                    }
                    _ => Token::new(TokenType::GreaterThan, ">".into(), position, line, column),
                }
            }
            '\'' | '"' => match self.read_string(c) {
                Ok(value) => Token::new(TokenType::StringLiteral, value, position, line, column),
                Err(e) => Token::error(format!("String error: {}", e), position, line, column),
            },
            _ if c.is_ascii_digit() => {
                let value = self.read_number();
                Token::new(TokenType::NumberLiteral, value, position, line, column)
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let ident = self.read_identifier();
                let token_type = match ident.as_str() {
                    "true" | "false" => TokenType::BooleanLiteral,
                    "and" => TokenType::And,
                    "or" => TokenType::Or,
                    _ => TokenType::Identifier,
                };
                Token::new(token_type, ident, position, line, column)
            }
            _ => Token::error(
                format!("Unexpected character: {}", c),
                position,
                line,
                column,
            ),
        }
    }
}
