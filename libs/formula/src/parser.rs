//! Formula parser - converts formula strings to AST
//!
//! Recursive descent parser. Precedence (lowest to highest):
//! 1. `||`, `or`
//! 2. `&&`, `and`
//! 3. `|` (bitwise or)
//! 4. `^` (bitwise xor)
//! 5. `&` (bitwise and)
//! 6. equality (`=`, `==`, `!=`)
//! 7. relational (`<`, `<=`, `>`, `>=`)
//! 8. shift (`<<`, `>>`)
//! 9. additive (`+`, `-`)
//! 10. multiplicative (`*`, `/`, `%`)
//! 11. prefix (`-`, `+`, `!`, `~`)
//! 12. power (`**`, right associative)
//! 13. primary (literal, variable, function call, parenthesized)
//!
//! `a / b` is produced as `a * inverse(b)` so that downstream consumers see
//! a single multiplicative operator and an explicit reciprocal.

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parser for formula expressions
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    recursion_depth: usize,
}

const MAX_RECURSION_DEPTH: usize = 200;

impl Parser {
    /// Create a new parser for the given input string
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Self {
            lexer,
            current_token,
            recursion_depth: 0,
        }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current_token, next)
    }

    fn current_token_is(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    fn current_token_is_one_of(&self, types: &[TokenType]) -> bool {
        types.contains(&self.current_token.token_type)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = &self.current_token;
        match token.token_type {
            TokenType::Error => Error::ParseError(format!(
                "{} at line {}, column {}",
                token.value, token.line, token.column
            )),
            TokenType::Eof => Error::ParseError(format!(
                "Expected {}, but reached end of input",
                expected
            )),
            _ => Error::ParseError(format!(
                "Expected {}, got '{}' at line {}, column {}",
                expected, token.value, token.line, token.column
            )),
        }
    }

    fn expect(&mut self, token_type: TokenType, expected: &str) -> Result<Token> {
        if self.current_token_is(token_type) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Parse the entire formula (top-level entry point)
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_expression()?;

        if !self.current_token_is(TokenType::Eof) {
            return Err(self.unexpected("end of input"));
        }

        Ok(expr)
    }

    fn enter(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(Error::ParseError(format!(
                "Expression too deeply nested (max depth: {})",
                MAX_RECURSION_DEPTH
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.recursion_depth -= 1;
    }

    /// Every operator folded into a left-associative chain adds a tree level.
    fn deepen(&mut self, chained: &mut usize) -> Result<()> {
        *chained += 1;
        self.enter()
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = self.parse_or_expression()?;
        self.leave();
        Ok(expr)
    }

    fn logical(left: Expr, operator: LogicalOperator, right: Expr) -> Expr {
        Expr::Logical {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    fn binary(left: Expr, operator: BinaryOperator, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    /// Parse or expression: expression ('||' | 'or') expression
    fn parse_or_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_and_expression()?;

        while self.current_token_is_one_of(&[TokenType::DoublePipe, TokenType::Or]) {
            self.deepen(&mut chained)?;
            self.advance();
            let right = self.parse_and_expression()?;
            left = Self::logical(left, LogicalOperator::Or, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    /// Parse and expression: expression ('&&' | 'and') expression
    fn parse_and_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_bitwise_or_expression()?;

        while self.current_token_is_one_of(&[TokenType::DoubleAmpersand, TokenType::And]) {
            self.deepen(&mut chained)?;
            self.advance();
            let right = self.parse_bitwise_or_expression()?;
            left = Self::logical(left, LogicalOperator::And, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    fn parse_bitwise_or_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_bitwise_xor_expression()?;

        while self.current_token_is(TokenType::Pipe) {
            self.deepen(&mut chained)?;
            self.advance();
            let right = self.parse_bitwise_xor_expression()?;
            left = Self::binary(left, BinaryOperator::BitwiseOr, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    fn parse_bitwise_xor_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_bitwise_and_expression()?;

        while self.current_token_is(TokenType::Caret) {
            self.deepen(&mut chained)?;
            self.advance();
            let right = self.parse_bitwise_and_expression()?;
            left = Self::binary(left, BinaryOperator::BitwiseXor, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    fn parse_bitwise_and_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_equality_expression()?;

        while self.current_token_is(TokenType::Ampersand) {
            self.deepen(&mut chained)?;
            self.advance();
            let right = self.parse_equality_expression()?;
            left = Self::binary(left, BinaryOperator::BitwiseAnd, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    /// Parse equality expression: expression ('=' | '==' | '!=') expression
    fn parse_equality_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_relational_expression()?;

        while self.current_token_is_one_of(&[TokenType::Equal, TokenType::NotEqual]) {
            self.deepen(&mut chained)?;
            let op = match self.advance().token_type {
                TokenType::Equal => LogicalOperator::Equal,
                _ => LogicalOperator::NotEqual,
            };
            let right = self.parse_relational_expression()?;
            left = Self::logical(left, op, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    /// Parse relational expression: expression ('<' | '<=' | '>' | '>=') expression
    fn parse_relational_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_shift_expression()?;

        while self.current_token_is_one_of(&[
            TokenType::LessThan,
            TokenType::LessThanOrEqual,
            TokenType::GreaterThan,
            TokenType::GreaterThanOrEqual,
        ]) {
            self.deepen(&mut chained)?;
            let op = match self.advance().token_type {
                TokenType::LessThan => LogicalOperator::LessThan,
                TokenType::LessThanOrEqual => LogicalOperator::LessThanOrEqual,
                TokenType::GreaterThan => LogicalOperator::GreaterThan,
                _ => LogicalOperator::GreaterThanOrEqual,
            };
            let right = self.parse_shift_expression()?;
            left = Self::logical(left, op, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    fn parse_shift_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_additive_expression()?;

        while self.current_token_is_one_of(&[TokenType::ShiftLeft, TokenType::ShiftRight]) {
            self.deepen(&mut chained)?;
            let op = match self.advance().token_type {
                TokenType::ShiftLeft => BinaryOperator::ShiftLeft,
                _ => BinaryOperator::ShiftRight,
            };
            let right = self.parse_additive_expression()?;
            left = Self::binary(left, op, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    /// Parse additive expression: expression ('+' | '-') expression
    fn parse_additive_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_multiplicative_expression()?;

        while self.current_token_is_one_of(&[TokenType::Plus, TokenType::Minus]) {
            self.deepen(&mut chained)?;
            let op = match self.advance().token_type {
                TokenType::Plus => BinaryOperator::Add,
                _ => BinaryOperator::Subtract,
            };
            let right = self.parse_multiplicative_expression()?;
            left = Self::binary(left, op, right);
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    /// Parse multiplicative expression: expression ('*' | '/' | '%') expression
    fn parse_multiplicative_expression(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let mut left = self.parse_prefix_expression()?;

        while self.current_token_is_one_of(&[
            TokenType::Multiply,
            TokenType::Divide,
            TokenType::Percent,
        ]) {
            self.deepen(&mut chained)?;
            let token_type = self.advance().token_type;
            let right = self.parse_prefix_expression()?;
            left = match token_type {
                TokenType::Multiply => Self::binary(left, BinaryOperator::Multiply, right),
                TokenType::Divide => Self::binary(
                    left,
                    BinaryOperator::Multiply,
                    Expr::Unary {
                        operator: UnaryOperator::Inverse,
                        operand: Box::new(right),
                    },
                ),
                _ => Self::binary(left, BinaryOperator::Modulo, right),
            };
        }

        self.recursion_depth -= chained;
        Ok(left)
    }

    /// Parse prefix expression: ('-' | '+' | '!' | '~') expression
    fn parse_prefix_expression(&mut self) -> Result<Expr> {
        let operator = match self.current_token.token_type {
            TokenType::Minus => UnaryOperator::Minus,
            TokenType::Plus => UnaryOperator::Plus,
            TokenType::Bang => UnaryOperator::Not,
            TokenType::Tilde => UnaryOperator::BitwiseNot,
            _ => return self.parse_power_expression(),
        };
        self.advance();

        self.enter()?;
        let operand = self.parse_prefix_expression()?;
        self.leave();

        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    /// Parse power expression: primary ('**' prefix)?
    /// The exponent is parsed at prefix level, which makes `**` right associative
    /// and lets `2 ** -1` parse.
    fn parse_power_expression(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;

        if self.current_token_is(TokenType::Power) {
            self.advance();
            self.enter()?;
            let exponent = self.parse_prefix_expression()?;
            self.leave();
            return Ok(Self::binary(base, BinaryOperator::Power, exponent));
        }

        Ok(base)
    }

    /// Parse primary: literal | identifier | identifier '(' args ')' | '(' expression ')'
    fn parse_primary(&mut self) -> Result<Expr> {
        match self.current_token.token_type {
            TokenType::NumberLiteral => {
                let token = self.advance();
                parse_number(&token).map(Expr::Literal)
            }
            TokenType::StringLiteral => {
                let token = self.advance();
                Ok(Expr::Literal(Literal::String(token.value)))
            }
            TokenType::BooleanLiteral => {
                let token = self.advance();
                Ok(Expr::Literal(Literal::Boolean(token.value == "true")))
            }
            TokenType::Identifier => {
                let token = self.advance();
                if self.current_token_is(TokenType::OpenParen) {
                    self.advance();
                    let arguments = self.parse_arguments()?;
                    Ok(Expr::Function {
                        name: token.value,
                        arguments,
                    })
                } else {
                    Ok(Expr::Variable(token.value))
                }
            }
            // `and(...)` and `or(...)` are calls, not infix keywords, in operand position
            TokenType::And | TokenType::Or => {
                let name = match self.advance().token_type {
                    TokenType::And => "and",
                    _ => "or",
                };
                self.expect(TokenType::OpenParen, "'(' after function name")?;
                let arguments = self.parse_arguments()?;
                Ok(Expr::Function {
                    name: name.to_string(),
                    arguments,
                })
            }
            TokenType::OpenParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenType::CloseParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("an operand")),
        }
    }

    /// Parse call arguments after the opening parenthesis, consuming the closing one
    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut arguments = Vec::new();

        if self.current_token_is(TokenType::CloseParen) {
            self.advance();
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_expression()?);
            if self.current_token_is(TokenType::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenType::CloseParen, "',' or ')'")?;
            return Ok(arguments);
        }
    }
}

fn parse_number(token: &Token) -> Result<Literal> {
    if !token.value.contains('.') {
        if let Ok(i) = token.value.parse::<i64>() {
            return Ok(Literal::Integer(i));
        }
    }
    Decimal::from_str(&token.value)
        .map(Literal::Decimal)
        .map_err(|_| {
            Error::ParseError(format!(
                "Number '{}' out of range at line {}, column {}",
                token.value, token.line, token.column
            ))
        })
}
