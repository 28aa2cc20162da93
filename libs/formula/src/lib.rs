//! Polydesk formula language
//!
//! Formulas are the small expression language used by generated columns and
//! filters. This crate only turns text into an [`ast::Expr`] tree:
//!
//! ```text
//! Formula String
//!      |
//!   Lexer -> Tokens
//!      |
//!   Parser -> AST
//! ```
//!
//! Compiling the tree to SQL lives with the query engine in the server.
//!
//! ```
//! use polydesk_formula::{parse, ast::Expr};
//!
//! let expr = parse("lookup_s(prop('data.job'), 'data.name')").unwrap();
//! assert!(matches!(expr, Expr::Function { .. }));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{BinaryOperator, Expr, Literal, LogicalOperator, UnaryOperator};
pub use error::{Error, Result};
pub use parser::Parser;

/// Parse a formula into its expression tree.
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(input).parse()
}
