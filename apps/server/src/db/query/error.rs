//! Errors raised while compiling a query payload.
//!
//! Every variant is a deterministic function of the request payload, so all
//! of them surface to clients as `400 Bad Request`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("{0}")]
    Parse(#[from] polydesk_formula::Error),

    #[error("Generator function argument error: {0}")]
    GeneratorFunctionArgument(String),

    #[error("Invalid property identifier: {0}")]
    InvalidPropertyIdentifier(String),

    #[error("Invalid filter expression: {0}")]
    InvalidFilterExpression(String),

    #[error("Generated column identifier is restricted: {0}")]
    RestrictedGeneratedColumnIdentifier(String),

    #[error("Invalid generated column identifier: {0}")]
    InvalidGeneratedColumnIdentifier(String),

    #[error("Unknown function: {0}()")]
    UnknownFunction(String),

    #[error("Invalid query payload: {0}")]
    InvalidPayload(String),
}

impl QueryError {
    /// Stable machine-readable code used in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Parse(_) => "parse_error",
            QueryError::GeneratorFunctionArgument(_) => "generator_function_argument",
            QueryError::InvalidPropertyIdentifier(_) => "invalid_property_identifier",
            QueryError::InvalidFilterExpression(_) => "invalid_filter_expression",
            QueryError::RestrictedGeneratedColumnIdentifier(_) => {
                "restricted_generated_column_identifier"
            }
            QueryError::InvalidGeneratedColumnIdentifier(_) => {
                "invalid_generated_column_identifier"
            }
            QueryError::UnknownFunction(_) => "unknown_function",
            QueryError::InvalidPayload(_) => "invalid_payload",
        }
    }

    pub(crate) fn disallowed_literal(function: &str, index: usize) -> Self {
        QueryError::GeneratorFunctionArgument(format!(
            "Argument at index {} for {}() is a literal with disallowed characters",
            index, function
        ))
    }

    pub(crate) fn must_be_string(function: &str, index: usize) -> Self {
        QueryError::GeneratorFunctionArgument(format!(
            "Argument at index {} for {}() must be a string",
            index, function
        ))
    }
}
