//! SQL quoting helpers.
//!
//! Formula string literals are embedded into SQL text rather than bound as
//! parameters, because compiled relations are themselves embedded as
//! subqueries. Quoting assumes `standard_conforming_strings = on` (the
//! Postgres default), under which backslashes are literal.

/// Quote a string as a SQL literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Quote a string as a SQL identifier, doubling embedded double quotes.
pub fn quote_identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
