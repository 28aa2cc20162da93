//! Identifier scrubbing.
//!
//! Any string that is interpolated into SQL text as an identifier, alias or
//! JSON path segment goes through [`validate`] first. Sub-expressions are
//! exempt: they are compiled into SQL rather than pasted in.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Character classes accepted for raw identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierClass {
    /// Blueprint namespaces: `^[a-z]+$`
    Namespace,
    /// Column names and `data.` paths: `^[-_.a-zA-Z0-9]+$`
    Path,
    /// Output aliases for generated columns: `^[a-zA-Z_][a-zA-Z0-9_]*$`
    GeneratedColumn,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a valid {class:?} identifier")]
pub struct InvalidIdentifier {
    pub candidate: String,
    pub class: IdentifierClass,
}

impl IdentifierClass {
    fn regex(self) -> &'static Regex {
        static NAMESPACE: OnceLock<Regex> = OnceLock::new();
        static PATH: OnceLock<Regex> = OnceLock::new();
        static GENERATED_COLUMN: OnceLock<Regex> = OnceLock::new();

        match self {
            IdentifierClass::Namespace => {
                NAMESPACE.get_or_init(|| Regex::new(r"^[a-z]+$").expect("valid regex"))
            }
            IdentifierClass::Path => {
                PATH.get_or_init(|| Regex::new(r"^[-_.a-zA-Z0-9]+$").expect("valid regex"))
            }
            IdentifierClass::GeneratedColumn => GENERATED_COLUMN
                .get_or_init(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("valid regex")),
        }
    }

    pub fn matches(self, candidate: &str) -> bool {
        self.regex().is_match(candidate)
    }
}

/// Return `candidate` unchanged if it belongs to `class`.
pub fn validate(candidate: &str, class: IdentifierClass) -> Result<&str, InvalidIdentifier> {
    if class.matches(candidate) {
        Ok(candidate)
    } else {
        Err(InvalidIdentifier {
            candidate: candidate.to_string(),
            class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_class() {
        assert!(validate("employees", IdentifierClass::Namespace).is_ok());
        assert!(validate("Employees", IdentifierClass::Namespace).is_err());
        assert!(validate("emp_loyees", IdentifierClass::Namespace).is_err());
        assert!(validate("", IdentifierClass::Namespace).is_err());
    }

    #[test]
    fn test_path_class() {
        assert!(validate("data.job", IdentifierClass::Path).is_ok());
        assert!(validate("data.first-name_2", IdentifierClass::Path).is_ok());
        assert!(validate("data.a'b", IdentifierClass::Path).is_err());
        assert!(validate("data.a b", IdentifierClass::Path).is_err());
        assert!(validate("data.a\n", IdentifierClass::Path).is_err());
        assert!(validate("(data__string)), * from prefabs --", IdentifierClass::Path).is_err());
    }

    #[test]
    fn test_generated_column_class() {
        assert!(validate("total_2", IdentifierClass::GeneratedColumn).is_ok());
        assert!(validate("_x", IdentifierClass::GeneratedColumn).is_ok());
        assert!(validate("2x", IdentifierClass::GeneratedColumn).is_err());
        assert!(validate("a-b", IdentifierClass::GeneratedColumn).is_err());
    }

    #[test]
    fn test_error_message_omits_candidate() {
        let err = validate("a;b", IdentifierClass::Path).unwrap_err();
        assert_eq!(err.candidate, "a;b");
        assert_eq!(err.class, IdentifierClass::Path);
        assert_eq!(err.to_string(), "not a valid Path identifier");
    }
}
