//! Property-based tests for query compilation using QuickCheck

use polydesk::db::query::{QueryError, QueryPayload, Relation, ResourceQuery};
use polydesk_formula::ast::Literal;
use quickcheck::{QuickCheck, TestResult};

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn compile_generator(formula: &str) -> Result<String, QueryError> {
    let payload = QueryPayload::from_json(&serde_json::json!({ "generate": { "x": formula } }))?;
    ResourceQuery::prefab(&payload)
        .apply(Relation::prefabs())
        .map(|relation| relation.to_sql())
}

/// Property: a remote path with any character outside the path class is
/// rejected and never reaches the SQL text
#[test]
fn prop_unsafe_lookup_paths_are_rejected() {
    fn prop(suffix: String) -> TestResult {
        if suffix.chars().all(is_path_char) {
            return TestResult::discard();
        }
        let path = format!("data.{}", suffix);
        let formula = format!(
            "lookup_s('data.ref', {})",
            Literal::String(path.clone())
        );
        match compile_generator(&formula) {
            Err(QueryError::GeneratorFunctionArgument(message)) => {
                TestResult::from_bool(!message.contains(&path))
            }
            _ => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(300)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: namespace arguments outside `[a-z]+` are rejected
#[test]
fn prop_unsafe_namespaces_are_rejected() {
    fn prop(namespace: String) -> TestResult {
        if !namespace.is_empty() && namespace.chars().all(|c| c.is_ascii_lowercase()) {
            return TestResult::discard();
        }
        let formula = format!(
            "referent_count({}, 'data.parent')",
            Literal::String(namespace)
        );
        TestResult::from_bool(matches!(
            compile_generator(&formula),
            Err(QueryError::GeneratorFunctionArgument(_))
        ))
    }

    QuickCheck::new()
        .tests(300)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: string literals always compile to one quoted SQL literal
#[test]
fn prop_string_literals_are_quoted() {
    fn prop(s: String) -> TestResult {
        let formula = format!("concat({})", Literal::String(s.clone()));
        match compile_generator(&formula) {
            Ok(sql) => {
                let quoted = format!("'{}'", s.replace('\'', "''"));
                TestResult::from_bool(sql.contains(&format!("(({})::text)", quoted)))
            }
            Err(_) => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(300)
        .quickcheck(prop as fn(String) -> TestResult);
}
