//! Unit tests for the formula parser

use polydesk_formula::ast::{Expr, Literal, LogicalOperator};
use polydesk_formula::parse;

/// Parse and render back into fully parenthesised form
fn render(input: &str) -> String {
    parse(input)
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", input, e))
        .to_string()
}

fn error(input: &str) -> String {
    parse(input)
        .expect_err(&format!("expected {:?} to fail", input))
        .to_string()
}

#[test]
fn test_parse_literals() {
    assert_eq!(parse("42").unwrap(), Expr::integer(42));
    assert_eq!(parse("'hello'").unwrap(), Expr::string("hello"));
    assert_eq!(parse("true").unwrap(), Expr::Literal(Literal::Boolean(true)));
    assert!(matches!(
        parse("3.14").unwrap(),
        Expr::Literal(Literal::Decimal(_))
    ));
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(render("1 + 2 * 3"), "(1 + (2 * 3))");
    assert_eq!(render("(1 + 2) * 3"), "((1 + 2) * 3)");
    assert_eq!(render("1 - 2 - 3"), "((1 - 2) - 3)");
    assert_eq!(render("7 % 4 + 1"), "((7 % 4) + 1)");
}

#[test]
fn test_division_is_inverse() {
    assert_eq!(render("6 / 4"), "(6 * (1 / 4))");
    assert_eq!(render("a / b / c"), "((a * (1 / b)) * (1 / c))");
}

#[test]
fn test_bitwise_precedence() {
    assert_eq!(render("1 | 2 ^ 3 & 4"), "(1 | (2 ^ (3 & 4)))");
    assert_eq!(render("1 << 2 + 3"), "(1 << (2 + 3))");
    assert_eq!(render("1 & 2 == 2"), "(1 & (2 == 2))");
}

#[test]
fn test_logical_precedence() {
    assert_eq!(render("a and b or c"), "((a && b) || c)");
    assert_eq!(render("a || b && c"), "(a || (b && c))");
    assert_eq!(render("1 < 2 == true"), "((1 < 2) == true)");
}

#[test]
fn test_single_and_double_equals() {
    let single = parse("x = 1").unwrap();
    let double = parse("x == 1").unwrap();
    assert_eq!(single, double);
    assert!(matches!(
        single,
        Expr::Logical {
            operator: LogicalOperator::Equal,
            ..
        }
    ));
}

#[test]
fn test_prefix_operators() {
    assert_eq!(render("-x"), "-x");
    assert_eq!(render("!x"), "!x");
    assert_eq!(render("~x"), "~x");
    assert_eq!(render("- -x"), "--x");
    assert_eq!(render("-2 ** 2"), "-(2 ** 2)");
    assert_eq!(render("2 ** -1"), "(2 ** -1)");
}

#[test]
fn test_function_calls() {
    assert_eq!(render("PI()"), "PI()");
    assert_eq!(
        render("concat('a', \"b\", 1 + 2)"),
        "concat(\"a\", \"b\", (1 + 2))"
    );
    assert_eq!(
        render("lookup_s(lookup_s(prop('data.job'), 'data.company'), 'data.name')"),
        "lookup_s(lookup_s(prop(\"data.job\"), \"data.company\"), \"data.name\")"
    );
}

#[test]
fn test_variables() {
    assert_eq!(parse("PI").unwrap(), Expr::Variable("PI".into()));
    assert_eq!(render("left + right"), "(left + right)");
}

#[test]
fn test_errors() {
    assert!(error("1 +").contains("end of input"));
    assert!(error("(1").contains("')'"));
    assert!(error("foo(1,)").contains("got ')'"));
    assert!(error("1 2").contains("Expected end of input, got '2'"));
    assert!(error("").contains("end of input"));
}

#[test]
fn test_error_positions() {
    assert_eq!(
        error("1 + $"),
        "Parse error: Unexpected character: $ at line 1, column 5"
    );
    assert!(error("a +\n  @").contains("line 2, column 3"));
    assert!(error("'open").contains("Unterminated string literal"));
}

#[test]
fn test_nesting_limit() {
    let ok = format!("{}1{}", "(".repeat(100), ")".repeat(100));
    assert!(parse(&ok).is_ok());

    let too_deep = format!("{}1{}", "(".repeat(300), ")".repeat(300));
    assert!(error(&too_deep).contains("too deeply nested"));
}

#[test]
fn test_and_or_calls() {
    assert_eq!(render("and(true, false)"), "and(true, false)");
    assert_eq!(render("or(a, b, c)"), "or(a, b, c)");
    assert_eq!(
        render("or(tag = 'a', tag = 'b')"),
        "or((tag == \"a\"), (tag == \"b\"))"
    );
    assert_eq!(render("a and or(b, c)"), "(a && or(b, c))");
    assert_eq!(render("and(x, y) or z"), "(and(x, y) || z)");
    assert!(error("and").contains("'(' after function name"));
}

#[test]
fn test_long_operator_chain_is_rejected() {
    let ok = vec!["1"; 150].join(" + ");
    assert!(parse(&ok).is_ok());

    let sum = vec!["1"; 50_000].join("+");
    assert!(error(&sum).contains("too deeply nested"));

    let conjunction = vec!["x = 1"; 50_000].join(" and ");
    assert!(error(&conjunction).contains("too deeply nested"));
}
