//! Formula AST to SQL compilation.
//!
//! [`Compiler::compile`] threads the working relation through every call and
//! returns it alongside the emitted SQL fragment, since functions such as
//! `lookup_s` extend the relation with joins as a side effect. A compiler is
//! built per query application, so its alias counter and generated columns
//! never outlive one pass.

use super::error::QueryError;
use super::escape::quote_literal;
use super::functions::{FunctionKind, FunctionRegistry};
use super::planner::{JoinPlanner, ReferentMeasure};
use super::relation::Relation;
use super::scrub::{self, IdentifierClass};
use polydesk_formula::ast::{BinaryOperator, Expr, Literal, LogicalOperator, UnaryOperator};

type Compiled = Result<(Relation, String), QueryError>;

/// A function argument that is either a scrubbed raw identifier or SQL
/// compiled from a sub-expression.
enum Argument<'e> {
    Identifier(&'e str),
    Expression(String),
}

pub struct Compiler<'a> {
    inner: &'a Relation,
    registry: &'a FunctionRegistry,
    strict_functions: bool,
    lookup_id: usize,
    generated: Vec<(String, String)>,
}

impl<'a> Compiler<'a> {
    pub fn new(inner: &'a Relation, registry: &'a FunctionRegistry, strict_functions: bool) -> Self {
        Self {
            inner,
            registry,
            strict_functions,
            lookup_id: 0,
            generated: Vec::new(),
        }
    }

    fn next_lookup_id(&mut self) -> usize {
        self.lookup_id += 1;
        self.lookup_id
    }

    /// Make a compiled generated column visible to later formulas by name.
    pub fn define_generated(&mut self, identifier: &str, sql: &str) {
        match self.generated.iter_mut().find(|(id, _)| id == identifier) {
            Some(entry) => entry.1 = sql.to_string(),
            None => self
                .generated
                .push((identifier.to_string(), sql.to_string())),
        }
    }

    pub fn into_generated(self) -> Vec<(String, String)> {
        self.generated
    }

    pub fn compile(&mut self, scope: Relation, expr: &Expr) -> Compiled {
        match expr {
            Expr::Literal(literal) => Ok((scope, compile_literal(literal))),
            Expr::Variable(name) => self.compile_variable(scope, name),
            Expr::Unary { operator, operand } => {
                let (scope, operand) = self.compile(scope, operand)?;
                let sql = match operator {
                    UnaryOperator::Inverse => format!("(1.0 / ({}))", operand),
                    UnaryOperator::Minus => format!("(-({}))", operand),
                    UnaryOperator::Plus => format!("(+({}))", operand),
                    UnaryOperator::BitwiseNot => format!("(~({}))", operand),
                    UnaryOperator::Not => format!("(NOT ({}))", operand),
                };
                Ok((scope, sql))
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let (scope, left) = self.compile(scope, left)?;
                let (scope, right) = self.compile(scope, right)?;
                Ok((
                    scope,
                    format!("({} {} {})", left, binary_operator_sql(*operator), right),
                ))
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let (scope, left) = self.compile(scope, left)?;
                let (scope, right) = self.compile(scope, right)?;
                Ok((
                    scope,
                    format!("(({}) {} ({}))", left, logical_operator_sql(*operator), right),
                ))
            }
            Expr::Function { name, arguments } => self.compile_function(scope, name, arguments),
        }
    }

    fn compile_variable(&self, scope: Relation, name: &str) -> Compiled {
        let sql = match name {
            "PI" => "pi()".to_string(),
            "E" => "exp(1)".to_string(),
            _ => {
                if let Some((_, sql)) = self.generated.iter().find(|(id, _)| id == name) {
                    format!("({})", sql)
                } else if scope.has_column(name) {
                    scope.local_column(name)?
                } else {
                    // Identifier tokens are [A-Za-z_][A-Za-z0-9_]*, safe as a path segment.
                    format!("({}::numeric)", scope.local_column(&format!("data.{}", name))?)
                }
            }
        };
        Ok((scope, sql))
    }

    fn compile_function(&mut self, scope: Relation, name: &str, args: &[Expr]) -> Compiled {
        let Some(spec) = self.registry.resolve(name) else {
            if self.strict_functions {
                return Err(QueryError::UnknownFunction(name.to_string()));
            }
            tracing::warn!(function = %name, "Unknown formula function compiled to NULL");
            return Ok((scope, "null".to_string()));
        };
        FunctionRegistry::validate_args(spec, args.len())?;

        match spec.kind {
            FunctionKind::Prop => {
                let (scope, argument) =
                    self.identifier_or_expression(scope, name, args, 0, IdentifierClass::Path)?;
                let sql = match argument {
                    Argument::Identifier(path) => scope.local_column(path)?,
                    Argument::Expression(sql) => sql,
                };
                Ok((scope, sql))
            }
            FunctionKind::Concat => {
                let (scope, parts) = self.compile_all(scope, args)?;
                let parts: Vec<String> = parts.iter().map(|p| format!("(({})::text)", p)).collect();
                Ok((scope, format!("(concat({}))", parts.join(", "))))
            }
            FunctionKind::Coalesce => {
                let (scope, parts) = self.compile_all(scope, args)?;
                Ok((scope, format!("coalesce({})", parts.join(", "))))
            }
            FunctionKind::Sqrt => {
                let (scope, value) = self.compile(scope, &args[0])?;
                Ok((scope, format!("sqrt(({})::numeric)", value)))
            }
            FunctionKind::Pow => {
                let (scope, base) = self.compile(scope, &args[0])?;
                let (scope, exponent) = self.compile(scope, &args[1])?;
                Ok((
                    scope,
                    format!("power(({})::numeric, ({})::numeric)", base, exponent),
                ))
            }
            FunctionKind::And | FunctionKind::Or => {
                let keyword = if spec.kind == FunctionKind::And {
                    " AND "
                } else {
                    " OR "
                };
                let (scope, parts) = self.compile_all(scope, args)?;
                let parts: Vec<String> = parts.iter().map(|p| format!("({})", p)).collect();
                Ok((scope, format!("({})", parts.join(keyword))))
            }
            FunctionKind::Not => {
                let (scope, value) = self.compile(scope, &args[0])?;
                Ok((scope, format!("(NOT ({}))", value)))
            }
            FunctionKind::Lookup(cast) => {
                let (scope, local) =
                    self.identifier_or_expression(scope, name, args, 0, IdentifierClass::Path)?;
                let local = match local {
                    Argument::Identifier(path) => scope.local_column(path)?,
                    Argument::Expression(sql) => sql,
                };
                let remote = identifier_arg(name, args, 1, IdentifierClass::Path)?;
                let id = self.next_lookup_id();
                JoinPlanner::new(self.inner).lookup(scope, id, cast, &local, remote)
            }
            FunctionKind::LookupVia(cast) => {
                let namespace = identifier_arg(name, args, 0, IdentifierClass::Namespace)?;
                let left = identifier_arg(name, args, 1, IdentifierClass::Path)?;
                let right = identifier_arg(name, args, 2, IdentifierClass::Path)?;
                let remote = identifier_arg(name, args, 3, IdentifierClass::Path)?;
                let id = self.next_lookup_id();
                JoinPlanner::new(self.inner).lookup_via(
                    scope,
                    id,
                    cast,
                    &quote_literal(namespace),
                    left,
                    right,
                    remote,
                )
            }
            FunctionKind::ReferentAggregate(_)
            | FunctionKind::ReferentCount
            | FunctionKind::ReferentCountDistinct => {
                let (scope, namespace) = self.identifier_or_expression(
                    scope,
                    name,
                    args,
                    0,
                    IdentifierClass::Namespace,
                )?;
                let namespace = match namespace {
                    Argument::Identifier(namespace) => quote_literal(namespace),
                    Argument::Expression(sql) => sql,
                };
                let referrer = identifier_arg(name, args, 1, IdentifierClass::Path)?;
                let measure = match spec.kind {
                    FunctionKind::ReferentAggregate(aggregate) => ReferentMeasure::Aggregate {
                        aggregate,
                        dimension: identifier_arg(name, args, 2, IdentifierClass::Path)?,
                    },
                    FunctionKind::ReferentCountDistinct => ReferentMeasure::CountDistinct {
                        dimension: identifier_arg(name, args, 2, IdentifierClass::Path)?,
                    },
                    _ => ReferentMeasure::Count,
                };
                let id = self.next_lookup_id();
                JoinPlanner::new(self.inner).referent(scope, id, measure, &namespace, referrer)
            }
        }
    }

    fn compile_all(
        &mut self,
        mut scope: Relation,
        args: &[Expr],
    ) -> Result<(Relation, Vec<String>), QueryError> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            let (next, sql) = self.compile(scope, arg)?;
            scope = next;
            parts.push(sql);
        }
        Ok((scope, parts))
    }

    fn identifier_or_expression<'e>(
        &mut self,
        scope: Relation,
        function: &str,
        args: &'e [Expr],
        index: usize,
        class: IdentifierClass,
    ) -> Result<(Relation, Argument<'e>), QueryError> {
        match &args[index] {
            Expr::Literal(_) => Ok((
                scope,
                Argument::Identifier(identifier_arg(function, args, index, class)?),
            )),
            other => {
                let (scope, sql) = self.compile(scope, other)?;
                Ok((scope, Argument::Expression(sql)))
            }
        }
    }
}

/// A string literal argument that passes the scrubber for `class`.
fn identifier_arg<'e>(
    function: &str,
    args: &'e [Expr],
    index: usize,
    class: IdentifierClass,
) -> Result<&'e str, QueryError> {
    match &args[index] {
        Expr::Literal(Literal::String(value)) => scrub::validate(value, class)
            .map_err(|_| QueryError::disallowed_literal(function, index)),
        _ => Err(QueryError::must_be_string(function, index)),
    }
}

fn compile_literal(literal: &Literal) -> String {
    match literal {
        Literal::String(value) => quote_literal(value),
        Literal::Integer(value) => value.to_string(),
        Literal::Decimal(value) => value.to_string(),
        Literal::Boolean(value) => value.to_string(),
    }
}

fn binary_operator_sql(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Modulo => "%",
        BinaryOperator::Power => "^",
        BinaryOperator::BitwiseAnd => "&",
        BinaryOperator::BitwiseOr => "|",
        BinaryOperator::BitwiseXor => "#",
        BinaryOperator::ShiftLeft => "<<",
        BinaryOperator::ShiftRight => ">>",
    }
}

fn logical_operator_sql(operator: LogicalOperator) -> &'static str {
    match operator {
        LogicalOperator::Equal => "=",
        LogicalOperator::NotEqual => "!=",
        LogicalOperator::LessThan => "<",
        LogicalOperator::LessThanOrEqual => "<=",
        LogicalOperator::GreaterThan => ">",
        LogicalOperator::GreaterThanOrEqual => ">=",
        LogicalOperator::And => "AND",
        LogicalOperator::Or => "OR",
    }
}

/// Whether a formula can stand as a WHERE predicate on its own.
pub fn is_boolean_root(expr: &Expr) -> bool {
    match expr {
        Expr::Logical { .. } => true,
        Expr::Unary {
            operator: UnaryOperator::Not,
            ..
        } => true,
        Expr::Function { name, .. } => matches!(name.as_str(), "and" | "or" | "not"),
        Expr::Literal(Literal::Boolean(_)) => true,
        _ => false,
    }
}
