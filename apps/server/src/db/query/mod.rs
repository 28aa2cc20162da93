//! Formula-driven query compilation.
//!
//! A [`ResourceQuery`] applies a [`QueryPayload`] to a base [`Relation`]:
//!
//! 1. validate every `generate` identifier
//! 2. compile each generator and append it as an aliased select expression
//! 3. compile each `filter` formula and AND it into the WHERE clause
//!
//! Formulas are parsed by `polydesk_formula`; compilation is synchronous and
//! performs no I/O. The resulting relation is executed by the caller.

pub mod compiler;
pub mod error;
pub mod escape;
pub mod functions;
pub mod payload;
pub mod planner;
pub mod relation;
pub mod scrub;
pub mod sorting;

pub use error::QueryError;
pub use functions::FunctionRegistry;
pub use payload::{FilterSpec, Generators, QueryPayload};
pub use relation::Relation;
pub use sorting::PrefabSorting;

use compiler::{is_boolean_root, Compiler};
use escape::quote_identifier;
use scrub::IdentifierClass;

/// Output of [`ResourceQuery::compile`].
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub relation: Relation,
    /// Identifier and emitted SQL of every generated column, in order.
    pub generated_columns: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ResourceQuery {
    payload: QueryPayload,
    inner_scope: Relation,
    registry: FunctionRegistry,
    strict_functions: bool,
}

impl ResourceQuery {
    /// Query with the base function table only.
    pub fn new(payload: &QueryPayload) -> Self {
        Self {
            payload: payload.clone(),
            inner_scope: Relation::prefabs(),
            registry: FunctionRegistry::base(),
            strict_functions: false,
        }
    }

    /// Query with lookups and referent aggregates over prefabs.
    pub fn prefab(payload: &QueryPayload) -> Self {
        Self::new(payload).with_functions(FunctionRegistry::prefab())
    }

    /// Relation that lookups and referent aggregates read from. Rows outside
    /// it are invisible to cross-record functions.
    pub fn with_inner_scope(mut self, inner_scope: Relation) -> Self {
        self.inner_scope = inner_scope;
        self
    }

    pub fn with_functions(mut self, registry: FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Reject unknown function names instead of compiling them to NULL.
    pub fn strict_functions(mut self, strict: bool) -> Self {
        self.strict_functions = strict;
        self
    }

    pub fn payload(&self) -> &QueryPayload {
        &self.payload
    }

    pub fn apply(&self, relation: Relation) -> Result<Relation, QueryError> {
        Ok(self.compile(relation)?.relation)
    }

    pub fn compile(&self, relation: Relation) -> Result<CompiledQuery, QueryError> {
        let mut compiler = Compiler::new(&self.inner_scope, &self.registry, self.strict_functions);
        let relation = self.apply_generators(&mut compiler, relation)?;
        let relation = self.apply_filters(&mut compiler, relation)?;

        Ok(CompiledQuery {
            relation,
            generated_columns: compiler.into_generated(),
        })
    }

    fn validate_identifiers(&self, relation: &Relation) -> Result<(), QueryError> {
        for identifier in self.payload.generate.identifiers() {
            // Existing columns such as `namespace` must not be shadowed.
            if relation.has_column(identifier) {
                return Err(QueryError::RestrictedGeneratedColumnIdentifier(
                    identifier.to_string(),
                ));
            }
            if !IdentifierClass::GeneratedColumn.matches(identifier) {
                return Err(QueryError::InvalidGeneratedColumnIdentifier(
                    identifier.to_string(),
                ));
            }
        }
        Ok(())
    }

    fn apply_generators(
        &self,
        compiler: &mut Compiler<'_>,
        mut relation: Relation,
    ) -> Result<Relation, QueryError> {
        self.validate_identifiers(&relation)?;

        for (identifier, formula) in self.payload.generate.iter() {
            let expr = polydesk_formula::parse(formula)?;
            let (next, sql) = compiler.compile(relation, &expr)?;
            tracing::debug!(identifier = %identifier, sql = %sql, "Compiled generated column");

            relation = next.select_append(format!("({}) AS {}", sql, quote_identifier(identifier)));
            compiler.define_generated(identifier, &sql);
        }

        Ok(relation)
    }

    fn apply_filters(
        &self,
        compiler: &mut Compiler<'_>,
        mut relation: Relation,
    ) -> Result<Relation, QueryError> {
        for formula in self.payload.filter.formulas() {
            let expr = polydesk_formula::parse(formula)?;
            if !is_boolean_root(&expr) {
                return Err(QueryError::InvalidFilterExpression(formula.clone()));
            }
            let (next, sql) = compiler.compile(relation, &expr)?;
            tracing::debug!(filter = %formula, sql = %sql, "Compiled filter");

            relation = next.and_where(sql);
        }

        Ok(relation)
    }
}
