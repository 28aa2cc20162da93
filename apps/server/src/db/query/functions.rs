//! Function registry for formula calls
//!
//! Maps function names to their compiled form and arity. Tables are static
//! compile-time perfect hash maps; a [`FunctionRegistry`] layers several of
//! them so that the prefab functions extend the base set without touching it.

use super::error::QueryError;
use phf::phf_map;

/// SQL type a looked-up value is cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    Text,
    Integer,
    Float,
    Boolean,
    Numeric,
}

impl Cast {
    pub fn sql(self) -> &'static str {
        match self {
            Cast::Text => "text",
            Cast::Integer => "integer",
            Cast::Float => "float",
            Cast::Boolean => "boolean",
            Cast::Numeric => "numeric",
        }
    }
}

/// Aggregate applied over referring records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn sql(self) -> &'static str {
        match self {
            Aggregate::Sum => "sum",
            Aggregate::Avg => "avg",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Prop,
    Concat,
    Coalesce,
    Sqrt,
    Pow,
    And,
    Or,
    Not,
    Lookup(Cast),
    LookupVia(Cast),
    ReferentAggregate(Aggregate),
    ReferentCount,
    ReferentCountDistinct,
}

/// Function metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>, // None = unbounded
    pub kind: FunctionKind,
}

pub type FunctionTable = phf::Map<&'static str, FunctionSpec>;

/// Functions available to every query.
pub static BASE_FUNCTIONS: FunctionTable = phf_map! {
    "prop" => FunctionSpec { name: "prop", min_args: 1, max_args: Some(1), kind: FunctionKind::Prop },
    "concat" => FunctionSpec { name: "concat", min_args: 1, max_args: None, kind: FunctionKind::Concat },
    "coalesce" => FunctionSpec { name: "coalesce", min_args: 2, max_args: Some(2), kind: FunctionKind::Coalesce },
    "sqrt" => FunctionSpec { name: "sqrt", min_args: 1, max_args: Some(1), kind: FunctionKind::Sqrt },
    "pow" => FunctionSpec { name: "pow", min_args: 2, max_args: Some(2), kind: FunctionKind::Pow },
    "and" => FunctionSpec { name: "and", min_args: 2, max_args: None, kind: FunctionKind::And },
    "or" => FunctionSpec { name: "or", min_args: 2, max_args: None, kind: FunctionKind::Or },
    "not" => FunctionSpec { name: "not", min_args: 1, max_args: Some(1), kind: FunctionKind::Not },
};

/// Cross-record functions for prefab queries.
pub static PREFAB_FUNCTIONS: FunctionTable = phf_map! {
    "lookup_s" => FunctionSpec { name: "lookup_s", min_args: 2, max_args: Some(2), kind: FunctionKind::Lookup(Cast::Text) },
    "lookup_i" => FunctionSpec { name: "lookup_i", min_args: 2, max_args: Some(2), kind: FunctionKind::Lookup(Cast::Integer) },
    "lookup_f" => FunctionSpec { name: "lookup_f", min_args: 2, max_args: Some(2), kind: FunctionKind::Lookup(Cast::Float) },
    "lookup_b" => FunctionSpec { name: "lookup_b", min_args: 2, max_args: Some(2), kind: FunctionKind::Lookup(Cast::Boolean) },

    "lookup_via_s" => FunctionSpec { name: "lookup_via_s", min_args: 4, max_args: Some(4), kind: FunctionKind::LookupVia(Cast::Text) },
    "lookup_via_i" => FunctionSpec { name: "lookup_via_i", min_args: 4, max_args: Some(4), kind: FunctionKind::LookupVia(Cast::Integer) },
    "lookup_via_f" => FunctionSpec { name: "lookup_via_f", min_args: 4, max_args: Some(4), kind: FunctionKind::LookupVia(Cast::Float) },
    "lookup_via_b" => FunctionSpec { name: "lookup_via_b", min_args: 4, max_args: Some(4), kind: FunctionKind::LookupVia(Cast::Boolean) },

    "referent_sum" => FunctionSpec { name: "referent_sum", min_args: 3, max_args: Some(3), kind: FunctionKind::ReferentAggregate(Aggregate::Sum) },
    "referent_avg" => FunctionSpec { name: "referent_avg", min_args: 3, max_args: Some(3), kind: FunctionKind::ReferentAggregate(Aggregate::Avg) },
    "referent_min" => FunctionSpec { name: "referent_min", min_args: 3, max_args: Some(3), kind: FunctionKind::ReferentAggregate(Aggregate::Min) },
    "referent_max" => FunctionSpec { name: "referent_max", min_args: 3, max_args: Some(3), kind: FunctionKind::ReferentAggregate(Aggregate::Max) },
    "referent_count" => FunctionSpec { name: "referent_count", min_args: 2, max_args: Some(2), kind: FunctionKind::ReferentCount },
    "referent_count_distinct" => FunctionSpec { name: "referent_count_distinct", min_args: 3, max_args: Some(3), kind: FunctionKind::ReferentCountDistinct },
};

/// Function registry
///
/// Tables are consulted from the most recently added to the first, so a later
/// table may shadow an entry of an earlier one.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    tables: Vec<&'static FunctionTable>,
}

impl FunctionRegistry {
    pub fn base() -> Self {
        Self {
            tables: vec![&BASE_FUNCTIONS],
        }
    }

    /// Base functions plus lookups and referent aggregates.
    pub fn prefab() -> Self {
        Self::base().with_table(&PREFAB_FUNCTIONS)
    }

    pub fn with_table(mut self, table: &'static FunctionTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<&'static FunctionSpec> {
        self.tables
            .iter()
            .rev()
            .copied()
            .find_map(|table| table.get(name))
    }

    /// Validate function call arity
    pub fn validate_args(spec: &FunctionSpec, arg_count: usize) -> Result<(), QueryError> {
        if arg_count < spec.min_args {
            return Err(QueryError::GeneratorFunctionArgument(format!(
                "Function {}() requires at least {} arguments, got {}",
                spec.name, spec.min_args, arg_count
            )));
        }

        if let Some(max) = spec.max_args {
            if arg_count > max {
                return Err(QueryError::GeneratorFunctionArgument(format!(
                    "Function {}() takes at most {} arguments, got {}",
                    spec.name, max, arg_count
                )));
            }
        }

        Ok(())
    }

    /// Get all registered function names (for testing/debugging)
    pub fn all_function_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .tables
            .iter()
            .flat_map(|table| table.keys().copied())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::prefab()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_registry_has_no_lookups() {
        let registry = FunctionRegistry::base();
        assert!(registry.resolve("prop").is_some());
        assert!(registry.resolve("lookup_s").is_none());
    }

    #[test]
    fn test_prefab_registry_layers_tables() {
        let registry = FunctionRegistry::prefab();
        assert_eq!(
            registry.resolve("lookup_i").map(|s| s.kind),
            Some(FunctionKind::Lookup(Cast::Integer))
        );
        assert_eq!(
            registry.resolve("concat").map(|s| s.kind),
            Some(FunctionKind::Concat)
        );
        assert!(registry.resolve("nope").is_none());
    }

    #[test]
    fn test_all_functions_registered() {
        let names = FunctionRegistry::prefab().all_function_names();
        for name in [
            "prop",
            "concat",
            "coalesce",
            "sqrt",
            "pow",
            "and",
            "or",
            "not",
            "lookup_s",
            "lookup_via_b",
            "referent_sum",
            "referent_avg",
            "referent_min",
            "referent_max",
            "referent_count",
            "referent_count_distinct",
        ] {
            assert!(names.contains(&name), "missing {}", name);
        }
    }

    #[test]
    fn test_validate_args() {
        let registry = FunctionRegistry::prefab();
        let coalesce = registry.resolve("coalesce").unwrap();
        assert!(FunctionRegistry::validate_args(coalesce, 2).is_ok());
        assert!(FunctionRegistry::validate_args(coalesce, 1).is_err());
        assert!(FunctionRegistry::validate_args(coalesce, 3).is_err());

        let concat = registry.resolve("concat").unwrap();
        assert!(FunctionRegistry::validate_args(concat, 12).is_ok());
    }
}
