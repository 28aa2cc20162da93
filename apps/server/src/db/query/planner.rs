//! Join planning for cross-record functions.
//!
//! Three join shapes are planned here, each as a `LEFT JOIN` against a
//! derived table built from the inner relation so that rows without a match
//! survive:
//!
//! - forward lookup: follow a `namespace/tag` reference stored on this row
//! - referent aggregate: aggregate over rows whose reference points at this row
//! - lookup via: follow references through an intermediate "through" row
//!
//! Callers scrub every raw identifier before it reaches this module.

use super::error::QueryError;
use super::escape::quote_identifier;
use super::functions::{Aggregate, Cast};
use super::relation::Relation;

/// What a referent join computes per referenced row.
#[derive(Debug, Clone, Copy)]
pub enum ReferentMeasure<'a> {
    Aggregate {
        aggregate: Aggregate,
        dimension: &'a str,
    },
    Count,
    CountDistinct {
        dimension: &'a str,
    },
}

pub struct JoinPlanner<'a> {
    inner: &'a Relation,
}

/// Postgres truncates identifiers longer than this many bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Room left for the `___through`, `___remote` and `___inner` suffixes.
const ALIAS_SUFFIX_LEN: usize = "___through".len();

/// Join alias for `path`. The path part is cut so that the alias plus any
/// suffix stays within [`MAX_IDENTIFIER_LEN`] and suffixed aliases never
/// truncate to the same name.
fn alias_for(prefix: &str, id: usize, path: &str) -> String {
    let mut alias = format!("{}{}___{}", prefix, id, path.replace('.', "__"));
    let mut len = MAX_IDENTIFIER_LEN - ALIAS_SUFFIX_LEN;
    while !alias.is_char_boundary(len.min(alias.len())) {
        len -= 1;
    }
    alias.truncate(len);
    alias
}

impl<'a> JoinPlanner<'a> {
    pub fn new(inner: &'a Relation) -> Self {
        Self { inner }
    }

    /// Join the row referenced by `local` and return `remote` read from it.
    ///
    /// `local` is SQL producing a UID string. Unmatched references yield NULL.
    pub fn lookup(
        &self,
        scope: Relation,
        id: usize,
        cast: Cast,
        local: &str,
        remote: &str,
    ) -> Result<(Relation, String), QueryError> {
        let alias = quote_identifier(&alias_for("lookup", id, remote));
        let remote_column = self.inner.column_ref(&alias, remote)?;

        let join = format!(
            "LEFT JOIN ({}) AS {} ON (({})::text) = {}",
            self.inner.to_sql(),
            alias,
            local,
            Relation::uid_expression(&alias)
        );
        tracing::debug!(alias = %alias, "Planned lookup join");

        Ok((
            scope.join(join),
            format!("({}::{})", remote_column, cast.sql()),
        ))
    }

    /// Join an aggregate over rows of `namespace` whose `referrer` property
    /// holds this row's UID. Rows with no referents yield zero.
    ///
    /// `namespace` is SQL producing the namespace text.
    pub fn referent(
        &self,
        scope: Relation,
        id: usize,
        measure: ReferentMeasure<'_>,
        namespace: &str,
        referrer: &str,
    ) -> Result<(Relation, String), QueryError> {
        let alias_name = alias_for("referent_aggregate", id, referrer);
        let alias = quote_identifier(&alias_name);
        let inner_alias = quote_identifier(&format!("{}___inner", alias_name));

        let namespace_column = self.inner.column_ref(&inner_alias, "namespace")?;
        let referrer_column = self.inner.column_ref(&inner_alias, referrer)?;

        let (result, zero) = match measure {
            ReferentMeasure::Aggregate {
                aggregate,
                dimension,
            } => {
                let dimension_column = self.inner.column_ref(&inner_alias, dimension)?;
                (
                    format!(
                        "{}({}::{})",
                        aggregate.sql(),
                        dimension_column,
                        Cast::Numeric.sql()
                    ),
                    "0.0",
                )
            }
            ReferentMeasure::Count => (format!("count({}.id)", inner_alias), "0"),
            ReferentMeasure::CountDistinct { dimension } => {
                let dimension_column = self.inner.column_ref(&inner_alias, dimension)?;
                (format!("count(DISTINCT ({}))", dimension_column), "0")
            }
        };

        let join = format!(
            "LEFT JOIN (SELECT {result} AS result, {referrer} AS referent \
             FROM ({inner}) AS {inner_alias} \
             WHERE {namespace_column} = {namespace} \
             GROUP BY {referrer}) AS {alias} \
             ON {alias}.referent = {local_uid}",
            result = result,
            referrer = referrer_column,
            inner = self.inner.to_sql(),
            inner_alias = inner_alias,
            namespace_column = namespace_column,
            namespace = namespace,
            alias = alias,
            local_uid = Relation::uid_expression(scope.table_name()),
        );
        tracing::debug!(alias = %alias, "Planned referent join");

        Ok((
            scope.join(join),
            format!("(coalesce({}.result, {}))", alias, zero),
        ))
    }

    /// Join, for each row, the `remote` values of every row reached through a
    /// row of `namespace` whose `left` points at this row and whose `right`
    /// points at the remote row. Rows with no matches yield an empty array.
    pub fn lookup_via(
        &self,
        scope: Relation,
        id: usize,
        cast: Cast,
        namespace: &str,
        left: &str,
        right: &str,
        remote: &str,
    ) -> Result<(Relation, String), QueryError> {
        let alias_name = alias_for("lookup_via", id, remote);
        let alias = quote_identifier(&alias_name);
        let through_alias = quote_identifier(&format!("{}___through", alias_name));
        let remote_alias = quote_identifier(&format!("{}___remote", alias_name));

        let namespace_column = self.inner.column_ref(&through_alias, "namespace")?;
        let left_column = self.inner.column_ref(&through_alias, left)?;
        let right_column = self.inner.column_ref(&through_alias, right)?;
        let remote_column = self.inner.column_ref(&remote_alias, remote)?;
        let inner = self.inner.to_sql();

        let join = format!(
            "LEFT JOIN (SELECT {left} AS referent, \
             array_agg({remote_column}::{cast} ORDER BY {remote_alias}.id) AS result \
             FROM ({inner}) AS {through_alias} \
             JOIN ({inner}) AS {remote_alias} ON {right} = {remote_uid} \
             WHERE {namespace_column} = {namespace} \
             GROUP BY {left}) AS {alias} \
             ON {alias}.referent = {local_uid}",
            left = left_column,
            remote_column = remote_column,
            cast = cast.sql(),
            remote_alias = remote_alias,
            inner = inner,
            through_alias = through_alias,
            right = right_column,
            remote_uid = Relation::uid_expression(&remote_alias),
            namespace_column = namespace_column,
            namespace = namespace,
            alias = alias,
            local_uid = Relation::uid_expression(scope.table_name()),
        );
        tracing::debug!(alias = %alias, "Planned lookup-via join");

        Ok((
            scope.join(join),
            format!("(coalesce({}.result, ARRAY[]::{}[]))", alias, cast.sql()),
        ))
    }
}
