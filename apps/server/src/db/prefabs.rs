//! Prefab repository

use crate::db::query::Relation;
use crate::models::{Blueprint, Prefab};
use crate::{Error, Result};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    /// One JSON object per row, including generated columns.
    pub rows: Vec<JsonValue>,
    /// Row count of the relation before paging.
    pub total: i64,
}

/// Name of the ordinal carried out of the paged subquery. The dot keeps it
/// clear of prefab columns and generated column identifiers.
const POSITION_COLUMN: &str = "row.position";

/// One page of `relation` as a JSON object per row.
///
/// A subquery's ORDER BY does not order the outer select, so the page is
/// numbered with `row_number()` over the relation's own ordering and the
/// outer select orders by that number.
fn page_sql(relation: &Relation, page: Page) -> String {
    let mut paged = relation.clone().limit(page.limit).offset(page.offset);
    if relation.orders().is_empty() {
        return format!("SELECT to_jsonb(q) AS row FROM ({}) q", paged.to_sql());
    }

    paged = paged.select_append(format!(
        "row_number() OVER (ORDER BY {}) AS \"{}\"",
        relation.orders().join(", "),
        POSITION_COLUMN
    ));
    format!(
        "SELECT to_jsonb(q) - '{position}' AS row FROM ({paged}) q ORDER BY q.\"{position}\"",
        position = POSITION_COLUMN,
        paged = paged.to_sql()
    )
}

#[derive(Clone)]
pub struct PrefabRepository {
    pool: PgPool,
}

fn prefab_from_row(row: &PgRow) -> Prefab {
    Prefab {
        id: row.get("id"),
        blueprint_id: row.get("blueprint_id"),
        namespace: row.get("namespace"),
        tag: row.get("tag"),
        data: row.get("data"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PrefabRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, blueprint: &Blueprint, tag: &str, data: &JsonValue) -> Result<Prefab> {
        let row = sqlx::query(
            r#"
            INSERT INTO prefabs (blueprint_id, namespace, tag, data)
            VALUES ($1, $2, $3, $4)
            RETURNING id, blueprint_id, namespace, tag, data, created_at, updated_at
            "#,
        )
        .bind(blueprint.id)
        .bind(&blueprint.namespace)
        .bind(tag)
        .bind(data)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(format!(
                "Prefab {}/{} already exists",
                blueprint.namespace, tag
            )),
            other => Error::Database(other),
        })?;

        let prefab = prefab_from_row(&row);
        tracing::debug!(uid = %prefab.uid(), "Created prefab");
        Ok(prefab)
    }

    pub async fn find(&self, namespace: &str, tag: &str) -> Result<Option<Prefab>> {
        let row = sqlx::query(
            r#"
            SELECT id, blueprint_id, namespace, tag, data, created_at, updated_at
            FROM prefabs
            WHERE namespace = $1 AND tag = $2
            "#,
        )
        .bind(namespace)
        .bind(tag)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(prefab_from_row))
    }

    /// Execute a compiled relation, returning one page of rows and the total.
    ///
    /// The relation text is trusted: every client-supplied fragment in it has
    /// been scrubbed or quoted by query compilation.
    pub async fn search(&self, relation: &Relation, page: Page) -> Result<SearchResult> {
        let sql = page_sql(relation, page);
        tracing::debug!(sql = %sql, joins = relation.joins().len(), "Executing prefab search");

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        let rows = rows
            .iter()
            .map(|row| row.try_get::<JsonValue, _>("row"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total: i64 = sqlx::query_scalar(&relation.to_count_sql())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(SearchResult { rows, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_sql_orders_outer_select() {
        let relation = Relation::prefabs()
            .select_append("((1 + 1)) AS \"x\"")
            .order("((1 + 1)) DESC")
            .order("(prefabs.id) ASC");
        let sql = page_sql(&relation, Page { offset: 10, limit: 5 });

        assert_eq!(
            sql,
            "SELECT to_jsonb(q) - 'row.position' AS row FROM (\
             SELECT prefabs.*, ((1 + 1)) AS \"x\", \
             row_number() OVER (ORDER BY ((1 + 1)) DESC, (prefabs.id) ASC) AS \"row.position\" \
             FROM prefabs ORDER BY ((1 + 1)) DESC, (prefabs.id) ASC LIMIT 5 OFFSET 10) q \
             ORDER BY q.\"row.position\""
        );
    }

    #[test]
    fn test_page_sql_without_order() {
        let sql = page_sql(&Relation::prefabs(), Page { offset: 0, limit: 25 });
        assert_eq!(
            sql,
            "SELECT to_jsonb(q) AS row FROM (SELECT prefabs.* FROM prefabs LIMIT 25 OFFSET 0) q"
        );
    }
}
