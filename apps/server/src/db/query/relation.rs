//! String-built relation over a single base table.
//!
//! A [`Relation`] is the working scope that query compilation extends: it
//! collects extra select expressions, join clauses, predicates, ordering and
//! paging, and renders them into one SQL statement. It renders as a plain
//! `SELECT` so it can be embedded into another relation as a subquery.

use super::error::QueryError;

/// Columns of the `prefabs` table, in declaration order.
pub const PREFAB_COLUMNS: &[&str] = &[
    "id",
    "blueprint_id",
    "namespace",
    "tag",
    "data",
    "created_at",
    "updated_at",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    table: String,
    columns: Vec<String>,
    selects: Vec<String>,
    joins: Vec<String>,
    wheres: Vec<String>,
    orders: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Relation {
    pub fn new(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            selects: Vec::new(),
            joins: Vec::new(),
            wheres: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// All prefabs.
    pub fn prefabs() -> Self {
        Self::new("prefabs", PREFAB_COLUMNS)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    pub fn selects(&self) -> &[String] {
        &self.selects
    }

    pub fn wheres(&self) -> &[String] {
        &self.wheres
    }

    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    pub fn select_append(mut self, expression: impl Into<String>) -> Self {
        self.selects.push(expression.into());
        self
    }

    pub fn and_where(mut self, predicate: impl Into<String>) -> Self {
        self.wheres.push(predicate.into());
        self
    }

    pub fn order(mut self, clause: impl Into<String>) -> Self {
        self.orders.push(clause.into());
        self
    }

    pub fn orders(&self) -> &[String] {
        &self.orders
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Resolve a property identifier against a table reference whose columns
    /// match this relation's.
    ///
    /// `data.a.b` becomes a text extraction from the JSON document; any other
    /// identifier must name a known column.
    pub fn column_ref(&self, table: &str, identifier: &str) -> Result<String, QueryError> {
        if let Some(path) = identifier.strip_prefix("data.") {
            if path.split('.').any(str::is_empty) {
                return Err(QueryError::InvalidPropertyIdentifier(identifier.to_string()));
            }
            let segments: Vec<&str> = path.split('.').collect();
            Ok(format!("(({}.data)#>>'{{{}}}')", table, segments.join(",")))
        } else if self.has_column(identifier) {
            Ok(format!("({}.{})", table, identifier))
        } else {
            Err(QueryError::InvalidPropertyIdentifier(identifier.to_string()))
        }
    }

    /// [`Relation::column_ref`] against this relation's own table.
    pub fn local_column(&self, identifier: &str) -> Result<String, QueryError> {
        self.column_ref(&self.table, identifier)
    }

    /// The `namespace/tag` UID of a row of this relation under `table`.
    pub fn uid_expression(table: &str) -> String {
        format!("({table}.namespace || '/' || {table}.tag)")
    }

    fn from_clause(&self) -> String {
        let mut sql = format!("FROM {}", self.table);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.wheres.is_empty() {
            let predicates: Vec<String> = self.wheres.iter().map(|w| format!("({})", w)).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        sql
    }

    pub fn to_sql(&self) -> String {
        let mut projection = vec![format!("{}.*", self.table)];
        projection.extend(self.selects.iter().cloned());

        let mut sql = format!("SELECT {} {}", projection.join(", "), self.from_clause());
        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }

    /// Row count of the relation, ignoring ordering and paging.
    pub fn to_count_sql(&self) -> String {
        format!("SELECT count(*) {}", self.from_clause())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_relation() {
        assert_eq!(Relation::prefabs().to_sql(), "SELECT prefabs.* FROM prefabs");
    }

    #[test]
    fn test_full_relation() {
        let sql = Relation::prefabs()
            .select_append("(1) AS \"x\"")
            .join("LEFT JOIN other ON true")
            .and_where("prefabs.namespace = 'jobs'")
            .and_where("true")
            .order("prefabs.id ASC")
            .limit(10)
            .offset(20)
            .to_sql();

        assert_eq!(
            sql,
            "SELECT prefabs.*, (1) AS \"x\" FROM prefabs LEFT JOIN other ON true \
             WHERE (prefabs.namespace = 'jobs') AND (true) ORDER BY prefabs.id ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_count_sql_drops_paging() {
        let relation = Relation::prefabs()
            .and_where("true")
            .order("prefabs.id ASC")
            .limit(5);
        assert_eq!(
            relation.to_count_sql(),
            "SELECT count(*) FROM prefabs WHERE (true)"
        );
    }

    #[test]
    fn test_column_ref() {
        let relation = Relation::prefabs();
        assert_eq!(
            relation.local_column("data.a.b").unwrap(),
            "((prefabs.data)#>>'{a,b}')"
        );
        assert_eq!(relation.local_column("tag").unwrap(), "(prefabs.tag)");
        assert_eq!(
            relation.column_ref("\"t\"", "data.x").unwrap(),
            "((\"t\".data)#>>'{x}')"
        );
        assert!(matches!(
            relation.local_column("salary"),
            Err(QueryError::InvalidPropertyIdentifier(_))
        ));
        assert!(matches!(
            relation.local_column("data..x"),
            Err(QueryError::InvalidPropertyIdentifier(_))
        ));
        assert!(matches!(
            relation.local_column("data."),
            Err(QueryError::InvalidPropertyIdentifier(_))
        ));
    }
}
