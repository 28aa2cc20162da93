//! Request-level ordering for prefab queries.
//!
//! Reads the `sort` parameter: comma-separated keys, each optionally
//! prefixed with `-` for descending order. A key names either a generated
//! column of the same request, ordered by its expression, or a property
//! (`tag`, `data.title`, ...).

use super::error::QueryError;
use super::relation::Relation;
use super::scrub::{self, IdentifierClass};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub identifier: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefabSorting {
    keys: Vec<SortKey>,
}

impl PrefabSorting {
    pub fn parse(sort: &str) -> Self {
        let keys = sort
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| match key.strip_prefix('-') {
                Some(identifier) => SortKey {
                    identifier: identifier.to_string(),
                    descending: true,
                },
                None => SortKey {
                    identifier: key.to_string(),
                    descending: false,
                },
            })
            .collect();
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Append ORDER BY clauses. `id` is always the final tiebreaker so that
    /// pages are stable.
    pub fn apply(
        &self,
        mut relation: Relation,
        generated_columns: &[(String, String)],
    ) -> Result<Relation, QueryError> {
        let mut sorts_by_id = false;

        for key in &self.keys {
            let direction = if key.descending { "DESC" } else { "ASC" };
            let generated = generated_columns
                .iter()
                .find(|(id, _)| *id == key.identifier);
            // The expression, not the output alias, so the order also works
            // inside window clauses.
            let target = if let Some((_, sql)) = generated {
                format!("({})", sql)
            } else {
                scrub::validate(&key.identifier, IdentifierClass::Path)
                    .map_err(|_| QueryError::InvalidPropertyIdentifier(key.identifier.clone()))?;
                sorts_by_id |= key.identifier == "id";
                relation.local_column(&key.identifier)?
            };
            relation = relation.order(format!("{} {}", target, direction));
        }

        if !sorts_by_id {
            let id = relation.local_column("id")?;
            relation = relation.order(format!("{} ASC", id));
        }

        Ok(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let sorting = PrefabSorting::parse("-total, tag,,data.title");
        assert_eq!(
            sorting.keys(),
            &[
                SortKey {
                    identifier: "total".into(),
                    descending: true
                },
                SortKey {
                    identifier: "tag".into(),
                    descending: false
                },
                SortKey {
                    identifier: "data.title".into(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn test_default_order_is_id() {
        let relation = PrefabSorting::default()
            .apply(Relation::prefabs(), &[])
            .unwrap();
        assert!(relation.to_sql().ends_with("ORDER BY (prefabs.id) ASC"));
    }

    #[test]
    fn test_generated_and_property_keys() {
        let generated = vec![("total".to_string(), "(1 + 1)".to_string())];
        let relation = PrefabSorting::parse("-total,data.title")
            .apply(Relation::prefabs(), &generated)
            .unwrap();
        assert!(relation.to_sql().ends_with(
            "ORDER BY ((1 + 1)) DESC, ((prefabs.data)#>>'{title}') ASC, (prefabs.id) ASC"
        ));
    }

    #[test]
    fn test_explicit_id_is_not_repeated() {
        let relation = PrefabSorting::parse("-id")
            .apply(Relation::prefabs(), &[])
            .unwrap();
        assert!(relation.to_sql().ends_with("ORDER BY (prefabs.id) DESC"));
    }

    #[test]
    fn test_rejects_unknown_or_unsafe_keys() {
        assert!(matches!(
            PrefabSorting::parse("salary").apply(Relation::prefabs(), &[]),
            Err(QueryError::InvalidPropertyIdentifier(_))
        ));
        assert!(matches!(
            PrefabSorting::parse("data.x;drop").apply(Relation::prefabs(), &[]),
            Err(QueryError::InvalidPropertyIdentifier(_))
        ));
    }
}
