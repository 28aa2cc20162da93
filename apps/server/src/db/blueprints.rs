//! Blueprint repository

use crate::models::{Blueprint, NewBlueprint};
use crate::{Error, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct BlueprintRepository {
    pool: PgPool,
}

fn blueprint_from_row(row: &PgRow) -> Blueprint {
    Blueprint {
        id: row.get("id"),
        name: row.get("name"),
        namespace: row.get("namespace"),
        schema: row.get("schema"),
        view: row.get("view"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl BlueprintRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, blueprint: &NewBlueprint) -> Result<Blueprint> {
        let row = sqlx::query(
            r#"
            INSERT INTO blueprints (name, namespace, schema, view)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, namespace, schema, view, created_at, updated_at
            "#,
        )
        .bind(&blueprint.name)
        .bind(&blueprint.namespace)
        .bind(&blueprint.schema)
        .bind(&blueprint.view)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(format!(
                "A blueprint for namespace '{}' already exists",
                blueprint.namespace
            )),
            other => Error::Database(other),
        })?;

        tracing::debug!(namespace = %blueprint.namespace, "Created blueprint");
        Ok(blueprint_from_row(&row))
    }

    pub async fn find_by_namespace(&self, namespace: &str) -> Result<Option<Blueprint>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, namespace, schema, view, created_at, updated_at
            FROM blueprints
            WHERE namespace = $1
            "#,
        )
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(blueprint_from_row))
    }
}
