//! Prefab handlers

use crate::{
    api::params::PrefabQueryRequest,
    db::query::{escape::quote_literal, scrub, scrub::IdentifierClass, Relation, ResourceQuery},
    models::NewPrefab,
    state::AppState,
    Error, Result,
};
use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

pub async fn create_prefab(
    State(state): State<AppState>,
    Json(prefab): Json<NewPrefab>,
) -> Result<Response> {
    prefab.validate()?;

    let blueprint = state
        .blueprints
        .find_by_namespace(&prefab.namespace)
        .await?
        .ok_or_else(|| Error::Validation(format!("No blueprint for namespace '{}'", prefab.namespace)))?;

    let tag = prefab
        .tag
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let prefab = state.prefabs.create(&blueprint, &tag, &prefab.data).await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": prefab }))).into_response())
}

pub async fn get_prefab(
    State(state): State<AppState>,
    Path((namespace, tag)): Path<(String, String)>,
) -> Result<Response> {
    match state.prefabs.find(&namespace, &tag).await? {
        Some(prefab) => Ok((StatusCode::OK, Json(json!({ "data": prefab }))).into_response()),
        None => Err(Error::NotFound(format!("Prefab {}/{}", namespace, tag))),
    }
}

/// `GET /prefabs` with the query in the query string.
pub async fn list_prefabs(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let request = PrefabQueryRequest::from_query_string(query.as_deref().unwrap_or(""))?;
    run_query(&state, request).await
}

/// `POST /prefabs/query` with the query as a JSON body.
pub async fn query_prefabs(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<Response> {
    let request = PrefabQueryRequest::from_json(&body)?;
    run_query(&state, request).await
}

/// Base relation of a request: every prefab, or one namespace of them.
fn base_relation(namespace: Option<&str>) -> Result<Relation> {
    let relation = Relation::prefabs();
    let Some(namespace) = namespace else {
        return Ok(relation);
    };

    let namespace = scrub::validate(namespace, IdentifierClass::Namespace)
        .map_err(|_| Error::Validation(format!("Invalid namespace '{}'", namespace)))?;
    let column = relation.local_column("namespace")?;
    Ok(relation.and_where(format!("{} = {}", column, quote_literal(namespace))))
}

async fn run_query(state: &AppState, request: PrefabQueryRequest) -> Result<Response> {
    let config = &state.config.query;
    let page = request.page(config)?;

    // Lookups and referent aggregates see every prefab, not just the
    // requested namespace.
    let compiled = ResourceQuery::prefab(&request.payload)
        .strict_functions(config.strict_functions)
        .compile(base_relation(request.namespace.as_deref())?)?;
    let relation = request
        .sorting()
        .apply(compiled.relation, &compiled.generated_columns)?;

    let result = state.prefabs.search(&relation, page).await?;
    let generated: Vec<&str> = compiled
        .generated_columns
        .iter()
        .map(|(identifier, _)| identifier.as_str())
        .collect();

    Ok((
        StatusCode::OK,
        Json(json!({
            "data": result.rows,
            "meta": {
                "total": result.total,
                "offset": page.offset,
                "limit": page.limit,
                "generated_columns": generated
            }
        })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_relation() {
        assert_eq!(base_relation(None).unwrap().to_sql(), "SELECT prefabs.* FROM prefabs");
        assert_eq!(
            base_relation(Some("jobs")).unwrap().to_sql(),
            "SELECT prefabs.* FROM prefabs WHERE ((prefabs.namespace) = 'jobs')"
        );
        assert!(matches!(
            base_relation(Some("jobs' or 1=1 --")),
            Err(Error::Validation(_))
        ));
    }
}
