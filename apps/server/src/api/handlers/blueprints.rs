//! Blueprint handlers

use crate::{models::NewBlueprint, state::AppState, Error, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub async fn create_blueprint(
    State(state): State<AppState>,
    Json(blueprint): Json<NewBlueprint>,
) -> Result<Response> {
    blueprint.validate()?;
    let blueprint = state.blueprints.create(&blueprint).await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": blueprint }))).into_response())
}

pub async fn get_blueprint(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<Response> {
    match state.blueprints.find_by_namespace(&namespace).await? {
        Some(blueprint) => Ok((StatusCode::OK, Json(json!({ "data": blueprint }))).into_response()),
        None => Err(Error::NotFound(format!("Blueprint {}", namespace))),
    }
}
