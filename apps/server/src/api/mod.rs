//! API layer - routes, handlers, and middleware

pub mod handlers;
pub mod middleware;
pub mod params;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/blueprints", post(handlers::blueprints::create_blueprint))
        .route(
            "/blueprints/:namespace",
            get(handlers::blueprints::get_blueprint),
        )
        .route(
            "/prefabs",
            get(handlers::prefabs::list_prefabs).post(handlers::prefabs::create_prefab),
        )
        .route("/prefabs/query", post(handlers::prefabs::query_prefabs))
        .route(
            "/prefabs/:namespace/:tag",
            get(handlers::prefabs::get_prefab),
        )
        .with_state(state)
        // Applied in reverse order
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(middleware::trace())
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "polydesk",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
