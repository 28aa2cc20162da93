#![allow(dead_code)]

pub mod shared;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{Method, Request, StatusCode},
    Router,
};
use futures::FutureExt as _;
use polydesk::{api::create_router, AppState, Config};
use serde_json::Value;
use sqlx::Connection as _;
use tower::ServiceExt as _;
use url::Url;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    schema: String,
    admin_database_url: String,
}

impl TestApp {
    /// A router backed by a fresh Postgres schema, or `None` when no test
    /// database is configured.
    pub async fn new() -> anyhow::Result<Option<Self>> {
        Self::new_with_config(|_| {}).await
    }

    pub async fn new_with_config(
        configure: impl FnOnce(&mut Config),
    ) -> anyhow::Result<Option<Self>> {
        let shared = shared::shared().await?;
        let Some(admin_database_url) = shared.database_url().map(str::to_string) else {
            eprintln!("database.test_database_url is not set, skipping");
            return Ok(None);
        };

        let mut config = shared.base_config.clone();
        configure(&mut config);

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let mut admin_conn = sqlx::PgConnection::connect(&admin_database_url)
            .await
            .context("connect admin db for schema create")?;
        sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
            .execute(&mut admin_conn)
            .await
            .context("create test schema")?;

        config.database.url = with_search_path(&admin_database_url, &schema)?;
        config.database.pool_min_size = 0;
        config.database.pool_max_size = 2;
        config.database.pool_timeout_seconds = 30;

        let state = AppState::new(config)
            .await
            .context("initialize AppState")?;
        let router = create_router(state.clone());

        Ok(Some(Self {
            router,
            state,
            schema,
            admin_database_url,
        }))
    }

    pub async fn cleanup(self) -> anyhow::Result<()> {
        self.state.db_pool.close().await;

        let mut admin_conn = sqlx::PgConnection::connect(&self.admin_database_url)
            .await
            .context("connect admin db for schema drop")?;
        sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
            .execute(&mut admin_conn)
            .await
            .context("drop test schema")?;

        Ok(())
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        send(&self.router, method, path_and_query, body).await
    }

    pub async fn blueprint(&self, namespace: &str) -> anyhow::Result<()> {
        let (status, body) = self
            .request(
                Method::POST,
                "/blueprints",
                Some(serde_json::json!({ "name": namespace, "namespace": namespace })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create blueprint: {status} {body}");
        Ok(())
    }

    pub async fn prefab(&self, namespace: &str, tag: &str, data: Value) -> anyhow::Result<()> {
        let (status, body) = self
            .request(
                Method::POST,
                "/prefabs",
                Some(serde_json::json!({ "namespace": namespace, "tag": tag, "data": data })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create prefab: {status} {body}");
        Ok(())
    }

    /// Run `POST /prefabs/query` and return the status and body.
    pub async fn query(&self, payload: Value) -> anyhow::Result<(StatusCode, Value)> {
        self.request(Method::POST, "/prefabs/query", Some(payload))
            .await
    }
}

/// Send one request through `router` and decode the JSON response.
pub async fn send(
    router: &Router,
    method: Method,
    path_and_query: &str,
    body: Option<Value>,
) -> anyhow::Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(path_and_query)
        .header("content-type", "application/json")
        .body(match body {
            Some(json) => Body::from(Bytes::from(serde_json::to_vec(&json)?)),
            None => Body::empty(),
        })
        .context("build request")?;

    let response = router
        .clone()
        .oneshot(request)
        .await
        .context("dispatch request")?;

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .context("read response body")?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("decode response body")?
    };

    Ok((status, json))
}

/// Run `f` against a fresh [`TestApp`], dropping its schema afterwards.
/// Does nothing when no test database is configured.
pub async fn with_test_app<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let result = std::panic::AssertUnwindSafe(f(&app)).catch_unwind().await;
    let cleanup_result = app.cleanup().await;

    if let Err(e) = cleanup_result {
        eprintln!("test schema cleanup failed: {e:?}");
    }

    match result {
        Ok(r) => r,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn with_search_path(database_url: &str, schema: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(database_url).context("parse database URL")?;
    url.query_pairs_mut()
        .append_pair("options", &format!("-c search_path={}", schema));
    Ok(url.to_string())
}
