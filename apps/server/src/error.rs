//! Error types for the Polydesk server

use crate::db::query::QueryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// SQLSTATE of a database error, if Postgres reported one.
fn sqlstate(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

impl Error {
    /// Machine-readable error code rendered in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Query(e) => e.code(),
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation_error",
            Error::Conflict(_) => "conflict",
            Error::Database(e) => match sqlstate(e).as_deref() {
                Some("23505") => "conflict",
                Some(code) if code.starts_with("22") => "invalid_data",
                _ => "internal_error",
            },
            Error::Internal(_) | Error::Other(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Query(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Database(e) => match sqlstate(e).as_deref() {
                Some("23505") => StatusCode::CONFLICT,
                // Data exceptions, e.g. a text property that does not cast to numeric.
                Some(code) if code.starts_with("22") => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Internal(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        let detail = match &self {
            Error::Database(sqlx::Error::Database(db)) if status != StatusCode::INTERNAL_SERVER_ERROR => {
                db.message().to_string()
            }
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Internal error: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "errors": [{
                "status": status.as_u16().to_string(),
                "code": self.code(),
                "detail": detail
            }]
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_query_errors_are_bad_requests() {
        let error = Error::from(QueryError::GeneratorFunctionArgument(
            "Argument at index 1 for lookup_s() must be a string".to_string(),
        ));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body["errors"][0]["status"], "400");
        assert_eq!(body["errors"][0]["code"], "generator_function_argument");
        assert_eq!(
            body["errors"][0]["detail"],
            "Generator function argument error: Argument at index 1 for lookup_s() must be a string"
        );
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let response = Error::Internal("pool exhausted".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["errors"][0]["detail"], "Internal server error");
    }

    #[test]
    fn test_not_found_and_conflict() {
        assert_eq!(
            Error::NotFound("prefab jobs/a".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::Conflict("dup".into()).code(), "conflict");
        assert_eq!(
            Error::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
