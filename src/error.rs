//! Application and engine error types

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised inside the query engine.
///
/// None of these escape the public engine entry points: they are folded into a
/// failed `QueryExecutionResult` carrying `kind()` and the display message.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Query timed out after {0} ms")]
    Timeout(u64),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("System {0} is inactive")]
    SystemInactive(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl QueryError {
    /// Stable, machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Validation(_) => "validation_error",
            QueryError::Authentication(_) => "authentication_error",
            QueryError::Configuration(_) => "configuration_error",
            QueryError::Timeout(_) => "timeout_error",
            QueryError::GraphQl(_) => "graphql_error",
            QueryError::SystemInactive(_) => "system_inactive_error",
            QueryError::NotFound(_) => "not_found",
            QueryError::AccessDenied(_) => "access_denied",
            QueryError::Upstream { .. } | QueryError::Request(_) | QueryError::Payload(_) => {
                "upstream_error"
            }
            QueryError::Store(_) => "store_error",
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        QueryError::Store(err.to_string())
    }
}

/// Result type alias for engine internals
pub type EngineResult<T> = std::result::Result<T, QueryError>;

/// Errors raised at the HTTP edge, before a request reaches the engine
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}
