//! HTTP surface

pub mod execute;
pub mod health;
pub mod metrics;
pub mod ws;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

/// Build the application router (middleware is layered by the caller)
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health and metrics (Kubernetes liveness and readiness + Prometheus)
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(metrics::prometheus_metrics))
        // Systems
        .route(
            "/api/v1/systems/{system_id}/execute",
            post(execute::execute_query),
        )
        .route(
            "/api/v1/systems/{system_id}/test",
            post(execute::test_connection),
        )
        .route("/api/v1/systems/cache", delete(execute::clear_all_caches))
        .route(
            "/api/v1/systems/{system_id}/cache",
            delete(execute::clear_system_cache),
        )
        // Saved queries
        .route(
            "/api/v1/queries/{query_id}/execute",
            post(execute::execute_saved_query),
        )
        .route(
            "/api/v1/queries/{query_id}/cache",
            delete(execute::invalidate_query_cache),
        )
        // Operator stream
        .route("/api/v1/executions/ws", get(ws::ws_handler))
        .with_state(state)
}
