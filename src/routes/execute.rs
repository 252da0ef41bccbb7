//! Query execution, connection test and cache endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{ConnectionTestResult, ExecuteRequest, QueryExecutionResult};
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Body of an ad-hoc execution; the system comes from the path
#[derive(Debug, Deserialize)]
pub struct ExecuteBody {
    pub query: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub transformations: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
    #[serde(default)]
    pub force_refresh: bool,
}

impl ExecuteBody {
    fn into_request(self, system_id: Uuid) -> ExecuteRequest {
        ExecuteRequest {
            system_id,
            query: self.query,
            method: self.method,
            parameters: self.parameters,
            transformations: self.transformations,
            timeout_ms: self.timeout_ms,
            cache_ttl_secs: self.cache_ttl_secs,
            force_refresh: self.force_refresh,
            query_id: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SavedQueryParams {
    #[serde(default)]
    pub force_refresh: bool,
}

/// Read the optional caller identity from `X-User-Id`
fn extract_user_id(headers: &HeaderMap) -> Result<Option<Uuid>> {
    let Some(raw) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let text = raw
        .to_str()
        .map_err(|_| AppError::InvalidRequest(format!("{} is not valid text", USER_ID_HEADER)))?;
    Uuid::parse_str(text.trim())
        .map(Some)
        .map_err(|e| AppError::InvalidRequest(format!("{} is not a UUID: {}", USER_ID_HEADER, e)))
}

/// POST /api/v1/systems/{system_id}/execute
///
/// Runs an ad-hoc query. Engine failures still answer 200 with
/// `success: false`; only malformed requests are rejected.
pub async fn execute_query(
    State(state): State<AppState>,
    Path(system_id): Path<Uuid>,
    headers: HeaderMap,
    body: std::result::Result<Json<ExecuteBody>, JsonRejection>,
) -> Result<Json<QueryExecutionResult>> {
    let parsed = extract_user_id(&headers).and_then(|user| Ok((user, body?.0)));
    let (user_id, body) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            state.metrics.inc_rejected();
            return Err(e);
        }
    };
    state.metrics.inc_requests();

    let request = body.into_request(system_id);
    let result = state.engine.execute_query(&request, user_id).await;
    Ok(Json(result))
}

/// POST /api/v1/queries/{query_id}/execute?force_refresh=
pub async fn execute_saved_query(
    State(state): State<AppState>,
    Path(query_id): Path<Uuid>,
    headers: HeaderMap,
    params: std::result::Result<Query<SavedQueryParams>, QueryRejection>,
) -> Result<Json<QueryExecutionResult>> {
    let parsed = extract_user_id(&headers).and_then(|user| Ok((user, params?.0)));
    let (user_id, params) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            state.metrics.inc_rejected();
            return Err(e);
        }
    };
    state.metrics.inc_requests();

    let result = state
        .engine
        .execute_custom_query(query_id, user_id, params.force_refresh)
        .await;
    Ok(Json(result))
}

/// POST /api/v1/systems/{system_id}/test
pub async fn test_connection(
    State(state): State<AppState>,
    Path(system_id): Path<Uuid>,
) -> Json<ConnectionTestResult> {
    state.metrics.inc_requests();
    Json(state.engine.test_connection(system_id).await)
}

/// DELETE /api/v1/systems/cache
pub async fn clear_all_caches(State(state): State<AppState>) -> StatusCode {
    state.engine.clear_cache(None);
    StatusCode::NO_CONTENT
}

/// DELETE /api/v1/systems/{system_id}/cache
pub async fn clear_system_cache(
    State(state): State<AppState>,
    Path(system_id): Path<Uuid>,
) -> StatusCode {
    state.engine.clear_cache(Some(system_id));
    StatusCode::NO_CONTENT
}

/// DELETE /api/v1/queries/{query_id}/cache
pub async fn invalidate_query_cache(
    State(state): State<AppState>,
    Path(query_id): Path<Uuid>,
) -> Json<Value> {
    let invalidated = state.engine.invalidate_query(query_id);
    debug!(query_id = %query_id, invalidated = invalidated, "Saved query cache invalidated via API");
    Json(json!({ "query_id": query_id, "invalidated": invalidated }))
}
