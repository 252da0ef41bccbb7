//! Dynamic query execution engine
//!
//! [`QueryEngine`] is the single entry point the request layer talks to. A call
//! flows through system resolution, method validation, placeholder
//! substitution, protocol dispatch, the transform pipeline and the result
//! cache, and is always recorded by the execution logger. Engine entry points
//! never return `Err`: failures come back as `success: false` results.

pub mod auth;
pub mod dispatch;
pub mod executors;
pub mod params;
pub mod path;
pub mod registry;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, CachedResult, ResultCache};
use crate::error::{EngineResult, QueryError};
use crate::logger::ExecutionLogger;
use crate::models::{
    ConnectionTestResult, CustomQuery, ErrorInfo, ExecuteRequest, ExecutionLogEntry,
    ExecutionMetadata, ExecutionStatus, ExternalSystem, QueryExecutionResult, Visibility,
};
use crate::store::QueryStore;
use crate::transform::{self, TransformConfig};

use dispatch::{resolve_method, resolve_timeout, Dispatcher};
use executors::{build_url, HttpExecutor, RequestContext, SqlExecutor, UnsupportedSqlExecutor};
use registry::SystemRegistry;

/// Timeout applied when neither request, method nor system declares one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Successful pipeline output, before it is logged and wrapped
struct Outcome {
    data: Value,
    record_count: usize,
    system_name: String,
    method: String,
    transformations_applied: Vec<String>,
}

impl From<CachedResult> for Outcome {
    fn from(cached: CachedResult) -> Self {
        Self {
            data: cached.data,
            record_count: cached.record_count,
            system_name: cached.system_name,
            method: cached.method,
            transformations_applied: cached.transformations_applied,
        }
    }
}

pub struct QueryEngine {
    registry: Arc<SystemRegistry>,
    queries: Arc<dyn QueryStore>,
    cache: Arc<ResultCache>,
    logger: Arc<ExecutionLogger>,
    dispatcher: Dispatcher,
    config: EngineConfig,
}

impl QueryEngine {
    pub fn new(
        registry: Arc<SystemRegistry>,
        queries: Arc<dyn QueryStore>,
        cache: Arc<ResultCache>,
        logger: Arc<ExecutionLogger>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let dispatcher = Dispatcher::new(HttpExecutor::new()?, Arc::new(UnsupportedSqlExecutor));
        Ok(Self {
            registry,
            queries,
            cache,
            logger,
            dispatcher,
            config,
        })
    }

    /// Replace the SQL executor (the default refuses every `sql` method)
    pub fn with_sql_executor(mut self, sql: Arc<dyn SqlExecutor>) -> Self {
        let http = self.dispatcher.http().clone();
        self.dispatcher = Dispatcher::new(http, sql);
        self
    }

    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn logger(&self) -> &ExecutionLogger {
        &self.logger
    }

    /// Execute an ad-hoc query.
    ///
    /// When `cache_ttl_secs` is set, a fresh cached result short-circuits the
    /// upstream call unless `force_refresh` is set; either way a successful
    /// call refreshes the entry.
    pub async fn execute_query(
        &self,
        request: &ExecuteRequest,
        user_id: Option<Uuid>,
    ) -> QueryExecutionResult {
        let started = Instant::now();

        let cache_ttl = request
            .cache_ttl_secs
            .filter(|ttl| *ttl > 0)
            .map(Duration::from_secs);
        let cache_key = cache_ttl.map(|_| {
            CacheKey::new(
                request.system_id,
                request.method.as_deref(),
                &request.query,
                &request.parameters,
                &request.transformations,
                request.query_id,
            )
        });

        if let (Some(key), false) = (&cache_key, request.force_refresh) {
            if let Some(cached) = self.cache.get(key) {
                debug!(system_id = %request.system_id, "Serving query result from cache");
                return self.finish(request, user_id, started, Ok(cached.into()), true);
            }
        }

        let outcome = self.run(request).await;

        if let (Ok(outcome), Some(key), Some(ttl)) = (&outcome, cache_key, cache_ttl) {
            self.cache.insert(
                key,
                CachedResult {
                    data: outcome.data.clone(),
                    record_count: outcome.record_count,
                    system_name: outcome.system_name.clone(),
                    method: outcome.method.clone(),
                    transformations_applied: outcome.transformations_applied.clone(),
                },
                ttl,
                request.system_id,
                request.query_id,
            );
        }

        self.finish(request, user_id, started, outcome, false)
    }

    /// Execute a saved query on behalf of `user_id`.
    ///
    /// Private queries only run for their owner. Caching follows the query's
    /// `cache_enabled` flag with its refresh interval as TTL.
    pub async fn execute_custom_query(
        &self,
        query_id: Uuid,
        user_id: Option<Uuid>,
        force_refresh: bool,
    ) -> QueryExecutionResult {
        let started = Instant::now();

        let query = match self.load_query(query_id).await {
            Ok(query) => query,
            Err(e) => {
                warn!(query_id = %query_id, error = %e, "Saved query could not be loaded");
                return failure_result(&e, started, None);
            }
        };

        if let Err(e) = check_runnable(&query, user_id) {
            warn!(query_id = %query_id, kind = e.kind(), error = %e, "Saved query refused");
            let mut entry = ExecutionLogEntry::new(query.system_id, ExecutionStatus::Failed);
            entry.query_id = Some(query.id);
            entry.user_id = user_id;
            entry.execution_time_ms = started.elapsed().as_millis() as u64;
            entry.error_message = Some(e.to_string());
            self.logger.record(entry);
            return failure_result(&e, started, query.method.clone());
        }

        let request = ExecuteRequest::from_custom_query(&query, force_refresh);
        self.execute_query(&request, user_id).await
    }

    async fn load_query(&self, query_id: Uuid) -> EngineResult<CustomQuery> {
        self.queries
            .get_query(query_id)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("query {}", query_id)))
    }

    /// Resolve, dispatch and transform
    async fn run(&self, request: &ExecuteRequest) -> EngineResult<Outcome> {
        let resolved = self.registry.resolve(request.system_id).await?;
        let system = &resolved.system;
        let method = resolve_method(system, request.method.as_deref())?;
        let timeout = resolve_timeout(
            request.timeout_ms,
            method,
            system,
            self.config.default_timeout,
        );

        let query = params::substitute(&request.query, &request.parameters);
        let ctx = RequestContext {
            system,
            headers: &resolved.headers,
            method,
            query: &query,
            parameters: &request.parameters,
        };

        let raw = self.dispatcher.dispatch_with_timeout(&ctx, timeout).await?;
        let (data, transformations_applied) =
            apply_declared_transforms(system, &request.transformations, raw)?;

        Ok(Outcome {
            record_count: transform::record_count(&data),
            data,
            system_name: system.name.clone(),
            method: method.name.clone(),
            transformations_applied,
        })
    }

    /// Log the attempt and wrap it as a result
    fn finish(
        &self,
        request: &ExecuteRequest,
        user_id: Option<Uuid>,
        started: Instant,
        outcome: EngineResult<Outcome>,
        cache_hit: bool,
    ) -> QueryExecutionResult {
        let execution_time_ms = started.elapsed().as_millis() as u64;

        let status = match (&outcome, cache_hit) {
            (Err(_), _) => ExecutionStatus::Failed,
            (Ok(_), true) => ExecutionStatus::Cached,
            (Ok(_), false) => ExecutionStatus::Completed,
        };
        let mut entry = ExecutionLogEntry::new(request.system_id, status);
        entry.query_id = request.query_id;
        entry.user_id = user_id;
        entry.execution_time_ms = execution_time_ms;

        let result = match outcome {
            Ok(outcome) => {
                info!(
                    system = %outcome.system_name,
                    method = %outcome.method,
                    records = outcome.record_count,
                    duration_ms = execution_time_ms,
                    cache_hit = cache_hit,
                    "Query executed"
                );
                entry.record_count = outcome.record_count;
                entry.result_snapshot = Some(outcome.data.clone());
                QueryExecutionResult {
                    success: true,
                    data: Some(outcome.data),
                    error: None,
                    metadata: ExecutionMetadata {
                        execution_time_ms,
                        record_count: outcome.record_count,
                        system_name: Some(outcome.system_name),
                        method: Some(outcome.method),
                        cache_hit,
                        transformations_applied: outcome.transformations_applied,
                        executed_at: Utc::now(),
                    },
                }
            }
            Err(e) => {
                warn!(
                    system_id = %request.system_id,
                    method = ?request.method,
                    kind = e.kind(),
                    error = %e,
                    duration_ms = execution_time_ms,
                    "Query execution failed"
                );
                entry.error_message = Some(e.to_string());
                failure_result(&e, started, request.method.clone())
            }
        };

        self.logger.record(entry);
        result
    }

    /// Call a system's health-check endpoint (or its base URL)
    pub async fn test_connection(&self, system_id: Uuid) -> ConnectionTestResult {
        let resolved = match self.registry.resolve(system_id).await {
            Ok(resolved) => resolved,
            Err(e) => {
                return ConnectionTestResult {
                    success: false,
                    message: e.to_string(),
                    details: json!({ "system_id": system_id, "kind": e.kind() }),
                }
            }
        };
        let system = &resolved.system;
        let (url, method, expected, timeout) = health_check_target(system, self.config.default_timeout);

        match self
            .dispatcher
            .http()
            .check_health(&url, method.clone(), &resolved.headers, timeout)
            .await
        {
            Ok(response) => {
                let success = match expected {
                    Some(code) => response.status == code,
                    None => (200..300).contains(&response.status),
                };
                let message = if success {
                    format!("Connected to {}", system.name)
                } else {
                    format!("{} responded with HTTP {}", system.name, response.status)
                };
                info!(system = %system.name, status = response.status, success = success, "Connection test");
                ConnectionTestResult {
                    success,
                    message,
                    details: json!({
                        "system_name": system.name,
                        "url": url,
                        "method": method.as_str(),
                        "status_code": response.status,
                        "response_time_ms": response.elapsed.as_millis() as u64,
                    }),
                }
            }
            Err(e) => {
                warn!(system = %system.name, error = %e, "Connection test failed");
                ConnectionTestResult {
                    success: false,
                    message: e.to_string(),
                    details: json!({
                        "system_name": system.name,
                        "url": url,
                        "kind": e.kind(),
                    }),
                }
            }
        }
    }

    /// Drop cached configuration for one system (or all), together with the
    /// results it produced. Call after editing a system.
    pub fn clear_cache(&self, system_id: Option<Uuid>) {
        self.registry.clear(system_id);
        match system_id {
            Some(id) => {
                let dropped = self.cache.invalidate_system(id);
                info!(system_id = %id, dropped = dropped, "System cache cleared");
            }
            None => {
                self.cache.clear();
                info!("All system caches cleared");
            }
        }
    }

    /// Drop cached results of a saved query. Call after editing or deleting it.
    pub fn invalidate_query(&self, query_id: Uuid) -> usize {
        let dropped = self.cache.invalidate_query(query_id);
        debug!(query_id = %query_id, dropped = dropped, "Query cache invalidated");
        dropped
    }
}

/// Apply the requested transforms the system declares, in request order.
/// Names the system does not declare are skipped.
fn apply_declared_transforms(
    system: &ExternalSystem,
    requested: &[String],
    raw: Value,
) -> EngineResult<(Value, Vec<String>)> {
    let mut steps: Vec<&TransformConfig> = Vec::with_capacity(requested.len());
    let mut applied = Vec::with_capacity(requested.len());

    for name in requested {
        match system.transforms.get(name) {
            Some(step) => {
                steps.push(step);
                applied.push(name.clone());
            }
            None => warn!(system = %system.name, transform = %name, "Transform not declared, skipping"),
        }
    }

    let data = transform::apply_pipeline(steps, raw)?;
    Ok((data, applied))
}

/// Deactivated queries never run; private ones only for their owner
fn check_runnable(query: &CustomQuery, user_id: Option<Uuid>) -> EngineResult<()> {
    if !query.is_active {
        return Err(QueryError::Validation(format!("query {} is deactivated", query.id)));
    }
    if query.visibility == Visibility::Private && user_id != Some(query.owner_id) {
        return Err(QueryError::AccessDenied(format!(
            "query {} is private to its owner",
            query.id
        )));
    }
    Ok(())
}

fn health_check_target(system: &ExternalSystem, default: Duration) -> (String, Method, Option<u16>, Duration) {
    match &system.health_check {
        Some(check) => {
            let url = build_url(&system.base_url, check.endpoint.as_deref().unwrap_or(""));
            let method = check
                .method
                .as_deref()
                .and_then(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
                .unwrap_or(Method::GET);
            let timeout = check
                .timeout_ms
                .or(system.timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(default);
            (url, method, check.expected_status, timeout)
        }
        None => {
            let timeout = system.timeout_ms.map(Duration::from_millis).unwrap_or(default);
            (system.base_url.clone(), Method::GET, None, timeout)
        }
    }
}

fn failure_result(err: &QueryError, started: Instant, method: Option<String>) -> QueryExecutionResult {
    QueryExecutionResult {
        success: false,
        data: None,
        error: Some(ErrorInfo::from(err)),
        metadata: ExecutionMetadata {
            execution_time_ms: started.elapsed().as_millis() as u64,
            record_count: 0,
            system_name: None,
            method,
            cache_hit: false,
            transformations_applied: Vec::new(),
            executed_at: Utc::now(),
        },
    }
}
