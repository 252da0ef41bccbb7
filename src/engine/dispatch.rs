//! Method validation and protocol dispatch

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::executors::{HttpExecutor, RequestContext, SqlExecutor};
use super::path;
use crate::error::{EngineResult, QueryError};
use crate::models::{ExternalSystem, Protocol, QueryMethod};

/// Pick the method to run.
///
/// With no requested name the first declared method is used. This fallback is
/// kept as-is for compatibility with existing saved queries.
pub fn resolve_method<'a>(
    system: &'a ExternalSystem,
    requested: Option<&str>,
) -> EngineResult<&'a QueryMethod> {
    let first = system.methods.first().ok_or_else(|| {
        QueryError::Validation(format!("system '{}' declares no query methods", system.name))
    })?;

    match requested.filter(|name| !name.is_empty()) {
        None => {
            debug!(system = %system.name, method = %first.name, "No method requested, using first declared");
            Ok(first)
        }
        Some(name) => system.method(name).ok_or_else(|| {
            let available: Vec<&str> = system.methods.iter().map(|m| m.name.as_str()).collect();
            QueryError::Validation(format!(
                "method '{}' is not declared by system '{}' (available: {})",
                name,
                system.name,
                available.join(", ")
            ))
        }),
    }
}

/// Request override, then the method's, then the system's, then the default
pub fn resolve_timeout(
    request_ms: Option<u64>,
    method: &QueryMethod,
    system: &ExternalSystem,
    default: Duration,
) -> Duration {
    request_ms
        .or(method.timeout_ms)
        .or(system.timeout_ms)
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// Routes a resolved method to its executor
pub struct Dispatcher {
    http: HttpExecutor,
    sql: Arc<dyn SqlExecutor>,
}

impl Dispatcher {
    pub fn new(http: HttpExecutor, sql: Arc<dyn SqlExecutor>) -> Self {
        Self { http, sql }
    }

    pub fn http(&self) -> &HttpExecutor {
        &self.http
    }

    /// Run the method and extract its declared result path
    pub async fn dispatch(&self, ctx: &RequestContext<'_>) -> EngineResult<Value> {
        let raw = match ctx.method.protocol {
            Protocol::HttpGet => self.http.get(ctx).await?,
            Protocol::HttpPost | Protocol::Rest => {
                self.http.post(ctx, &ctx.method.endpoint).await?
            }
            Protocol::GraphQl => self.http.graphql(ctx).await?,
            Protocol::Sql => self.sql.execute(ctx).await?,
            Protocol::Custom => {
                let endpoint = ctx
                    .method
                    .custom_endpoint
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| {
                        QueryError::Configuration(format!(
                            "custom method '{}' has no custom_endpoint",
                            ctx.method.name
                        ))
                    })?;
                self.http.post(ctx, endpoint).await?
            }
        };

        Ok(path::extract(raw, ctx.method.result_path.as_deref()))
    }

    /// [`Dispatcher::dispatch`] bounded by `timeout`
    pub async fn dispatch_with_timeout(
        &self,
        ctx: &RequestContext<'_>,
        timeout: Duration,
    ) -> EngineResult<Value> {
        tokio::time::timeout(timeout, self.dispatch(ctx))
            .await
            .map_err(|_| QueryError::Timeout(timeout.as_millis() as u64))?
    }
}
