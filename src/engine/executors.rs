//! Protocol executors
//!
//! HTTP-based protocols share one [`HttpExecutor`]; SQL goes through the
//! pluggable [`SqlExecutor`] trait so a driver-backed implementation can be
//! injected without touching the dispatcher.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::debug;

use super::auth::Headers;
use super::params::{substitute, value_to_text};
use crate::error::{EngineResult, QueryError};
use crate::models::{ExternalSystem, QueryMethod};

/// Body field carrying the query text when a method declares none
pub const DEFAULT_QUERY_FIELD: &str = "query";

/// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Everything an executor needs for one call
pub struct RequestContext<'a> {
    pub system: &'a ExternalSystem,
    pub headers: &'a Headers,
    pub method: &'a QueryMethod,
    /// Query text with placeholders already substituted
    pub query: &'a str,
    pub parameters: &'a Map<String, Value>,
}

/// Executes `sql` methods
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, ctx: &RequestContext<'_>) -> EngineResult<Value>;
}

/// Default SQL executor: always refuses.
pub struct UnsupportedSqlExecutor;

#[async_trait]
impl SqlExecutor for UnsupportedSqlExecutor {
    async fn execute(&self, ctx: &RequestContext<'_>) -> EngineResult<Value> {
        Err(QueryError::Configuration(format!(
            "method '{}' uses the sql protocol, which requires a database-driver-backed \
             SqlExecutor to be supplied to the engine",
            ctx.method.name
        )))
    }
}

/// Join a base URL and an endpoint. Absolute endpoints win.
pub fn build_url(base: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let base = base.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    if endpoint.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, endpoint)
    }
}

/// JSON body for POST/REST, in increasing precedence: the method's default
/// payload, caller parameters (nested or flattened), then the query text.
pub fn build_post_body(method: &QueryMethod, parameters: &Map<String, Value>, query: &str) -> Value {
    let mut body = method.default_payload.clone().unwrap_or_default();

    match method.params_field.as_deref() {
        Some(field) if !field.is_empty() => {
            body.insert(field.to_string(), Value::Object(parameters.clone()));
        }
        _ => body.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone()))),
    }

    let query_field = method
        .query_field
        .as_deref()
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_QUERY_FIELD);
    body.insert(query_field.to_string(), Value::String(query.to_string()));

    Value::Object(body)
}

/// Concatenated messages of a non-empty GraphQL `errors` array
pub fn graphql_errors(response: &Value) -> Option<String> {
    let errors = response.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    let messages: Vec<String> = errors
        .iter()
        .map(|e| match e.get("message").and_then(Value::as_str) {
            Some(msg) => msg.to_string(),
            None => e.to_string(),
        })
        .collect();
    Some(messages.join("; "))
}

fn apply_headers(mut builder: RequestBuilder, headers: &Headers) -> RequestBuilder {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Read a response as JSON, mapping non-2xx to an upstream error
async fn read_json(response: reqwest::Response) -> EngineResult<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(QueryError::Upstream {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body)
        .map_err(|e| QueryError::Payload(format!("response is not valid JSON: {}", e)))
}

/// Outcome of a health check
#[derive(Debug, Clone)]
pub struct HealthCheckResponse {
    pub status: u16,
    pub elapsed: Duration,
}

/// Shared executor for `http_get`, `http_post`, `rest`, `graphql` and `custom`
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new() -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("query-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn url_for(ctx: &RequestContext<'_>, endpoint: &str) -> String {
        build_url(&ctx.system.base_url, &substitute(endpoint, ctx.parameters))
    }

    /// GET with parameters (and the query text, if declared) in the query string
    pub async fn get(&self, ctx: &RequestContext<'_>) -> EngineResult<Value> {
        let url = Self::url_for(ctx, &ctx.method.endpoint);

        let mut pairs: Vec<(String, String)> = ctx
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), value_to_text(v)))
            .collect();
        if let Some(name) = ctx.method.query_param.as_deref().filter(|n| !n.is_empty()) {
            pairs.push((name.to_string(), ctx.query.to_string()));
        }

        debug!(url = %url, method = %ctx.method.name, "Executing HTTP GET");
        let request = apply_headers(self.client.get(&url), ctx.headers).query(&pairs);
        read_json(request.send().await?).await
    }

    /// POST a merged JSON body to `endpoint`
    pub async fn post(&self, ctx: &RequestContext<'_>, endpoint: &str) -> EngineResult<Value> {
        let url = Self::url_for(ctx, endpoint);
        let body = build_post_body(ctx.method, ctx.parameters, ctx.query);

        debug!(url = %url, method = %ctx.method.name, "Executing HTTP POST");
        let request = apply_headers(self.client.post(&url), ctx.headers).json(&body);
        read_json(request.send().await?).await
    }

    /// POST `{query, variables}`; a non-empty `errors` array fails the call
    pub async fn graphql(&self, ctx: &RequestContext<'_>) -> EngineResult<Value> {
        let url = Self::url_for(ctx, &ctx.method.endpoint);
        let body = json!({
            "query": ctx.query,
            "variables": ctx.parameters,
        });

        debug!(url = %url, method = %ctx.method.name, "Executing GraphQL query");
        let request = apply_headers(self.client.post(&url), ctx.headers).json(&body);
        let response = read_json(request.send().await?).await?;

        match graphql_errors(&response) {
            Some(messages) => Err(QueryError::GraphQl(messages)),
            None => Ok(response),
        }
    }

    /// Issue a bare request and report status and latency
    pub async fn check_health(
        &self,
        url: &str,
        method: Method,
        headers: &Headers,
        timeout: Duration,
    ) -> EngineResult<HealthCheckResponse> {
        let started = Instant::now();
        let request = apply_headers(self.client.request(method, url), headers);

        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| QueryError::Timeout(timeout.as_millis() as u64))??;

        Ok(HealthCheckResponse {
            status: response.status().as_u16(),
            elapsed: started.elapsed(),
        })
    }
}
