//! Core domain models for query-bridge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::QueryError;
use crate::transform::TransformConfig;

/// Wire protocol used by a query method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    HttpGet,
    HttpPost,
    #[serde(rename = "graphql")]
    GraphQl,
    Rest,
    Sql,
    Custom,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::HttpGet => "http_get",
            Protocol::HttpPost => "http_post",
            Protocol::GraphQl => "graphql",
            Protocol::Rest => "rest",
            Protocol::Sql => "sql",
            Protocol::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Authentication scheme and credentials of an external system.
///
/// Credentials are optional at the type level so that a half-configured
/// system still loads; the header builder rejects missing fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    #[default]
    None,
    Basic {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
    Bearer {
        #[serde(default)]
        token: Option<String>,
    },
    ApiKey {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        header_name: Option<String>,
    },
    #[serde(rename = "oauth")]
    OAuth {
        #[serde(default)]
        access_token: Option<String>,
        #[serde(default)]
        refresh_token: Option<String>,
    },
    Custom {
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

/// A named, declared way of talking to one external system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMethod {
    pub name: String,
    #[serde(alias = "type")]
    pub protocol: Protocol,
    /// Endpoint template, relative to the system base URL unless absolute
    #[serde(default)]
    pub endpoint: String,
    /// Query-string name carrying the raw query text (GET)
    #[serde(default)]
    pub query_param: Option<String>,
    /// Body field carrying the query text (POST/REST), defaults to `query`
    #[serde(default)]
    pub query_field: Option<String>,
    /// Body field carrying caller parameters; flattened into the body when absent
    #[serde(default)]
    pub params_field: Option<String>,
    /// Dot-path to the payload inside the response, e.g. `data.issues`
    #[serde(default)]
    pub result_path: Option<String>,
    #[serde(default)]
    pub default_payload: Option<Map<String, Value>>,
    /// Override endpoint for `custom` methods
    #[serde(default)]
    pub custom_endpoint: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl QueryMethod {
    pub fn new(name: impl Into<String>, protocol: Protocol, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol,
            endpoint: endpoint.into(),
            query_param: None,
            query_field: None,
            params_field: None,
            result_path: None,
            default_payload: None,
            custom_endpoint: None,
            timeout_ms: None,
        }
    }
}

/// How `test_connection` checks a system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    /// `GET` unless stated
    #[serde(default)]
    pub method: Option<String>,
    /// Any 2xx passes when unset
    #[serde(default)]
    pub expected_status: Option<u16>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// An external system queries are executed against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSystem {
    pub id: Uuid,
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Additional headers merged on top of the auth headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Declared methods, in declaration order
    #[serde(default)]
    pub methods: Vec<QueryMethod>,
    #[serde(default)]
    pub transforms: BTreeMap<String, TransformConfig>,
    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Stored for compatibility; the engine never retries.
    #[serde(default)]
    pub retries: u32,
}

fn default_true() -> bool {
    true
}

impl ExternalSystem {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            base_url: base_url.into(),
            is_active: true,
            auth: AuthConfig::None,
            headers: BTreeMap::new(),
            methods: Vec::new(),
            transforms: BTreeMap::new(),
            health_check: None,
            timeout_ms: None,
            retries: 0,
        }
    }

    pub fn method(&self, name: &str) -> Option<&QueryMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

/// A user-owned, saved declarative query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomQuery {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub system_id: Uuid,
    #[serde(default)]
    pub method: Option<String>,
    pub query_text: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub transformations: Vec<String>,
    /// Also the cache TTL
    #[serde(default)]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// An ad-hoc execution request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub system_id: Uuid,
    pub query: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub transformations: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Cache results for this many seconds; no caching when unset or zero
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
    /// Skip the cache lookup but still write a fresh entry
    #[serde(default)]
    pub force_refresh: bool,
    /// Saved query this execution belongs to
    #[serde(default)]
    pub query_id: Option<Uuid>,
}

impl ExecuteRequest {
    pub fn new(system_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            system_id,
            query: query.into(),
            ..Default::default()
        }
    }

    /// Build the request a saved query stands for
    pub fn from_custom_query(query: &CustomQuery, force_refresh: bool) -> Self {
        Self {
            system_id: query.system_id,
            query: query.query_text.clone(),
            method: query.method.clone(),
            parameters: query.parameters.clone(),
            transformations: query.transformations.clone(),
            timeout_ms: None,
            cache_ttl_secs: query.cache_enabled.then_some(query.refresh_interval_secs),
            force_refresh,
            query_id: Some(query.id),
        }
    }
}

/// Error descriptor of a failed execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

impl From<&QueryError> for ErrorInfo {
    fn from(err: &QueryError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub execution_time_ms: u64,
    pub record_count: usize,
    pub system_name: Option<String>,
    pub method: Option<String>,
    pub cache_hit: bool,
    pub transformations_applied: Vec<String>,
    pub executed_at: DateTime<Utc>,
}

/// Outcome of one execution, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub metadata: ExecutionMetadata,
}

impl QueryExecutionResult {
    pub fn error_kind(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.kind.as_str())
    }
}

/// Status of a recorded execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    Cached,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cached => "cached",
        }
    }
}

/// Audit row for one execution attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub id: Uuid,
    pub query_id: Option<Uuid>,
    pub system_id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: ExecutionStatus,
    pub result_snapshot: Option<Value>,
    pub execution_time_ms: u64,
    pub record_count: usize,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    pub fn new(system_id: Uuid, status: ExecutionStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_id: None,
            system_id,
            user_id: None,
            status,
            result_snapshot: None,
            execution_time_ms: 0,
            record_count: 0,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

/// Events pushed to operators over the WebSocket stream
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OperatorEvent {
    Execution(ExecutionLogEntry),
    LogDropped { system_id: Uuid, query_id: Option<Uuid> },
    LogFlushFailed { batch_size: usize, error: String },
}

/// Response of `test_connection`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    pub details: Value,
}
