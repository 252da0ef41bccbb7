//! Database access layer with SQLx and PostgreSQL

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{EngineResult, QueryError};
use crate::models::{CustomQuery, ExecutionLogEntry, ExternalSystem, Visibility};
use crate::store::{ExecutionLogStore, QueryStore, SystemStore};

/// Database connection pool and operations
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn new(connection_string: &str) -> EngineResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(50)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(connection_string)
            .await
            .map_err(|e| QueryError::Store(format!("Failed to connect: {}", e)))?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Delete execution logs older than `older_than_days`
    pub async fn prune_old_logs(&self, older_than_days: i32) -> EngineResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM query_execution_logs
            WHERE created_at < NOW() - make_interval(days => $1)
            "#,
        )
        .bind(older_than_days)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Decode a JSONB column into a typed config, reporting bad shapes as
/// configuration errors
fn json_column<T: DeserializeOwned>(row: &PgRow, column: &str) -> EngineResult<T> {
    let raw: Value = row.try_get(column)?;
    serde_json::from_value(raw)
        .map_err(|e| QueryError::Configuration(format!("invalid {} configuration: {}", column, e)))
}

fn optional_json_column<T: DeserializeOwned>(row: &PgRow, column: &str) -> EngineResult<Option<T>> {
    let raw: Option<Value> = row.try_get(column)?;
    raw.map(|v| {
        serde_json::from_value(v).map_err(|e| {
            QueryError::Configuration(format!("invalid {} configuration: {}", column, e))
        })
    })
    .transpose()
}

#[async_trait]
impl SystemStore for Database {
    async fn get_system(&self, id: Uuid) -> EngineResult<Option<ExternalSystem>> {
        let row = sqlx::query(
            r#"
            SELECT
                id, name, base_url, is_active, auth, headers, methods,
                transforms, health_check, timeout_ms, retries
            FROM external_systems
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ExternalSystem {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            base_url: row.try_get("base_url")?,
            is_active: row.try_get("is_active")?,
            auth: json_column(&row, "auth")?,
            headers: json_column(&row, "headers")?,
            methods: json_column(&row, "methods")?,
            transforms: json_column(&row, "transforms")?,
            health_check: optional_json_column(&row, "health_check")?,
            timeout_ms: row
                .try_get::<Option<i64>, _>("timeout_ms")?
                .map(|ms| ms.max(0) as u64),
            retries: row.try_get::<i32, _>("retries")?.max(0) as u32,
        }))
    }
}

#[async_trait]
impl QueryStore for Database {
    async fn get_query(&self, id: Uuid) -> EngineResult<Option<CustomQuery>> {
        let row = sqlx::query(
            r#"
            SELECT
                id, owner_id, system_id, method, query_text, parameters,
                transformations, refresh_interval_secs, cache_enabled,
                visibility, tags, is_active
            FROM custom_queries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let visibility: String = row.try_get("visibility")?;
        Ok(Some(CustomQuery {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            system_id: row.try_get("system_id")?,
            method: row.try_get("method")?,
            query_text: row.try_get("query_text")?,
            parameters: json_column(&row, "parameters")?,
            transformations: row.try_get("transformations")?,
            refresh_interval_secs: row.try_get::<i64, _>("refresh_interval_secs")?.max(0) as u64,
            cache_enabled: row.try_get("cache_enabled")?,
            visibility: if visibility == "public" {
                Visibility::Public
            } else {
                Visibility::Private
            },
            tags: row.try_get("tags")?,
            is_active: row.try_get("is_active")?,
        }))
    }
}

#[async_trait]
impl ExecutionLogStore for Database {
    /// Batch insert inside one transaction. Each row runs under its own
    /// savepoint, so a rejected row is rolled back alone and the rest commit.
    async fn insert_logs(&self, entries: &[ExecutionLogEntry]) -> EngineResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for entry in entries {
            sqlx::query("SAVEPOINT log_row").execute(&mut *tx).await?;

            let snapshot = entry.result_snapshot.clone().map(strip_nul);
            let error_message = entry.error_message.as_deref().map(|m| m.replace('\0', ""));

            let outcome = sqlx::query(
                r#"
                INSERT INTO query_execution_logs (
                    id, query_id, system_id, user_id, status, result_snapshot,
                    execution_time_ms, record_count, error_message, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(entry.id)
            .bind(entry.query_id)
            .bind(entry.system_id)
            .bind(entry.user_id)
            .bind(entry.status.as_str())
            .bind(&snapshot)
            .bind(entry.execution_time_ms as i64)
            .bind(entry.record_count as i64)
            .bind(&error_message)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await;

            match outcome {
                Ok(_) => {
                    sqlx::query("RELEASE SAVEPOINT log_row").execute(&mut *tx).await?;
                    inserted += 1;
                }
                Err(e) => {
                    error!(error = %e, log_id = %entry.id, "Failed to insert execution log");
                    sqlx::query("ROLLBACK TO SAVEPOINT log_row")
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

/// Remove NUL characters, which Postgres refuses in `jsonb` and `text`
fn strip_nul(value: Value) -> Value {
    match value {
        Value::String(s) if s.contains('\0') => Value::String(s.replace('\0', "")),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nul).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.replace('\0', ""), strip_nul(v)))
                .collect(),
        ),
        other => other,
    }
}
