//! Application state shared across handlers

use crate::buffer::LogBuffer;
use crate::cache::ResultCache;
use crate::config::Config;
use crate::db::Database;
use crate::engine::registry::SystemRegistry;
use crate::engine::QueryEngine;
use crate::error::EngineResult;
use crate::logger::ExecutionLogger;
use crate::routes::metrics::Metrics;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, also the system/query/log store
    pub db: Arc<Database>,
    /// Query execution engine
    pub engine: Arc<QueryEngine>,
    /// Execution logger, shared with the flush task
    pub logger: Arc<ExecutionLogger>,
    /// Result cache, shared with the sweep task
    pub cache: Arc<ResultCache>,
    /// Application metrics for Prometheus
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire the engine and its caches on top of the database
    ///
    /// # Arguments
    /// * `db` - Database connection
    /// * `config` - Process configuration (buffer sizes, timeouts)
    pub fn new(db: Database, config: &Config) -> EngineResult<Self> {
        let db = Arc::new(db);
        let (events_tx, _) = broadcast::channel(config.broadcast_capacity);

        let registry = Arc::new(SystemRegistry::new(db.clone()));
        let cache = Arc::new(ResultCache::default());
        let logger = Arc::new(ExecutionLogger::new(
            LogBuffer::new(config.log_buffer_capacity),
            events_tx,
        ));
        let engine = QueryEngine::new(
            registry,
            db.clone(),
            cache.clone(),
            logger.clone(),
            config.engine(),
        )?;

        Ok(Self {
            db,
            engine: Arc::new(engine),
            logger,
            cache,
            metrics: Arc::new(Metrics::new()),
        })
    }
}
