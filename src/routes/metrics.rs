//! Prometheus metrics endpoint

use axum::extract::State;
use axum::response::IntoResponse;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::state::AppState;

/// HTTP-level counters; engine, logger and cache counters are read at scrape time
#[derive(Default)]
pub struct Metrics {
    /// Total execute/test requests processed
    pub requests_total: AtomicU64,
    /// Requests rejected before reaching the engine
    pub rejected_total: AtomicU64,
    /// Active WebSocket connections
    ws_connections: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ws_connections(&self) {
        self.ws_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_ws_connections(&self) {
        self.ws_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            ws_connections: self.ws_connections.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub rejected_total: u64,
    pub ws_connections: u64,
}

/// GET /metrics
///
/// Returns Prometheus-format metrics
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.get_metrics();
    let logs = state.logger.stats();
    let cache = state.cache.stats();

    let output = format!(
        r#"# HELP querybridge_requests_total Total number of engine HTTP requests processed
# TYPE querybridge_requests_total counter
querybridge_requests_total {}

# HELP querybridge_requests_rejected_total Requests rejected before execution
# TYPE querybridge_requests_rejected_total counter
querybridge_requests_rejected_total {}

# HELP querybridge_executions_total Recorded executions by status
# TYPE querybridge_executions_total counter
querybridge_executions_total{{status="completed"}} {}
querybridge_executions_total{{status="failed"}} {}
querybridge_executions_total{{status="cached"}} {}

# HELP querybridge_execution_logs_dropped_total Execution log rows dropped because the buffer was full
# TYPE querybridge_execution_logs_dropped_total counter
querybridge_execution_logs_dropped_total {}

# HELP querybridge_execution_logs_flushed_total Execution log rows written to the store
# TYPE querybridge_execution_logs_flushed_total counter
querybridge_execution_logs_flushed_total {}

# HELP querybridge_execution_log_flush_failures_total Failed execution log batch writes
# TYPE querybridge_execution_log_flush_failures_total counter
querybridge_execution_log_flush_failures_total {}

# HELP querybridge_log_buffer_depth Current number of execution log rows in buffer
# TYPE querybridge_log_buffer_depth gauge
querybridge_log_buffer_depth {}

# HELP querybridge_result_cache_entries Current number of result cache entries
# TYPE querybridge_result_cache_entries gauge
querybridge_result_cache_entries {}

# HELP querybridge_result_cache_hits_total Result cache hits
# TYPE querybridge_result_cache_hits_total counter
querybridge_result_cache_hits_total {}

# HELP querybridge_result_cache_misses_total Result cache misses
# TYPE querybridge_result_cache_misses_total counter
querybridge_result_cache_misses_total {}

# HELP querybridge_registry_entries Current number of cached system configurations
# TYPE querybridge_registry_entries gauge
querybridge_registry_entries {}

# HELP querybridge_websocket_connections Current number of active WebSocket connections
# TYPE querybridge_websocket_connections gauge
querybridge_websocket_connections {}

# HELP querybridge_info Build information
# TYPE querybridge_info gauge
querybridge_info{{version="{}"}} 1
"#,
        snapshot.requests_total,
        snapshot.rejected_total,
        logs.completed,
        logs.failed,
        logs.cached,
        logs.dropped,
        logs.flushed,
        logs.flush_failures,
        state.logger.buffer().len(),
        cache.entries,
        cache.hits,
        cache.misses,
        state.engine.registry().len(),
        snapshot.ws_connections,
        env!("CARGO_PKG_VERSION"),
    );

    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        output,
    )
}
