//! Log flush task - moves execution log rows from buffer to the store

use crate::logger::ExecutionLogger;
use crate::store::ExecutionLogStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Rows written per store round trip
pub const FLUSH_BATCH_SIZE: usize = 1_000;

pub const FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// Background task that periodically drains the execution log buffer.
///
/// Each tick keeps flushing until the buffer is empty, so bursts do not wait
/// several intervals. Failures are reported by the logger and the batch is lost.
pub async fn log_flush_task(logger: Arc<ExecutionLogger>, store: Arc<dyn ExecutionLogStore>) {
    let mut interval = tokio::time::interval(FLUSH_INTERVAL);

    info!("Log flush task started (2s interval)");

    loop {
        interval.tick().await;
        let written = drain(&logger, store.as_ref()).await;
        if written > 0 {
            debug!(written = written, "Execution logs flushed");
        }
    }
}

/// Flush until the buffer is empty or a batch makes no progress
pub async fn drain(logger: &ExecutionLogger, store: &dyn ExecutionLogStore) -> usize {
    let mut total = 0;
    while !logger.buffer().is_empty() {
        let written = logger.flush(store, FLUSH_BATCH_SIZE).await;
        if written == 0 {
            break;
        }
        total += written;
    }
    total
}
