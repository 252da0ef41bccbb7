//! Execution logger
//!
//! Every execution attempt (completed, failed or served from cache) becomes an
//! [`ExecutionLogEntry`]. Entries are broadcast to operators immediately and
//! queued for the log store; a full queue or a failing store is reported, never
//! propagated to the request that produced the entry.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::buffer::LogBuffer;
use crate::models::{ExecutionLogEntry, ExecutionStatus, OperatorEvent};
use crate::store::ExecutionLogStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerStats {
    pub completed: u64,
    pub failed: u64,
    pub cached: u64,
    pub dropped: u64,
    pub flushed: u64,
    pub flush_failures: u64,
}

pub struct ExecutionLogger {
    buffer: LogBuffer,
    events: broadcast::Sender<OperatorEvent>,
    completed: AtomicU64,
    failed: AtomicU64,
    cached: AtomicU64,
    dropped: AtomicU64,
    flushed: AtomicU64,
    flush_failures: AtomicU64,
}

impl ExecutionLogger {
    pub fn new(buffer: LogBuffer, events: broadcast::Sender<OperatorEvent>) -> Self {
        Self {
            buffer,
            events,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cached: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            flushed: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OperatorEvent> {
        self.events.subscribe()
    }

    /// Record one execution attempt. Never fails.
    pub fn record(&self, entry: ExecutionLogEntry) {
        let counter = match entry.status {
            ExecutionStatus::Completed => &self.completed,
            ExecutionStatus::Failed => &self.failed,
            ExecutionStatus::Cached => &self.cached,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        // No subscribers is not an error
        let _ = self.events.send(OperatorEvent::Execution(entry.clone()));

        if let Err(entry) = self.buffer.try_push(entry) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            error!(
                system_id = %entry.system_id,
                query_id = ?entry.query_id,
                status = entry.status.as_str(),
                "Execution log buffer full, entry dropped"
            );
            let _ = self.events.send(OperatorEvent::LogDropped {
                system_id: entry.system_id,
                query_id: entry.query_id,
            });
        }
    }

    /// Move up to `max` buffered entries into `store`, returning how many were written.
    ///
    /// A failed batch is reported and discarded.
    pub async fn flush(&self, store: &dyn ExecutionLogStore, max: usize) -> usize {
        let batch = self.buffer.pop_batch(max);
        if batch.is_empty() {
            return 0;
        }

        let batch_size = batch.len();
        match store.insert_logs(&batch).await {
            Ok(written) => {
                self.flushed.fetch_add(written as u64, Ordering::Relaxed);
                if written < batch_size {
                    error!(
                        written = written,
                        expected = batch_size,
                        "Some execution log entries failed to insert"
                    );
                } else {
                    debug!(written = written, "Execution log batch flushed");
                }
                written
            }
            Err(e) => {
                self.flush_failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, batch_size = batch_size, "Failed to flush execution log batch");
                let _ = self.events.send(OperatorEvent::LogFlushFailed {
                    batch_size,
                    error: e.to_string(),
                });
                0
            }
        }
    }

    pub fn stats(&self) -> LoggerStats {
        LoggerStats {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
        }
    }
}
