//! Retention task - prunes old execution logs

use crate::db::Database;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Background task that periodically prunes execution logs.
///
/// Runs every 6 hours and deletes rows older than `retention_days`.
pub async fn retention_task(db: Arc<Database>, retention_days: i32) {
    // Wait 1 minute before starting to allow system to stabilize
    tokio::time::sleep(Duration::from_secs(60)).await;

    let mut interval = tokio::time::interval(Duration::from_secs(6 * 60 * 60));

    info!(retention_days = retention_days, "Retention task started (6h interval)");

    loop {
        interval.tick().await;

        match db.prune_old_logs(retention_days).await {
            Ok(deleted) if deleted > 0 => info!(deleted = deleted, "Pruned old execution logs"),
            Ok(_) => info!("No old execution logs to prune"),
            Err(e) => error!(error = %e, "Failed to prune old execution logs"),
        }
    }
}
