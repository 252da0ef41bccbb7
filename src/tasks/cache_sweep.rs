//! Cache sweep task - drops expired result cache entries

use crate::cache::ResultCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Expired entries are already ignored on read; this only bounds memory.
pub async fn cache_sweep_task(cache: Arc<ResultCache>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    info!(interval_secs = every.as_secs(), "Cache sweep task started");

    loop {
        interval.tick().await;
        let purged = cache.purge_expired();
        if purged > 0 {
            debug!(purged = purged, remaining = cache.len(), "Expired cache entries purged");
        }
    }
}
