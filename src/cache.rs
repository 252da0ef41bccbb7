//! TTL result cache
//!
//! Entries are keyed by a SHA-256 of the request identity and carry the
//! system and (optionally) the saved query that produced them, so both can be
//! invalidated in bulk. Stale entries are never served; they are dropped on
//! read or by [`ResultCache::purge_expired`].

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Hash of everything that shapes a stored result: system, method, query,
/// parameters, the ordered transform list and the saved query, if any
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(
        system_id: Uuid,
        method: Option<&str>,
        query: &str,
        parameters: &Map<String, Value>,
        transformations: &[String],
        query_id: Option<Uuid>,
    ) -> Self {
        // serde_json maps are sorted, so equal parameters hash equally.
        // Transform order matters and is kept as given.
        let identity = json!({
            "system_id": system_id,
            "method": method.unwrap_or_default(),
            "query": query,
            "parameters": parameters,
            "transformations": transformations,
            "query_id": query_id,
        });
        let digest = Sha256::digest(identity.to_string().as_bytes());
        CacheKey(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a cache hit replays
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub data: Value,
    pub record_count: usize,
    pub system_name: String,
    pub method: String,
    pub transformations_applied: Vec<String>,
}

struct CacheEntry {
    result: CachedResult,
    created_at: Instant,
    ttl: Duration,
    system_id: Uuid,
    query_id: Option<Uuid>,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh entry for `key`, if any. A stale entry is removed.
    pub fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        let fresh = match self.entries.read().get(key) {
            Some(entry) if entry.is_fresh() => Some(entry.result.clone()),
            Some(_) => None,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match fresh {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let mut entries = self.entries.write();
                if entries.get(key).is_some_and(|e| !e.is_fresh()) {
                    entries.remove(key);
                }
                None
            }
        }
    }

    /// Store a result for `ttl`. A zero TTL stores nothing.
    pub fn insert(
        &self,
        key: CacheKey,
        result: CachedResult,
        ttl: Duration,
        system_id: Uuid,
        query_id: Option<Uuid>,
    ) {
        if ttl.is_zero() {
            return;
        }
        self.entries.write().insert(
            key,
            CacheEntry {
                result,
                created_at: Instant::now(),
                ttl,
                system_id,
                query_id,
            },
        );
    }

    /// Drop every entry produced by a saved query
    pub fn invalidate_query(&self, query_id: Uuid) -> usize {
        self.remove_where(|e| e.query_id == Some(query_id))
    }

    /// Drop every entry produced by a system
    pub fn invalidate_system(&self, system_id: Uuid) -> usize {
        self.remove_where(|e| e.system_id == system_id)
    }

    pub fn purge_expired(&self) -> usize {
        self.remove_where(|e| !e.is_fresh())
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn remove_where(&self, predicate: impl Fn(&CacheEntry) -> bool) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !predicate(entry));
        before - entries.len()
    }
}
