//! System registry and config cache
//!
//! Memoizes each system's definition together with its pre-built auth headers.
//! Entries are only dropped through [`SystemRegistry::clear`]; whoever edits a
//! system's configuration must clear it here or the old auth and method
//! definitions keep being served.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::auth::{build_auth_headers, Headers};
use crate::error::{EngineResult, QueryError};
use crate::models::ExternalSystem;
use crate::store::SystemStore;

/// A loaded system and the headers derived from its auth config
#[derive(Debug)]
pub struct ResolvedSystem {
    pub system: ExternalSystem,
    pub headers: Headers,
}

pub struct SystemRegistry {
    store: Arc<dyn SystemStore>,
    cache: RwLock<HashMap<Uuid, Arc<ResolvedSystem>>>,
}

impl SystemRegistry {
    pub fn new(store: Arc<dyn SystemStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a system, loading and caching it on first use.
    ///
    /// Inactive systems and systems whose auth config cannot produce headers
    /// fail and are not cached.
    pub async fn resolve(&self, system_id: Uuid) -> EngineResult<Arc<ResolvedSystem>> {
        let cached = self.cache.read().get(&system_id).cloned();
        if let Some(resolved) = cached {
            return Ok(resolved);
        }

        let system = self
            .store
            .get_system(system_id)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("system {}", system_id)))?;

        if !system.is_active {
            return Err(QueryError::SystemInactive(system_id));
        }

        let headers = build_auth_headers(&system.auth, &system.headers)?;
        let resolved = Arc::new(ResolvedSystem { system, headers });

        debug!(system_id = %system_id, "Cached system configuration");
        self.cache
            .write()
            .insert(system_id, Arc::clone(&resolved));

        Ok(resolved)
    }

    /// Evict one system, or every system when `system_id` is `None`
    pub fn clear(&self, system_id: Option<Uuid>) {
        let mut cache = self.cache.write();
        match system_id {
            Some(id) => {
                cache.remove(&id);
            }
            None => cache.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}
