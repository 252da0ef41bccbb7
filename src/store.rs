//! Persistence collaborators
//!
//! The engine only reads systems and saved queries and appends execution log
//! rows. [`crate::db::Database`] implements these traits on Postgres;
//! [`MemoryStore`] keeps everything in process.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{CustomQuery, ExecutionLogEntry, ExternalSystem};

#[async_trait]
pub trait SystemStore: Send + Sync {
    async fn get_system(&self, id: Uuid) -> EngineResult<Option<ExternalSystem>>;
}

#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn get_query(&self, id: Uuid) -> EngineResult<Option<CustomQuery>>;
}

#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    /// Append a batch of log rows, returning how many were written
    async fn insert_logs(&self, entries: &[ExecutionLogEntry]) -> EngineResult<usize>;
}

/// In-process record store
#[derive(Default)]
pub struct MemoryStore {
    systems: RwLock<HashMap<Uuid, ExternalSystem>>,
    queries: RwLock<HashMap<Uuid, CustomQuery>>,
    logs: RwLock<Vec<ExecutionLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_system(&self, system: ExternalSystem) {
        self.systems.write().insert(system.id, system);
    }

    pub fn put_query(&self, query: CustomQuery) {
        self.queries.write().insert(query.id, query);
    }

    pub fn remove_query(&self, id: Uuid) -> Option<CustomQuery> {
        self.queries.write().remove(&id)
    }

    /// Snapshot of every log row written so far
    pub fn logs(&self) -> Vec<ExecutionLogEntry> {
        self.logs.read().clone()
    }
}

#[async_trait]
impl SystemStore for MemoryStore {
    async fn get_system(&self, id: Uuid) -> EngineResult<Option<ExternalSystem>> {
        Ok(self.systems.read().get(&id).cloned())
    }
}

#[async_trait]
impl QueryStore for MemoryStore {
    async fn get_query(&self, id: Uuid) -> EngineResult<Option<CustomQuery>> {
        Ok(self.queries.read().get(&id).cloned())
    }
}

#[async_trait]
impl ExecutionLogStore for MemoryStore {
    async fn insert_logs(&self, entries: &[ExecutionLogEntry]) -> EngineResult<usize> {
        self.logs.write().extend_from_slice(entries);
        Ok(entries.len())
    }
}
