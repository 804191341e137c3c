//! In-memory storage backend.
//!
//! Thread-safe map keyed by job name. Intended for tests and embedded use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::PersistedState;
use crate::storage::StateStore;

fn lock_err(context: &'static str) -> AppError {
    AppError::store(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: RwLock<HashMap<String, PersistedState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with records.
    pub fn with_records(records: impl IntoIterator<Item = PersistedState>) -> Self {
        let records = records
            .into_iter()
            .map(|state| (state.name.clone(), state))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Copy of the record for `name`, bypassing the async trait.
    pub fn snapshot(&self, name: &str) -> Option<PersistedState> {
        self.records.read().ok()?.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, name: &str) -> Result<Option<PersistedState>> {
        let records = self.records.read().map_err(|_| lock_err("get"))?;
        Ok(records.get(name).cloned())
    }

    async fn put(&self, state: &PersistedState) -> Result<()> {
        let mut records = self.records.write().map_err(|_| lock_err("put"))?;
        records.insert(state.name.clone(), state.clone());
        Ok(())
    }
}
