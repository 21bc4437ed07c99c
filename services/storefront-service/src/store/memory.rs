//! In-memory record store for tests.
//!
//! Reports itself as the database backend so routing tests can tell which
//! store served a call without a running PostgreSQL. Like the database
//! store it lists newest first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{
    apply_patch, generate_id, Backend, Filter, Patch, Record, RecordStore, StoreError, StoreResult,
};

pub struct MemoryStore<T> {
    records: Mutex<Vec<T>>,
    simulate_write_error: AtomicBool,
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            simulate_write_error: AtomicBool::new(false),
        }
    }
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail as if the connection dropped.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(Backend::Database, "simulated write error"));
        }
        Ok(())
    }

    fn matching(&self, filter: &Filter) -> Vec<T> {
        let records = self.records.lock().unwrap();
        records
            .iter()
            .rev()
            .filter(|record| {
                let doc = serde_json::to_value(record).unwrap_or(Value::Null);
                filter.matches(&doc)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for MemoryStore<T> {
    fn backend(&self) -> Backend {
        Backend::Database
    }

    async fn list(&self, filter: &Filter) -> Vec<T> {
        self.matching(filter)
    }

    async fn get(&self, id: &str) -> Option<T> {
        let records = self.records.lock().unwrap();
        records.iter().find(|record| record.id() == id).cloned()
    }

    async fn create(&self, mut record: T) -> StoreResult<T> {
        self.check_writable()?;
        record.assign_identity(generate_id(), Utc::now());
        record.validate().map_err(StoreError::Validation)?;
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: Patch) -> StoreResult<Option<T>> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        let Some(slot) = records.iter_mut().find(|record| record.id() == id) else {
            return Ok(None);
        };
        let updated = apply_patch(slot, &patch, Utc::now())?;
        *slot = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|record| record.id() != id);
        Ok(records.len() != before)
    }

    async fn count(&self, filter: &Filter) -> usize {
        self.matching(filter).len()
    }
}
