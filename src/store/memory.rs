// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory queue store.

use super::{QueueError, QueueStore};
use crate::models::QueuedReport;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Queue store backed by a concurrent map. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<Uuid, QueuedReport>>,
    /// Maximum number of records; inserts beyond it fail with `StorageFull`.
    max_records: Option<usize>,
    /// Serializes the capacity check with the insert of a new record
    admit: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(max_records: Option<usize>) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            max_records,
            admit: Arc::new(Mutex::new(())),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl QueueStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<QueuedReport>, QueueError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn set(&self, record: &QueuedReport) -> Result<(), QueueError> {
        let Some(max) = self.max_records else {
            self.records.insert(record.id, record.clone());
            return Ok(());
        };

        // Removals only shrink the map, so holding this across check and
        // insert is enough to keep the cap exact.
        let _admit = self
            .admit
            .lock()
            .map_err(|_| QueueError::Storage("capacity lock poisoned".to_string()))?;
        if !self.records.contains_key(&record.id) && self.records.len() >= max {
            tracing::warn!(max_records = max, "Memory queue store is full");
            return Err(QueueError::StorageFull);
        }
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<bool, QueueError> {
        Ok(self.records.remove(&id).is_some())
    }

    async fn iterate(&self) -> Result<Vec<QueuedReport>, QueueError> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }
}
