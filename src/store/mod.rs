// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local persistence for the offline report queue.
//!
//! The sync engine only needs four primitives (get/set/remove/iterate keyed
//! by report id). Two adapters implement them:
//! - [`MemoryStore`]: in-process map (web builds, tests)
//! - [`FileStore`]: one JSON document per report, survives restarts
//!
//! The adapter is chosen once at startup from [`Config`]; nothing downstream
//! knows which one is in use.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{Config, StoreBackend};
use crate::models::QueuedReport;
use std::future::Future;
use uuid::Uuid;

/// Key-value port over queued reports.
pub trait QueueStore: Send + Sync {
    /// Fetch a single record.
    fn get(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<QueuedReport>, QueueError>> + Send;

    /// Insert or replace a record.
    fn set(&self, record: &QueuedReport) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Delete a record. Returns `false` if it was not present.
    fn remove(&self, id: Uuid) -> impl Future<Output = Result<bool, QueueError>> + Send;

    /// All records, in no particular order.
    fn iterate(&self) -> impl Future<Output = Result<Vec<QueuedReport>, QueueError>> + Send;
}

/// Store adapter selected by configuration.
#[derive(Clone)]
pub enum ReportStore {
    Memory(MemoryStore),
    File(FileStore),
}

impl ReportStore {
    /// Build the adapter named by `QUEUE_STORE`.
    pub async fn from_config(config: &Config) -> Result<Self, QueueError> {
        let store = match config.queue_store {
            StoreBackend::Memory => {
                ReportStore::Memory(MemoryStore::with_capacity_limit(config.queue_max_records))
            }
            StoreBackend::File => ReportStore::File(
                FileStore::open(&config.queue_dir, config.queue_max_records).await?,
            ),
        };
        tracing::info!(backend = ?config.queue_store, "Queue store initialized");
        Ok(store)
    }
}

impl QueueStore for ReportStore {
    async fn get(&self, id: Uuid) -> Result<Option<QueuedReport>, QueueError> {
        match self {
            ReportStore::Memory(s) => s.get(id).await,
            ReportStore::File(s) => s.get(id).await,
        }
    }

    async fn set(&self, record: &QueuedReport) -> Result<(), QueueError> {
        match self {
            ReportStore::Memory(s) => s.set(record).await,
            ReportStore::File(s) => s.set(record).await,
        }
    }

    async fn remove(&self, id: Uuid) -> Result<bool, QueueError> {
        match self {
            ReportStore::Memory(s) => s.remove(id).await,
            ReportStore::File(s) => s.remove(id).await,
        }
    }

    async fn iterate(&self) -> Result<Vec<QueuedReport>, QueueError> {
        match self {
            ReportStore::Memory(s) => s.iterate().await,
            ReportStore::File(s) => s.iterate().await,
        }
    }
}

/// Errors from queue persistence.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Local storage is full; report was not saved")]
    StorageFull,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt queue record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Queued report not found: {0}")]
    NotFound(Uuid),
}

impl From<std::io::Error> for QueueError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::StorageFull => QueueError::StorageFull,
            _ => QueueError::Storage(e.to_string()),
        }
    }
}
