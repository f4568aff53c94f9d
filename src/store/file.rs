// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Directory-backed queue store.
//!
//! Each record lives in `<dir>/<id>.json`. Writes go to a temp file first and
//! are renamed into place, so a crash never leaves a half-written record.

use super::{QueueError, QueueStore};
use crate::models::QueuedReport;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "json.tmp";

/// Queue store persisted as JSON files in a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
    max_records: Option<usize>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open<P: AsRef<Path>>(
        dir: P,
        max_records: Option<usize>,
    ) -> Result<Self, QueueError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        tracing::info!(path = %dir.display(), "Opened file queue store");
        Ok(Self { dir, max_records })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    async fn record_count(&self) -> Result<usize, QueueError> {
        let mut count = 0;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if is_record_file(&entry.path()) {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn is_record_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
}

impl QueueStore for FileStore {
    async fn get(&self, id: Uuid) -> Result<Option<QueuedReport>, QueueError> {
        let path = self.record_path(id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| QueueError::Corrupt {
                key: id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn set(&self, record: &QueuedReport) -> Result<(), QueueError> {
        let path = self.record_path(record.id);

        if let Some(max) = self.max_records {
            let exists = fs::try_exists(&path).await?;
            if !exists && self.record_count().await? >= max {
                tracing::warn!(max_records = max, "File queue store is full");
                return Err(QueueError::StorageFull);
            }
        }

        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| QueueError::Storage(format!("Serialize error: {}", e)))?;

        let tmp = self
            .dir
            .join(format!("{}.{}", record.id, TEMP_EXTENSION));
        if let Err(e) = fs::write(&tmp, &body).await {
            // Best effort: don't leave a partial temp file behind
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<bool, QueueError> {
        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn iterate(&self) -> Result<Vec<QueuedReport>, QueueError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_record_file(&path) {
                continue;
            }
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                // Removed by a concurrent sync between read_dir and read
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let record: QueuedReport =
                serde_json::from_slice(&bytes).map_err(|e| QueueError::Corrupt {
                    key: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            records.push(record);
        }
        Ok(records)
    }
}
