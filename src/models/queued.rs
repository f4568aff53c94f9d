// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Locally queued report awaiting upload.

use crate::models::ActivityReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Persisted status of a queued report.
///
/// `Submitting` and `Synced` are never stored: an in-flight record is still
/// `Pending` on disk, and a synced record is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    /// Terminal: rejected by the backend or out of retries
    Failed,
}

/// A report held in the local queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QueuedReport {
    /// Local id (also the storage key)
    pub id: Uuid,
    /// Enqueue order; flushes walk records by ascending sequence
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub sequence: u64,
    pub payload: ActivityReport,
    pub enqueued_at: DateTime<Utc>,
    /// Failed send attempts so far
    pub retry_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    pub status: ReportStatus,
    /// Earliest time an interval-triggered flush may retry this record
    #[serde(default)]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl QueuedReport {
    pub fn new(sequence: u64, payload: ActivityReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_error: None,
            status: ReportStatus::Pending,
            next_attempt_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReportStatus::Pending
    }

    /// Whether the backoff gate has passed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.map_or(true, |at| at <= now)
    }
}
