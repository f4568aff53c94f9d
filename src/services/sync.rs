// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Offline report queue and sync engine.
//!
//! Handles the report lifecycle:
//! 1. Submit directly when online, queue locally when offline or on a
//!    retryable failure
//! 2. Drain the queue oldest-first when connectivity returns, on a timer,
//!    or on request
//! 3. Back off exponentially between retries and park records that the
//!    backend rejects (or that run out of retries) as `Failed`
//!
//! Only one flush runs at a time. A flush works from a snapshot taken when
//! it starts and mutates records by id, so reports enqueued mid-flush are
//! left for the next cycle.

use crate::error::{AppError, Result};
use crate::models::{ActivityReport, QueuedReport, ReportStatus};
use crate::services::network::NetworkMonitor;
use crate::services::supabase::SubmitError;
use crate::store::{QueueError, QueueStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Remote endpoint that accepts one report at a time.
pub trait ReportSubmitter: Send + Sync {
    fn submit(
        &self,
        report: &ActivityReport,
    ) -> impl Future<Output = std::result::Result<(), SubmitError>> + Send;
}

/// Why a flush was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// Device went from offline to online
    Reconnected,
    /// Periodic timer
    Interval,
    /// User pressed "sync now" (or the shell asked)
    Manual,
}

impl SyncTrigger {
    /// Only timer-driven flushes wait out the backoff delay.
    fn honors_backoff(self) -> bool {
        matches!(self, SyncTrigger::Interval)
    }
}

/// Retry limits and exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Failed attempts before a record is parked as `Failed`
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30 * 60),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.backoff_base,
            max_delay: config.backoff_max,
        }
    }

    /// Delay after the `retry_count`-th failure: base * 2^(n-1), capped.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry_count - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Per-record notification emitted during flushes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Submitting {
        id: Uuid,
    },
    Synced {
        id: Uuid,
    },
    Retrying {
        id: Uuid,
        retry_count: u32,
        error: String,
        next_attempt_at: DateTime<Utc>,
    },
    Failed {
        id: Uuid,
        error: String,
    },
}

/// Result of one flush pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FlushReport {
    /// Records handed to the submitter
    pub attempted: usize,
    /// Records delivered and removed, in order
    pub synced: Vec<Uuid>,
    /// Record whose failure ended the pass
    pub halted_on: Option<Uuid>,
    /// Pass stopped because the oldest record is still backing off
    pub deferred: bool,
    /// Pending records left after the pass
    pub remaining: usize,
}

/// Outcome of `attempt_flush`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Another flush is in progress; nothing was done
    AlreadyRunning,
    /// Device is offline; nothing was done
    Offline,
    Completed(FlushReport),
}

/// Why a submitted report ended up in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueReason {
    Offline,
    SubmitFailed,
}

/// Outcome of `submit_report`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Delivered to the backend
    Submitted,
    /// Saved locally; will be sent by a later flush
    Queued {
        id: Uuid,
        reason: QueueReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Counts for the sync status badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncStatus {
    pub pending: usize,
    pub failed: usize,
    pub syncing: bool,
    pub online: bool,
}

/// Clears the in-progress flag when the flush ends, however it ends.
struct FlushGuard<'a>(&'a AtomicBool);

impl<'a> FlushGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Queue + flush engine over a store and a submitter.
pub struct SyncEngine<S, R> {
    store: S,
    submitter: R,
    network: NetworkMonitor,
    policy: RetryPolicy,
    next_sequence: AtomicU64,
    flushing: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl<S: QueueStore, R: ReportSubmitter> SyncEngine<S, R> {
    /// Build an engine, resuming sequence numbering after whatever the store
    /// already holds.
    pub async fn open(
        store: S,
        submitter: R,
        network: NetworkMonitor,
        policy: RetryPolicy,
    ) -> std::result::Result<Self, QueueError> {
        let existing = store.iterate().await?;
        let next_sequence = existing
            .iter()
            .map(|r| r.sequence + 1)
            .max()
            .unwrap_or(1);

        tracing::info!(
            queued = existing.len(),
            next_sequence,
            "Sync engine opened"
        );

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            store,
            submitter,
            network,
            policy,
            next_sequence: AtomicU64::new(next_sequence),
            flushing: AtomicBool::new(false),
            events,
        })
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receive per-record notifications from subsequent flushes.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ─── Queue Operations ────────────────────────────────────────

    /// Append a report to the queue.
    pub async fn enqueue(&self, payload: ActivityReport) -> std::result::Result<Uuid, QueueError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let record = QueuedReport::new(sequence, payload);

        if let Err(e) = self.store.set(&record).await {
            tracing::error!(error = %e, "Failed to queue report locally");
            return Err(e);
        }

        tracing::info!(id = %record.id, sequence, "Report queued for later sync");
        Ok(record.id)
    }

    /// Every queued record (pending and failed), oldest first.
    pub async fn list_pending(&self) -> std::result::Result<Vec<QueuedReport>, QueueError> {
        let mut records = self.store.iterate().await?;
        records.sort_by_key(|r| r.sequence);
        Ok(records)
    }

    /// Current pending/failed counts.
    pub async fn status(&self) -> std::result::Result<SyncStatus, QueueError> {
        let records = self.store.iterate().await?;
        let failed = records
            .iter()
            .filter(|r| r.status == ReportStatus::Failed)
            .count();
        Ok(SyncStatus {
            pending: records.len() - failed,
            failed,
            syncing: self.flushing.load(Ordering::Acquire),
            online: self.network.is_online(),
        })
    }

    /// Put a `Failed` record back in line. Its retry count is kept.
    pub async fn retry_failed(&self, id: Uuid) -> std::result::Result<QueuedReport, QueueError> {
        let mut record = self.store.get(id).await?.ok_or(QueueError::NotFound(id))?;
        if record.status == ReportStatus::Failed {
            record.status = ReportStatus::Pending;
            record.next_attempt_at = None;
            self.store.set(&record).await?;
            tracing::info!(%id, retry_count = record.retry_count, "Failed report re-queued");
        }
        Ok(record)
    }

    /// Delete a record at the user's request.
    pub async fn discard(&self, id: Uuid) -> std::result::Result<(), QueueError> {
        if !self.store.remove(id).await? {
            return Err(QueueError::NotFound(id));
        }
        tracing::info!(%id, "Queued report discarded by user");
        Ok(())
    }

    // ─── Submission ──────────────────────────────────────────────

    /// Submit a new report, falling back to the queue when it can't be
    /// delivered now.
    ///
    /// Invalid reports and reports the backend rejects are returned as
    /// errors and never queued.
    pub async fn submit_report(&self, payload: ActivityReport) -> Result<SubmitOutcome> {
        payload.check()?;

        if !self.network.is_online() {
            let id = self.enqueue(payload).await?;
            return Ok(SubmitOutcome::Queued {
                id,
                reason: QueueReason::Offline,
                error: None,
            });
        }

        match self.submitter.submit(&payload).await {
            Ok(()) => {
                tracing::info!("Report submitted");
                Ok(SubmitOutcome::Submitted)
            }
            Err(err) if err.is_retryable() => {
                tracing::warn!(error = %err, "Submission failed, queueing report");
                let id = self.enqueue(payload).await?;
                Ok(SubmitOutcome::Queued {
                    id,
                    reason: QueueReason::SubmitFailed,
                    error: Some(err.to_string()),
                })
            }
            Err(err) => Err(AppError::from(err)),
        }
    }

    // ─── Flush ───────────────────────────────────────────────────

    /// Try to drain the queue, oldest first, stopping at the first failure.
    ///
    /// Each record is re-read just before it is sent, so a report discarded
    /// mid-flush is never submitted.
    pub async fn attempt_flush(
        &self,
        trigger: SyncTrigger,
    ) -> std::result::Result<FlushOutcome, QueueError> {
        let Some(_guard) = FlushGuard::acquire(&self.flushing) else {
            tracing::debug!(?trigger, "Flush already in progress");
            return Ok(FlushOutcome::AlreadyRunning);
        };

        if !self.network.is_online() {
            tracing::debug!(?trigger, "Offline, skipping flush");
            return Ok(FlushOutcome::Offline);
        }

        let snapshot: Vec<QueuedReport> = self
            .list_pending()
            .await?
            .into_iter()
            .filter(QueuedReport::is_pending)
            .collect();

        let now = Utc::now();
        let mut report = FlushReport::default();

        for queued in snapshot {
            // The snapshot only fixes the order; the user may have discarded
            // or changed a record while earlier ones were being sent.
            let Some(record) = self.store.get(queued.id).await? else {
                tracing::debug!(id = %queued.id, "Report discarded during flush, skipping");
                continue;
            };
            if !record.is_pending() {
                tracing::debug!(id = %record.id, "Report no longer pending, skipping");
                continue;
            }

            if trigger.honors_backoff() && !record.is_due(now) {
                tracing::debug!(
                    id = %record.id,
                    next_attempt_at = ?record.next_attempt_at,
                    "Oldest report still backing off"
                );
                report.deferred = true;
                break;
            }

            report.attempted += 1;
            self.emit(SyncEvent::Submitting { id: record.id });

            match self.submitter.submit(&record.payload).await {
                Ok(()) => {
                    self.store.remove(record.id).await?;
                    tracing::info!(id = %record.id, "Queued report synced");
                    report.synced.push(record.id);
                    self.emit(SyncEvent::Synced { id: record.id });
                }
                Err(err) => {
                    self.record_failure(record.id, &err).await?;
                    report.halted_on = Some(record.id);
                    break;
                }
            }
        }

        report.remaining = self
            .store
            .iterate()
            .await?
            .iter()
            .filter(|r| r.is_pending())
            .count();

        tracing::info!(
            ?trigger,
            attempted = report.attempted,
            synced = report.synced.len(),
            remaining = report.remaining,
            halted = report.halted_on.is_some(),
            deferred = report.deferred,
            "Flush complete"
        );

        Ok(FlushOutcome::Completed(report))
    }

    /// Record a failed send against the stored copy of the record.
    async fn record_failure(
        &self,
        id: Uuid,
        err: &SubmitError,
    ) -> std::result::Result<(), QueueError> {
        // Re-read: the user may have discarded or retried it meanwhile
        let Some(mut record) = self.store.get(id).await? else {
            tracing::warn!(%id, "Report disappeared during flush");
            return Ok(());
        };

        record.retry_count = record.retry_count.saturating_add(1);
        record.last_error = Some(err.to_string());

        if !err.is_retryable() {
            record.status = ReportStatus::Failed;
            record.next_attempt_at = None;
            tracing::warn!(%id, error = %err, "Report rejected by backend, marked failed");
            self.emit(SyncEvent::Failed {
                id,
                error: err.to_string(),
            });
        } else if record.retry_count >= self.policy.max_retries {
            record.status = ReportStatus::Failed;
            record.next_attempt_at = None;
            tracing::warn!(
                %id,
                retry_count = record.retry_count,
                error = %err,
                "Retry limit reached, marked failed"
            );
            self.emit(SyncEvent::Failed {
                id,
                error: format!("retry limit reached: {}", err),
            });
        } else {
            let delay = self.policy.delay_for(record.retry_count);
            let next_attempt_at = Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::days(1));
            record.next_attempt_at = Some(next_attempt_at);
            tracing::info!(
                %id,
                retry_count = record.retry_count,
                delay_secs = delay.as_secs(),
                error = %err,
                "Report send failed, will retry"
            );
            self.emit(SyncEvent::Retrying {
                id,
                retry_count: record.retry_count,
                error: err.to_string(),
                next_attempt_at,
            });
        }

        self.store.set(&record).await
    }
}

/// Run flushes on reconnect and on a fixed interval until the runtime stops.
///
/// When the monitor has a ping URL, each tick probes reachability first.
/// `interval` must be non-zero; `Config::from_env` enforces this.
pub fn spawn_sync_loop<S, R>(engine: Arc<SyncEngine<S, R>>, interval: Duration) -> JoinHandle<()>
where
    S: QueueStore + 'static,
    R: ReportSubmitter + 'static,
{
    tokio::spawn(async move {
        let mut online_rx = engine.network().subscribe();
        let mut was_online = *online_rx.borrow_and_update();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    let reconnected = online && !was_online;
                    was_online = online;
                    if reconnected {
                        run_flush(&engine, SyncTrigger::Reconnected).await;
                    }
                }
                _ = ticker.tick() => {
                    if engine.network().has_probe() {
                        engine.network().probe().await;
                    }
                    if engine.network().is_online() {
                        run_flush(&engine, SyncTrigger::Interval).await;
                    }
                }
            }
        }

        tracing::info!("Sync loop stopped");
    })
}

async fn run_flush<S: QueueStore, R: ReportSubmitter>(
    engine: &SyncEngine<S, R>,
    trigger: SyncTrigger,
) {
    if let Err(e) = engine.attempt_flush(trigger).await {
        tracing::error!(?trigger, error = %e, "Flush failed");
    }
}
