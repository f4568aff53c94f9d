// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report submission, offline queue, and sync routes.

use crate::error::{AppError, Result};
use crate::models::{ActivityReport, QueuedReport, ReportStatus};
use crate::services::{FlushOutcome, SubmitOutcome, SyncStatus, SyncTrigger};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Report and sync routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports", post(submit_report))
        .route("/api/reports/pending", get(list_pending))
        .route("/api/reports/{id}", delete(discard_report))
        .route("/api/reports/{id}/retry", post(retry_report))
        .route("/api/sync", post(sync_now))
        .route("/api/sync/status", get(sync_status))
        .route("/api/network", put(set_network))
}

fn parse_report_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid report id: {}", raw)))
}

// ─── Submission ──────────────────────────────────────────────

/// Submit a report; 201 if delivered, 202 if saved for later.
async fn submit_report(
    State(state): State<Arc<AppState>>,
    Json(report): Json<ActivityReport>,
) -> Result<(StatusCode, Json<SubmitOutcome>)> {
    let outcome = state.sync.submit_report(report).await?;
    let status = match outcome {
        SubmitOutcome::Submitted => StatusCode::CREATED,
        SubmitOutcome::Queued { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(outcome)))
}

// ─── Queue ───────────────────────────────────────────────────

/// Queued report as shown in the sync screen.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PendingReportSummary {
    pub id: Uuid,
    pub status: ReportStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub enqueued_at: String,
    pub next_attempt_at: Option<String>,
    pub report: ActivityReport,
}

impl From<QueuedReport> for PendingReportSummary {
    fn from(record: QueuedReport) -> Self {
        Self {
            id: record.id,
            status: record.status,
            retry_count: record.retry_count,
            last_error: record.last_error,
            enqueued_at: format_utc_rfc3339(record.enqueued_at),
            next_attempt_at: record.next_attempt_at.map(format_utc_rfc3339),
            report: record.payload,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PendingReportsResponse {
    pub reports: Vec<PendingReportSummary>,
}

/// List queued reports, oldest first.
async fn list_pending(State(state): State<Arc<AppState>>) -> Result<Json<PendingReportsResponse>> {
    let reports = state
        .sync
        .list_pending()
        .await?
        .into_iter()
        .map(PendingReportSummary::from)
        .collect();
    Ok(Json(PendingReportsResponse { reports }))
}

/// Move a failed report back into the queue.
async fn retry_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PendingReportSummary>> {
    let id = parse_report_id(&id)?;
    let record = state.sync.retry_failed(id).await?;
    Ok(Json(record.into()))
}

/// Delete a queued report.
async fn discard_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_report_id(&id)?;
    state.sync.discard(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Sync ────────────────────────────────────────────────────

/// Run a flush now ("sync now" button).
async fn sync_now(State(state): State<Arc<AppState>>) -> Result<Json<FlushOutcome>> {
    let outcome = state.sync.attempt_flush(SyncTrigger::Manual).await?;
    Ok(Json(outcome))
}

async fn sync_status(State(state): State<Arc<AppState>>) -> Result<Json<SyncStatus>> {
    Ok(Json(state.sync.status().await?))
}

#[derive(Deserialize)]
struct NetworkUpdate {
    online: bool,
}

#[derive(Serialize)]
struct NetworkResponse {
    online: bool,
    changed: bool,
}

/// Connectivity change pushed by the platform bridge.
async fn set_network(
    State(state): State<Arc<AppState>>,
    Json(update): Json<NetworkUpdate>,
) -> Json<NetworkResponse> {
    let changed = state.network.set_online(update.online);
    Json(NetworkResponse {
        online: update.online,
        changed,
    })
}
