// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::ReportError;
use crate::services::geometry::{DecodeError, UnsupportedGeometryError};
use crate::services::supabase::SubmitError;
use crate::store::QueueError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidReport(#[from] ReportError),

    #[error("Local storage is full")]
    StorageFull,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Backend rejected report: {0}")]
    Rejected(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    UnsupportedGeometry(#[from] UnsupportedGeometryError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::StorageFull => AppError::StorageFull,
            QueueError::NotFound(id) => AppError::NotFound(format!("Queued report {}", id)),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        if err.is_retryable() {
            AppError::Unavailable(err.to_string())
        } else {
            AppError::Rejected(err.to_string())
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Status code and machine-readable error name.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::InvalidReport(_) => (StatusCode::BAD_REQUEST, "invalid_report"),
            AppError::StorageFull => (StatusCode::INSUFFICIENT_STORAGE, "storage_full"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            AppError::Rejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "rejected"),
            AppError::Unavailable(_) => (StatusCode::BAD_GATEWAY, "backend_unavailable"),
            AppError::Decode(_) => (StatusCode::BAD_REQUEST, "decode_error"),
            AppError::UnsupportedGeometry(_) => {
                (StatusCode::BAD_REQUEST, "unsupported_geometry")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();

        let details = match &self {
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Queue storage error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            other => Some(other.to_string()),
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
