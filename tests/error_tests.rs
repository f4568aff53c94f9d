// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use eravat_sync::error::AppError;
use eravat_sync::services::geometry::DecodeError;
use eravat_sync::services::SubmitError;
use eravat_sync::store::QueueError;

fn status_of(err: AppError) -> StatusCode {
    err.into_response().status()
}

#[test]
fn test_queue_errors_map_to_status() {
    assert_eq!(
        status_of(QueueError::StorageFull.into()),
        StatusCode::INSUFFICIENT_STORAGE
    );
    assert_eq!(
        status_of(QueueError::NotFound(uuid::Uuid::nil()).into()),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_of(QueueError::Storage("disk gone".to_string()).into()),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_submit_errors_split_by_retryability() {
    let err: AppError = SubmitError::Network("timed out".to_string()).into();
    assert!(matches!(err, AppError::Unavailable(_)));
    assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);

    let err: AppError = SubmitError::Rejected {
        status: 409,
        message: "duplicate key".to_string(),
    }
    .into();
    assert!(matches!(err, AppError::Rejected(_)));
    assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn test_decode_error_is_bad_request() {
    assert_eq!(
        status_of(DecodeError::Empty.into()),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(AppError::BadRequest("nope".to_string())),
        StatusCode::BAD_REQUEST
    );
}
