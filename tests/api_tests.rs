// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests against an agent that starts offline.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use eravat_sync::services::geometry::encode_ewkb_hex;
use geo::polygon;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn report_json(tag: &str) -> Value {
    serde_json::to_value(common::sample_report(tag)).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _state) = common::create_test_app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_offline_submit_is_queued() {
    let (app, _state) = common::create_test_app().await;

    let (status, body) = send(&app, "POST", "/api/reports", Some(report_json("A"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    assert_eq!(body["reason"], "offline");

    let (status, body) = send(&app, "GET", "/api/reports/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["status"], "pending");
    assert_eq!(reports[0]["retry_count"], 0);
    assert_eq!(reports[0]["report"]["notes"], "A");
    assert!(reports[0]["enqueued_at"].as_str().unwrap().ends_with('Z'));

    let (status, body) = send(&app, "GET", "/api/sync/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"], 1);
    assert_eq!(body["online"], false);
}

#[tokio::test]
async fn test_invalid_report_rejected() {
    let (app, state) = common::create_test_app().await;

    let mut report = report_json("A");
    report["activity_time"] = json!("6:45 am");
    let (status, body) = send(&app, "POST", "/api/reports", Some(report)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_report");

    let mut report = report_json("B");
    report["total_elephants"] = json!(7);
    let (status, _) = send(&app, "POST", "/api/reports", Some(report)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(state.sync.list_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_while_offline() {
    let (app, _state) = common::create_test_app().await;
    send(&app, "POST", "/api/reports", Some(report_json("A"))).await;

    let (status, body) = send(&app, "POST", "/api/sync", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "offline");
}

#[tokio::test]
async fn test_network_update() {
    let (app, state) = common::create_test_app().await;

    let (status, body) = send(&app, "PUT", "/api/network", Some(json!({ "online": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], true);
    assert_eq!(body["changed"], true);
    assert!(state.network.is_online());

    let (_, body) = send(&app, "PUT", "/api/network", Some(json!({ "online": true }))).await;
    assert_eq!(body["changed"], false);
}

#[tokio::test]
async fn test_discard_and_retry_routes() {
    let (app, _state) = common::create_test_app().await;

    let (_, body) = send(&app, "POST", "/api/reports", Some(report_json("A"))).await;
    let id = body["id"].as_str().unwrap().to_string();

    // Retrying a pending record is a no-op that returns it
    let (status, body) = send(&app, "POST", &format!("/api/reports/{}/retry", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");

    let (status, _) = send(&app, "DELETE", &format!("/api/reports/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "DELETE", &format!("/api/reports/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(&app, "DELETE", "/api/reports/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_geometry_routes() {
    let (app, _state) = common::create_test_app().await;
    let polygon = polygon![
        (x: 75.1, y: 21.2),
        (x: 75.2, y: 21.2),
        (x: 75.2, y: 21.3),
        (x: 75.1, y: 21.2),
    ];
    let hex = encode_ewkb_hex(&polygon, 4326);

    let (status, body) = send(
        &app,
        "POST",
        "/api/geometry/decode",
        Some(json!({ "polygon": hex })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "Feature");
    assert_eq!(body["geometry"]["type"], "Polygon");
    assert_eq!(body["geometry"]["coordinates"][0][2], json!([75.2, 21.3]));

    let (status, body) = send(
        &app,
        "POST",
        "/api/geometry/wkt",
        Some(json!({ "polygon": body })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["wkt"],
        "POLYGON((75.1 21.2, 75.2 21.2, 75.2 21.3, 75.1 21.2))"
    );

    let (status, body) = send(
        &app,
        "POST",
        "/api/geometry/decode",
        Some(json!({ "polygon": "0103000020E6100000" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "decode_error");
}
