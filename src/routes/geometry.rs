// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Polygon decode/encode routes for the beat map views.

use crate::error::Result;
use crate::services::geometry::{
    decode_polygon, encode_to_wkt, polygon_to_feature, PolygonInput,
};
use crate::AppState;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Geometry routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/geometry/decode", post(decode))
        .route("/api/geometry/wkt", post(to_wkt))
}

#[derive(Deserialize)]
struct GeometryRequest {
    /// EWKB hex string or GeoJSON object, as read from the polygon column
    polygon: PolygonInput,
}

/// Decode a polygon column value into a GeoJSON Feature.
async fn decode(Json(req): Json<GeometryRequest>) -> Result<Json<geojson::Feature>> {
    let polygon = decode_polygon(&req.polygon)?;
    Ok(Json(polygon_to_feature(&polygon)))
}

#[derive(Serialize)]
struct WktResponse {
    wkt: String,
}

/// Convert a polygon into WKT for insertion into a geometry column.
async fn to_wkt(Json(req): Json<GeometryRequest>) -> Result<Json<WktResponse>> {
    let polygon = decode_polygon(&req.polygon)?;
    let wkt = encode_to_wkt(&polygon)?;
    Ok(Json(WktResponse { wkt }))
}
