// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beat/range/division polygon codec.
//!
//! PostGIS hands polygon columns back either as hex EWKB (raw column reads)
//! or as GeoJSON (RPC results). Map views need a `geo::Polygon`; writes go
//! back to the database as WKT.

use geo::{Coord, Geometry, LineString, Polygon};
use serde::Deserialize;
use serde_json::Value;
use std::convert::TryInto;

/// Hex characters in the EWKB header: byte order (1) + type (4) + SRID (4).
const EWKB_HEADER_HEX_LEN: usize = 18;
/// Little-endian (NDR) byte-order marker.
const WKB_NDR: u8 = 0x01;
const WKB_POLYGON: u32 = 3;
/// PostGIS extension bit: an SRID follows the type.
const EWKB_SRID_FLAG: u32 = 0x2000_0000;
/// Three distinct vertices plus the closing point.
const MIN_RING_POSITIONS: usize = 4;

/// A polygon value as received from the database layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PolygonInput {
    /// Hex-encoded EWKB
    Hex(String),
    /// GeoJSON Feature, bare Polygon, or any object with a Polygon `.geometry`
    Structured(Value),
}

/// Decoded EWKB polygon with its spatial reference id.
#[derive(Debug, Clone, PartialEq)]
pub struct EwkbPolygon {
    pub srid: u32,
    pub polygon: Polygon<f64>,
}

/// Decode a polygon from either representation.
pub fn decode_polygon(input: &PolygonInput) -> Result<Polygon<f64>, DecodeError> {
    match input {
        PolygonInput::Hex(hex) => decode_ewkb_hex(hex).map(|decoded| decoded.polygon),
        PolygonInput::Structured(value) => polygon_from_structured(value),
    }
}

/// Decode a hex EWKB polygon (little-endian, with SRID).
///
/// Every declared ring is decoded: the first is the exterior, the rest are
/// holes. Rings must be closed and have at least four positions.
pub fn decode_ewkb_hex(hex: &str) -> Result<EwkbPolygon, DecodeError> {
    let hex = hex.trim();
    if !hex.is_ascii() {
        return Err(DecodeError::InvalidHex("non-ASCII input".to_string()));
    }
    if hex.len() < EWKB_HEADER_HEX_LEN {
        return Err(DecodeError::Truncated {
            needed: EWKB_HEADER_HEX_LEN / 2,
            available: hex.len() / 2,
        });
    }

    let (header_hex, body_hex) = hex.split_at(EWKB_HEADER_HEX_LEN);
    let header = hex::decode(header_hex).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
    let srid = parse_header(&header)?;

    let body = hex::decode(body_hex).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
    let mut reader = ByteReader::new(&body);

    let ring_count = reader.read_u32()? as usize;
    if ring_count == 0 {
        return Err(DecodeError::Empty);
    }

    let mut rings = Vec::with_capacity(ring_count.min(16));
    for _ in 0..ring_count {
        rings.push(read_ring(&mut reader)?);
    }

    if reader.remaining() > 0 {
        tracing::debug!(
            trailing_bytes = reader.remaining(),
            "Ignoring trailing bytes after EWKB polygon"
        );
    }

    let mut rings = rings.into_iter();
    let exterior = rings.next().ok_or(DecodeError::Empty)?;
    Ok(EwkbPolygon {
        srid,
        polygon: Polygon::new(exterior, rings.collect()),
    })
}

/// Validate the 9-byte EWKB header and return the SRID.
fn parse_header(header: &[u8]) -> Result<u32, DecodeError> {
    let mut reader = ByteReader::new(header);
    let byte_order = reader.read_u8()?;
    if byte_order != WKB_NDR {
        return Err(DecodeError::UnsupportedHeader(format!(
            "byte order {:#04x} (only little-endian is supported)",
            byte_order
        )));
    }
    let geometry_type = reader.read_u32()?;
    if geometry_type != (WKB_POLYGON | EWKB_SRID_FLAG) {
        return Err(DecodeError::UnsupportedHeader(format!(
            "geometry type {:#010x} (expected 2D polygon with SRID)",
            geometry_type
        )));
    }
    reader.read_u32()
}

fn read_ring(reader: &mut ByteReader<'_>) -> Result<LineString<f64>, DecodeError> {
    let point_count = reader.read_u32()? as usize;
    let needed = point_count
        .checked_mul(16)
        .ok_or(DecodeError::Truncated {
            needed: usize::MAX,
            available: reader.remaining(),
        })?;
    if needed > reader.remaining() {
        return Err(DecodeError::Truncated {
            needed,
            available: reader.remaining(),
        });
    }
    if point_count < MIN_RING_POSITIONS {
        return Err(DecodeError::RingTooShort(point_count));
    }

    let mut coords = Vec::with_capacity(point_count);
    for _ in 0..point_count {
        let x = reader.read_f64()?;
        let y = reader.read_f64()?;
        coords.push(Coord { x, y });
    }
    check_closed(&coords)?;
    Ok(LineString::new(coords))
}

/// Passthrough path: pull the polygon out of an already-structured value.
fn polygon_from_structured(value: &Value) -> Result<Polygon<f64>, DecodeError> {
    let geometry = match value.get("type").and_then(Value::as_str) {
        Some("Polygon") => Some(value),
        // Feature, or a row-like object carrying a `geometry` member
        _ => value.get("geometry"),
    }
    .filter(|g| g.get("type").and_then(Value::as_str) == Some("Polygon"))
    .ok_or(DecodeError::UnrecognizedShape)?;

    let geometry: geojson::Geometry = serde_json::from_value(geometry.clone())
        .map_err(|e| DecodeError::InvalidGeoJson(e.to_string()))?;

    // Check rings as given: `Polygon::new` would silently close them
    if let geojson::Value::Polygon(rings) = &geometry.value {
        for ring in rings {
            if ring.len() < MIN_RING_POSITIONS {
                return Err(DecodeError::RingTooShort(ring.len()));
            }
            if ring.first() != ring.last() {
                return Err(DecodeError::UnclosedRing);
            }
        }
    }

    geometry
        .value
        .try_into()
        .map_err(|e: geojson::Error| DecodeError::InvalidGeoJson(e.to_string()))
}

/// A ring must end where it starts.
fn check_closed(coords: &[Coord<f64>]) -> Result<(), DecodeError> {
    if coords.first() != coords.last() {
        return Err(DecodeError::UnclosedRing);
    }
    Ok(())
}

/// Convert a polygon into a GeoJSON Feature for the map layer.
pub fn polygon_to_feature(polygon: &Polygon<f64>) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(polygon))),
        id: None,
        properties: Some(serde_json::Map::new()),
        foreign_members: None,
    }
}

/// Encode a single-ring polygon as OGC WKT: `POLYGON((x1 y1, x2 y2, ...))`.
pub fn encode_to_wkt(polygon: &Polygon<f64>) -> Result<String, UnsupportedGeometryError> {
    if !polygon.interiors().is_empty() {
        return Err(UnsupportedGeometryError::MultiRing(
            polygon.interiors().len() + 1,
        ));
    }
    if polygon.exterior().0.is_empty() {
        return Err(UnsupportedGeometryError::Empty);
    }

    let coords: Vec<String> = polygon
        .exterior()
        .coords()
        .map(|c| format!("{} {}", c.x, c.y))
        .collect();
    Ok(format!("POLYGON(({}))", coords.join(", ")))
}

/// Encode any geometry as WKT; only polygons are supported.
pub fn encode_geometry_to_wkt(geometry: &Geometry<f64>) -> Result<String, UnsupportedGeometryError> {
    match geometry {
        Geometry::Polygon(polygon) => encode_to_wkt(polygon),
        other => Err(UnsupportedGeometryError::GeometryType(geometry_type_name(
            other,
        ))),
    }
}

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Encode a polygon as little-endian hex EWKB, the way PostGIS prints it.
pub fn encode_ewkb_hex(polygon: &Polygon<f64>, srid: u32) -> String {
    let rings: Vec<&LineString<f64>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .collect();

    let point_total: usize = rings.iter().map(|r| r.0.len()).sum();
    let mut bytes = Vec::with_capacity(13 + rings.len() * 4 + point_total * 16);
    bytes.push(WKB_NDR);
    bytes.extend_from_slice(&(WKB_POLYGON | EWKB_SRID_FLAG).to_le_bytes());
    bytes.extend_from_slice(&srid.to_le_bytes());
    bytes.extend_from_slice(&(rings.len() as u32).to_le_bytes());
    for ring in rings {
        bytes.extend_from_slice(&(ring.0.len() as u32).to_le_bytes());
        for c in ring.coords() {
            bytes.extend_from_slice(&c.x.to_le_bytes());
            bytes.extend_from_slice(&c.y.to_le_bytes());
        }
    }
    hex::encode_upper(bytes)
}

/// Little-endian cursor over a byte slice.
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let chunk = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated {
                needed: N,
                available: self.remaining(),
            })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.take()?))
    }
}

/// Errors decoding a polygon.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Unsupported EWKB header: {0}")]
    UnsupportedHeader(String),

    #[error("Truncated EWKB: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Polygon has no rings")]
    Empty,

    #[error("Ring has {0} positions (at least 4 required)")]
    RingTooShort(usize),

    #[error("Ring is not closed (first and last positions differ)")]
    UnclosedRing,

    #[error("Input is not a Feature, Polygon, or object with Polygon geometry")]
    UnrecognizedShape,

    #[error("Invalid GeoJSON polygon: {0}")]
    InvalidGeoJson(String),
}

/// Errors encoding a geometry to WKT.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UnsupportedGeometryError {
    #[error("Only Polygon geometry is supported, got {0}")]
    GeometryType(&'static str),

    #[error("Only single-ring polygons are supported, got {0} rings")]
    MultiRing(usize),

    #[error("Polygon has no coordinates")]
    Empty,
}
