//! The GeoJSON-shaped geometry value shared by every codec.
//!
//! Only the 2D shapes stored for entity locations are supported: Point,
//! LineString, Polygon, and GeometryCollections nesting them.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::types::{
    BOX_TYPE, GeoBox, LINE_TYPE, Line, POINT_TYPE, POLYGON_TYPE, Point, Polygon, SlfGeometry,
};
use crate::error::CodecError;

/// A GeoJSON position: `[longitude, latitude]`.
pub type Position = [f64; 2];

/// A supported GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Vec<Position>> },
    GeometryCollection { geometries: Vec<GeoJson> },
}

const SUPPORTED_TYPES: [&str; 4] = ["Point", "LineString", "Polygon", "GeometryCollection"];

impl GeoJson {
    /// Read a geometry from its JSON form.
    ///
    /// Shapes outside the supported set fail with
    /// [`CodecError::UnsupportedGeometry`]; broken members with
    /// [`CodecError::Malformed`].
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::geojson("missing \"type\" member"))?;
        if !SUPPORTED_TYPES.contains(&type_name) {
            return Err(CodecError::UnsupportedGeometry(type_name.to_string()));
        }
        if let Some(geometries) = value.get("geometries").and_then(Value::as_array) {
            // Surface nested unsupported shapes as such rather than as
            // deserialization noise.
            for inner in geometries {
                Self::from_value(inner)?;
            }
        }
        serde_json::from_value(value.clone()).map_err(|e| CodecError::geojson(e.to_string()))
    }

    /// The JSON form of this geometry.
    pub fn to_value(&self) -> Value {
        match self {
            GeoJson::Point { coordinates } => {
                json!({ "type": "Point", "coordinates": coordinates })
            }
            GeoJson::LineString { coordinates } => {
                json!({ "type": "LineString", "coordinates": coordinates })
            }
            GeoJson::Polygon { coordinates } => {
                json!({ "type": "Polygon", "coordinates": coordinates })
            }
            GeoJson::GeometryCollection { geometries } => json!({
                "type": "GeometryCollection",
                "geometries": geometries.iter().map(GeoJson::to_value).collect::<Vec<_>>(),
            }),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            GeoJson::Point { .. } => "Point",
            GeoJson::LineString { .. } => "LineString",
            GeoJson::Polygon { .. } => "Polygon",
            GeoJson::GeometryCollection { .. } => "GeometryCollection",
        }
    }
}

impl From<&SlfGeometry> for GeoJson {
    /// Encode an SLF shape. A box becomes its equivalent five-point polygon.
    fn from(geometry: &SlfGeometry) -> Self {
        let positions = |points: &[Point]| points.iter().map(Point::lon_lat).collect::<Vec<_>>();
        match geometry {
            SlfGeometry::Point(p) => GeoJson::Point {
                coordinates: p.lon_lat(),
            },
            SlfGeometry::Line(l) => GeoJson::LineString {
                coordinates: positions(l.points()),
            },
            SlfGeometry::Polygon(p) => GeoJson::Polygon {
                coordinates: vec![positions(p.points())],
            },
            SlfGeometry::Box(b) => GeoJson::Polygon {
                coordinates: vec![positions(b.to_polygon().points())],
            },
        }
    }
}

/// Decode a GeoJSON geometry into the SLF shape named by `ngsi_type`.
///
/// A box is read back from the polygon produced by encoding it: the ring's
/// first point is the bottom-right corner and its third the top-left one.
pub fn decode_slf(geojson: &GeoJson, ngsi_type: &str) -> Result<SlfGeometry, CodecError> {
    let points = |positions: &[Position]| {
        positions
            .iter()
            .map(|[lon, lat]| Point::new(*lat, *lon))
            .collect::<Vec<_>>()
    };
    let mismatch = || {
        CodecError::UnsupportedGeometry(format!(
            "cannot decode a {} as {ngsi_type}",
            geojson.type_name()
        ))
    };
    let invalid = |e: crate::error::GeometryError| CodecError::geojson(e.to_string());

    match (ngsi_type, geojson) {
        (POINT_TYPE, GeoJson::Point { coordinates }) => {
            let [lon, lat] = *coordinates;
            Ok(Point::new(lat, lon).into())
        }
        (LINE_TYPE, GeoJson::LineString { coordinates }) => {
            Ok(Line::new(points(coordinates)).map_err(invalid)?.into())
        }
        (POLYGON_TYPE, GeoJson::Polygon { coordinates }) => {
            let ring = exterior_ring(coordinates)?;
            Ok(Polygon::new(points(ring)).map_err(invalid)?.into())
        }
        (BOX_TYPE, GeoJson::Polygon { coordinates }) => {
            let ring = points(exterior_ring(coordinates)?);
            let [bottom_right, _, top_left, _, _] = ring.as_slice() else {
                return Err(CodecError::geojson(format!(
                    "a box ring has 5 points, got {}",
                    ring.len()
                )));
            };
            Ok(GeoBox::from_corners(*bottom_right, *top_left).into())
        }
        _ => Err(mismatch()),
    }
}

fn exterior_ring(rings: &[Vec<Position>]) -> Result<&[Position], CodecError> {
    rings
        .first()
        .map(Vec::as_slice)
        .ok_or_else(|| CodecError::geojson("polygon without an exterior ring"))
}
