//! Parsers from the SLF wire format into typed shapes.

use serde_json::Value;

use super::types::{
    BOX_TYPE, GeoBox, LINE_TYPE, Line, POINT_TYPE, POLYGON_TYPE, Point, Polygon, SlfGeometry,
};
use crate::error::GeometryError;

/// Parse a `"lat, lon"` string.
///
/// Whitespace around either number is ignored and a leading sign is allowed.
pub fn parse_point(text: &str) -> Result<Point, GeometryError> {
    let invalid = || GeometryError::InvalidCoordinate(text.to_string());

    let mut parts = text.split(',');
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let lat = parse_component(lat).ok_or_else(invalid)?;
    let lon = parse_component(lon).ok_or_else(invalid)?;
    Ok(Point::new(lat, lon))
}

/// Parse each string of `texts` as a point.
pub fn parse_points<S: AsRef<str>>(texts: &[S]) -> Result<Vec<Point>, GeometryError> {
    texts.iter().map(|t| parse_point(t.as_ref())).collect()
}

/// Parse a JSON string value as a point.
pub fn parse_point_value(value: &Value) -> Result<Point, GeometryError> {
    match value {
        Value::String(text) => parse_point(text),
        other => Err(GeometryError::InvalidArgument(format!(
            "expected a \"lat, lon\" string, got {other}"
        ))),
    }
}

/// Parse a JSON array of `"lat, lon"` strings.
pub fn parse_point_values(value: &Value) -> Result<Vec<Point>, GeometryError> {
    match value {
        Value::Array(items) => items.iter().map(parse_point_value).collect(),
        other => Err(GeometryError::InvalidArgument(format!(
            "expected a list of \"lat, lon\" strings, got {other}"
        ))),
    }
}

/// Build the SLF shape described by a location attribute's type and value.
///
/// Returns `Ok(None)` when `ngsi_type` is not an SLF tag.
pub fn from_location_attribute(
    ngsi_type: &str,
    value: &Value,
) -> Result<Option<SlfGeometry>, GeometryError> {
    let geometry = match ngsi_type {
        POINT_TYPE => parse_point_value(value)?.into(),
        LINE_TYPE => Line::new(parse_point_values(value)?)?.into(),
        POLYGON_TYPE => Polygon::new(parse_point_values(value)?)?.into(),
        BOX_TYPE => GeoBox::new(parse_point_values(value)?)?.into(),
        _ => return Ok(None),
    };
    Ok(Some(geometry))
}

fn parse_component(text: &str) -> Option<f64> {
    let text = text.trim();
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    // f64's own parser also accepts "inf", "NaN" and exponents.
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse().ok()
}
