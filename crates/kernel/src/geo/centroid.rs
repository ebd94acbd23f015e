//! Arithmetic-mean centroids of 2D point sets.
//!
//! The mean of the coordinates is a cheap stand-in for the true centroid.
//! It is accurate enough for small shapes, which is all proximity queries
//! against the centroid column need.

use serde_json::{Map, Value};

use crate::error::CentroidError;

/// Mean of each coordinate dimension over `points`.
///
/// Only the first two components of a point are used.
pub fn centroid2d<P: AsRef<[f64]>>(points: Option<&[P]>) -> Result<[f64; 2], CentroidError> {
    let points = points.ok_or(CentroidError::NullInput)?;
    if points.is_empty() {
        return Err(CentroidError::EmptyInput);
    }

    let mut sum = [0.0, 0.0];
    for p in points {
        let [x, y, ..] = p.as_ref() else {
            return Err(CentroidError::MissingCoordinate);
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(CentroidError::NonNumericCoordinate);
        }
        sum[0] += x;
        sum[1] += y;
    }

    let n = points.len() as f64;
    Ok([sum[0] / n, sum[1] / n])
}

/// Same as [`centroid2d`] but yields `None` instead of an error.
pub fn maybe_centroid2d<P: AsRef<[f64]>>(points: Option<&[P]>) -> Option<[f64; 2]> {
    centroid2d(points).ok()
}

/// [`centroid2d`] over a JSON array of `[x, y]` arrays.
pub fn centroid2d_json(points: Option<&Value>) -> Result<[f64; 2], CentroidError> {
    let items = match points {
        Some(Value::Array(items)) => items,
        _ => return Err(CentroidError::NullInput),
    };
    let mut positions = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Array(components) => positions.push(numeric_position(components)?),
            _ => return Err(CentroidError::MissingCoordinate),
        }
    }
    centroid2d(Some(positions.as_slice()))
}

/// Centroid of every position found in a GeoJSON object.
///
/// Walks features, feature collections, geometry collections and multi-part
/// geometries depth-first, concatenating all rings and points before
/// averaging them.
pub fn geojson_centroid(doc: &Value) -> Result<[f64; 2], CentroidError> {
    let mut positions = Vec::new();
    collect_positions(doc, &mut positions)?;
    centroid2d(Some(positions.as_slice()))
}

fn collect_positions(value: &Value, out: &mut Vec<Vec<f64>>) -> Result<(), CentroidError> {
    match value {
        Value::Array(items) if items.iter().any(is_scalar) => {
            out.push(numeric_position(items)?);
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| collect_positions(item, out)),
        Value::Object(map) => collect_object_positions(map, out),
        Value::Null => Err(CentroidError::NullInput),
        _ => Err(CentroidError::NonNumericCoordinate),
    }
}

fn collect_object_positions(
    map: &Map<String, Value>,
    out: &mut Vec<Vec<f64>>,
) -> Result<(), CentroidError> {
    for key in ["features", "geometry", "geometries", "coordinates"] {
        if let Some(inner) = map.get(key) {
            return collect_positions(inner, out);
        }
    }
    Err(CentroidError::MissingCoordinate)
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn numeric_position(components: &[Value]) -> Result<Vec<f64>, CentroidError> {
    if components.len() < 2 {
        return Err(CentroidError::MissingCoordinate);
    }
    components
        .iter()
        .map(|c| c.as_f64().ok_or(CentroidError::NonNumericCoordinate))
        .collect()
}
