//! NGSI geo-queries and the parser for their request parameters.
//!
//! A geo-query arrives as three parameters that must be given together:
//!
//! - `georel`: `equals`, `intersects`, `disjoint`, `coveredBy`, or
//!   `near;minDistance:<m>`, `near;maxDistance:<m>` (both bounds may be
//!   combined in either order)
//! - `geometry`: `point`, `line`, `polygon` or `box`
//! - `coords`: semicolon-separated `lat,lon` pairs

use std::sync::LazyLock;

use regex::Regex;

use super::parse::parse_points;
use super::types::{GeoBox, Line, Point, Polygon, SlfGeometry};
use crate::error::GeoQueryError;

const FLOAT: &str = r"[+-]?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?";
const DISTANCE: &str = r"(?:0|[1-9][0-9]*)(?:\.[0-9]+)?";
const MIN_DISTANCE_KEY: &str = "minDistance";
const MAX_DISTANCE_KEY: &str = "maxDistance";

/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static COORDS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{FLOAT},{FLOAT}(?:;{FLOAT},{FLOAT})*$")).expect("valid regex literal")
});

/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static NEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^near;(minDistance|maxDistance):({DISTANCE})(?:;(minDistance|maxDistance):({DISTANCE}))?$"
    ))
    .expect("valid regex literal")
});

/// The distance bounds of a near query, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceRange {
    AtLeast(f64),
    AtMost(f64),
    Between { min: f64, max: f64 },
}

impl DistanceRange {
    /// Build a range from optional bounds; `None` if both are absent.
    pub fn from_bounds(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        match (min, max) {
            (Some(min), Some(max)) => Some(Self::Between { min, max }),
            (Some(min), None) => Some(Self::AtLeast(min)),
            (None, Some(max)) => Some(Self::AtMost(max)),
            (None, None) => None,
        }
    }

    pub fn min(&self) -> Option<f64> {
        match self {
            Self::AtLeast(min) | Self::Between { min, .. } => Some(*min),
            Self::AtMost(_) => None,
        }
    }

    pub fn max(&self) -> Option<f64> {
        match self {
            Self::AtMost(max) | Self::Between { max, .. } => Some(*max),
            Self::AtLeast(_) => None,
        }
    }
}

/// A proximity query around the centroid of the given shape.
#[derive(Debug, PartialEq)]
pub struct NearQuery {
    centroid: Point,
    reference: SlfGeometry,
    range: DistanceRange,
}

impl NearQuery {
    /// Create a near query around `geometry`'s centroid.
    ///
    /// At least one bound is required. Computing the centroid enumerates the
    /// shape, so a line or polygon passed here is consumed.
    pub fn new(
        geometry: &SlfGeometry,
        min_distance: Option<f64>,
        max_distance: Option<f64>,
    ) -> Result<Self, GeoQueryError> {
        let range = DistanceRange::from_bounds(min_distance, max_distance).ok_or_else(|| {
            GeoQueryError::Validation(
                "a near query needs minDistance, maxDistance, or both".to_string(),
            )
        })?;
        let centroid = geometry
            .centroid2d()
            .ok_or_else(|| GeoQueryError::malformed("coords", "shape has no centroid"))?;
        Ok(Self {
            centroid,
            reference: SlfGeometry::Point(centroid),
            range,
        })
    }

    pub fn centroid(&self) -> Point {
        self.centroid
    }

    pub fn range(&self) -> DistanceRange {
        self.range
    }

    pub fn min_distance(&self) -> Option<f64> {
        self.range.min()
    }

    pub fn max_distance(&self) -> Option<f64> {
        self.range.max()
    }
}

/// A spatial predicate over an entity's location.
#[derive(Debug, PartialEq)]
pub enum GeoQuery {
    Near(NearQuery),
    CoveredBy(SlfGeometry),
    Intersects(SlfGeometry),
    Disjoint(SlfGeometry),
    Equals(SlfGeometry),
}

impl GeoQuery {
    /// Parse the `georel`, `geometry` and `coords` request parameters.
    ///
    /// Returns `Ok(None)` when all three are absent and
    /// [`GeoQueryError::Validation`] when only some are given. Parameters
    /// that are present but do not describe a valid query fail with
    /// [`GeoQueryError::Malformed`].
    pub fn parse(
        georel: Option<&str>,
        geometry: Option<&str>,
        coords: Option<&str>,
    ) -> Result<Option<Self>, GeoQueryError> {
        let (georel, geometry, coords) = match (georel, geometry, coords) {
            (None, None, None) => return Ok(None),
            (Some(georel), Some(geometry), Some(coords)) => (georel, geometry, coords),
            _ => {
                return Err(GeoQueryError::Validation(
                    "georel, geometry and coords must be given together".to_string(),
                ));
            }
        };

        let shape = parse_shape(geometry, coords)?;
        let query = match georel {
            "equals" => Self::Equals(shape),
            "intersects" => Self::Intersects(shape),
            "disjoint" => Self::Disjoint(shape),
            "coveredBy" => Self::CoveredBy(shape),
            near => {
                let (min, max) = parse_near(near)?;
                Self::Near(NearQuery::new(&shape, min, max)?)
            }
        };
        Ok(Some(query))
    }

    /// Like [`parse`](Self::parse), but malformed parameters mean "no
    /// spatial filter" instead of an error.
    ///
    /// A partial parameter set still fails with
    /// [`GeoQueryError::Validation`].
    pub fn parse_lenient(
        georel: Option<&str>,
        geometry: Option<&str>,
        coords: Option<&str>,
    ) -> Result<Option<Self>, GeoQueryError> {
        match Self::parse(georel, geometry, coords) {
            Err(GeoQueryError::Malformed { param, details }) => {
                tracing::warn!(param, %details, "ignoring malformed geo query");
                Ok(None)
            }
            other => other,
        }
    }

    /// The shape the entity's location is compared with. For a near query
    /// this is the query centroid.
    pub fn reference_geometry(&self) -> &SlfGeometry {
        match self {
            Self::Near(near) => &near.reference,
            Self::CoveredBy(g) | Self::Intersects(g) | Self::Disjoint(g) | Self::Equals(g) => g,
        }
    }

    /// The `georel` keyword of this query.
    pub fn georel_type(&self) -> &'static str {
        match self {
            Self::Near(_) => "near",
            Self::CoveredBy(_) => "coveredBy",
            Self::Intersects(_) => "intersects",
            Self::Disjoint(_) => "disjoint",
            Self::Equals(_) => "equals",
        }
    }
}

fn parse_shape(geometry: &str, coords: &str) -> Result<SlfGeometry, GeoQueryError> {
    if !COORDS_PATTERN.is_match(coords) {
        return Err(GeoQueryError::malformed(
            "coords",
            format!("'{coords}' is not a list of lat,lon pairs"),
        ));
    }
    let points = parse_points(&coords.split(';').collect::<Vec<_>>())
        .map_err(|e| GeoQueryError::malformed("coords", e.to_string()))?;
    let invalid = |e: crate::error::GeometryError| GeoQueryError::malformed("coords", e.to_string());

    match geometry {
        "point" => points
            .first()
            .map(|p| SlfGeometry::Point(*p))
            .ok_or_else(|| GeoQueryError::malformed("coords", "no point given")),
        "line" => Ok(Line::new(points).map_err(invalid)?.into()),
        "polygon" => Ok(Polygon::new(points).map_err(invalid)?.into()),
        "box" => Ok(GeoBox::new(points).map_err(invalid)?.into()),
        other => Err(GeoQueryError::malformed(
            "geometry",
            format!("unknown geometry '{other}'"),
        )),
    }
}

fn parse_near(georel: &str) -> Result<(Option<f64>, Option<f64>), GeoQueryError> {
    let unknown = || GeoQueryError::malformed("georel", format!("unknown relation '{georel}'"));
    let caps = NEAR_PATTERN.captures(georel).ok_or_else(unknown)?;

    let mut min = None;
    let mut max = None;
    for (key_group, value_group) in [(1, 2), (3, 4)] {
        let (Some(key), Some(value)) = (caps.get(key_group), caps.get(value_group)) else {
            continue;
        };
        let distance: f64 = value.as_str().parse().map_err(|_| unknown())?;
        let slot = if key.as_str() == MIN_DISTANCE_KEY {
            &mut min
        } else {
            debug_assert_eq!(key.as_str(), MAX_DISTANCE_KEY);
            &mut max
        };
        if slot.replace(distance).is_some() {
            return Err(GeoQueryError::malformed(
                "georel",
                format!("'{}' given twice", key.as_str()),
            ));
        }
    }
    Ok((min, max))
}
