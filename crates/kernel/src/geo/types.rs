//! Simple Location Format shapes: point, line, polygon and box.
//!
//! Every shape stores its points in a fixed ordered collection. Enumerating
//! the `[longitude, latitude]` pairs of a [`Point`] or a [`GeoBox`] can be
//! repeated at will, whereas [`Line`] and [`Polygon`] hand their points out
//! through a one-shot cursor: the first [`enum_points`](Line::enum_points)
//! call yields every point and later calls on the same instance yield
//! nothing. Call sites rely on that asymmetry, so it is kept.
//!
//! The cursor lives in a `Cell`, which makes lines and polygons `!Sync`: an
//! instance belongs to a single consumer.

use std::cell::Cell;
use std::collections::HashSet;

use serde_json::{Value, json};

use super::centroid::maybe_centroid2d;
use super::format_coord;
use crate::error::GeometryError;

/// NGSI type tag of an SLF point.
pub const POINT_TYPE: &str = "geo:point";
/// NGSI type tag of an SLF line.
pub const LINE_TYPE: &str = "geo:line";
/// NGSI type tag of an SLF polygon.
pub const POLYGON_TYPE: &str = "geo:polygon";
/// NGSI type tag of an SLF box.
pub const BOX_TYPE: &str = "geo:box";

/// Whether `ngsi_type` names one of the SLF shapes.
pub fn is_slf_type(ngsi_type: &str) -> bool {
    matches!(ngsi_type, POINT_TYPE | LINE_TYPE | POLYGON_TYPE | BOX_TYPE)
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    latitude: f64,
    longitude: f64,
}

impl Point {
    /// Create a point from its latitude and longitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Coordinates in GeoJSON order: `[longitude, latitude]`.
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// The SLF text form, `"lat, lon"`.
    pub fn wgs84_coords(&self) -> String {
        format!(
            "{}, {}",
            format_coord(self.latitude),
            format_coord(self.longitude)
        )
    }

    /// Enumerate this point's single coordinate pair. Repeatable.
    pub fn enum_points(&self) -> Vec<[f64; 2]> {
        vec![self.lon_lat()]
    }
}

/// An open polyline of two or more points.
#[derive(Debug)]
pub struct Line {
    points: Vec<Point>,
    drained: Cell<bool>,
}

impl Line {
    /// Create a line, failing if fewer than two points are given.
    pub fn new(points: Vec<Point>) -> Result<Self, GeometryError> {
        if points.len() < 2 {
            return Err(GeometryError::invalid(format!(
                "a line needs at least 2 points, got {}",
                points.len()
            )));
        }
        Ok(Self {
            points,
            drained: Cell::new(false),
        })
    }

    /// The stored points, in order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Enumerate the points through the one-shot cursor.
    ///
    /// The first call yields every `[lon, lat]` pair; any later call on the
    /// same instance yields an empty vector.
    pub fn enum_points(&self) -> Vec<[f64; 2]> {
        drain_once(&self.drained, &self.points)
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

/// A closed ring of at least four points whose first and last points match.
#[derive(Debug)]
pub struct Polygon {
    points: Vec<Point>,
    drained: Cell<bool>,
}

impl Polygon {
    /// Create a polygon from a closed ring.
    ///
    /// The ring must hold at least four points, repeat its first point last,
    /// contain no adjacent duplicates, and have at least three distinct
    /// vertices.
    pub fn new(points: Vec<Point>) -> Result<Self, GeometryError> {
        if points.len() < 4 {
            return Err(GeometryError::invalid(format!(
                "a polygon needs at least 4 points, got {}",
                points.len()
            )));
        }
        if points.first() != points.last() {
            return Err(GeometryError::invalid(
                "a polygon ring must end with its first point",
            ));
        }
        if points.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(GeometryError::invalid(
                "a polygon ring must not repeat adjacent points",
            ));
        }
        let distinct: HashSet<(u64, u64)> = points
            .iter()
            .map(|p| (p.latitude.to_bits(), p.longitude.to_bits()))
            .collect();
        if distinct.len() < 3 {
            return Err(GeometryError::invalid(
                "a polygon ring needs at least 3 distinct vertices",
            ));
        }
        Ok(Self::from_ring(points))
    }

    fn from_ring(points: Vec<Point>) -> Self {
        Self {
            points,
            drained: Cell::new(false),
        }
    }

    /// The stored ring, closing point included.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Enumerate the ring through the one-shot cursor.
    ///
    /// Same contract as [`Line::enum_points`].
    pub fn enum_points(&self) -> Vec<[f64; 2]> {
        drain_once(&self.drained, &self.points)
    }
}

impl PartialEq for Polygon {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

/// An axis-aligned rectangle given by its bottom-right and top-left corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBox {
    bottom_right: Point,
    top_left: Point,
}

impl GeoBox {
    /// Create a box from exactly two points: bottom-right, then top-left.
    pub fn new(points: Vec<Point>) -> Result<Self, GeometryError> {
        match points.as_slice() {
            [bottom_right, top_left] => Ok(Self::from_corners(*bottom_right, *top_left)),
            _ => Err(GeometryError::invalid(format!(
                "a box needs exactly 2 points, got {}",
                points.len()
            ))),
        }
    }

    pub fn from_corners(bottom_right: Point, top_left: Point) -> Self {
        Self {
            bottom_right,
            top_left,
        }
    }

    pub fn bottom_right(&self) -> Point {
        self.bottom_right
    }

    pub fn top_left(&self) -> Point {
        self.top_left
    }

    /// Enumerate the two corners. Repeatable.
    pub fn enum_points(&self) -> Vec<[f64; 2]> {
        vec![self.bottom_right.lon_lat(), self.top_left.lon_lat()]
    }

    /// The equivalent closed ring: bottom-right, top-right, top-left,
    /// bottom-left, bottom-right.
    pub fn to_polygon(&self) -> Polygon {
        let top_right = Point::new(self.top_left.latitude, self.bottom_right.longitude);
        let bottom_left = Point::new(self.bottom_right.latitude, self.top_left.longitude);
        Polygon::from_ring(vec![
            self.bottom_right,
            top_right,
            self.top_left,
            bottom_left,
            self.bottom_right,
        ])
    }
}

/// Any SLF shape.
#[derive(Debug, PartialEq)]
pub enum SlfGeometry {
    Point(Point),
    Line(Line),
    Polygon(Polygon),
    Box(GeoBox),
}

impl SlfGeometry {
    /// The NGSI wire-type tag of this shape.
    pub fn ngsi_type(&self) -> &'static str {
        match self {
            SlfGeometry::Point(_) => POINT_TYPE,
            SlfGeometry::Line(_) => LINE_TYPE,
            SlfGeometry::Polygon(_) => POLYGON_TYPE,
            SlfGeometry::Box(_) => BOX_TYPE,
        }
    }

    /// Enumerate the shape's `[lon, lat]` pairs, honoring each shape's
    /// enumeration contract.
    pub fn enum_points(&self) -> Vec<[f64; 2]> {
        match self {
            SlfGeometry::Point(p) => p.enum_points(),
            SlfGeometry::Line(l) => l.enum_points(),
            SlfGeometry::Polygon(p) => p.enum_points(),
            SlfGeometry::Box(b) => b.enum_points(),
        }
    }

    /// The stored points, read without touching any cursor.
    pub(crate) fn stored_points(&self) -> Vec<Point> {
        match self {
            SlfGeometry::Point(p) => vec![*p],
            SlfGeometry::Line(l) => l.points().to_vec(),
            SlfGeometry::Polygon(p) => p.points().to_vec(),
            SlfGeometry::Box(b) => vec![b.bottom_right, b.top_left],
        }
    }

    /// Render as an NGSI attribute: `{"type": <tag>, "value": <coords>}`.
    ///
    /// A point's value is its `"lat, lon"` string; every other shape's value
    /// is the list of its points' strings.
    pub fn to_attribute(&self) -> Value {
        let value = match self {
            SlfGeometry::Point(p) => Value::String(p.wgs84_coords()),
            other => Value::Array(
                other
                    .stored_points()
                    .iter()
                    .map(|p| Value::String(p.wgs84_coords()))
                    .collect(),
            ),
        };
        json!({ "type": self.ngsi_type(), "value": value })
    }

    /// Best-effort centroid of the enumerated points.
    ///
    /// Goes through [`enum_points`](Self::enum_points), so a line or polygon
    /// whose cursor was already drained has no centroid.
    pub fn centroid2d(&self) -> Option<Point> {
        maybe_centroid2d(Some(self.enum_points().as_slice()))
            .map(|[lon, lat]| Point::new(lat, lon))
    }
}

impl From<Point> for SlfGeometry {
    fn from(point: Point) -> Self {
        SlfGeometry::Point(point)
    }
}

impl From<Line> for SlfGeometry {
    fn from(line: Line) -> Self {
        SlfGeometry::Line(line)
    }
}

impl From<Polygon> for SlfGeometry {
    fn from(polygon: Polygon) -> Self {
        SlfGeometry::Polygon(polygon)
    }
}

impl From<GeoBox> for SlfGeometry {
    fn from(geo_box: GeoBox) -> Self {
        SlfGeometry::Box(geo_box)
    }
}

fn drain_once(drained: &Cell<bool>, points: &[Point]) -> Vec<[f64; 2]> {
    if drained.replace(true) {
        return Vec::new();
    }
    points.iter().map(Point::lon_lat).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ring() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ]
    }

    #[test]
    fn point_enumeration_is_repeatable() {
        let p = Point::new(1.0, 2.0);
        assert_eq!(p.enum_points(), vec![[2.0, 1.0]]);
        assert_eq!(p.enum_points(), vec![[2.0, 1.0]]);
    }

    #[test]
    fn box_enumeration_is_repeatable() {
        let b = GeoBox::new(vec![Point::new(0.0, 1.0), Point::new(1.0, 0.0)]).unwrap();
        let first = b.enum_points();
        assert!(!first.is_empty());
        assert_eq!(first, b.enum_points());
    }

    #[test]
    fn line_enumeration_is_one_shot() {
        let line = Line::new(vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]).unwrap();
        assert_eq!(line.enum_points(), vec![[2.0, 1.0], [4.0, 3.0]]);
        assert!(line.enum_points().is_empty());
        // Stored points are untouched by the cursor.
        assert_eq!(line.points().len(), 2);
    }

    #[test]
    fn polygon_enumeration_is_one_shot() {
        let polygon = Polygon::new(ring()).unwrap();
        assert_eq!(polygon.enum_points().len(), 4);
        assert!(polygon.enum_points().is_empty());
    }

    #[test]
    fn line_needs_two_points() {
        let err = Line::new(vec![Point::new(1.0, 2.0)]).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidGeometry(msg) if msg.contains("at least 2")));
    }

    #[test]
    fn polygon_rules_are_enforced() {
        let too_short = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(0.0, 0.0)];
        assert!(Polygon::new(too_short).is_err());

        let mut open = ring();
        open[3] = Point::new(2.0, 2.0);
        let err = Polygon::new(open).unwrap_err();
        assert!(err.to_string().contains("first point"));

        let adjacent = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        assert!(Polygon::new(adjacent).is_err());

        let degenerate = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        let err = Polygon::new(degenerate).unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn box_needs_exactly_two_points() {
        assert!(GeoBox::new(vec![Point::new(0.0, 0.0)]).is_err());
        assert!(GeoBox::new(vec![Point::new(0.0, 0.0); 3]).is_err());
    }

    #[test]
    fn box_to_polygon_walks_corners_from_bottom_right() {
        let b = GeoBox::from_corners(Point::new(-1.0, 4.0), Point::new(1.0, 2.0));
        let polygon = b.to_polygon();
        assert_eq!(
            polygon.points(),
            &[
                Point::new(-1.0, 4.0),
                Point::new(1.0, 4.0),
                Point::new(1.0, 2.0),
                Point::new(-1.0, 2.0),
                Point::new(-1.0, 4.0),
            ]
        );
    }

    #[test]
    fn attribute_rendering() {
        let point = SlfGeometry::from(Point::new(1.0, 2.0));
        assert_eq!(
            point.to_attribute(),
            json!({"type": "geo:point", "value": "1.0, 2.0"})
        );

        let line = SlfGeometry::from(
            Line::new(vec![Point::new(1.0, 2.0), Point::new(3.5, -4.0)]).unwrap(),
        );
        assert_eq!(
            line.to_attribute(),
            json!({"type": "geo:line", "value": ["1.0, 2.0", "3.5, -4.0"]})
        );
    }

    #[test]
    fn centroid_follows_enumeration_contract() {
        let line = SlfGeometry::from(
            Line::new(vec![Point::new(1.0, 2.0), Point::new(1.0, 4.0)]).unwrap(),
        );
        assert_eq!(line.centroid2d(), Some(Point::new(1.0, 3.0)));
        assert_eq!(line.centroid2d(), None);

        let b = SlfGeometry::from(GeoBox::from_corners(
            Point::new(-1.0, 4.0),
            Point::new(1.0, 2.0),
        ));
        assert_eq!(b.centroid2d(), Some(Point::new(0.0, 3.0)));
        assert_eq!(b.centroid2d(), Some(Point::new(0.0, 3.0)));
    }

    #[test]
    fn slf_type_tags() {
        assert!(is_slf_type("geo:box"));
        assert!(!is_slf_type("geo:json"));
    }
}
