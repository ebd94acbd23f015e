//! PostGIS geo predicates, as used by the Timescale backend.
//!
//! Shape literals carry `SRID=4326;` so they compare against the stored
//! WGS84 geometries. `ST_DWithin` on geometries measures in the units of the
//! reference system, so search radii are converted from meters to decimal
//! degrees with a small-angle approximation. It is adequate for radii up to
//! a few tens of kilometers and inaccurate beyond that.

use super::{Bound, GeoDialect, decimal_literal, distance_filter, shape_literal};
use crate::geo::{CENTROID_ATTR_NAME, GeoQuery, LOCATION_ATTR_NAME, SlfGeometry, WGS84_SRID};
use crate::sql::terms::{Term, var};

/// Decimal degrees per meter.
pub const METERS_TO_DEGREES: f64 = 0.000009;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostGisDialect;

impl PostGisDialect {
    fn incidence(function: &str, geometry: &SlfGeometry) -> Term {
        let shape = shape_literal(geometry, Some(WGS84_SRID));
        var(format!("{function}({LOCATION_ATTR_NAME}, {shape})"))
    }
}

impl GeoDialect for PostGisDialect {
    fn geo_filter(&self, query: &GeoQuery) -> Term {
        match query {
            GeoQuery::Near(near) => {
                let point = shape_literal(&SlfGeometry::Point(near.centroid()), None);
                let within = |meters: f64| {
                    let degrees = decimal_literal(meters * METERS_TO_DEGREES);
                    var(format!("ST_DWithin({CENTROID_ATTR_NAME}, {point}, {degrees})"))
                };
                // ST_DWithin only answers "closer than", so a lower bound
                // is its negation.
                distance_filter(near.range(), |bound, meters| match bound {
                    Bound::Min => within(meters).negate(),
                    Bound::Max => within(meters),
                })
            }
            GeoQuery::CoveredBy(g) => Self::incidence("ST_Within", g),
            GeoQuery::Intersects(g) => Self::incidence("ST_Intersects", g),
            GeoQuery::Disjoint(g) => Self::incidence("ST_Disjoint", g),
            GeoQuery::Equals(g) => Self::incidence("ST_Equals", g),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::geo::query::NearQuery;
    use crate::geo::{GeoBox, Point};

    fn point() -> SlfGeometry {
        SlfGeometry::Point(Point::new(1.0, 2.0))
    }

    #[test]
    fn near_with_both_bounds() {
        let query = GeoQuery::Near(NearQuery::new(&point(), Some(10.0), Some(20.0)).unwrap());
        assert_eq!(
            PostGisDialect.compile(&query),
            "(not ST_DWithin(location_centroid, 'POINT (2.0 1.0)', 0.00009) and \
             ST_DWithin(location_centroid, 'POINT (2.0 1.0)', 0.00018))"
        );
    }

    #[test]
    fn near_lower_bound_is_negated() {
        let query = GeoQuery::Near(NearQuery::new(&point(), Some(10.0), None).unwrap());
        assert_eq!(
            PostGisDialect.compile(&query),
            "not ST_DWithin(location_centroid, 'POINT (2.0 1.0)', 0.00009)"
        );
    }

    #[test]
    fn incidence_functions_carry_srid() {
        let cases = [
            (GeoQuery::Equals(point()), "ST_Equals"),
            (GeoQuery::Intersects(point()), "ST_Intersects"),
            (GeoQuery::Disjoint(point()), "ST_Disjoint"),
            (GeoQuery::CoveredBy(point()), "ST_Within"),
        ];
        for (query, function) in cases {
            assert_eq!(
                PostGisDialect.compile(&query),
                format!("{function}(location, 'SRID=4326;POINT (2.0 1.0)')")
            );
        }
    }

    #[test]
    fn box_compiles_as_polygon() {
        let geo_box = GeoBox::from_corners(Point::new(0.0, 1.0), Point::new(1.0, 0.0));
        let query = GeoQuery::CoveredBy(geo_box.into());
        assert_eq!(
            PostGisDialect.compile(&query),
            "ST_Within(location, 'SRID=4326;POLYGON ((1.0 0.0, 1.0 1.0, 0.0 1.0, 0.0 0.0, 1.0 0.0))')"
        );
    }
}
