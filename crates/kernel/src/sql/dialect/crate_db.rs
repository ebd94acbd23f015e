//! CrateDB geo predicates.
//!
//! Shape relations use the `match` full-text predicate over the geo-shape
//! index; proximity uses `distance` (meters) on the centroid geo-point.

use super::{Bound, GeoDialect, decimal_literal, distance_filter, shape_literal};
use crate::geo::{CENTROID_ATTR_NAME, GeoQuery, LOCATION_ATTR_NAME, SlfGeometry};
use crate::sql::terms::{Term, var};

#[derive(Debug, Clone, Copy, Default)]
pub struct CrateDialect;

impl CrateDialect {
    fn shape_match(relation: &str, geometry: &SlfGeometry) -> Term {
        let shape = shape_literal(geometry, None);
        var(format!(
            "match ({LOCATION_ATTR_NAME}, {shape}) using {relation}"
        ))
    }
}

impl GeoDialect for CrateDialect {
    fn geo_filter(&self, query: &GeoQuery) -> Term {
        match query {
            GeoQuery::Near(near) => {
                let point = shape_literal(&SlfGeometry::Point(near.centroid()), None);
                let distance = var(format!("distance({CENTROID_ATTR_NAME}, {point})"));
                distance_filter(near.range(), |bound, meters| match bound {
                    Bound::Min => distance.clone().greater_or_equal(decimal_literal(meters)),
                    Bound::Max => distance.clone().less_or_equal(decimal_literal(meters)),
                })
            }
            GeoQuery::CoveredBy(g) => Self::shape_match("within", g),
            GeoQuery::Intersects(g) => Self::shape_match("intersects", g),
            GeoQuery::Disjoint(g) => Self::shape_match("disjoint", g),
            GeoQuery::Equals(g) => {
                let shape = shape_literal(g, None);
                var(format!(
                    "match ({LOCATION_ATTR_NAME}, {shape}) using within and within({shape}, {LOCATION_ATTR_NAME})"
                ))
            }
        }
    }
}
