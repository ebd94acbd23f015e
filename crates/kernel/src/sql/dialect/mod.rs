//! Per-backend compilers from [`GeoQuery`] to SQL predicates.
//!
//! Both dialects query two columns: the exact shape in `location` for
//! topological relations, and the derived point in `location_centroid` for
//! proximity.

mod crate_db;
mod postgis;

pub use crate_db::CrateDialect;
pub use postgis::{METERS_TO_DEGREES, PostGisDialect};

use serde_json::Value;

use super::terms::{Term, default_renderer, lit};
use crate::geo::query::DistanceRange;
use crate::geo::wkt::to_wkt_with_srid;
use crate::geo::{GeoJson, GeoQuery, SlfGeometry};

/// A backend's translation of geo-queries.
pub trait GeoDialect {
    /// The predicate selecting rows whose location satisfies `query`.
    fn geo_filter(&self, query: &GeoQuery) -> Term;

    /// [`geo_filter`](Self::geo_filter) rendered as SQL text.
    fn compile(&self, query: &GeoQuery) -> String {
        self.geo_filter(query).eval()
    }
}

/// A single-quoted WKT literal for `geometry`.
pub(crate) fn shape_literal(geometry: &SlfGeometry, srid: Option<u32>) -> Term {
    lit(to_wkt_with_srid(&GeoJson::from(geometry), None, srid))
}

/// A numeric literal printed as a plain decimal: at most 16 fractional
/// digits, trailing zeros and a bare trailing point removed.
pub(crate) fn decimal_literal(value: f64) -> Term {
    Term::literal(value, trimmed_decimal, None)
}

pub(crate) fn trimmed_decimal(value: &Value) -> String {
    match value.as_f64() {
        Some(v) => format!("{v:.16}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        None => default_renderer(value),
    }
}

/// Build the near predicate from its bound terms.
pub(crate) fn distance_filter(range: DistanceRange, bound: impl Fn(Bound, f64) -> Term) -> Term {
    match range {
        DistanceRange::AtLeast(min) => bound(Bound::Min, min),
        DistanceRange::AtMost(max) => bound(Bound::Max, max),
        DistanceRange::Between { min, max } => bound(Bound::Min, min).and(bound(Bound::Max, max)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    Min,
    Max,
}
