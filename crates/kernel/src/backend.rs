//! The supported storage backends.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::insert::errors::{ErrorAnalyzer, analyzer_for};
use crate::sql::dialect::{CrateDialect, GeoDialect, PostGisDialect};

/// A relational backend entities can be stored in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// CrateDB.
    #[default]
    Crate,
    /// PostgreSQL with the TimescaleDB and PostGIS extensions.
    Timescale,
}

impl Backend {
    /// Look up a backend by name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "crate" => Some(Self::Crate),
            "timescale" => Some(Self::Timescale),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crate => "crate",
            Self::Timescale => "timescale",
        }
    }

    /// The compiler for this backend's geo predicates.
    pub fn dialect(&self) -> &'static dyn GeoDialect {
        match self {
            Self::Crate => &CrateDialect,
            Self::Timescale => &PostGisDialect,
        }
    }

    /// The classifier for errors raised by this backend.
    pub fn analyzer<'a>(&self, error: &'a sqlx::Error) -> Box<dyn ErrorAnalyzer + 'a> {
        analyzer_for(*self, error)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::geo::{GeoQuery, Point, SlfGeometry};

    #[test]
    fn names() {
        assert_eq!(Backend::from_name("crate"), Some(Backend::Crate));
        assert_eq!(Backend::from_name(" Timescale "), Some(Backend::Timescale));
        assert_eq!(Backend::from_name("influx"), None);
        assert_eq!(Backend::Timescale.to_string(), "timescale");
        assert_eq!(Backend::default(), Backend::Crate);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let backend: Backend = serde_json::from_str("\"timescale\"").unwrap();
        assert_eq!(backend, Backend::Timescale);
        assert_eq!(serde_json::to_string(&Backend::Crate).unwrap(), "\"crate\"");
    }

    #[test]
    fn each_backend_has_its_dialect() {
        let query = GeoQuery::Intersects(SlfGeometry::Point(Point::new(1.0, 2.0)));
        assert!(Backend::Crate.dialect().compile(&query).starts_with("match"));
        assert!(Backend::Timescale.dialect().compile(&query).starts_with("ST_Intersects"));
    }
}
