//! Error types for the translation engine.
//!
//! Each concern gets its own enum so callers can match on the failure kinds
//! they care about. The insert path is the only place where backend errors
//! surface; everything else is local and synchronous.

use thiserror::Error;

/// Errors raised while building or parsing Simple Location Format shapes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// A shape violates its point-count or closure rule.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A coordinate string is not a "lat, lon" pair of decimal numbers.
    #[error("invalid coordinate '{0}': expected \"lat, lon\"")]
    InvalidCoordinate(String),

    /// The input is not textual where text was required.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl GeometryError {
    /// Create an invalid geometry error.
    pub fn invalid(rule: impl Into<String>) -> Self {
        Self::InvalidGeometry(rule.into())
    }
}

/// Errors raised by the GeoJSON, WKT and WKB codecs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// The shape is outside the supported set.
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// The input is syntactically broken.
    #[error("malformed {format}: {details}")]
    Malformed {
        format: &'static str,
        details: String,
    },

    /// The binary input ended before the geometry was complete.
    #[error("truncated WKB: {0}")]
    Truncated(String),
}

impl CodecError {
    pub(crate) fn wkt(details: impl Into<String>) -> Self {
        Self::Malformed {
            format: "WKT",
            details: details.into(),
        }
    }

    pub(crate) fn wkb(details: impl Into<String>) -> Self {
        Self::Malformed {
            format: "WKB",
            details: details.into(),
        }
    }

    pub(crate) fn geojson(details: impl Into<String>) -> Self {
        Self::Malformed {
            format: "GeoJSON",
            details: details.into(),
        }
    }
}

/// Errors raised by the centroid calculator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CentroidError {
    /// No points to average.
    #[error("cannot compute the centroid of an empty point set")]
    EmptyInput,

    /// A point has fewer than two components.
    #[error("point has fewer than two coordinates")]
    MissingCoordinate,

    /// A component is not a number.
    #[error("coordinate is not a number")]
    NonNumericCoordinate,

    /// The point set itself is absent.
    #[error("point set is absent")]
    NullInput,
}

/// Errors raised while parsing `georel`/`geometry`/`coords` parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeoQueryError {
    /// The parameter combination is inconsistent.
    #[error("invalid geo query: {0}")]
    Validation(String),

    /// The parameters are all present but do not describe a valid query.
    #[error("malformed geo query parameter '{param}': {details}")]
    Malformed { param: &'static str, details: String },
}

impl GeoQueryError {
    pub(crate) fn malformed(param: &'static str, details: impl Into<String>) -> Self {
        Self::Malformed {
            param,
            details: details.into(),
        }
    }
}

/// Errors raised on the insert path.
#[derive(Debug, Error)]
pub enum InsertError {
    /// A transient backend failure; the work queue should reschedule.
    #[error("retryable insert failure on table '{table}': {source}")]
    Retryable {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// A permanent backend failure; retrying will not help.
    #[error("permanent insert failure on table '{table}': {source}")]
    Permanent {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// The insert statement could not be built.
    #[error("cannot build insert statement for table '{table}': {details}")]
    Statement { table: String, details: String },
}

impl InsertError {
    /// Whether the work queue should reschedule the insert.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}
