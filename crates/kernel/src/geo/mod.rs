//! Geometry handling for entity locations and spatial queries.
//!
//! Provides:
//! - Simple Location Format (SLF) shapes and their parsers
//! - GeoJSON, WKT and WKB codecs
//! - Centroid computation and location normalization
//! - The NGSI geo-query model and its parameter parser

pub mod centroid;
pub mod geojson;
pub mod location;
pub mod parse;
pub mod query;
pub mod types;
pub mod wkb;
pub mod wkt;

pub use centroid::{centroid2d, geojson_centroid, maybe_centroid2d};
pub use geojson::{GeoJson, Position};
pub use location::{CENTROID_ATTR_NAME, Entity, LOCATION_ATTR_NAME, normalize_location};
pub use parse::{from_location_attribute, parse_point, parse_points};
pub use query::{DistanceRange, GeoQuery, NearQuery};
pub use types::{GeoBox, Line, Point, Polygon, SlfGeometry};

/// Spatial reference used for every stored geometry (WGS84).
pub const WGS84_SRID: u32 = 4326;

/// Deepest collection nesting the codecs accept.
pub(crate) const MAX_NESTING: usize = 64;

/// Render a coordinate with the shortest text that reads back to the same
/// value, always in positional notation with a fractional part (`2.0`).
pub(crate) fn format_coord(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}
