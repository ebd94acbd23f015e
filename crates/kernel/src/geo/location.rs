//! Location normalization for incoming entities.
//!
//! An entity stores its shape twice: `location` holds the exact geometry as
//! GeoJSON and `location_centroid` a single `geo:point` derived from it.
//! Topological queries run against the former, proximity queries against the
//! latter.

use serde_json::{Map, Value};

use super::centroid::geojson_centroid;
use super::geojson::GeoJson;
use super::parse::from_location_attribute;
use super::types::{Point, SlfGeometry};

/// An NGSI entity: attribute name to attribute object.
pub type Entity = Map<String, Value>;

pub const LOCATION_ATTR_NAME: &str = "location";
pub const CENTROID_ATTR_NAME: &str = "location_centroid";

const TYPE_KEY: &str = "type";
const VALUE_KEY: &str = "value";
const GEOJSON_TYPE: &str = "geo:json";
const GEOJSON_LD_TYPE: &str = "GeoProperty";

/// Rewrite an entity's location as GeoJSON and refresh its centroid.
///
/// - No `location`: any `location_centroid` is removed.
/// - Unusable `location` (bad shape, missing value, unknown type): the
///   location is left as is and `location_centroid` removed.
/// - `geo:json` (or NGSI-LD `GeoProperty`): the location is kept and the
///   centroid recomputed from its coordinates.
/// - An SLF shape: the location is replaced by its `geo:json` form and the
///   centroid recomputed from the SLF points.
///
/// The centroid is always either absent or consistent with the location.
pub fn normalize_location(entity: Option<&mut Entity>) {
    let Some(entity) = entity else {
        return;
    };

    let (location, centroid) = match normalized(entity.get(LOCATION_ATTR_NAME)) {
        Some(result) => result,
        None => {
            entity.remove(CENTROID_ATTR_NAME);
            return;
        }
    };

    if let Some(location) = location {
        entity.insert(LOCATION_ATTR_NAME.to_string(), location);
    }
    match centroid {
        Some(point) => {
            entity.insert(
                CENTROID_ATTR_NAME.to_string(),
                SlfGeometry::Point(point).to_attribute(),
            );
        }
        None => {
            entity.remove(CENTROID_ATTR_NAME);
        }
    }
}

/// The replacement location (if it changes) and the centroid, or `None`
/// when the location cannot be handled at all.
fn normalized(location: Option<&Value>) -> Option<(Option<Value>, Option<Point>)> {
    let attr = location?.as_object()?;
    let geo_type = attr.get(TYPE_KEY)?.as_str()?;
    let value = attr.get(VALUE_KEY).filter(|v| !v.is_null())?;

    if geo_type == GEOJSON_TYPE || geo_type == GEOJSON_LD_TYPE {
        let centroid = match geojson_centroid(value) {
            Ok([lon, lat]) => Some(Point::new(lat, lon)),
            Err(e) => {
                tracing::debug!(error = %e, "no centroid for GeoJSON location");
                None
            }
        };
        return Some((None, centroid));
    }

    let geometry = match from_location_attribute(geo_type, value) {
        Ok(Some(geometry)) => geometry,
        Ok(None) => {
            tracing::debug!(geo_type, "unrecognized location type");
            return None;
        }
        Err(e) => {
            tracing::debug!(geo_type, error = %e, "invalid SLF location");
            return None;
        }
    };

    let mut geojson = Map::new();
    geojson.insert(TYPE_KEY.to_string(), Value::String(GEOJSON_TYPE.to_string()));
    geojson.insert(VALUE_KEY.to_string(), GeoJson::from(&geometry).to_value());
    Some((Some(Value::Object(geojson)), geometry.centroid2d()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        value.as_object().unwrap().clone()
    }

    fn normalize(value: Value) -> Value {
        let mut e = entity(value);
        normalize_location(Some(&mut e));
        Value::Object(e)
    }

    #[test]
    fn none_is_left_alone() {
        normalize_location(None);
    }

    #[test]
    fn stale_centroid_without_location_is_removed() {
        assert_eq!(normalize(json!({"location_centroid": [1, 2]})), json!({}));
        assert_eq!(normalize(json!({"id": "d1"})), json!({"id": "d1"}));
    }

    #[test]
    fn point_becomes_geojson() {
        let out = normalize(json!({
            "location": {"type": "geo:point", "value": "1, 2"}
        }));
        assert_eq!(
            out,
            json!({
                "location": {
                    "type": "geo:json",
                    "value": {"type": "Point", "coordinates": [2.0, 1.0]}
                },
                "location_centroid": {"type": "geo:point", "value": "1.0, 2.0"}
            })
        );
    }

    #[test]
    fn line_centroid() {
        let out = normalize(json!({
            "location": {"type": "geo:line", "value": ["1, 2", "1, 4"]}
        }));
        assert_eq!(
            out["location"]["value"],
            json!({"type": "LineString", "coordinates": [[2.0, 1.0], [4.0, 1.0]]})
        );
        assert_eq!(
            out["location_centroid"],
            json!({"type": "geo:point", "value": "1.0, 3.0"})
        );
    }

    #[test]
    fn box_centroid_is_mean_of_corners() {
        let out = normalize(json!({
            "location": {"type": "geo:box", "value": ["-1, 4", "1, 2"]}
        }));
        assert_eq!(out["location"]["value"]["type"], json!("Polygon"));
        assert_eq!(
            out["location_centroid"],
            json!({"type": "geo:point", "value": "0.0, 3.0"})
        );
    }

    #[test]
    fn geojson_location_is_kept() {
        for geo_type in ["geo:json", "GeoProperty"] {
            let location = json!({
                "type": geo_type,
                "value": {"type": "Point", "coordinates": [2, 1]}
            });
            let out = normalize(json!({"location": location.clone()}));
            assert_eq!(out["location"], location);
            assert_eq!(
                out["location_centroid"],
                json!({"type": "geo:point", "value": "1.0, 2.0"})
            );
        }
    }

    #[test]
    fn geojson_without_centroid_drops_stale_one() {
        let out = normalize(json!({
            "location": {"type": "geo:json", "value": {"type": "Point"}},
            "location_centroid": {"type": "geo:point", "value": "9.0, 9.0"}
        }));
        assert!(out.get("location").is_some());
        assert!(out.get("location_centroid").is_none());
    }

    #[test]
    fn invalid_locations_are_left_untouched() {
        let cases = [
            json!("1, 2"),
            json!({"type": "geo:point"}),
            json!({"type": "geo:point", "value": null}),
            json!({"type": "geo:point", "value": "not a point"}),
            json!({"type": "geo:polygon", "value": ["0, 0", "1, 1", "0, 0"]}),
            json!({"type": "Text", "value": "somewhere"}),
        ];
        for location in cases {
            let out = normalize(json!({
                "location": location.clone(),
                "location_centroid": {"type": "geo:point", "value": "9.0, 9.0"}
            }));
            assert_eq!(out, json!({"location": location}));
        }
    }
}
