//! Tempora test utilities.
//!
//! Helpers for testing: NGSI entity fixtures, a stand-in for database
//! errors, and assertion utilities for JSON and SQL output.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use serde_json::{Map, Value as JsonValue, json};
use sqlx::error::{DatabaseError, ErrorKind};
use uuid::Uuid;

/// Create a test entity of `entity_type` with a fresh URN id.
pub fn test_entity(entity_type: &str) -> TestEntity {
    TestEntity {
        id: format!("urn:ngsi-ld:{entity_type}:{}", Uuid::now_v7()),
        entity_type: entity_type.to_string(),
        attributes: Map::new(),
    }
}

/// An NGSI entity builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestEntity {
    pub id: String,
    pub entity_type: String,
    pub attributes: Map<String, JsonValue>,
}

impl TestEntity {
    /// Set a custom ID.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Add an attribute with the given NGSI type.
    pub fn with_attribute(mut self, name: &str, attr_type: &str, value: JsonValue) -> Self {
        self.attributes
            .insert(name.to_string(), json!({"type": attr_type, "value": value}));
        self
    }

    /// Set the `location` attribute.
    pub fn with_location(self, attr_type: &str, value: JsonValue) -> Self {
        self.with_attribute("location", attr_type, value)
    }

    /// Set the `location` attribute to a `geo:point`.
    pub fn at_point(self, latitude: f64, longitude: f64) -> Self {
        self.with_location("geo:point", json!(format!("{latitude}, {longitude}")))
    }

    /// The entity as the JSON object found in a notification.
    pub fn into_map(self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("id".to_string(), JsonValue::String(self.id));
        map.insert("type".to_string(), JsonValue::String(self.entity_type));
        map.extend(self.attributes);
        map
    }

    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.into_map())
    }
}

/// A database error with a chosen SQLSTATE code and message, for feeding
/// error classifiers without a live server.
#[derive(Debug, Clone)]
pub struct FakeDbError {
    code: String,
    message: String,
}

impl FakeDbError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Wrap as the error sqlx returns for a failed statement.
    pub fn into_sqlx(self) -> sqlx::Error {
        sqlx::Error::Database(Box::new(self))
    }
}

impl fmt::Display for FakeDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (SQLSTATE {})", self.message, self.code)
    }
}

impl StdError for FakeDbError {}

impl DatabaseError for FakeDbError {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.code))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Sample location values, one per supported shape.
pub mod shapes {
    use serde_json::{Value, json};

    /// A `geo:json` point at longitude 2, latitude 1.
    pub fn geojson_point() -> Value {
        json!({"type": "Point", "coordinates": [2.0, 1.0]})
    }

    /// A closed `geo:json` square with corners (0,0) and (2,2).
    pub fn geojson_square() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
        })
    }

    /// A `geo:line` value with two `lat, lon` points.
    pub fn slf_line() -> Value {
        json!(["1.0, 2.0", "3.0, 4.0"])
    }

    /// A closed `geo:polygon` triangle.
    pub fn slf_triangle() -> Value {
        json!(["0, 0", "0, 2", "2, 0", "0, 0"])
    }

    /// A `geo:box` with bottom-right and top-left corners.
    pub fn slf_box() -> Value {
        json!(["0, 2", "2, 0"])
    }
}

/// Assertion helpers for JSON and SQL text.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON value lacks a specific key.
    pub fn lacks_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_none(),
            "Expected JSON to lack key '{key}', got: {value}"
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a JSON `[x, y]` pair is within `tolerance` of `expected`.
    pub fn close_to(actual: &Value, expected: [f64; 2], tolerance: f64) {
        let pair = actual
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_f64).collect::<Vec<_>>())
            .unwrap_or_default();
        assert!(
            pair.len() == 2
                && (pair[0] - expected[0]).abs() <= tolerance
                && (pair[1] - expected[1]).abs() <= tolerance,
            "Expected {actual} to be within {tolerance} of {expected:?}"
        );
    }
}
