//! Well-Known Text encoding and decoding.
//!
//! Output follows the spacing PostGIS prints: `POINT (2.0 1.0)`,
//! `LINESTRING (1.0 2.0, 3.0 4.0)`. An optional `SRID=<n>;` prefix produces
//! the extended form PostGIS accepts as a geometry literal.

use std::str::FromStr;

use ::wkt::Wkt;
use ::wkt::types::{Coord, GeometryCollection, LineString, Point, Polygon};

use super::geojson::{GeoJson, Position};
use super::{MAX_NESTING, format_coord};
use crate::error::CodecError;

/// Render `geometry` as WKT.
///
/// `decimals` rounds every coordinate to that many fractional digits in the
/// text; the geometry itself is left alone.
pub fn to_wkt(geometry: &GeoJson, decimals: Option<usize>) -> String {
    let mut out = String::new();
    write_geometry(&mut out, geometry, decimals);
    out
}

/// Render `geometry` as WKT, prefixed with `SRID=<srid>;` when given.
pub fn to_wkt_with_srid(geometry: &GeoJson, decimals: Option<usize>, srid: Option<u32>) -> String {
    let wkt = to_wkt(geometry, decimals);
    match srid {
        Some(srid) => format!("SRID={srid};{wkt}"),
        None => wkt,
    }
}

/// Parse WKT, accepting and discarding a leading `SRID=<n>;`.
///
/// Keywords are case-insensitive. Multi-part shapes, `POINT EMPTY` and
/// coordinates carrying Z or M are rejected as unsupported.
pub fn from_wkt(text: &str) -> Result<GeoJson, CodecError> {
    let body = strip_srid(text.trim())?.to_ascii_uppercase();
    check_structure(&body)?;
    let parsed = Wkt::<f64>::from_str(&body).map_err(|e| CodecError::wkt(format!("{e}")))?;
    geometry(parsed)
}

fn write_geometry(out: &mut String, geometry: &GeoJson, decimals: Option<usize>) {
    match geometry {
        GeoJson::Point { coordinates } => {
            out.push_str("POINT (");
            write_position(out, coordinates, decimals);
            out.push(')');
        }
        GeoJson::LineString { coordinates } => {
            out.push_str("LINESTRING");
            write_list(out, coordinates, |out, p| write_position(out, p, decimals));
        }
        GeoJson::Polygon { coordinates } => {
            out.push_str("POLYGON");
            write_list(out, coordinates, |out, ring| {
                write_items(out, ring, |out, p| write_position(out, p, decimals));
            });
        }
        GeoJson::GeometryCollection { geometries } => {
            out.push_str("GEOMETRYCOLLECTION");
            write_list(out, geometries, |out, inner| {
                write_geometry(out, inner, decimals);
            });
        }
    }
}

/// Writes the list after a geometry tag: ` (a, b, ...)` or ` EMPTY`.
fn write_list<T>(out: &mut String, items: &[T], write_item: impl FnMut(&mut String, &T)) {
    out.push(' ');
    write_items(out, items, write_item);
}

/// Writes `(a, b, ...)`, or `EMPTY` for an empty list.
fn write_items<T>(out: &mut String, items: &[T], mut write_item: impl FnMut(&mut String, &T)) {
    if items.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_item(out, item);
    }
    out.push(')');
}

fn write_position(out: &mut String, [x, y]: &Position, decimals: Option<usize>) {
    out.push_str(&render_number(*x, decimals));
    out.push(' ');
    out.push_str(&render_number(*y, decimals));
}

fn render_number(value: f64, decimals: Option<usize>) -> String {
    let rounded = decimals
        .and_then(|d| format!("{value:.d$}").parse::<f64>().ok())
        .unwrap_or(value);
    format_coord(rounded)
}

fn strip_srid(text: &str) -> Result<&str, CodecError> {
    let Some(prefix) = text.get(..5) else {
        return Ok(text);
    };
    if !prefix.eq_ignore_ascii_case("SRID=") {
        return Ok(text);
    }
    let (srid, body) = text[5..]
        .split_once(';')
        .ok_or_else(|| CodecError::wkt("SRID prefix without ';'"))?;
    if srid.trim().parse::<u32>().is_err() {
        return Err(CodecError::wkt(format!("invalid SRID '{srid}'")));
    }
    Ok(body.trim_start())
}

/// Checks parentheses before parsing: balanced, no deeper than a polygon
/// inside `MAX_NESTING` collections, and nothing after the outermost group.
fn check_structure(body: &str) -> Result<(), CodecError> {
    // Tag, dimension and EMPTY at most.
    if !body.contains('(') && body.split_whitespace().count() > 3 {
        return Err(CodecError::wkt(format!("unexpected text in '{body}'")));
    }
    let mut depth = 0usize;
    let mut closed = false;
    for c in body.chars() {
        if closed && !c.is_whitespace() {
            return Err(CodecError::wkt(format!("unexpected trailing '{c}'")));
        }
        match c {
            '(' => {
                depth += 1;
                if depth > MAX_NESTING + 2 {
                    return Err(CodecError::wkt(format!(
                        "collections nested deeper than {MAX_NESTING}"
                    )));
                }
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CodecError::wkt("unbalanced ')'"))?;
                closed = depth == 0;
            }
            _ => {}
        }
    }
    if depth > 0 {
        return Err(CodecError::wkt("unclosed '('"));
    }
    Ok(())
}

fn geometry(parsed: Wkt<f64>) -> Result<GeoJson, CodecError> {
    match parsed {
        Wkt::Point(Point(Some(coord))) => Ok(GeoJson::Point {
            coordinates: position(coord)?,
        }),
        Wkt::Point(Point(None)) => Err(unsupported("POINT EMPTY")),
        Wkt::LineString(line) => Ok(GeoJson::LineString {
            coordinates: positions(line)?,
        }),
        Wkt::Polygon(Polygon(rings)) => Ok(GeoJson::Polygon {
            coordinates: rings.into_iter().map(positions).collect::<Result<_, _>>()?,
        }),
        Wkt::GeometryCollection(GeometryCollection(items)) => Ok(GeoJson::GeometryCollection {
            geometries: items.into_iter().map(geometry).collect::<Result<_, _>>()?,
        }),
        Wkt::MultiPoint(_) => Err(unsupported("MULTIPOINT")),
        Wkt::MultiLineString(_) => Err(unsupported("MULTILINESTRING")),
        Wkt::MultiPolygon(_) => Err(unsupported("MULTIPOLYGON")),
    }
}

fn positions(LineString(coords): LineString<f64>) -> Result<Vec<Position>, CodecError> {
    coords.into_iter().map(position).collect()
}

fn position(coord: Coord<f64>) -> Result<Position, CodecError> {
    if coord.z.is_some() || coord.m.is_some() {
        return Err(unsupported("coordinates with more than 2 dimensions"));
    }
    Ok([coord.x, coord.y])
}

fn unsupported(what: &str) -> CodecError {
    CodecError::UnsupportedGeometry(what.to_string())
}
