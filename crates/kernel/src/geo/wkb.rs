//! Well-Known Binary encoding and decoding.
//!
//! Encoding writes plain 2D WKB, big endian unless asked otherwise. Decoding
//! accepts either byte order per geometry, and the PostGIS extended form
//! whose type word carries an SRID flag (the SRID is read and dropped).

use std::io::{Cursor, Read};

use super::MAX_NESTING;
use super::geojson::{GeoJson, Position};
use crate::error::CodecError;

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_GEOMETRYCOLLECTION: u32 = 7;

const WKB_BE: u8 = 0;
const WKB_LE: u8 = 1;

/// EWKB flags carried in the high bits of the type word.
const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Smallest encodings of the parts a count can refer to.
const POSITION_SIZE: usize = 16;
const RING_MIN_SIZE: usize = 4;
const GEOMETRY_MIN_SIZE: usize = 9;

/// Byte order of encoded numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteOrder {
    /// XDR.
    #[default]
    BigEndian,
    /// NDR.
    LittleEndian,
}

/// Encode `geometry` as big-endian WKB.
pub fn to_wkb(geometry: &GeoJson) -> Vec<u8> {
    to_wkb_with_order(geometry, ByteOrder::BigEndian)
}

/// Encode `geometry` as WKB with the given byte order.
pub fn to_wkb_with_order(geometry: &GeoJson, order: ByteOrder) -> Vec<u8> {
    let mut writer = Writer {
        buf: Vec::new(),
        order,
    };
    writer.geometry(geometry);
    writer.buf
}

/// Encode `geometry` as big-endian WKB in lowercase hex.
pub fn to_wkb_hex(geometry: &GeoJson) -> String {
    hex::encode(to_wkb(geometry))
}

/// Decode a WKB (or EWKB) geometry.
pub fn from_wkb(bytes: &[u8]) -> Result<GeoJson, CodecError> {
    let mut reader = Reader {
        cursor: Cursor::new(bytes),
    };
    let geometry = reader.geometry(0)?;
    let consumed = reader.cursor.position();
    if consumed < bytes.len() as u64 {
        return Err(CodecError::wkb(format!(
            "{} trailing bytes after geometry",
            bytes.len() as u64 - consumed
        )));
    }
    Ok(geometry)
}

/// Decode a hex-encoded WKB (or EWKB) geometry, in either letter case.
pub fn from_wkb_hex(text: &str) -> Result<GeoJson, CodecError> {
    let bytes = hex::decode(text.trim()).map_err(|e| CodecError::wkb(format!("bad hex: {e}")))?;
    from_wkb(&bytes)
}

struct Writer {
    buf: Vec<u8>,
    order: ByteOrder,
}

impl Writer {
    fn geometry(&mut self, geometry: &GeoJson) {
        self.buf.push(match self.order {
            ByteOrder::BigEndian => WKB_BE,
            ByteOrder::LittleEndian => WKB_LE,
        });
        match geometry {
            GeoJson::Point { coordinates } => {
                self.u32(WKB_POINT);
                self.position(coordinates);
            }
            GeoJson::LineString { coordinates } => {
                self.u32(WKB_LINESTRING);
                self.positions(coordinates);
            }
            GeoJson::Polygon { coordinates } => {
                self.u32(WKB_POLYGON);
                self.count(coordinates.len());
                for ring in coordinates {
                    self.positions(ring);
                }
            }
            GeoJson::GeometryCollection { geometries } => {
                self.u32(WKB_GEOMETRYCOLLECTION);
                self.count(geometries.len());
                for inner in geometries {
                    self.geometry(inner);
                }
            }
        }
    }

    fn positions(&mut self, positions: &[Position]) {
        self.count(positions.len());
        for p in positions {
            self.position(p);
        }
    }

    fn position(&mut self, [x, y]: &Position) {
        self.f64(*x);
        self.f64(*y);
    }

    fn count(&mut self, n: usize) {
        // Location shapes are nowhere near u32::MAX parts.
        self.u32(u32::try_from(n).unwrap_or(u32::MAX));
    }

    fn u32(&mut self, value: u32) {
        let bytes = match self.order {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }

    fn f64(&mut self, value: f64) {
        let bytes = match self.order {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }
}

struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl Reader<'_> {
    /// Read one geometry nested inside `depth` collections.
    fn geometry(&mut self, depth: usize) -> Result<GeoJson, CodecError> {
        let order = match self.bytes::<1>("byte order")? {
            [WKB_BE] => ByteOrder::BigEndian,
            [WKB_LE] => ByteOrder::LittleEndian,
            [other] => return Err(CodecError::wkb(format!("invalid byte order {other}"))),
        };

        let type_word = self.u32(order, "geometry type")?;
        if type_word & (EWKB_Z | EWKB_M) != 0 {
            return Err(CodecError::UnsupportedGeometry(
                "geometries with Z or M coordinates".to_string(),
            ));
        }
        if type_word & EWKB_SRID != 0 {
            self.u32(order, "SRID")?;
        }

        match type_word & !EWKB_SRID {
            WKB_POINT => Ok(GeoJson::Point {
                coordinates: self.position(order)?,
            }),
            WKB_LINESTRING => Ok(GeoJson::LineString {
                coordinates: self.positions(order)?,
            }),
            WKB_POLYGON => {
                let n = self.count(order, "ring count", RING_MIN_SIZE)?;
                let mut rings = Vec::with_capacity(n);
                for _ in 0..n {
                    rings.push(self.positions(order)?);
                }
                Ok(GeoJson::Polygon { coordinates: rings })
            }
            WKB_GEOMETRYCOLLECTION => {
                if depth >= MAX_NESTING {
                    return Err(CodecError::wkb(format!(
                        "collections nested deeper than {MAX_NESTING}"
                    )));
                }
                let n = self.count(order, "geometry count", GEOMETRY_MIN_SIZE)?;
                let mut geometries = Vec::with_capacity(n);
                for _ in 0..n {
                    geometries.push(self.geometry(depth + 1)?);
                }
                Ok(GeoJson::GeometryCollection { geometries })
            }
            other => Err(CodecError::UnsupportedGeometry(format!(
                "WKB geometry type {other}"
            ))),
        }
    }

    fn positions(&mut self, order: ByteOrder) -> Result<Vec<Position>, CodecError> {
        let n = self.count(order, "point count", POSITION_SIZE)?;
        let mut positions = Vec::with_capacity(n);
        for _ in 0..n {
            positions.push(self.position(order)?);
        }
        Ok(positions)
    }

    fn position(&mut self, order: ByteOrder) -> Result<Position, CodecError> {
        let x = self.f64(order, "x coordinate")?;
        let y = self.f64(order, "y coordinate")?;
        Ok([x, y])
    }

    /// Read an element count, rejecting counts the remaining input cannot hold.
    fn count(
        &mut self,
        order: ByteOrder,
        what: &str,
        min_item_size: usize,
    ) -> Result<usize, CodecError> {
        let n = self.u32(order, what)? as usize;
        let remaining = self.cursor.get_ref().len() as u64 - self.cursor.position();
        if (n as u64).saturating_mul(min_item_size as u64) > remaining {
            return Err(CodecError::Truncated(format!(
                "{what} {n} exceeds the remaining {remaining} bytes"
            )));
        }
        Ok(n)
    }

    fn u32(&mut self, order: ByteOrder, what: &str) -> Result<u32, CodecError> {
        let bytes = self.bytes::<4>(what)?;
        Ok(match order {
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
        })
    }

    fn f64(&mut self, order: ByteOrder, what: &str) -> Result<f64, CodecError> {
        let bytes = self.bytes::<8>(what)?;
        Ok(match order {
            ByteOrder::BigEndian => f64::from_be_bytes(bytes),
            ByteOrder::LittleEndian => f64::from_le_bytes(bytes),
        })
    }

    fn bytes<const N: usize>(&mut self, what: &str) -> Result<[u8; N], CodecError> {
        let mut buf = [0u8; N];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| CodecError::Truncated(format!("failed to read {what}")))?;
        Ok(buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn shapes() -> Vec<GeoJson> {
        let point = GeoJson::Point {
            coordinates: [2.0, 1.0],
        };
        let line = GeoJson::LineString {
            coordinates: vec![[2.0, 1.0], [4.0, 3.0], [-0.5, 7.25]],
        };
        let polygon = GeoJson::Polygon {
            coordinates: vec![
                vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]],
                vec![[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]],
            ],
        };
        let collection = GeoJson::GeometryCollection {
            geometries: vec![
                point.clone(),
                GeoJson::GeometryCollection {
                    geometries: vec![line.clone(), polygon.clone()],
                },
            ],
        };
        vec![point, line, polygon, collection]
    }

    #[test]
    fn point_layout_is_big_endian() {
        let point = GeoJson::Point {
            coordinates: [2.0, 1.0],
        };
        assert_eq!(
            to_wkb_hex(&point),
            "000000000140000000000000003ff0000000000000"
        );
    }

    #[test]
    fn round_trips_in_both_byte_orders() {
        for shape in shapes() {
            assert_eq!(from_wkb(&to_wkb(&shape)).unwrap(), shape);
            assert_eq!(from_wkb_hex(&to_wkb_hex(&shape)).unwrap(), shape);
            let le = to_wkb_with_order(&shape, ByteOrder::LittleEndian);
            assert_eq!(from_wkb(&le).unwrap(), shape);
        }
    }

    #[test]
    fn accepts_ewkb_with_srid() {
        // SRID=4326;POINT(2 1), little endian, as PostGIS prints it.
        let hex = "0101000020E61000000000000000000040000000000000F03F";
        let geometry = from_wkb_hex(hex).unwrap();
        assert_eq!(
            geometry,
            GeoJson::Point {
                coordinates: [2.0, 1.0]
            }
        );
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = to_wkb(&shapes()[1]);
        for cut in [0, 1, 5, bytes.len() - 1] {
            assert!(
                matches!(from_wkb(&bytes[..cut]), Err(CodecError::Truncated(_))),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn rejects_trailing_bytes_and_bad_order() {
        let mut bytes = to_wkb(&shapes()[0]);
        bytes.push(0);
        assert!(matches!(from_wkb(&bytes), Err(CodecError::Malformed { .. })));

        bytes[0] = 7;
        assert!(matches!(from_wkb(&bytes), Err(CodecError::Malformed { .. })));
    }

    #[test]
    fn rejects_unsupported_types() {
        // MULTIPOINT header with no members.
        let multipoint = [0u8, 0, 0, 0, 4, 0, 0, 0, 0];
        assert!(matches!(
            from_wkb(&multipoint),
            Err(CodecError::UnsupportedGeometry(_))
        ));
        assert!(matches!(from_wkb_hex("zz"), Err(CodecError::Malformed { .. })));
    }

    /// `levels` big-endian collections, each holding the next, around a point.
    fn nested_collections(levels: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(levels * 9 + 21);
        for _ in 0..levels {
            bytes.extend_from_slice(&[0, 0, 0, 0, 7, 0, 0, 0, 1]);
        }
        bytes.extend(to_wkb(&GeoJson::Point {
            coordinates: [2.0, 1.0],
        }));
        bytes
    }

    #[test]
    fn bounds_collection_nesting() {
        assert!(from_wkb(&nested_collections(MAX_NESTING)).is_ok());
        for levels in [MAX_NESTING + 1, 200_000] {
            assert!(
                matches!(
                    from_wkb(&nested_collections(levels)),
                    Err(CodecError::Malformed { .. })
                ),
                "{levels} levels"
            );
        }
    }
}
