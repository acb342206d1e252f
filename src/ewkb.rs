//! Extended well-known binary codec for `geo_types` geometries.
//!
//! The writer emits little-endian EWKB with the spatial reference id embedded
//! on the top-level geometry via the `0x20000000` type flag, byte-compatible
//! with what PostGIS and Redshift ingest. The reader accepts either byte
//! order and is primarily there to prove round-trips in tests.
//!
//! Only two-dimensional geometries are handled; Z/M ordinates are rejected.

use geo_types::{Coord, Geometry, GeometryCollection, LineString, Point, Polygon};

const SRID_FLAG: u32 = 0x2000_0000;
const Z_FLAG: u32 = 0x8000_0000;
const M_FLAG: u32 = 0x4000_0000;

const POINT: u32 = 1;
const LINESTRING: u32 = 2;
const POLYGON: u32 = 3;
const MULTIPOINT: u32 = 4;
const MULTILINESTRING: u32 = 5;
const MULTIPOLYGON: u32 = 6;
const GEOMETRYCOLLECTION: u32 = 7;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(&'static str),
    #[error("unknown wkb type code {0}")]
    UnknownTypeCode(u32),
    #[error("multi-geometry member has an unexpected type")]
    UnexpectedMember,
    #[error("geometries with Z or M ordinates are not supported")]
    UnsupportedOrdinates,
    #[error("invalid byte-order marker {0:#04x}")]
    InvalidByteOrder(u8),
    #[error("truncated payload at offset {0}")]
    Truncated(usize),
    #[error("trailing bytes after geometry")]
    TrailingBytes,
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Serialize a geometry and render it as lowercase hex.
pub fn encode_hex(geometry: &Geometry<f64>, srid: Option<i32>) -> Result<String, Error> {
    let mut buf = Vec::new();
    write_geometry(&mut buf, geometry, srid)?;
    Ok(hex::encode(buf))
}

/// Parse a lowercase-hex EWKB payload back into a geometry and its SRID.
pub fn decode_hex(payload: &str) -> Result<(Geometry<f64>, Option<i32>), Error> {
    read_geometry(&hex::decode(payload)?)
}

/// Append one geometry in EWKB form.
///
/// The SRID, when given, is written on this geometry only; members of
/// multi-geometries and collections never repeat it.
pub fn write_geometry(
    out: &mut Vec<u8>,
    geometry: &Geometry<f64>,
    srid: Option<i32>,
) -> Result<(), Error> {
    match geometry {
        Geometry::Point(point) => {
            write_header(out, POINT, srid);
            write_coord(out, point.0);
        }
        Geometry::LineString(line) => {
            write_header(out, LINESTRING, srid);
            write_coords(out, &line.0);
        }
        Geometry::Polygon(polygon) => {
            write_header(out, POLYGON, srid);
            write_u32(out, 1 + polygon.interiors().len() as u32);
            write_coords(out, &polygon.exterior().0);
            for ring in polygon.interiors() {
                write_coords(out, &ring.0);
            }
        }
        Geometry::MultiPoint(points) => {
            write_header(out, MULTIPOINT, srid);
            write_u32(out, points.0.len() as u32);
            for point in &points.0 {
                write_geometry(out, &Geometry::Point(*point), None)?;
            }
        }
        Geometry::MultiLineString(lines) => {
            write_header(out, MULTILINESTRING, srid);
            write_u32(out, lines.0.len() as u32);
            for line in &lines.0 {
                write_geometry(out, &Geometry::LineString(line.clone()), None)?;
            }
        }
        Geometry::MultiPolygon(polygons) => {
            write_header(out, MULTIPOLYGON, srid);
            write_u32(out, polygons.0.len() as u32);
            for polygon in &polygons.0 {
                write_geometry(out, &Geometry::Polygon(polygon.clone()), None)?;
            }
        }
        Geometry::GeometryCollection(collection) => {
            write_header(out, GEOMETRYCOLLECTION, srid);
            write_u32(out, collection.0.len() as u32);
            for member in &collection.0 {
                write_geometry(out, member, None)?;
            }
        }
        Geometry::Line(_) => return Err(Error::UnsupportedGeometry("Line")),
        Geometry::Rect(_) => return Err(Error::UnsupportedGeometry("Rect")),
        Geometry::Triangle(_) => return Err(Error::UnsupportedGeometry("Triangle")),
    }
    Ok(())
}

/// Parse one EWKB geometry, requiring the buffer to be fully consumed.
pub fn read_geometry(buf: &[u8]) -> Result<(Geometry<f64>, Option<i32>), Error> {
    let mut reader = Reader { buf, pos: 0 };
    let parsed = parse_geometry(&mut reader)?;
    if reader.pos != buf.len() {
        return Err(Error::TrailingBytes);
    }
    Ok(parsed)
}

fn write_header(out: &mut Vec<u8>, code: u32, srid: Option<i32>) {
    out.push(0x01); // little-endian
    let mut ty = code;
    if srid.is_some() {
        ty |= SRID_FLAG;
    }
    write_u32(out, ty);
    if let Some(srid) = srid {
        out.extend_from_slice(&srid.to_le_bytes());
    }
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_coord(out: &mut Vec<u8>, coord: Coord<f64>) {
    out.extend_from_slice(&coord.x.to_le_bytes());
    out.extend_from_slice(&coord.y.to_le_bytes());
}

fn write_coords(out: &mut Vec<u8>, coords: &[Coord<f64>]) {
    write_u32(out, coords.len() as u32);
    for coord in coords {
        write_coord(out, *coord);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, len: usize) -> Result<&[u8], Error> {
        let end = self.pos.checked_add(len).ok_or(Error::Truncated(self.pos))?;
        if end > self.buf.len() {
            return Err(Error::Truncated(self.pos));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self, le: bool) -> Result<u32, Error> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("sized slice");
        Ok(if le {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn read_i32(&mut self, le: bool) -> Result<i32, Error> {
        self.read_u32(le).map(|value| value as i32)
    }

    fn read_f64(&mut self, le: bool) -> Result<f64, Error> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("sized slice");
        Ok(if le {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }
}

fn parse_coord(reader: &mut Reader<'_>, le: bool) -> Result<Coord<f64>, Error> {
    let x = reader.read_f64(le)?;
    let y = reader.read_f64(le)?;
    Ok(Coord { x, y })
}

fn parse_ring(reader: &mut Reader<'_>, le: bool) -> Result<LineString<f64>, Error> {
    let count = reader.read_u32(le)?;
    let mut coords = Vec::with_capacity(count as usize);
    for _ in 0..count {
        coords.push(parse_coord(reader, le)?);
    }
    Ok(LineString(coords))
}

fn parse_geometry(reader: &mut Reader<'_>) -> Result<(Geometry<f64>, Option<i32>), Error> {
    let le = match reader.read_u8()? {
        0x01 => true,
        0x00 => false,
        other => return Err(Error::InvalidByteOrder(other)),
    };
    let ty = reader.read_u32(le)?;
    if ty & (Z_FLAG | M_FLAG) != 0 {
        return Err(Error::UnsupportedOrdinates);
    }
    let srid = if ty & SRID_FLAG != 0 {
        Some(reader.read_i32(le)?)
    } else {
        None
    };
    let geometry = match ty & !SRID_FLAG {
        POINT => Geometry::Point(Point(parse_coord(reader, le)?)),
        LINESTRING => Geometry::LineString(parse_ring(reader, le)?),
        POLYGON => {
            let rings = reader.read_u32(le)?;
            if rings == 0 {
                return Err(Error::Truncated(reader.pos));
            }
            let exterior = parse_ring(reader, le)?;
            let mut interiors = Vec::with_capacity(rings as usize - 1);
            for _ in 1..rings {
                interiors.push(parse_ring(reader, le)?);
            }
            Geometry::Polygon(Polygon::new(exterior, interiors))
        }
        MULTIPOINT => {
            let mut points = Vec::new();
            for _ in 0..reader.read_u32(le)? {
                match parse_geometry(reader)?.0 {
                    Geometry::Point(point) => points.push(point),
                    _ => return Err(Error::UnexpectedMember),
                }
            }
            Geometry::MultiPoint(geo_types::MultiPoint(points))
        }
        MULTILINESTRING => {
            let mut lines = Vec::new();
            for _ in 0..reader.read_u32(le)? {
                match parse_geometry(reader)?.0 {
                    Geometry::LineString(line) => lines.push(line),
                    _ => return Err(Error::UnexpectedMember),
                }
            }
            Geometry::MultiLineString(geo_types::MultiLineString(lines))
        }
        MULTIPOLYGON => {
            let mut polygons = Vec::new();
            for _ in 0..reader.read_u32(le)? {
                match parse_geometry(reader)?.0 {
                    Geometry::Polygon(polygon) => polygons.push(polygon),
                    _ => return Err(Error::UnexpectedMember),
                }
            }
            Geometry::MultiPolygon(geo_types::MultiPolygon(polygons))
        }
        GEOMETRYCOLLECTION => {
            let mut members = Vec::new();
            for _ in 0..reader.read_u32(le)? {
                members.push(parse_geometry(reader)?.0);
            }
            Geometry::GeometryCollection(GeometryCollection(members))
        }
        code => return Err(Error::UnknownTypeCode(code)),
    };
    Ok((geometry, srid))
}
