//! Shape-type-tagged record payloads.
//!
//! Every record's content starts with a little-endian type tag; the tag
//! picks the binary layout of everything after it. The supported layouts are
//! NullShape, Point, Polygon and PolyLineM. Unknown tags are a hard error:
//! there is no way to skip a payload we cannot measure.

use std::io;
use units::{Tolerance, WordLength};
use endian;
use geo::{BoundingBox2D, MeasureRange, Point, PolyLineM, Polygon};
use super::ShpError;

const TYPE_NULL: u32 = 0;
const TYPE_POINT: u32 = 1;
const TYPE_POLYGON: u32 = 5;
const TYPE_POLYLINE_M: u32 = 23;

/// Bytes before the parts array in a Polygon/PolyLineM payload: type tag,
/// bounding box, part count, point count.
const POLY_PREFIX_LENGTH: usize = 44;
const POINT_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    NullShape,
    Point,
    Polygon,
    PolyLineM,
}

impl ShapeType {
    pub fn from_u32(u: u32) -> Option<ShapeType> {
        match u {
            TYPE_NULL => Some(ShapeType::NullShape),
            TYPE_POINT => Some(ShapeType::Point),
            TYPE_POLYGON => Some(ShapeType::Polygon),
            TYPE_POLYLINE_M => Some(ShapeType::PolyLineM),
            _ => None,
        }
    }

    pub fn to_u32(&self) -> u32 {
        match *self {
            ShapeType::NullShape => TYPE_NULL,
            ShapeType::Point => TYPE_POINT,
            ShapeType::Polygon => TYPE_POLYGON,
            ShapeType::PolyLineM => TYPE_POLYLINE_M,
        }
    }
}

/// One record's geometry payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeContent {
    Null,
    Point(Point),
    Polygon(Polygon),
    PolyLineM(PolyLineM),
}

impl ShapeContent {
    pub fn shape_type(&self) -> ShapeType {
        match *self {
            ShapeContent::Null => ShapeType::NullShape,
            ShapeContent::Point(_) => ShapeType::Point,
            ShapeContent::Polygon(_) => ShapeType::Polygon,
            ShapeContent::PolyLineM(_) => ShapeType::PolyLineM,
        }
    }

    /// The content length, in words, computed from the payload itself. The
    /// record-header writer consumes this same value, so the header can
    /// never disagree with the bytes that follow it.
    pub fn content_length(&self) -> Result<WordLength, ShpError> {
        let words: u64 = match *self {
            ShapeContent::Null => 2,
            ShapeContent::Point(_) => 10,
            ShapeContent::Polygon(ref polygon) => {
                22 + 2 * polygon.parts.len() as u64 + 8 * polygon.points.len() as u64
            }
            ShapeContent::PolyLineM(ref line) => {
                let base = 22 + 2 * line.parts.len() as u64 + 8 * line.points.len() as u64;
                if line.has_measures() {
                    base + 8 + 4 * line.measures.len() as u64
                } else {
                    base
                }
            }
        };
        WordLength::new(words).map_err(|err| ShpError::ParseError(format!("shape too large: {}", err)))
    }

    /// Parses one record's content bytes. The buffer must span exactly the
    /// content the record header declared.
    pub fn read(buf: &[u8]) -> Result<ShapeContent, ShpError> {
        if buf.len() < 4 {
            return Err(ShpError::ParseError(format!(
                "a shape record needs at least 4 content bytes, got {}", buf.len()
            )));
        }
        let tag = endian::u32_le(&buf[0..4]);
        let shape_type = match ShapeType::from_u32(tag) {
            Some(shape_type) => shape_type,
            None => {
                return Err(ShpError::ParseError(format!("nonexistent shape type {}", tag)));
            }
        };

        match shape_type {
            ShapeType::NullShape => {
                if buf.len() != 4 {
                    return Err(ShpError::ParseError(format!(
                        "a NullShape record is 4 bytes, got {}", buf.len()
                    )));
                }
                Ok(ShapeContent::Null)
            }
            ShapeType::Point => {
                if buf.len() != 20 {
                    return Err(ShpError::ParseError(format!(
                        "a Point record is 20 bytes, got {}", buf.len()
                    )));
                }
                Ok(ShapeContent::Point(Point(
                    endian::f64_le(&buf[4..12]),
                    endian::f64_le(&buf[12..20]),
                )))
            }
            ShapeType::Polygon => ShapeContent::read_polygon(buf),
            ShapeType::PolyLineM => ShapeContent::read_polyline_m(buf),
        }
    }

    fn read_poly_prefix(buf: &[u8]) -> Result<(BoundingBox2D, usize, usize), ShpError> {
        if buf.len() < POLY_PREFIX_LENGTH {
            return Err(ShpError::ParseError(format!(
                "a multi-part shape needs at least {} bytes, got {}", POLY_PREFIX_LENGTH, buf.len()
            )));
        }
        let bounding_box = BoundingBox2D::new(
            endian::f64_le(&buf[4..12]),
            endian::f64_le(&buf[12..20]),
            endian::f64_le(&buf[20..28]),
            endian::f64_le(&buf[28..36]),
        );
        let n_parts = endian::u32_le(&buf[36..40]) as usize;
        let n_points = endian::u32_le(&buf[40..44]) as usize;
        Ok((bounding_box, n_parts, n_points))
    }

    fn read_parts_and_points(buf: &[u8], n_parts: usize, n_points: usize) -> (Vec<usize>, Vec<Point>) {
        let parts: Vec<usize> = buf[POLY_PREFIX_LENGTH..POLY_PREFIX_LENGTH + 4 * n_parts]
            .chunks(4)
            .map(|b| endian::u32_le(b) as usize)
            .collect();
        let points_start = POLY_PREFIX_LENGTH + 4 * n_parts;
        let points: Vec<Point> = buf[points_start..points_start + POINT_LENGTH * n_points]
            .chunks(POINT_LENGTH)
            .map(|b| Point(endian::f64_le(&b[0..8]), endian::f64_le(&b[8..16])))
            .collect();
        (parts, points)
    }

    fn read_polygon(buf: &[u8]) -> Result<ShapeContent, ShpError> {
        let (bounding_box, n_parts, n_points) = ShapeContent::read_poly_prefix(buf)?;
        let needed = POLY_PREFIX_LENGTH + 4 * n_parts + POINT_LENGTH * n_points;
        if needed != buf.len() {
            return Err(ShpError::ParseError(format!(
                "a Polygon with {} parts and {} points needs {} bytes, but the record header says it has {}",
                n_parts, n_points, needed, buf.len()
            )));
        }
        let (parts, points) = ShapeContent::read_parts_and_points(buf, n_parts, n_points);
        Polygon::with_bounding_box(bounding_box, parts, points)
            .map(ShapeContent::Polygon)
            .map_err(|err| ShpError::ParseError(format!("{}", err)))
    }

    fn read_polyline_m(buf: &[u8]) -> Result<ShapeContent, ShpError> {
        let (bounding_box, n_parts, n_points) = ShapeContent::read_poly_prefix(buf)?;
        let base = POLY_PREFIX_LENGTH + 4 * n_parts + POINT_LENGTH * n_points;
        let with_measures = base + 16 + 8 * n_points;

        // the measure block is optional: a buffer that ends exactly after
        // the point array simply has no measures
        let (measure_range, measures) = if buf.len() == base {
            (MeasureRange::empty(), Vec::new())
        } else if buf.len() == with_measures {
            let range = MeasureRange::new(
                endian::measure_le(&buf[base..base + 8]),
                endian::measure_le(&buf[base + 8..base + 16]),
            );
            let measures: Vec<f64> = buf[base + 16..]
                .chunks(8)
                .map(|b| endian::measure_le(b))
                .collect();
            (range, measures)
        } else {
            return Err(ShpError::ParseError(format!(
                "a PolyLineM with {} parts and {} points needs {} bytes ({} without measures), but the record header says it has {}",
                n_parts, n_points, with_measures, base, buf.len()
            )));
        };

        let (parts, points) = ShapeContent::read_parts_and_points(buf, n_parts, n_points);
        PolyLineM::with_bounding_box(bounding_box, parts, points, measure_range, measures)
            .map(ShapeContent::PolyLineM)
            .map_err(|err| ShpError::ParseError(format!("{}", err)))
    }

    /// Writes the type tag and payload, little-endian throughout. Emits
    /// exactly `content_length()` words.
    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<(), ShpError> {
        // also catches payloads too large for the format's int32 counters
        self.content_length()?;

        endian::write_i32_le(w, self.shape_type().to_u32() as i32).map_err(ShpError::IOError)?;
        match *self {
            ShapeContent::Null => Ok(()),
            ShapeContent::Point(ref point) => {
                endian::write_f64_le(w, point.0).map_err(ShpError::IOError)?;
                endian::write_f64_le(w, point.1).map_err(ShpError::IOError)
            }
            ShapeContent::Polygon(ref polygon) => {
                ShapeContent::write_poly_body(w, &polygon.bounding_box, &polygon.parts, &polygon.points)
            }
            ShapeContent::PolyLineM(ref line) => {
                ShapeContent::write_poly_body(w, &line.bounding_box, &line.parts, &line.points)?;
                if line.has_measures() {
                    endian::write_measure_le(w, line.measure_range.min).map_err(ShpError::IOError)?;
                    endian::write_measure_le(w, line.measure_range.max).map_err(ShpError::IOError)?;
                    for &measure in line.measures.iter() {
                        endian::write_measure_le(w, measure).map_err(ShpError::IOError)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn write_poly_body<W: io::Write>(
        w: &mut W,
        bounding_box: &BoundingBox2D,
        parts: &[usize],
        points: &[Point],
    ) -> Result<(), ShpError> {
        endian::write_f64_le(w, bounding_box.x_min).map_err(ShpError::IOError)?;
        endian::write_f64_le(w, bounding_box.y_min).map_err(ShpError::IOError)?;
        endian::write_f64_le(w, bounding_box.x_max).map_err(ShpError::IOError)?;
        endian::write_f64_le(w, bounding_box.y_max).map_err(ShpError::IOError)?;
        endian::write_i32_le(w, parts.len() as i32).map_err(ShpError::IOError)?;
        endian::write_i32_le(w, points.len() as i32).map_err(ShpError::IOError)?;
        for &part in parts.iter() {
            endian::write_i32_le(w, part as i32).map_err(ShpError::IOError)?;
        }
        for point in points.iter() {
            endian::write_f64_le(w, point.0).map_err(ShpError::IOError)?;
            endian::write_f64_le(w, point.1).map_err(ShpError::IOError)?;
        }
        Ok(())
    }

    pub fn close_to(&self, other: &ShapeContent, tolerance: Tolerance) -> bool {
        match (self, other) {
            (&ShapeContent::Null, &ShapeContent::Null) => true,
            (&ShapeContent::Point(ref a), &ShapeContent::Point(ref b)) => a.close_to(b, tolerance),
            (&ShapeContent::Polygon(ref a), &ShapeContent::Polygon(ref b)) => a.close_to(b, tolerance),
            (&ShapeContent::PolyLineM(ref a), &ShapeContent::PolyLineM(ref b)) => a.close_to(b, tolerance),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use geo::{MeasureRange, Point, PolyLineM, Polygon};
    use super::{ShapeContent, ShapeType};

    fn encode(content: &ShapeContent) -> Vec<u8> {
        let mut buf = Vec::new();
        content.write(&mut buf).unwrap();
        assert_eq!(content.content_length().unwrap().to_bytes().value(), buf.len() as u64);
        buf
    }

    #[test]
    fn shape_type_tags() {
        assert_eq!(Some(ShapeType::NullShape), ShapeType::from_u32(0));
        assert_eq!(Some(ShapeType::Point), ShapeType::from_u32(1));
        assert_eq!(Some(ShapeType::Polygon), ShapeType::from_u32(5));
        assert_eq!(Some(ShapeType::PolyLineM), ShapeType::from_u32(23));
        assert_eq!(None, ShapeType::from_u32(13));
        assert_eq!(None, ShapeType::from_u32(99));
    }

    #[test]
    fn null_shape_is_two_words() {
        let content = ShapeContent::Null;
        assert_eq!(2, content.content_length().unwrap().value());
        let buf = encode(&content);
        assert_eq!(vec![ 0, 0, 0, 0 ], buf);
        assert_eq!(content, ShapeContent::read(&buf).unwrap());
    }

    #[test]
    fn point_round_trip() {
        let content = ShapeContent::Point(Point(0.5, -1.25));
        assert_eq!(10, content.content_length().unwrap().value());
        let buf = encode(&content);
        assert_eq!(content, ShapeContent::read(&buf).unwrap());
    }

    #[test]
    fn polygon_round_trip() {
        let polygon = Polygon::new(
            vec![ 0, 4 ],
            vec![
                Point(0., 0.), Point(4., 0.), Point(4., 4.), Point(0., 0.),
                Point(1., 1.), Point(2., 1.), Point(2., 2.), Point(1., 1.),
            ],
        ).unwrap();
        let content = ShapeContent::Polygon(polygon);
        // 22 + 2*2 + 8*8
        assert_eq!(90, content.content_length().unwrap().value());
        let buf = encode(&content);
        assert_eq!(content, ShapeContent::read(&buf).unwrap());
    }

    #[test]
    fn polyline_m_round_trip_with_measures() {
        let line = PolyLineM::new(
            vec![ 0 ],
            vec![ Point(0., 0.), Point(1., 1.), Point(2., 0.) ],
            vec![ 0., 1.5, 3. ],
        ).unwrap();
        let content = ShapeContent::PolyLineM(line);
        // 22 + 2 + 24 + 8 + 12
        assert_eq!(68, content.content_length().unwrap().value());
        let buf = encode(&content);
        assert_eq!(content, ShapeContent::read(&buf).unwrap());
    }

    #[test]
    fn polyline_m_omitted_measures_decode_to_empty() {
        let line = PolyLineM::new(
            vec![ 0 ],
            vec![ Point(0., 0.), Point(1., 1.) ],
            vec![],
        ).unwrap();
        let content = ShapeContent::PolyLineM(line);
        // no measure block: 22 + 2 + 16
        assert_eq!(40, content.content_length().unwrap().value());
        let buf = encode(&content);

        match ShapeContent::read(&buf).unwrap() {
            ShapeContent::PolyLineM(parsed) => {
                assert_eq!(0, parsed.measures.len());
                assert!(parsed.measure_range.is_empty());
            }
            other => panic!("expected a PolyLineM, got {:?}", other),
        }
    }

    #[test]
    fn polyline_m_nan_measures_round_trip_through_sentinel() {
        let nan = ::std::f64::NAN;
        let line = PolyLineM::new(
            vec![ 0 ],
            vec![ Point(0., 0.), Point(1., 1.) ],
            vec![ 2.5, nan ],
        ).unwrap();
        let content = ShapeContent::PolyLineM(line);
        let buf = encode(&content);
        match ShapeContent::read(&buf).unwrap() {
            ShapeContent::PolyLineM(parsed) => {
                assert_eq!(2.5, parsed.measures[0]);
                assert!(parsed.measures[1].is_nan());
            }
            other => panic!("expected a PolyLineM, got {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_is_fatal() {
        // PolygonZ (15) exists in the wild but not in this codec
        let buf = vec![ 15, 0, 0, 0 ];
        assert!(ShapeContent::read(&buf).is_err());
    }

    #[test]
    fn truncated_records_are_fatal() {
        let content = ShapeContent::Point(Point(0.5, 0.5));
        let mut buf = encode(&content);
        buf.pop();
        assert!(ShapeContent::read(&buf).is_err());

        let polygon = ShapeContent::Polygon(Polygon::new(
            vec![ 0 ],
            vec![ Point(0., 0.), Point(1., 0.), Point(1., 1.), Point(0., 0.) ],
        ).unwrap());
        let mut buf = encode(&polygon);
        buf.truncate(buf.len() - 8);
        assert!(ShapeContent::read(&buf).is_err());
    }

    #[test]
    fn decoded_box_survives_round_trip() {
        // a deliberately loose bounding box must not be "repaired"
        let polygon = Polygon::with_bounding_box(
            ::geo::BoundingBox2D::new(-10., -10., 10., 10.),
            vec![ 0 ],
            vec![ Point(0., 0.), Point(1., 0.), Point(1., 1.), Point(0., 0.) ],
        ).unwrap();
        let content = ShapeContent::Polygon(polygon.clone());
        let buf = encode(&content);
        match ShapeContent::read(&buf).unwrap() {
            ShapeContent::Polygon(parsed) => assert_eq!(polygon.bounding_box, parsed.bounding_box),
            other => panic!("expected a Polygon, got {:?}", other),
        }
    }

    #[test]
    fn close_to_distinguishes_types() {
        let point = ShapeContent::Point(Point(0., 0.));
        let tolerance = ::units::Tolerance::new(1.).unwrap();
        assert!(point.close_to(&ShapeContent::Point(Point(0.5, 0.5)), tolerance));
        assert!(!point.close_to(&ShapeContent::Null, tolerance));
    }
}
