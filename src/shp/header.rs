//! The 100-byte file header and the per-record header.
//!
//! The file header mixes endianness: the magic number and file length are
//! big-endian, everything from the version on is little-endian. Record
//! headers are entirely big-endian.

use std::io;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use units::{RecordCount, RecordNumber, WordLength};
use endian;
use geo::{BoundingBox2D, BoundingBox3D, MeasureRange};
use super::ShpError;
use super::content::ShapeType;

pub const FILE_CODE: i32 = 9994;
pub const VERSION: i32 = 1000;

/// File header size in bytes. Record contents start right after it, at
/// word offset 50.
pub const HEADER_LENGTH: usize = 100;
pub const HEADER_WORDS: u64 = 50;

/// Words per index entry: a word offset and a word length, both int32.
pub const INDEX_RECORD_WORDS: u64 = 4;

/// Bytes per record header: record number and content length, both int32.
pub const RECORD_HEADER_LENGTH: usize = 8;
pub const RECORD_HEADER_WORDS: u64 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// Total file length, header included, in words.
    pub file_length: WordLength,
    /// The homogeneous shape type of every non-null record in the file.
    pub shape_type: ShapeType,
    pub bounding_box: BoundingBox3D,
}

impl FileHeader {
    pub fn new(file_length: WordLength, shape_type: ShapeType, bounding_box: BoundingBox3D) -> FileHeader {
        FileHeader {
            file_length: file_length,
            shape_type: shape_type,
            bounding_box: bounding_box,
        }
    }

    /// The header of the index file that describes `n_records` entries:
    /// same shape type and box, file length 50 + 4n words.
    pub fn for_index(&self, n_records: RecordCount) -> Result<FileHeader, ShpError> {
        let words = HEADER_WORDS + INDEX_RECORD_WORDS * n_records.value() as u64;
        let file_length = WordLength::new(words)
            .map_err(|err| ShpError::ParseError(format!("index too large: {}", err)))?;
        Ok(FileHeader::new(file_length, self.shape_type, self.bounding_box))
    }

    /// Side-effect: advances the reader past the 100-byte header.
    pub fn read<R: io::Read>(r: &mut R) -> Result<FileHeader, ShpError> {
        let mut buf = [ 0u8; HEADER_LENGTH ];
        r.read_exact(&mut buf).map_err(ShpError::IOError)?;

        let file_code = BigEndian::read_i32(&buf[0..4]);
        if file_code != FILE_CODE {
            return Err(ShpError::ParseError(format!(
                "expected file code {}, got {}", FILE_CODE, file_code
            )));
        }
        // bytes 4..24 are reserved

        let file_length = WordLength::new(BigEndian::read_i32(&buf[24..28]) as u64)
            .map_err(|err| ShpError::ParseError(format!("invalid file length: {}", err)))?;
        if file_length.value() < HEADER_WORDS {
            return Err(ShpError::ParseError(format!(
                "the header says the file is {} words long, but the header alone is {} words",
                file_length.value(), HEADER_WORDS
            )));
        }

        let version = LittleEndian::read_i32(&buf[28..32]);
        if version != VERSION {
            return Err(ShpError::ParseError(format!(
                "expected version {}, got {}", VERSION, version
            )));
        }

        let shape_type_u32 = LittleEndian::read_u32(&buf[32..36]);
        let shape_type = match ShapeType::from_u32(shape_type_u32) {
            Some(shape_type) => shape_type,
            None => {
                return Err(ShpError::ParseError(format!("nonexistent shape type {}", shape_type_u32)));
            }
        };

        let xy = BoundingBox2D::new(
            endian::f64_le(&buf[36..44]),
            endian::f64_le(&buf[44..52]),
            endian::f64_le(&buf[52..60]),
            endian::f64_le(&buf[60..68]),
        );
        let z_min = endian::f64_le(&buf[68..76]);
        let z_max = endian::f64_le(&buf[76..84]);
        let measure_range = MeasureRange::new(
            endian::measure_le(&buf[84..92]),
            endian::measure_le(&buf[92..100]),
        );

        Ok(FileHeader::new(
            file_length,
            shape_type,
            BoundingBox3D::new(xy, z_min, z_max, measure_range),
        ))
    }

    /// Writes the 100-byte header. NaN measure bounds come out as the
    /// no-data sentinel; every other value is verbatim.
    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<(), ShpError> {
        endian::write_i32_be(w, FILE_CODE).map_err(ShpError::IOError)?;
        w.write_all(&[ 0u8; 20 ]).map_err(ShpError::IOError)?;
        endian::write_i32_be(w, self.file_length.value() as i32).map_err(ShpError::IOError)?;
        endian::write_i32_le(w, VERSION).map_err(ShpError::IOError)?;
        endian::write_i32_le(w, self.shape_type.to_u32() as i32).map_err(ShpError::IOError)?;

        let xy = &self.bounding_box.xy;
        endian::write_f64_le(w, xy.x_min).map_err(ShpError::IOError)?;
        endian::write_f64_le(w, xy.y_min).map_err(ShpError::IOError)?;
        endian::write_f64_le(w, xy.x_max).map_err(ShpError::IOError)?;
        endian::write_f64_le(w, xy.y_max).map_err(ShpError::IOError)?;
        endian::write_f64_le(w, self.bounding_box.z_min).map_err(ShpError::IOError)?;
        endian::write_f64_le(w, self.bounding_box.z_max).map_err(ShpError::IOError)?;
        endian::write_measure_le(w, self.bounding_box.measure_range.min).map_err(ShpError::IOError)?;
        endian::write_measure_le(w, self.bounding_box.measure_range.max).map_err(ShpError::IOError)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    pub record_number: RecordNumber,
    pub content_length: WordLength,
}

impl RecordHeader {
    /// Side-effect: advances the reader past the 8-byte record header.
    pub fn read<R: io::Read>(r: &mut R) -> Result<RecordHeader, ShpError> {
        let mut buf = [ 0u8; RECORD_HEADER_LENGTH ];
        r.read_exact(&mut buf).map_err(ShpError::IOError)?;

        let record_number = RecordNumber::new(BigEndian::read_i32(&buf[0..4]) as i64 as u64)
            .map_err(|err| ShpError::ParseError(format!("invalid record number: {}", err)))?;
        let content_length = WordLength::new(BigEndian::read_i32(&buf[4..8]) as i64 as u64)
            .map_err(|err| ShpError::ParseError(format!("invalid content length: {}", err)))?;

        Ok(RecordHeader {
            record_number: record_number,
            content_length: content_length,
        })
    }

    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<(), ShpError> {
        endian::write_i32_be(w, self.record_number.value() as i32).map_err(ShpError::IOError)?;
        endian::write_i32_be(w, self.content_length.value() as i32).map_err(ShpError::IOError)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use units::{RecordCount, RecordNumber, WordLength};
    use geo::{BoundingBox2D, BoundingBox3D, MeasureRange};
    use shp::content::ShapeType;
    use super::{FileHeader, RecordHeader, HEADER_LENGTH};

    fn sample() -> FileHeader {
        FileHeader::new(
            WordLength::new(64).unwrap(),
            ShapeType::PolyLineM,
            BoundingBox3D::new(
                BoundingBox2D::new(-1., -2., 3., 4.),
                0.,
                0.,
                MeasureRange::new(0., 100.),
            ),
        )
    }

    #[test]
    fn round_trip() {
        let header = sample();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(HEADER_LENGTH, buf.len());
        assert_eq!(header, FileHeader::read(&mut Cursor::new(buf)).unwrap());
    }

    #[test]
    fn layout_details() {
        let header = sample();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(&[ 0x00, 0x00, 0x27, 0x0a ], &buf[0..4]); // 9994, big-endian
        assert_eq!(&[ 0x00, 0x00, 0x00, 0x40 ], &buf[24..28]); // 64 words, big-endian
        assert_eq!(&[ 0xe8, 0x03, 0x00, 0x00 ], &buf[28..32]); // version 1000, little-endian
        assert_eq!(&[ 0x17, 0x00, 0x00, 0x00 ], &buf[32..36]); // PolyLineM tag 23
    }

    #[test]
    fn nan_measure_bounds_use_the_sentinel() {
        let header = FileHeader::new(
            WordLength::new(50).unwrap(),
            ShapeType::Point,
            BoundingBox3D::new(
                BoundingBox2D::new(0., 0., 1., 1.),
                0.,
                0.,
                MeasureRange::no_data(),
            ),
        );
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        // sentinel, not a NaN bit pattern
        assert_eq!((-10e39f64).to_bits().to_le_bytes().to_vec(), buf[84..92].to_vec());

        let parsed = FileHeader::read(&mut Cursor::new(buf)).unwrap();
        assert!(parsed.bounding_box.measure_range.min.is_nan());
        assert!(parsed.bounding_box.measure_range.max.is_nan());
    }

    #[test]
    fn bad_magic_is_fatal() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[3] = 0x0b;
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn bad_version_is_fatal() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[28] = 0xe9;
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn unknown_shape_type_is_fatal() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[32] = 0x0d; // PolyLineZ
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn file_length_shorter_than_the_header_is_fatal() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[24..28].copy_from_slice(&[ 0x00, 0x00, 0x00, 0x10 ]); // 16 words
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn index_header_counts_four_words_per_entry() {
        let index = sample().for_index(RecordCount::new(3)).unwrap();
        assert_eq!(62, index.file_length.value());
        assert_eq!(ShapeType::PolyLineM, index.shape_type);
    }

    #[test]
    fn record_header_round_trip() {
        let header = RecordHeader {
            record_number: RecordNumber::new(7).unwrap(),
            content_length: WordLength::new(10).unwrap(),
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(vec![ 0, 0, 0, 7, 0, 0, 0, 10 ], buf);
        assert_eq!(header, RecordHeader::read(&mut Cursor::new(buf)).unwrap());
    }

    #[test]
    fn negative_record_number_is_fatal() {
        let buf = vec![ 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 10 ];
        assert!(RecordHeader::read(&mut Cursor::new(buf)).is_err());
    }
}
