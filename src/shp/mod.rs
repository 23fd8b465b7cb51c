//! Reads and writes ".shp" geometry files and their ".shx" indexes, as per
//! the ESRI Shapefile Technical Description.
//!
//! A ".shp" file is a 100-byte header followed by variable-length records.
//! Each record is a big-endian header (record number, content length in
//! 16-bit words) and a little-endian, shape-type-tagged payload. The ".shx"
//! index repeats the file header and adds one fixed-width entry per record
//! so readers can seek.
//!
//! # Examples
//!
//! Write a one-point file to memory and read it back:
//!
//! ```
//! use std::io::Cursor;
//! use shapecodec::geo::{BoundingBox2D, BoundingBox3D, Point};
//! use shapecodec::shp::{FileHeader, ShapeContent, ShapeType, ShpReader, ShpWriter};
//! use shapecodec::units::WordLength;
//!
//! // 50 header words, then a 4-word record header and a 10-word Point
//! let header = FileHeader::new(
//!     WordLength::new(64).unwrap(),
//!     ShapeType::Point,
//!     BoundingBox3D::flat(BoundingBox2D::new(0., 0., 1., 1.)),
//! );
//!
//! let mut writer = ShpWriter::new(Vec::new(), header).unwrap();
//! let entry = writer.write_shape(&ShapeContent::Point(Point(0.5, 0.5))).unwrap();
//! assert_eq!(50, entry.offset.value());
//! assert_eq!(10, entry.content_length.value());
//! let (bytes, _index) = writer.finish().unwrap();
//!
//! let mut reader = ShpReader::new(Cursor::new(bytes)).unwrap();
//! let record = reader.next().unwrap().unwrap();
//! assert_eq!(ShapeContent::Point(Point(0.5, 0.5)), record.content);
//! assert!(reader.next().is_none());
//! ```

use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use units::{RecordCount, RecordNumber, WordLength, WordOffset};

pub mod content;
pub mod header;
pub mod index;

pub use self::content::{ShapeContent, ShapeType};
pub use self::header::{FileHeader, RecordHeader};
pub use self::index::{IndexReader, IndexRecord, IndexWriter};

use self::header::{HEADER_WORDS, RECORD_HEADER_WORDS};

#[derive(Debug)]
pub enum ShpError {
    IOError(io::Error),
    /// The bytes are not a valid shapefile. Always fatal.
    ParseError(String),
}

impl error::Error for ShpError {
    fn description(&self) -> &str {
        match *self {
            ShpError::IOError(ref err) => err.description(),
            ShpError::ParseError(ref description) => description,
        }
    }

    fn cause(&self) -> Option<&error::Error> {
        match *self {
            ShpError::IOError(ref err) => Some(err),
            ShpError::ParseError(_) => None,
        }
    }
}

impl fmt::Display for ShpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShpError::IOError(ref err) => err.fmt(f),
            ShpError::ParseError(ref description) => write!(f, "Parse error: {}", description),
        }
    }
}

/// One geometry record: its on-disk header plus the parsed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    pub header: RecordHeader,
    pub content: ShapeContent,
}

impl ShapeRecord {
    pub fn record_number(&self) -> RecordNumber {
        self.header.record_number
    }
}

/// Streams records out of a ".shp" file.
///
/// The header is read and validated once at construction. Iteration ends
/// when the header's declared file length is consumed; records that claim
/// bytes past that length, skip a record number, or contradict their own
/// declared content length are parse errors.
pub struct ShpReader<R: io::Read> {
    file: R,
    header: FileHeader,
    words_read: u64,
    next_record_number: RecordNumber,
}

impl<R: io::Read> ShpReader<R> {
    pub fn new(mut file: R) -> Result<ShpReader<R>, ShpError> {
        let header = FileHeader::read(&mut file)?;
        Ok(ShpReader {
            file: file,
            header: header,
            words_read: HEADER_WORDS,
            next_record_number: RecordNumber::first(),
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    fn read_record(&mut self) -> Result<ShapeRecord, ShpError> {
        let record_header = RecordHeader::read(&mut self.file)?;
        if record_header.record_number != self.next_record_number {
            return Err(ShpError::ParseError(format!(
                "expected {}, got {}", self.next_record_number, record_header.record_number
            )));
        }

        self.words_read += RECORD_HEADER_WORDS + record_header.content_length.value();
        if self.words_read > self.header.file_length.value() {
            return Err(ShpError::ParseError(format!(
                "{} ends at word {}, past the declared file length of {} words",
                record_header.record_number, self.words_read, self.header.file_length.value()
            )));
        }

        let mut buf = vec![ 0u8; record_header.content_length.to_bytes().value() as usize ];
        self.file.read_exact(&mut buf).map_err(ShpError::IOError)?;
        let content = ShapeContent::read(&buf)?;

        if content.content_length()? != record_header.content_length {
            return Err(ShpError::ParseError(format!(
                "{} declares {} content words but its payload spans {}",
                record_header.record_number,
                record_header.content_length.value(),
                content.content_length()?.value()
            )));
        }
        if content.shape_type() != self.header.shape_type && content.shape_type() != ShapeType::NullShape {
            return Err(ShpError::ParseError(format!(
                "{} is a {:?} in a {:?} file",
                record_header.record_number, content.shape_type(), self.header.shape_type
            )));
        }

        self.next_record_number = self.next_record_number.next()
            .map_err(|err| ShpError::ParseError(format!("{}", err)))?;
        Ok(ShapeRecord {
            header: record_header,
            content: content,
        })
    }
}

impl<R: io::Read> fmt::Debug for ShpReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ShpReader")
            .field("header", &self.header)
            .field("words_read", &self.words_read)
            .field("next_record_number", &self.next_record_number)
            .finish()
    }
}

impl<R: io::Read> Iterator for ShpReader<R> {
    type Item = Result<ShapeRecord, ShpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.words_read >= self.header.file_length.value() {
            return None;
        }
        Some(self.read_record())
    }
}

/// Opens a ".shp" file.
pub fn open(path: &Path) -> Result<ShpReader<io::BufReader<fs::File>>, ShpError> {
    match fs::File::open(path) {
        Err(err) => Err(ShpError::IOError(err)),
        Ok(f) => ShpReader::new(io::BufReader::new(f)),
    }
}

/// Streams records into a ".shp" file, accumulating the index entries a
/// ".shx" file needs.
///
/// The header goes out once at construction, so the total file length is
/// fixed up front. `write_shape` assigns record numbers in order, starting
/// at 1, and computes each record's content length from its payload; the
/// same value goes into the record header and the returned index entry.
/// `finish` fails unless the records written fill the declared file length
/// exactly.
pub struct ShpWriter<W: io::Write> {
    file: W,
    header: FileHeader,
    next_offset: WordOffset,
    index: Vec<IndexRecord>,
}

impl<W: io::Write> ShpWriter<W> {
    pub fn new(mut file: W, header: FileHeader) -> Result<ShpWriter<W>, ShpError> {
        header.write(&mut file)?;
        let next_offset = WordOffset::new(HEADER_WORDS)
            .map_err(|err| ShpError::ParseError(format!("{}", err)))?;
        Ok(ShpWriter {
            file: file,
            header: header,
            next_offset: next_offset,
            index: Vec::new(),
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn n_records_written(&self) -> RecordCount {
        RecordCount::new(self.index.len() as u32)
    }

    /// Writes one record and returns its index entry. Every non-null shape
    /// must match the header's shape type.
    pub fn write_shape(&mut self, content: &ShapeContent) -> Result<IndexRecord, ShpError> {
        if content.shape_type() != self.header.shape_type && content.shape_type() != ShapeType::NullShape {
            return Err(ShpError::ParseError(format!(
                "cannot write a {:?} into a {:?} file",
                content.shape_type(), self.header.shape_type
            )));
        }

        let content_length = content.content_length()?;
        let record_number = RecordNumber::new(self.index.len() as u64 + 1)
            .map_err(|err| ShpError::ParseError(format!("{}", err)))?;

        let end_offset = self.next_offset
            .plus(content_length)
            .and_then(|o| o.plus(WordLength::new(RECORD_HEADER_WORDS)?))
            .map_err(|err| ShpError::ParseError(format!("{}", err)))?;
        if end_offset.value() > self.header.file_length.value() {
            return Err(ShpError::ParseError(format!(
                "{} would end at word {}, past the declared file length of {} words",
                record_number, end_offset.value(), self.header.file_length.value()
            )));
        }

        RecordHeader {
            record_number: record_number,
            content_length: content_length,
        }.write(&mut self.file)?;
        content.write(&mut self.file)?;

        let entry = IndexRecord {
            offset: self.next_offset,
            content_length: content_length,
        };
        self.index.push(entry);
        self.next_offset = end_offset;
        Ok(entry)
    }

    /// Flushes and hands back the sink plus every index entry written, in
    /// record order. Fails if the records do not fill the declared file
    /// length.
    pub fn finish(mut self) -> Result<(W, Box<[IndexRecord]>), ShpError> {
        if self.next_offset.value() != self.header.file_length.value() {
            return Err(ShpError::ParseError(format!(
                "the header declares {} words but {} were written",
                self.header.file_length.value(), self.next_offset.value()
            )));
        }
        self.file.flush().map_err(ShpError::IOError)?;
        Ok((self.file, self.index.into_boxed_slice()))
    }
}

impl<W: io::Write> fmt::Debug for ShpWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ShpWriter")
            .field("header", &self.header)
            .field("next_offset", &self.next_offset)
            .field("n_records_written", &self.index.len())
            .finish()
    }
}
