//! Reads and writes dBase III ".dbf" attribute tables, as per
//! https://www.clicketyclick.dk/databases/xbase/format/dbf.html
//!
//! A ".dbf" file is the attribute half of a shapefile layer: one fixed-width
//! row per shape, in record order. The header carries the schema; every
//! record is a deleted-flag byte plus one fixed-width value per field; the
//! file ends with a 0x1a marker.
//!
//! # Examples
//!
//! Write a table to memory and read it back:
//!
//! ```
//! # extern crate chrono;
//! # extern crate shapecodec;
//! # fn main() {
//! use std::io::Cursor;
//! use chrono::NaiveDate;
//! use shapecodec::dbf;
//! use shapecodec::dbf::{DbfReader, DbfWriter, FieldValue, Record};
//! use shapecodec::units::{DecimalCount, FieldLength, RecordCount};
//!
//! let schema = dbf::Schema::new(vec![
//!     dbf::Field::character("NAME", FieldLength::new(10).unwrap()).unwrap(),
//!     dbf::Field::number("AGE", FieldLength::new(3).unwrap(), DecimalCount::new(0).unwrap()).unwrap(),
//! ]).unwrap();
//! let header = dbf::FileHeader::new(
//!     NaiveDate::from_ymd(2024, 6, 1),
//!     dbf::CodePage::WINDOWS_1252,
//!     RecordCount::new(1),
//!     schema.clone(),
//! ).unwrap();
//!
//! let record = Record::new(&schema, vec![
//!     FieldValue::character(&schema.fields()[0], "Alice").unwrap(),
//!     FieldValue::number(&schema.fields()[1], 30.).unwrap(),
//! ]).unwrap();
//!
//! let mut writer = DbfWriter::new(Vec::new(), header).unwrap();
//! writer.write_record(&record).unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let mut reader = DbfReader::new(Cursor::new(bytes)).unwrap();
//! assert_eq!(record, reader.next().unwrap().unwrap());
//! assert!(reader.next().is_none());
//! # }
//! ```

use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use encoding::EncodingRef;
use units::RecordCount;

pub mod codepage;
pub mod field;
pub mod value;
pub mod header;
pub mod record;

pub use self::codepage::CodePage;
pub use self::field::{Field, FieldType, Schema};
pub use self::value::FieldValue;
pub use self::header::FileHeader;
pub use self::record::Record;

#[derive(Debug)]
pub enum DbfError {
    IOError(io::Error),
    /// The bytes are not a valid dBase III file. Always fatal.
    ParseError(String),
    /// A value does not fit its field, or an argument is inconsistent.
    /// Raised before any bytes are emitted.
    ValueError(String),
}

impl error::Error for DbfError {
    fn description(&self) -> &str {
        match *self {
            DbfError::IOError(ref err) => err.description(),
            DbfError::ParseError(ref description) => description,
            DbfError::ValueError(ref description) => description,
        }
    }

    fn cause(&self) -> Option<&error::Error> {
        match *self {
            DbfError::IOError(ref err) => Some(err),
            DbfError::ParseError(_) => None,
            DbfError::ValueError(_) => None,
        }
    }
}

impl fmt::Display for DbfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DbfError::IOError(ref err) => err.fmt(f),
            DbfError::ParseError(ref description) => write!(f, "Parse error: {}", description),
            DbfError::ValueError(ref description) => write!(f, "Value error: {}", description),
        }
    }
}

/// Streams records out of a ".dbf" file.
///
/// The header is read and validated once at construction. Iteration yields
/// records in file order and stops after the header's declared count; a
/// premature 0x1a marker is a parse error, because the header promised more
/// records.
pub struct DbfReader<R: io::Read> {
    file: R,
    header: FileHeader,
    encoding: EncodingRef,
    n_records_already_iterated: u32,
}

impl<R: io::Read> DbfReader<R> {
    /// Decodes Character fields with the encoding the header's code page
    /// names.
    pub fn new(mut file: R) -> Result<DbfReader<R>, DbfError> {
        let header = FileHeader::read(&mut file)?;
        let encoding = header.code_page.encoding();
        Ok(DbfReader {
            file: file,
            header: header,
            encoding: encoding,
            n_records_already_iterated: 0,
        })
    }

    /// Overrides the header's code page. For files whose driver byte lies,
    /// which is common in the wild.
    pub fn with_encoding(mut file: R, encoding: EncodingRef) -> Result<DbfReader<R>, DbfError> {
        let header = FileHeader::read(&mut file)?;
        Ok(DbfReader {
            file: file,
            header: header,
            encoding: encoding,
            n_records_already_iterated: 0,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn schema(&self) -> &Schema {
        &self.header.schema
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.header.schema.field(name)
    }
}

impl<R: io::Read> fmt::Debug for DbfReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DbfReader")
            .field("header", &self.header)
            .field("encoding", &self.encoding.name())
            .field("n_records_already_iterated", &self.n_records_already_iterated)
            .finish()
    }
}

impl<R: io::Read> Iterator for DbfReader<R> {
    type Item = Result<Record, DbfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.n_records_already_iterated == self.header.n_records.value() {
            return None;
        }
        self.n_records_already_iterated += 1;
        match Record::read(&mut self.file, &self.header.schema, self.encoding) {
            Err(err) => Some(Err(err)),
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => Some(Err(DbfError::ParseError(format!(
                "the file ends after {} of {} declared records",
                self.n_records_already_iterated - 1,
                self.header.n_records.value()
            )))),
        }
    }
}

/// Opens a ".dbf" file, decoding text per its code-page byte.
pub fn open(path: &Path) -> Result<DbfReader<io::BufReader<fs::File>>, DbfError> {
    match fs::File::open(path) {
        Err(err) => Err(DbfError::IOError(err)),
        Ok(f) => DbfReader::new(io::BufReader::new(f)),
    }
}

/// Opens a ".dbf" file with an explicit text encoding.
pub fn open_with_encoding(path: &Path, encoding: EncodingRef) -> Result<DbfReader<io::BufReader<fs::File>>, DbfError> {
    match fs::File::open(path) {
        Err(err) => Err(DbfError::IOError(err)),
        Ok(f) => DbfReader::with_encoding(io::BufReader::new(f), encoding),
    }
}

/// Streams records into a ".dbf" file.
///
/// The header goes out once at construction, so the record count is fixed up
/// front: writing more records than declared fails, and `finish` fails if
/// fewer arrived. `finish` consumes the writer, emits the 0x1a end marker,
/// flushes, and hands the sink back.
pub struct DbfWriter<W: io::Write> {
    file: W,
    header: FileHeader,
    encoding: EncodingRef,
    n_records_written: u32,
}

impl<W: io::Write> DbfWriter<W> {
    pub fn new(mut file: W, header: FileHeader) -> Result<DbfWriter<W>, DbfError> {
        header.write(&mut file)?;
        let encoding = header.code_page.encoding();
        Ok(DbfWriter {
            file: file,
            header: header,
            encoding: encoding,
            n_records_written: 0,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn n_records_written(&self) -> RecordCount {
        RecordCount::new(self.n_records_written)
    }

    pub fn write_record(&mut self, record: &Record) -> Result<(), DbfError> {
        if self.n_records_written == self.header.n_records.value() {
            return Err(DbfError::ValueError(format!(
                "the header declares {}; record {} does not fit",
                self.header.n_records, self.n_records_written + 1
            )));
        }
        record.write(&mut self.file, &self.header.schema, self.encoding)?;
        self.n_records_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, DbfError> {
        if self.n_records_written != self.header.n_records.value() {
            return Err(DbfError::ValueError(format!(
                "the header declares {} but only {} were written",
                self.header.n_records, self.n_records_written
            )));
        }
        self.file.write_all(&[ record::END_OF_FILE ]).map_err(DbfError::IOError)?;
        self.file.flush().map_err(DbfError::IOError)?;
        Ok(self.file)
    }
}

impl<W: io::Write> fmt::Debug for DbfWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DbfWriter")
            .field("header", &self.header)
            .field("encoding", &self.encoding.name())
            .field("n_records_written", &self.n_records_written)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use chrono::NaiveDate;
    use units::{DecimalCount, FieldLength, RecordCount};
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::character("NAME", FieldLength::new(10).unwrap()).unwrap(),
            Field::number("AGE", FieldLength::new(3).unwrap(), DecimalCount::new(0).unwrap()).unwrap(),
        ]).unwrap()
    }

    fn header(n_records: u32) -> FileHeader {
        FileHeader::new(
            NaiveDate::from_ymd(2024, 6, 1),
            CodePage::WINDOWS_1252,
            RecordCount::new(n_records),
            schema(),
        ).unwrap()
    }

    fn alice(schema: &Schema) -> Record {
        Record::new(schema, vec![
            FieldValue::character(&schema.fields()[0], "Alice").unwrap(),
            FieldValue::number(&schema.fields()[1], 30.).unwrap(),
        ]).unwrap()
    }

    #[test]
    fn end_to_end_alice() {
        let header = header(1);
        let record = alice(&header.schema);

        let mut writer = DbfWriter::new(Vec::new(), header.clone()).unwrap();
        writer.write_record(&record).unwrap();
        let bytes = writer.finish().unwrap();

        // header + one 14-byte record + end marker
        assert_eq!(header.header_length() + 14 + 1, bytes.len());
        assert_eq!(0x1a, *bytes.last().unwrap());

        let mut reader = DbfReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(&header, reader.header());
        let parsed = reader.next().unwrap().unwrap();
        assert!(!parsed.deleted);
        assert_eq!(
            &FieldValue::Character(Some(String::from("Alice"))),
            parsed.value(reader.schema(), "NAME").unwrap()
        );
        assert_eq!(
            &FieldValue::Number(Some(30.)),
            parsed.value(reader.schema(), "AGE").unwrap()
        );
        assert!(reader.next().is_none());
    }

    #[test]
    fn round_trip_multiple_records_with_nulls() {
        let header = header(3);
        let schema = header.schema.clone();
        let records = vec![
            alice(&schema),
            Record::with_deleted(&schema, vec![
                FieldValue::character(&schema.fields()[0], "Bob").unwrap(),
                FieldValue::Number(None),
            ], true).unwrap(),
            Record::new(&schema, vec![
                FieldValue::Character(None),
                FieldValue::number(&schema.fields()[1], 7.).unwrap(),
            ]).unwrap(),
        ];

        let mut writer = DbfWriter::new(Vec::new(), header).unwrap();
        for record in records.iter() {
            writer.write_record(record).unwrap();
        }
        let bytes = writer.finish().unwrap();

        let reader = DbfReader::new(Cursor::new(bytes)).unwrap();
        let parsed: Vec<Record> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records, parsed);
    }

    #[test]
    fn writer_rejects_extra_records() {
        let header = header(1);
        let record = alice(&header.schema);
        let mut writer = DbfWriter::new(Vec::new(), header).unwrap();
        writer.write_record(&record).unwrap();
        assert!(writer.write_record(&record).is_err());
    }

    #[test]
    fn finish_rejects_missing_records() {
        let header = header(2);
        let record = alice(&header.schema);
        let mut writer = DbfWriter::new(Vec::new(), header).unwrap();
        writer.write_record(&record).unwrap();
        assert!(writer.finish().is_err());
    }

    #[test]
    fn premature_end_marker_is_fatal() {
        let header = header(2);
        let record = alice(&header.schema);
        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        record.write(&mut bytes, &header.schema, header.code_page.encoding()).unwrap();
        bytes.push(0x1a); // one record short

        let mut reader = DbfReader::new(Cursor::new(bytes)).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
    }
}
