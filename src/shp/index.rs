//! The index file: a copy of the main-file header, then one fixed-width
//! entry per record giving the record's word offset and content length.
//! Entry N lets a reader seek straight to record N without scanning.

use std::fmt;
use std::io;
use byteorder::{BigEndian, ByteOrder};
use units::{RecordCount, WordLength, WordOffset};
use endian;
use super::ShpError;
use super::header::{FileHeader, HEADER_WORDS, INDEX_RECORD_WORDS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexRecord {
    /// Word offset of the record's header in the main file.
    pub offset: WordOffset,
    /// Content length of the record, excluding its 4-word header.
    pub content_length: WordLength,
}

impl IndexRecord {
    pub fn read<R: io::Read>(r: &mut R) -> Result<IndexRecord, ShpError> {
        let mut buf = [ 0u8; 8 ];
        r.read_exact(&mut buf).map_err(ShpError::IOError)?;

        let offset = WordOffset::new(BigEndian::read_i32(&buf[0..4]) as i64 as u64)
            .map_err(|err| ShpError::ParseError(format!("invalid index offset: {}", err)))?;
        let content_length = WordLength::new(BigEndian::read_i32(&buf[4..8]) as i64 as u64)
            .map_err(|err| ShpError::ParseError(format!("invalid index content length: {}", err)))?;

        Ok(IndexRecord {
            offset: offset,
            content_length: content_length,
        })
    }

    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<(), ShpError> {
        endian::write_i32_be(w, self.offset.value() as i32).map_err(ShpError::IOError)?;
        endian::write_i32_be(w, self.content_length.value() as i32).map_err(ShpError::IOError)
    }
}

impl fmt::Display for IndexRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} words at word {}", self.content_length.value(), self.offset.value())
    }
}

/// Streams index entries. The entry count comes from the header's file
/// length, so a truncated file fails instead of ending early.
pub struct IndexReader<R> {
    file: R,
    header: FileHeader,
    n_records: u64,
    n_records_already_iterated: u64,
}

impl<R: io::Read> IndexReader<R> {
    pub fn new(mut file: R) -> Result<IndexReader<R>, ShpError> {
        let header = FileHeader::read(&mut file)?;
        let record_words = header.file_length.value() - HEADER_WORDS;
        if record_words % INDEX_RECORD_WORDS != 0 {
            return Err(ShpError::ParseError(format!(
                "an index file holds {}-word entries, but this one has {} words of entries",
                INDEX_RECORD_WORDS, record_words
            )));
        }
        Ok(IndexReader {
            file: file,
            header: header,
            n_records: record_words / INDEX_RECORD_WORDS,
            n_records_already_iterated: 0,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn n_records(&self) -> u64 {
        self.n_records
    }
}

impl<R: io::Read> Iterator for IndexReader<R> {
    type Item = Result<IndexRecord, ShpError>;

    fn next(&mut self) -> Option<Result<IndexRecord, ShpError>> {
        if self.n_records_already_iterated == self.n_records {
            return None;
        }
        self.n_records_already_iterated += 1;
        Some(IndexRecord::read(&mut self.file))
    }
}

impl<R> fmt::Debug for IndexReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IndexReader {{ header: {:?}, {}/{} records }}",
            self.header, self.n_records_already_iterated, self.n_records
        )
    }
}

/// Writes an index file whose entry count was fixed at construction. Entries
/// normally come from `ShpWriter::write_shape`.
pub struct IndexWriter<W> {
    file: W,
    n_records: u64,
    n_records_written: u64,
}

impl<W: io::Write> IndexWriter<W> {
    /// Writes the index header immediately. `header` must be the main
    /// file's header; the entry count fixes this file's length.
    pub fn new(mut file: W, header: &FileHeader, n_records: RecordCount) -> Result<IndexWriter<W>, ShpError> {
        let index_header = header.for_index(n_records)?;
        index_header.write(&mut file)?;
        Ok(IndexWriter {
            file: file,
            n_records: n_records.value() as u64,
            n_records_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &IndexRecord) -> Result<(), ShpError> {
        if self.n_records_written == self.n_records {
            return Err(ShpError::ParseError(format!(
                "the index header declares {} records; cannot write another", self.n_records
            )));
        }
        record.write(&mut self.file)?;
        self.n_records_written += 1;
        Ok(())
    }

    /// Flushes and hands the underlying writer back. Fails if fewer entries
    /// were written than the header declares.
    pub fn finish(mut self) -> Result<W, ShpError> {
        if self.n_records_written != self.n_records {
            return Err(ShpError::ParseError(format!(
                "the index header declares {} records but only {} were written",
                self.n_records, self.n_records_written
            )));
        }
        self.file.flush().map_err(ShpError::IOError)?;
        Ok(self.file)
    }
}

impl<W> fmt::Debug for IndexWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IndexWriter {{ {}/{} records }}", self.n_records_written, self.n_records)
    }
}
