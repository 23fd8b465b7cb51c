//! Joins a ".shp" geometry file with its ".dbf" attribute table: one
//! logical layer, one record per shape.
//!
//! The two files are parallel arrays. Record N of the ".shp" file and
//! record N of the ".dbf" file describe the same feature, so this module
//! iterates them in lockstep and fails loudly when their lengths disagree.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use shapecodec::shapefile;
//!
//! let reader = shapefile::open(Path::new("cities.shp")).unwrap();
//! for record in reader {
//!     let record = record.unwrap();
//!     println!("{:?}", record.shape.content);
//! }
//! ```

use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use encoding::EncodingRef;
use encoding::all::{ASCII, UTF_8, WINDOWS_1252};
use units::RecordCount;
use dbf;
use dbf::{DbfReader, DbfWriter, DbfError};
use shp;
use shp::{IndexRecord, IndexWriter, ShapeContent, ShapeRecord, ShpError, ShpReader, ShpWriter};

#[derive(Debug)]
pub enum ShapefileError {
    ShpError(ShpError),
    DbfError(DbfError),
    /// The ".shp" and ".dbf" files disagree about how many records the
    /// layer has.
    JoinError(String),
}

impl error::Error for ShapefileError {
    fn description(&self) -> &str {
        match *self {
            ShapefileError::ShpError(ref err) => err.description(),
            ShapefileError::DbfError(ref err) => err.description(),
            ShapefileError::JoinError(ref description) => description,
        }
    }

    fn cause(&self) -> Option<&error::Error> {
        match *self {
            ShapefileError::ShpError(ref err) => Some(err),
            ShapefileError::DbfError(ref err) => Some(err),
            ShapefileError::JoinError(_) => None,
        }
    }
}

impl fmt::Display for ShapefileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShapefileError::ShpError(ref err) => err.fmt(f),
            ShapefileError::DbfError(ref err) => err.fmt(f),
            ShapefileError::JoinError(ref description) => write!(f, "Join error: {}", description),
        }
    }
}

/// One feature: a shape and its attribute row.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapefileRecord {
    pub shape: ShapeRecord,
    pub attributes: dbf::Record,
}

impl ShapefileRecord {
    /// Looks up an attribute by field name.
    pub fn attribute<'a>(&'a self, schema: &dbf::Schema, name: &str) -> Option<&'a dbf::FieldValue> {
        self.attributes.value(schema, name)
    }
}

/// Iterates a geometry file and its attribute table in lockstep.
pub struct ShapefileReader<R: io::Read, S: io::Read> {
    shp: ShpReader<R>,
    dbf: DbfReader<S>,
}

impl<R: io::Read, S: io::Read> ShapefileReader<R, S> {
    pub fn new(shp_file: R, dbf_file: S) -> Result<ShapefileReader<R, S>, ShapefileError> {
        let shp = ShpReader::new(shp_file).map_err(ShapefileError::ShpError)?;
        let dbf = DbfReader::new(dbf_file).map_err(ShapefileError::DbfError)?;
        Ok(ShapefileReader { shp: shp, dbf: dbf })
    }

    pub fn with_encoding(shp_file: R, dbf_file: S, encoding: EncodingRef) -> Result<ShapefileReader<R, S>, ShapefileError> {
        let shp = ShpReader::new(shp_file).map_err(ShapefileError::ShpError)?;
        let dbf = DbfReader::with_encoding(dbf_file, encoding).map_err(ShapefileError::DbfError)?;
        Ok(ShapefileReader { shp: shp, dbf: dbf })
    }

    pub fn shp_header(&self) -> &shp::FileHeader {
        self.shp.header()
    }

    pub fn dbf_header(&self) -> &dbf::FileHeader {
        self.dbf.header()
    }

    pub fn schema(&self) -> &dbf::Schema {
        self.dbf.schema()
    }

    pub fn field(&self, name: &str) -> Option<&dbf::Field> {
        self.dbf.field(name)
    }
}

impl<R: io::Read, S: io::Read> fmt::Debug for ShapefileReader<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ShapefileReader")
            .field("shp", &self.shp)
            .field("dbf", &self.dbf)
            .finish()
    }
}

impl<R: io::Read, S: io::Read> Iterator for ShapefileReader<R, S> {
    type Item = Result<ShapefileRecord, ShapefileError>;

    fn next(&mut self) -> Option<Self::Item> {
        match (self.shp.next(), self.dbf.next()) {
            (None, None) => None,
            (Some(Err(err)), _) => Some(Err(ShapefileError::ShpError(err))),
            (_, Some(Err(err))) => Some(Err(ShapefileError::DbfError(err))),
            (Some(Ok(shape)), Some(Ok(attributes))) => Some(Ok(ShapefileRecord {
                shape: shape,
                attributes: attributes,
            })),
            (Some(Ok(shape)), None) => Some(Err(ShapefileError::JoinError(format!(
                "the geometry file has {} but the attribute table has no more records",
                shape.record_number()
            )))),
            (None, Some(Ok(_))) => Some(Err(ShapefileError::JoinError(String::from(
                "the attribute table has more records than the geometry file"
            )))),
        }
    }
}

type FileReader = ShapefileReader<io::BufReader<fs::File>, io::BufReader<fs::File>>;

fn open_files(shp_path: &Path) -> Result<(io::BufReader<fs::File>, io::BufReader<fs::File>), ShapefileError> {
    let shp_file = fs::File::open(shp_path)
        .map_err(|err| ShapefileError::ShpError(ShpError::IOError(err)))?;
    let dbf_file = fs::File::open(shp_path.with_extension("dbf"))
        .map_err(|err| ShapefileError::DbfError(DbfError::IOError(err)))?;
    Ok((io::BufReader::new(shp_file), io::BufReader::new(dbf_file)))
}

/// Opens a layer by its ".shp" path; the ".dbf" must sit beside it. Text
/// decodes per the ".dbf" header's code-page byte.
pub fn open(shp_path: &Path) -> Result<FileReader, ShapefileError> {
    let (shp_file, dbf_file) = open_files(shp_path)?;
    ShapefileReader::new(shp_file, dbf_file)
}

/// Opens a layer with an explicit attribute-text encoding, ignoring the
/// code-page byte.
pub fn open_with_encoding(shp_path: &Path, encoding: EncodingRef) -> Result<FileReader, ShapefileError> {
    let (shp_file, dbf_file) = open_files(shp_path)?;
    ShapefileReader::with_encoding(shp_file, dbf_file, encoding)
}

pub fn open_ascii(shp_path: &Path) -> Result<FileReader, ShapefileError> {
    open_with_encoding(shp_path, ASCII as EncodingRef)
}

pub fn open_utf8(shp_path: &Path) -> Result<FileReader, ShapefileError> {
    open_with_encoding(shp_path, UTF_8 as EncodingRef)
}

pub fn open_windows1252(shp_path: &Path) -> Result<FileReader, ShapefileError> {
    open_with_encoding(shp_path, WINDOWS_1252 as EncodingRef)
}

/// Writes a layer's three files in lockstep: ".shp" records, their ".shx"
/// index entries, and ".dbf" attribute rows.
///
/// Both headers go out at construction, so the record count and file length
/// are fixed up front. The ".dbf" header's record count drives the index
/// file's length; `finish` fails unless every declared record arrived.
pub struct ShapefileWriter<W: io::Write, X: io::Write, D: io::Write> {
    shp: ShpWriter<W>,
    shx: IndexWriter<X>,
    dbf: DbfWriter<D>,
}

impl<W: io::Write, X: io::Write, D: io::Write> ShapefileWriter<W, X, D> {
    pub fn new(
        shp_sink: W,
        shx_sink: X,
        dbf_sink: D,
        shp_header: shp::FileHeader,
        dbf_header: dbf::FileHeader,
    ) -> Result<ShapefileWriter<W, X, D>, ShapefileError> {
        let n_records = dbf_header.n_records;
        let shx = IndexWriter::new(shx_sink, &shp_header, n_records)
            .map_err(ShapefileError::ShpError)?;
        let shp = ShpWriter::new(shp_sink, shp_header).map_err(ShapefileError::ShpError)?;
        let dbf = DbfWriter::new(dbf_sink, dbf_header).map_err(ShapefileError::DbfError)?;
        Ok(ShapefileWriter { shp: shp, shx: shx, dbf: dbf })
    }

    pub fn schema(&self) -> &dbf::Schema {
        &self.dbf.header().schema
    }

    pub fn n_records_written(&self) -> RecordCount {
        self.shp.n_records_written()
    }

    /// Writes one feature across all three files.
    pub fn write_record(&mut self, shape: &ShapeContent, attributes: &dbf::Record) -> Result<IndexRecord, ShapefileError> {
        let entry = self.shp.write_shape(shape).map_err(ShapefileError::ShpError)?;
        self.shx.write_record(&entry).map_err(ShapefileError::ShpError)?;
        self.dbf.write_record(attributes).map_err(ShapefileError::DbfError)?;
        Ok(entry)
    }

    /// Flushes all three files and hands the sinks back.
    pub fn finish(self) -> Result<(W, X, D), ShapefileError> {
        let (shp_sink, _) = self.shp.finish().map_err(ShapefileError::ShpError)?;
        let shx_sink = self.shx.finish().map_err(ShapefileError::ShpError)?;
        let dbf_sink = self.dbf.finish().map_err(ShapefileError::DbfError)?;
        Ok((shp_sink, shx_sink, dbf_sink))
    }
}

impl<W: io::Write, X: io::Write, D: io::Write> fmt::Debug for ShapefileWriter<W, X, D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ShapefileWriter")
            .field("shp", &self.shp)
            .field("shx", &self.shx)
            .field("dbf", &self.dbf)
            .finish()
    }
}

type FileWriter = ShapefileWriter<io::BufWriter<fs::File>, io::BufWriter<fs::File>, io::BufWriter<fs::File>>;

/// Creates a layer's ".shp", ".shx" and ".dbf" files beside each other,
/// named after `shp_path`.
pub fn create(shp_path: &Path, shp_header: shp::FileHeader, dbf_header: dbf::FileHeader) -> Result<FileWriter, ShapefileError> {
    let shp_sink = fs::File::create(shp_path)
        .map_err(|err| ShapefileError::ShpError(ShpError::IOError(err)))?;
    let shx_sink = fs::File::create(shp_path.with_extension("shx"))
        .map_err(|err| ShapefileError::ShpError(ShpError::IOError(err)))?;
    let dbf_sink = fs::File::create(shp_path.with_extension("dbf"))
        .map_err(|err| ShapefileError::DbfError(DbfError::IOError(err)))?;
    ShapefileWriter::new(
        io::BufWriter::new(shp_sink),
        io::BufWriter::new(shx_sink),
        io::BufWriter::new(dbf_sink),
        shp_header,
        dbf_header,
    )
}
