//! Endian read/write helpers for the mixed framing both formats use.
//!
//! Shapefiles store their file code, lengths and record headers big-endian
//! but everything else little-endian; dBase files are little-endian
//! throughout. These helpers keep that knowledge in one place and are
//! independent of host byte order (they go through the `byteorder` crate).
//!
//! The shapefile "measure" axis has one extra wrinkle: the format has no NaN
//! convention, so any value below -10^38 means "no measure data". We decode
//! that sentinel to NaN and encode NaN back to the sentinel.

use std::io;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

/// Values below this threshold on the M axis mean "no data".
pub const MEASURE_NO_DATA_THRESHOLD: f64 = -1e38;

/// The sentinel we write for a missing measure.
pub const MEASURE_NO_DATA: f64 = -10e39;

pub fn read_i32_be<R: io::Read>(r: &mut R) -> io::Result<i32> {
    r.read_i32::<BigEndian>()
}

pub fn read_i32_le<R: io::Read>(r: &mut R) -> io::Result<i32> {
    r.read_i32::<LittleEndian>()
}

pub fn read_f64_le<R: io::Read>(r: &mut R) -> io::Result<f64> {
    r.read_f64::<LittleEndian>()
}

pub fn write_i32_be<W: io::Write>(w: &mut W, value: i32) -> io::Result<()> {
    w.write_i32::<BigEndian>(value)
}

pub fn write_i32_le<W: io::Write>(w: &mut W, value: i32) -> io::Result<()> {
    w.write_i32::<LittleEndian>(value)
}

pub fn write_f64_le<W: io::Write>(w: &mut W, value: f64) -> io::Result<()> {
    w.write_f64::<LittleEndian>(value)
}

/// Slice variants, for parsers that work over an already-read record buffer.
pub fn i32_le(buf: &[u8]) -> i32 {
    LittleEndian::read_i32(buf)
}

pub fn u32_le(buf: &[u8]) -> u32 {
    LittleEndian::read_u32(buf)
}

pub fn f64_le(buf: &[u8]) -> f64 {
    LittleEndian::read_f64(buf)
}

/// Maps the on-disk M-axis representation to NaN when it is the "no data"
/// sentinel.
pub fn measure_from_f64(value: f64) -> f64 {
    if value < MEASURE_NO_DATA_THRESHOLD {
        ::std::f64::NAN
    } else {
        value
    }
}

/// Maps NaN back to the on-disk "no data" sentinel.
pub fn measure_to_f64(value: f64) -> f64 {
    if value.is_nan() {
        MEASURE_NO_DATA
    } else {
        value
    }
}

pub fn read_measure_le<R: io::Read>(r: &mut R) -> io::Result<f64> {
    read_f64_le(r).map(measure_from_f64)
}

pub fn write_measure_le<W: io::Write>(w: &mut W, value: f64) -> io::Result<()> {
    write_f64_le(w, measure_to_f64(value))
}

pub fn measure_le(buf: &[u8]) -> f64 {
    measure_from_f64(f64_le(buf))
}
