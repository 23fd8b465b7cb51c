//! Measurement newtypes for the two file formats.
//!
//! Shapefiles count in 16-bit words, dBase files count in bytes, and both
//! store lengths and offsets as fixed-range integers. Mixing those up is the
//! classic way to corrupt a file, so every quantity gets its own type and
//! every cross-unit move is an explicit, checked conversion (1 word = 2
//! bytes). Constructors validate their domain, and arithmetic re-validates
//! through the same constructor, so an out-of-range or odd intermediate value
//! cannot exist.

use std::error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum UnitError {
    OutOfRange(String),
    Parity(String),
}

impl error::Error for UnitError {
    fn description(&self) -> &str {
        match *self {
            UnitError::OutOfRange(ref description) => description,
            UnitError::Parity(ref description) => description,
        }
    }
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            UnitError::OutOfRange(ref description) => write!(f, "Out of range: {}", description),
            UnitError::Parity(ref description) => write!(f, "Parity error: {}", description),
        }
    }
}

/// Largest value a big-endian int32 length/offset field can store.
const INT32_MAX: u64 = 0x7fff_ffff;

/// A length in bytes. Always even, because every shapefile structure is
/// measured in 16-bit words and byte lengths must convert exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteLength(u64);

impl ByteLength {
    pub fn new(bytes: u64) -> Result<ByteLength, UnitError> {
        if bytes % 2 != 0 {
            Err(UnitError::Parity(format!("ByteLength must be even, got {}", bytes)))
        } else {
            Ok(ByteLength(bytes))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn to_words(&self) -> Result<WordLength, UnitError> {
        WordLength::new(self.0 / 2)
    }

    pub fn plus(&self, other: ByteLength) -> Result<ByteLength, UnitError> {
        match self.0.checked_add(other.0) {
            Some(sum) => ByteLength::new(sum),
            None => Err(UnitError::OutOfRange(format!("ByteLength {} + {} overflows", self.0, other.0))),
        }
    }

    pub fn minus(&self, other: ByteLength) -> Result<ByteLength, UnitError> {
        match self.0.checked_sub(other.0) {
            Some(diff) => ByteLength::new(diff),
            None => Err(UnitError::OutOfRange(format!("ByteLength {} - {} underflows", self.0, other.0))),
        }
    }

    pub fn times(&self, n: u64) -> Result<ByteLength, UnitError> {
        match self.0.checked_mul(n) {
            Some(product) => ByteLength::new(product),
            None => Err(UnitError::OutOfRange(format!("ByteLength {} * {} overflows", self.0, n))),
        }
    }
}

impl fmt::Display for ByteLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// A position in bytes from the start of a file. May be odd: only the
/// conversion to words requires evenness, and it checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteOffset(u64);

impl ByteOffset {
    pub fn new(bytes: u64) -> Result<ByteOffset, UnitError> {
        Ok(ByteOffset(bytes))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn to_words(&self) -> Result<WordOffset, UnitError> {
        if self.0 % 2 != 0 {
            Err(UnitError::Parity(format!("ByteOffset {} is odd and cannot convert to words", self.0)))
        } else {
            WordOffset::new(self.0 / 2)
        }
    }

    pub fn plus(&self, length: ByteLength) -> Result<ByteOffset, UnitError> {
        match self.0.checked_add(length.value()) {
            Some(sum) => ByteOffset::new(sum),
            None => Err(UnitError::OutOfRange(format!("ByteOffset {} + {} overflows", self.0, length.value()))),
        }
    }

    pub fn minus(&self, length: ByteLength) -> Result<ByteOffset, UnitError> {
        match self.0.checked_sub(length.value()) {
            Some(diff) => ByteOffset::new(diff),
            None => Err(UnitError::OutOfRange(format!("ByteOffset {} - {} underflows", self.0, length.value()))),
        }
    }
}

impl fmt::Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "byte {}", self.0)
    }
}

/// A length in 16-bit words, as stored in shapefile headers. Bounded to the
/// int32 range the file format stores it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WordLength(u64);

impl WordLength {
    pub fn new(words: u64) -> Result<WordLength, UnitError> {
        if words > INT32_MAX {
            Err(UnitError::OutOfRange(format!("WordLength {} exceeds the int32 range", words)))
        } else {
            Ok(WordLength(words))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Words to bytes is always exact.
    pub fn to_bytes(&self) -> ByteLength {
        ByteLength(self.0 * 2)
    }

    pub fn plus(&self, other: WordLength) -> Result<WordLength, UnitError> {
        WordLength::new(self.0 + other.0)
    }

    pub fn minus(&self, other: WordLength) -> Result<WordLength, UnitError> {
        match self.0.checked_sub(other.0) {
            Some(diff) => WordLength::new(diff),
            None => Err(UnitError::OutOfRange(format!("WordLength {} - {} underflows", self.0, other.0))),
        }
    }

    pub fn times(&self, n: u64) -> Result<WordLength, UnitError> {
        match self.0.checked_mul(n) {
            Some(product) => WordLength::new(product),
            None => Err(UnitError::OutOfRange(format!("WordLength {} * {} overflows", self.0, n))),
        }
    }
}

impl fmt::Display for WordLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} words", self.0)
    }
}

/// A position in 16-bit words from the start of a file, as stored in ".shx"
/// index entries. Bounded to the int32 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WordOffset(u64);

impl WordOffset {
    pub fn new(words: u64) -> Result<WordOffset, UnitError> {
        if words > INT32_MAX {
            Err(UnitError::OutOfRange(format!("WordOffset {} exceeds the int32 range", words)))
        } else {
            Ok(WordOffset(words))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn to_bytes(&self) -> ByteOffset {
        ByteOffset(self.0 * 2)
    }

    pub fn plus(&self, length: WordLength) -> Result<WordOffset, UnitError> {
        WordOffset::new(self.0 + length.value())
    }

    pub fn minus(&self, length: WordLength) -> Result<WordOffset, UnitError> {
        match self.0.checked_sub(length.value()) {
            Some(diff) => WordOffset::new(diff),
            None => Err(UnitError::OutOfRange(format!("WordOffset {} - {} underflows", self.0, length.value()))),
        }
    }
}

impl fmt::Display for WordOffset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "word {}", self.0)
    }
}

/// A 1-based shapefile record number, stored big-endian in every record
/// header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordNumber(u64);

impl RecordNumber {
    pub fn new(number: u64) -> Result<RecordNumber, UnitError> {
        if number < 1 {
            Err(UnitError::OutOfRange(String::from("RecordNumber must be >= 1")))
        } else if number > INT32_MAX {
            Err(UnitError::OutOfRange(format!("RecordNumber {} exceeds the int32 range", number)))
        } else {
            Ok(RecordNumber(number))
        }
    }

    pub fn first() -> RecordNumber {
        RecordNumber(1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Result<RecordNumber, UnitError> {
        RecordNumber::new(self.0 + 1)
    }
}

impl fmt::Display for RecordNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "record {}", self.0)
    }
}

/// A dBase field width in bytes. One descriptor byte on disk, and the format
/// reserves 255 (0xff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FieldLength(u8);

impl FieldLength {
    pub fn new(length: u8) -> Result<FieldLength, UnitError> {
        if length > 254 {
            Err(UnitError::OutOfRange(format!("FieldLength must be <= 254, got {}", length)))
        } else {
            Ok(FieldLength(length))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digits to the right of the decimal point in a numeric dBase field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DecimalCount(u8);

impl DecimalCount {
    pub fn new(count: u8) -> Result<DecimalCount, UnitError> {
        if count > 254 {
            Err(UnitError::OutOfRange(format!("DecimalCount must be <= 254, got {}", count)))
        } else {
            Ok(DecimalCount(count))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DecimalCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digits a numeric field can hold to the left of the decimal point.
///
/// Derived from a field's length and decimal count: the decimal point itself
/// costs one byte when the decimal count is nonzero, and at least one integer
/// digit must remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IntegerDigits(u8);

impl IntegerDigits {
    pub fn new(digits: u8) -> Result<IntegerDigits, UnitError> {
        if digits < 1 {
            Err(UnitError::OutOfRange(String::from("IntegerDigits must be >= 1")))
        } else {
            Ok(IntegerDigits(digits))
        }
    }

    pub fn for_field(length: FieldLength, decimal_count: DecimalCount) -> Result<IntegerDigits, UnitError> {
        let spent = if decimal_count.value() > 0 { decimal_count.value() as u16 + 1 } else { 0 };
        let length = length.value() as u16;
        if length <= spent {
            Err(UnitError::OutOfRange(format!(
                "a field of length {} with {} decimals leaves no room for integer digits",
                length, decimal_count.value()
            )))
        } else {
            IntegerDigits::new((length - spent) as u8)
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for IntegerDigits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Total bytes in one dBase record: the deleted-flag byte plus every field.
/// Two bytes on disk, and never zero because the flag byte is always there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordLength(u16);

impl RecordLength {
    pub fn new(bytes: u16) -> Result<RecordLength, UnitError> {
        if bytes < 1 {
            Err(UnitError::OutOfRange(String::from("RecordLength must be >= 1")))
        } else {
            Ok(RecordLength(bytes))
        }
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RecordLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// Number of records a dBase header declares. Four bytes on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordCount(u32);

impl RecordCount {
    pub fn new(records: u32) -> RecordCount {
        RecordCount(records)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RecordCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} records", self.0)
    }
}

/// A non-negative, finite comparison tolerance for coordinate equality.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tolerance(f64);

impl Tolerance {
    pub fn new(tolerance: f64) -> Result<Tolerance, UnitError> {
        if !tolerance.is_finite() || tolerance < 0. {
            Err(UnitError::OutOfRange(format!("Tolerance must be finite and >= 0, got {}", tolerance)))
        } else {
            Ok(Tolerance(tolerance))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
