//! Typed dBase field values and their fixed-width binary codec.
//!
//! One closed union covers every field kind the format knows, so encode and
//! decode are exhaustive matches rather than an open class hierarchy.
//! Nullability is `Option`: a field whose stored bytes start with NUL decodes
//! to `None` for every kind, and `None` encodes back to NUL fill (Logical
//! excepted, whose unknown value is `?` on disk).
//!
//! The codec is loud about data loss. A value whose formatted width exceeds
//! its field's declared length is rejected at construction or write time with
//! an error naming the field, the value and the length; nothing is ever
//! silently clipped. The one deliberate soft spot is decoding: legacy files
//! carry blank or garbage text in numeric and date fields, so unparsable
//! *content* degrades to `None` instead of failing the read.

use std::fmt;
use std::io;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use encoding::{DecoderTrap, EncoderTrap, EncodingRef};
use regex::Regex;
use super::DbfError;
use super::field::{Field, FieldType, DATE_TIME_LENGTH};

lazy_static! {
    /// Locale-invariant numeric field text: optional sign, digits, at most
    /// one `.` separator. Leading spaces are the format's left padding.
    static ref NUMERIC_RE: Regex = Regex::new(r"^ *-?(\d+(\.\d*)?|\.\d+)$").unwrap();
}

pub const DATE_FORMAT: &'static str = "%Y%m%d";
pub const DATE_TIME_FORMAT: &'static str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Character(Option<String>),
    Date(Option<NaiveDate>),
    DateTime(Option<NaiveDateTime>),
    Number(Option<f64>),
    Float(Option<f32>),
    Logical(Option<bool>),
}

/// Truncates (decimal count 0) or rounds the value to the field's decimal
/// count and renders it with `.` as separator. Fails if the rendered text
/// would not fit the field: that is the precision-loss check.
fn format_numeric(field: &Field, value: f64) -> Result<String, DbfError> {
    if !value.is_finite() {
        return Err(DbfError::ValueError(format!(
            "field {:?} cannot store the non-finite value {}", field.name(), value
        )));
    }
    let decimals = field.decimal_count().as_usize();
    let text = if decimals == 0 {
        format!("{:.0}", value.trunc())
    } else {
        format!("{:.*}", decimals, value)
    };
    if text.len() > field.length().as_usize() {
        return Err(DbfError::ValueError(format!(
            "value {} formats to {:?} ({} bytes), which does not fit field {:?} of length {}",
            value, text, text.len(), field.name(), field.length()
        )));
    }
    Ok(text)
}

fn require_type(field: &Field, expected: FieldType) -> Result<(), DbfError> {
    if field.data_type() != expected {
        Err(DbfError::ValueError(format!(
            "field {:?} is {}, not {}", field.name(), field.data_type(), expected
        )))
    } else {
        Ok(())
    }
}

impl FieldValue {
    /// The kind-appropriate "no value" for a field.
    pub fn empty(field: &Field) -> FieldValue {
        match field.data_type() {
            FieldType::Character => FieldValue::Character(None),
            FieldType::Date => FieldValue::Date(None),
            FieldType::Number => FieldValue::Number(None),
            FieldType::Float => FieldValue::Float(None),
            FieldType::Logical => FieldValue::Logical(None),
        }
    }

    pub fn character(field: &Field, value: &str) -> Result<FieldValue, DbfError> {
        require_type(field, FieldType::Character)?;
        if value.chars().count() > field.length().as_usize() {
            return Err(DbfError::ValueError(format!(
                "value {:?} ({} characters) does not fit field {:?} of length {}",
                value, value.chars().count(), field.name(), field.length()
            )));
        }
        Ok(FieldValue::Character(Some(String::from(value))))
    }

    /// Dates are day-precise by construction: the 8-byte `yyyyMMdd` format
    /// carries no time component.
    pub fn date(field: &Field, value: NaiveDate) -> Result<FieldValue, DbfError> {
        require_type(field, FieldType::Date)?;
        Ok(FieldValue::Date(Some(value)))
    }

    /// A timestamp stored as `yyyyMMddTHHmmss` text in a Character field.
    /// Rounded to second precision, because the format carries no
    /// sub-second component.
    pub fn date_time(field: &Field, value: NaiveDateTime) -> Result<FieldValue, DbfError> {
        require_type(field, FieldType::Character)?;
        if field.length().value() < DATE_TIME_LENGTH {
            return Err(DbfError::ValueError(format!(
                "a DateTime needs a Character field of length >= {}, but {:?} has length {}",
                DATE_TIME_LENGTH, field.name(), field.length()
            )));
        }
        let seconds = value.with_nanosecond(0).unwrap_or(value);
        Ok(FieldValue::DateTime(Some(seconds)))
    }

    pub fn number(field: &Field, value: f64) -> Result<FieldValue, DbfError> {
        require_type(field, FieldType::Number)?;
        let text = format_numeric(field, value)?;
        // store exactly what a read of the formatted text will yield
        let stored = text.parse::<f64>()
            .map_err(|err| DbfError::ValueError(format!("field {:?}: {}", field.name(), err)))?;
        Ok(FieldValue::Number(Some(stored)))
    }

    pub fn float(field: &Field, value: f32) -> Result<FieldValue, DbfError> {
        require_type(field, FieldType::Float)?;
        let text = format_numeric(field, value as f64)?;
        let stored = text.parse::<f32>()
            .map_err(|err| DbfError::ValueError(format!("field {:?}: {}", field.name(), err)))?;
        Ok(FieldValue::Float(Some(stored)))
    }

    pub fn logical(field: &Field, value: bool) -> Result<FieldValue, DbfError> {
        require_type(field, FieldType::Logical)?;
        Ok(FieldValue::Logical(Some(value)))
    }

    /// Decodes one field's byte window. `bytes` must be exactly the field's
    /// declared width.
    pub fn read(field: &Field, bytes: &[u8], encoding: EncodingRef) -> Result<FieldValue, DbfError> {
        if bytes.len() != field.length().as_usize() {
            return Err(DbfError::ParseError(format!(
                "field {:?} spans {} bytes, got {}", field.name(), field.length(), bytes.len()
            )));
        }

        // all-NUL (or NUL-prefixed) windows are the stored-null sentinel
        if !bytes.is_empty() && bytes[0] == 0 {
            return Ok(FieldValue::empty(field));
        }

        match field.data_type() {
            FieldType::Character => {
                let decoded = encoding.decode(bytes, DecoderTrap::Replace)
                    .map_err(|err| DbfError::ParseError(format!(
                        "field {:?} is not decodable text: {}", field.name(), err
                    )))?;
                let trimmed = decoded.trim_end_matches(|c| c == ' ' || c == '\u{0}');
                Ok(FieldValue::Character(Some(String::from(trimmed))))
            }
            FieldType::Number => {
                Ok(FieldValue::Number(parse_numeric_text(bytes).and_then(|text| text.parse::<f64>().ok())))
            }
            FieldType::Float => {
                Ok(FieldValue::Float(parse_numeric_text(bytes).and_then(|text| text.parse::<f32>().ok())))
            }
            FieldType::Date => {
                let text = String::from_utf8_lossy(bytes);
                Ok(FieldValue::Date(NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()))
            }
            FieldType::Logical => {
                let value = match bytes[0] {
                    b't' | b'T' | b'y' | b'Y' => Some(true),
                    b'f' | b'F' | b'n' | b'N' => Some(false),
                    _ => None,
                };
                Ok(FieldValue::Logical(value))
            }
        }
    }

    /// Decodes a Character window as a `yyyyMMddTHHmmss` timestamp overlay.
    pub fn read_date_time(field: &Field, bytes: &[u8], encoding: EncodingRef) -> Result<FieldValue, DbfError> {
        require_type(field, FieldType::Character)?;
        match FieldValue::read(field, bytes, encoding)? {
            FieldValue::Character(None) => Ok(FieldValue::DateTime(None)),
            FieldValue::Character(Some(text)) => {
                Ok(FieldValue::DateTime(NaiveDateTime::parse_from_str(text.trim(), DATE_TIME_FORMAT).ok()))
            }
            _ => unreachable!(),
        }
    }

    /// Encodes the value into exactly `field.length()` bytes: never more,
    /// never less.
    pub fn write<W: io::Write>(&self, field: &Field, encoding: EncodingRef, w: &mut W) -> Result<(), DbfError> {
        let width = field.length().as_usize();
        match *self {
            FieldValue::Logical(value) => {
                require_type(field, FieldType::Logical)?;
                let byte = match value {
                    Some(true) => b'T',
                    Some(false) => b'F',
                    None => b'?',
                };
                w.write_all(&[ byte ]).map_err(DbfError::IOError)
            }
            FieldValue::Character(None) | FieldValue::Date(None)
            | FieldValue::Number(None) | FieldValue::Float(None) => {
                self.require_write_type(field)?;
                w.write_all(&vec![ 0u8; width ]).map_err(DbfError::IOError)
            }
            FieldValue::DateTime(None) => {
                require_type(field, FieldType::Character)?;
                w.write_all(&vec![ 0u8; width ]).map_err(DbfError::IOError)
            }
            FieldValue::Character(Some(ref value)) => {
                require_type(field, FieldType::Character)?;
                let mut bytes = encoding.encode(value, EncoderTrap::Strict)
                    .map_err(|_| DbfError::ValueError(format!(
                        "value {:?} is not representable in {} for field {:?}",
                        value, encoding.name(), field.name()
                    )))?;
                if bytes.len() > width {
                    return Err(DbfError::ValueError(format!(
                        "value {:?} encodes to {} bytes, which does not fit field {:?} of length {}",
                        value, bytes.len(), field.name(), field.length()
                    )));
                }
                bytes.resize(width, b' ');
                w.write_all(&bytes).map_err(DbfError::IOError)
            }
            FieldValue::DateTime(Some(ref value)) => {
                require_type(field, FieldType::Character)?;
                let text = value.format(DATE_TIME_FORMAT).to_string();
                if text.len() > width {
                    return Err(DbfError::ValueError(format!(
                        "timestamp {:?} ({} bytes) does not fit field {:?} of length {}",
                        text, text.len(), field.name(), field.length()
                    )));
                }
                let mut bytes = text.into_bytes();
                bytes.resize(width, b' ');
                w.write_all(&bytes).map_err(DbfError::IOError)
            }
            FieldValue::Date(Some(ref value)) => {
                require_type(field, FieldType::Date)?;
                let text = value.format(DATE_FORMAT).to_string();
                if text.len() != width {
                    return Err(DbfError::ValueError(format!(
                        "date {:?} renders to {:?}, which does not fit field {:?} of length {}",
                        value, text, field.name(), field.length()
                    )));
                }
                w.write_all(text.as_bytes()).map_err(DbfError::IOError)
            }
            FieldValue::Number(Some(value)) => {
                require_type(field, FieldType::Number)?;
                write_padded_numeric(field, value, w)
            }
            FieldValue::Float(Some(value)) => {
                require_type(field, FieldType::Float)?;
                write_padded_numeric(field, value as f64, w)
            }
        }
    }

    fn require_write_type(&self, field: &Field) -> Result<(), DbfError> {
        let expected = match *self {
            FieldValue::Character(_) | FieldValue::DateTime(_) => FieldType::Character,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Logical(_) => FieldType::Logical,
        };
        require_type(field, expected)
    }

    /// True iff `write` against this field would succeed. Callers use this
    /// to pre-validate before committing a record.
    pub fn accepts(&self, field: &Field, encoding: EncodingRef) -> bool {
        self.write(field, encoding, &mut io::sink()).is_ok()
    }
}

/// Numeric field text must be ASCII and match the locale-invariant pattern;
/// anything else (blanks, `*` overflow fill, garbage) is "no value".
fn parse_numeric_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if !text.is_empty() && NUMERIC_RE.is_match(text) {
        Some(String::from(text))
    } else {
        None
    }
}

fn write_padded_numeric<W: io::Write>(field: &Field, value: f64, w: &mut W) -> Result<(), DbfError> {
    let text = format_numeric(field, value)?;
    // numbers are right-aligned: left-pad with spaces to the exact width
    let padded = format!("{:>width$}", text, width = field.length().as_usize());
    w.write_all(padded.as_bytes()).map_err(DbfError::IOError)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FieldValue::Character(Some(ref value)) => write!(f, "{}", value),
            FieldValue::Date(Some(ref value)) => write!(f, "{}", value.format(DATE_FORMAT)),
            FieldValue::DateTime(Some(ref value)) => write!(f, "{}", value.format(DATE_TIME_FORMAT)),
            FieldValue::Number(Some(value)) => write!(f, "{}", value),
            FieldValue::Float(Some(value)) => write!(f, "{}", value),
            FieldValue::Logical(Some(value)) => write!(f, "{}", if value { "T" } else { "F" }),
            FieldValue::Character(None) | FieldValue::Date(None) | FieldValue::DateTime(None)
            | FieldValue::Number(None) | FieldValue::Float(None) | FieldValue::Logical(None) => {
                write!(f, "NULL")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use encoding::EncodingRef;
    use encoding::all::{ASCII, WINDOWS_1252};
    use units::{DecimalCount, FieldLength};
    use dbf::field::Field;
    use super::FieldValue;

    fn ascii() -> EncodingRef {
        ASCII as EncodingRef
    }

    fn number_field(length: u8, decimals: u8) -> Field {
        Field::number("N", FieldLength::new(length).unwrap(), DecimalCount::new(decimals).unwrap()).unwrap()
    }

    fn encode(value: &FieldValue, field: &Field) -> Vec<u8> {
        let mut buf = Vec::new();
        value.write(field, ascii(), &mut buf).unwrap();
        buf
    }

    #[test]
    fn precision_loss_is_rejected() {
        let field = number_field(5, 2);
        // "123.46" is 6 bytes > 5
        assert!(FieldValue::number(&field, 123.456).is_err());
        let ok = FieldValue::number(&field, 1.23).unwrap();
        assert_eq!(FieldValue::Number(Some(1.23)), ok);
    }

    #[test]
    fn number_round_trips_through_bytes() {
        let field = number_field(5, 2);
        let value = FieldValue::number(&field, 1.23).unwrap();
        let bytes = encode(&value, &field);
        assert_eq!(b" 1.23".to_vec(), bytes);
        assert_eq!(value, FieldValue::read(&field, &bytes, ascii()).unwrap());
    }

    #[test]
    fn zero_decimals_truncate() {
        let field = number_field(5, 0);
        let value = FieldValue::number(&field, 42.9).unwrap();
        assert_eq!(FieldValue::Number(Some(42.)), value);
        assert_eq!(b"   42".to_vec(), encode(&value, &field));
    }

    #[test]
    fn width_always_equals_field_length() {
        let fields_and_values = vec![
            (number_field(7, 2), FieldValue::number(&number_field(7, 2), -3.5).unwrap()),
            (number_field(7, 2), FieldValue::Number(None)),
            (Field::character("C", FieldLength::new(10).unwrap()).unwrap(),
             FieldValue::Character(Some(String::from("hi")))),
            (Field::character("C", FieldLength::new(10).unwrap()).unwrap(),
             FieldValue::Character(None)),
            (Field::date("D").unwrap(),
             FieldValue::Date(Some(NaiveDate::from_ymd(2020, 2, 29)))),
            (Field::date("D").unwrap(), FieldValue::Date(None)),
            (Field::logical("L").unwrap(), FieldValue::Logical(Some(true))),
            (Field::logical("L").unwrap(), FieldValue::Logical(None)),
        ];
        for (field, value) in fields_and_values {
            assert_eq!(field.length().as_usize(), encode(&value, &field).len(), "field {}", field);
        }
    }

    #[test]
    fn null_round_trips_as_null() {
        let field = number_field(5, 2);
        let bytes = encode(&FieldValue::Number(None), &field);
        assert_eq!(vec![ 0u8; 5 ], bytes);
        assert_eq!(FieldValue::Number(None), FieldValue::read(&field, &bytes, ascii()).unwrap());
    }

    #[test]
    fn nul_prefixed_bytes_decode_to_null_for_every_type() {
        let character = Field::character("C", FieldLength::new(4).unwrap()).unwrap();
        assert_eq!(
            FieldValue::Character(None),
            FieldValue::read(&character, &[ 0, 0, 0, 0 ], ascii()).unwrap()
        );
        let date = Field::date("D").unwrap();
        assert_eq!(
            FieldValue::Date(None),
            FieldValue::read(&date, &[ 0u8; 8 ], ascii()).unwrap()
        );
        let logical = Field::logical("L").unwrap();
        assert_eq!(
            FieldValue::Logical(None),
            FieldValue::read(&logical, &[ 0 ], ascii()).unwrap()
        );
    }

    #[test]
    fn character_values_right_trim_padding() {
        let field = Field::character("C", FieldLength::new(8).unwrap()).unwrap();
        let value = FieldValue::character(&field, "Alice").unwrap();
        let bytes = encode(&value, &field);
        assert_eq!(b"Alice   ".to_vec(), bytes);
        assert_eq!(value, FieldValue::read(&field, &bytes, ascii()).unwrap());
    }

    #[test]
    fn character_too_long_is_rejected() {
        let field = Field::character("C", FieldLength::new(4).unwrap()).unwrap();
        assert!(FieldValue::character(&field, "too long").is_err());
        // a value that fits in characters but not in bytes is caught at write
        let odd = FieldValue::Character(Some(String::from("héllo")));
        let wide = Field::character("C", FieldLength::new(5).unwrap()).unwrap();
        let mut buf = Vec::new();
        assert!(odd.write(&wide, WINDOWS_1252 as EncodingRef, &mut buf).is_ok());
        assert!(odd.write(&wide, ascii(), &mut buf).is_err()); // é unmappable
    }

    #[test]
    fn garbage_numeric_text_degrades_to_null() {
        let field = number_field(5, 0);
        assert_eq!(FieldValue::Number(None), FieldValue::read(&field, b"*****", ascii()).unwrap());
        assert_eq!(FieldValue::Number(None), FieldValue::read(&field, b"     ", ascii()).unwrap());
        assert_eq!(FieldValue::Number(None), FieldValue::read(&field, b"1,2,3", ascii()).unwrap());
        assert_eq!(FieldValue::Number(Some(-12.)), FieldValue::read(&field, b"  -12", ascii()).unwrap());
    }

    #[test]
    fn date_round_trip_and_garbage() {
        let field = Field::date("D").unwrap();
        let value = FieldValue::date(&field, NaiveDate::from_ymd(1999, 12, 31)).unwrap();
        let bytes = encode(&value, &field);
        assert_eq!(b"19991231".to_vec(), bytes);
        assert_eq!(value, FieldValue::read(&field, &bytes, ascii()).unwrap());
        assert_eq!(FieldValue::Date(None), FieldValue::read(&field, b"not.a.dy", ascii()).unwrap());
    }

    #[test]
    fn date_time_rides_on_a_character_field() {
        let field = Field::character("STAMP", FieldLength::new(15).unwrap()).unwrap();
        let stamp = NaiveDate::from_ymd(2001, 7, 4).and_hms(12, 30, 45);
        let value = FieldValue::date_time(&field, stamp).unwrap();
        let bytes = encode(&value, &field);
        assert_eq!(b"20010704T123045".to_vec(), bytes);
        assert_eq!(value, FieldValue::read_date_time(&field, &bytes, ascii()).unwrap());

        let short = Field::character("S", FieldLength::new(10).unwrap()).unwrap();
        assert!(FieldValue::date_time(&short, stamp).is_err());
    }

    #[test]
    fn logical_decode_table() {
        let field = Field::logical("L").unwrap();
        for &byte in b"tTyY" {
            assert_eq!(
                FieldValue::Logical(Some(true)),
                FieldValue::read(&field, &[ byte ], ascii()).unwrap()
            );
        }
        for &byte in b"fFnN" {
            assert_eq!(
                FieldValue::Logical(Some(false)),
                FieldValue::read(&field, &[ byte ], ascii()).unwrap()
            );
        }
        assert_eq!(FieldValue::Logical(None), FieldValue::read(&field, b"?", ascii()).unwrap());
        assert_eq!(FieldValue::Logical(None), FieldValue::read(&field, b"x", ascii()).unwrap());
        assert_eq!(b"?".to_vec(), encode(&FieldValue::Logical(None), &field));
    }

    #[test]
    fn kind_must_match_field_type() {
        let number = number_field(5, 0);
        let mut buf = Vec::new();
        let text = FieldValue::Character(Some(String::from("oops")));
        assert!(text.write(&number, ascii(), &mut buf).is_err());
        assert!(FieldValue::character(&number, "oops").is_err());
    }

    #[test]
    fn accepts_pre_validates() {
        let field = number_field(5, 2);
        assert!(FieldValue::Number(Some(1.23)).accepts(&field, ascii()));
        assert!(!FieldValue::Number(Some(123456.)).accepts(&field, ascii()));
        assert!(!FieldValue::Character(Some(String::from("x"))).accepts(&field, ascii()));
    }
}
