//! dBase III field descriptors and record schemas.

use std::fmt;
use units::{DecimalCount, FieldLength, IntegerDigits, RecordLength};
use super::DbfError;

/// One byte on disk per descriptor. dBase III knows five field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Character,
    Date,
    Number,
    Float,
    Logical,
}

impl FieldType {
    pub fn from_tag(tag: u8) -> Option<FieldType> {
        match tag {
            b'C' => Some(FieldType::Character),
            b'D' => Some(FieldType::Date),
            b'N' => Some(FieldType::Number),
            b'F' => Some(FieldType::Float),
            b'L' => Some(FieldType::Logical),
            _ => None,
        }
    }

    pub fn tag(&self) -> u8 {
        match *self {
            FieldType::Character => b'C',
            FieldType::Date => b'D',
            FieldType::Number => b'N',
            FieldType::Float => b'F',
            FieldType::Logical => b'L',
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            FieldType::Character => "Character",
            FieldType::Date => "Date",
            FieldType::Number => "Number",
            FieldType::Float => "Float",
            FieldType::Logical => "Logical",
        };
        write!(f, "{}", name)
    }
}

pub const MAX_NAME_LENGTH: usize = 11;
pub const MAX_NUMBER_LENGTH: u8 = 18;
pub const MAX_FLOAT_LENGTH: u8 = 20;
pub const DATE_LENGTH: u8 = 8;

/// Width of the `yyyyMMddTHHmmss` text a DateTime overlay needs.
pub const DATE_TIME_LENGTH: u8 = 15;

/// An immutable field descriptor: name, type, byte offset within the record,
/// width, decimal count.
///
/// The offset supplied at construction is advisory: assembling fields into a
/// `Schema` always re-offsets them contiguously from 0. Stored offsets only
/// matter when reading a file header, where they are checked against the
/// declared lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    data_type: FieldType,
    offset: u16,
    length: FieldLength,
    decimal_count: DecimalCount,
}

impl Field {
    pub fn new(
        name: &str,
        data_type: FieldType,
        offset: u16,
        length: FieldLength,
        decimal_count: DecimalCount,
    ) -> Result<Field, DbfError> {
        if name.is_empty() || name.len() > MAX_NAME_LENGTH {
            return Err(DbfError::ValueError(format!(
                "field name {:?} must be 1-{} bytes", name, MAX_NAME_LENGTH
            )));
        }
        if !name.bytes().all(|b| b.is_ascii() && b != 0) {
            return Err(DbfError::ValueError(format!("field name {:?} must be ASCII", name)));
        }

        match data_type {
            FieldType::Character => {
                if decimal_count.value() != 0 {
                    return Err(DbfError::ValueError(format!(
                        "Character field {:?} must have decimal count 0, got {}", name, decimal_count
                    )));
                }
            }
            FieldType::Date => {
                if length.value() != DATE_LENGTH || decimal_count.value() != 0 {
                    return Err(DbfError::ValueError(format!(
                        "Date field {:?} must have length {} and decimal count 0, got length {} and decimal count {}",
                        name, DATE_LENGTH, length, decimal_count
                    )));
                }
            }
            FieldType::Logical => {
                if length.value() != 1 || decimal_count.value() != 0 {
                    return Err(DbfError::ValueError(format!(
                        "Logical field {:?} must have length 1 and decimal count 0, got length {} and decimal count {}",
                        name, length, decimal_count
                    )));
                }
            }
            FieldType::Number => {
                Field::validate_numeric(name, length, decimal_count, MAX_NUMBER_LENGTH)?;
            }
            FieldType::Float => {
                Field::validate_numeric(name, length, decimal_count, MAX_FLOAT_LENGTH)?;
            }
        }

        Ok(Field {
            name: String::from(name),
            data_type: data_type,
            offset: offset,
            length: length,
            decimal_count: decimal_count,
        })
    }

    fn validate_numeric(
        name: &str,
        length: FieldLength,
        decimal_count: DecimalCount,
        max_length: u8,
    ) -> Result<(), DbfError> {
        if length.value() < 1 || length.value() > max_length {
            return Err(DbfError::ValueError(format!(
                "numeric field {:?} must have length 1-{}, got {}", name, max_length, length
            )));
        }
        if decimal_count.value() != 0 {
            if decimal_count.value() as u16 > length.value() as u16 - 2 {
                return Err(DbfError::ValueError(format!(
                    "numeric field {:?} with length {} allows at most {} decimals, got {}",
                    name, length, length.value() - 2, decimal_count
                )));
            }
        }
        // at least one integer digit must fit
        IntegerDigits::for_field(length, decimal_count)
            .map_err(|err| DbfError::ValueError(format!("numeric field {:?}: {}", name, err)))?;
        Ok(())
    }

    pub fn character(name: &str, length: FieldLength) -> Result<Field, DbfError> {
        Field::new(name, FieldType::Character, 0, length, DecimalCount::new(0).unwrap())
    }

    pub fn date(name: &str) -> Result<Field, DbfError> {
        Field::new(name, FieldType::Date, 0, FieldLength::new(DATE_LENGTH).unwrap(), DecimalCount::new(0).unwrap())
    }

    pub fn number(name: &str, length: FieldLength, decimal_count: DecimalCount) -> Result<Field, DbfError> {
        Field::new(name, FieldType::Number, 0, length, decimal_count)
    }

    pub fn float(name: &str, length: FieldLength, decimal_count: DecimalCount) -> Result<Field, DbfError> {
        Field::new(name, FieldType::Float, 0, length, decimal_count)
    }

    pub fn logical(name: &str) -> Result<Field, DbfError> {
        Field::new(name, FieldType::Logical, 0, FieldLength::new(1).unwrap(), DecimalCount::new(0).unwrap())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> FieldType {
        self.data_type
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn length(&self) -> FieldLength {
        self.length
    }

    pub fn decimal_count(&self) -> DecimalCount {
        self.decimal_count
    }

    /// Digits available left of the decimal point, for numeric fields.
    pub fn integer_digits(&self) -> Result<IntegerDigits, DbfError> {
        IntegerDigits::for_field(self.length, self.decimal_count)
            .map_err(|err| DbfError::ValueError(format!("field {:?}: {}", self.name, err)))
    }

    fn at_offset(&self, offset: u16) -> Field {
        Field {
            name: self.name.clone(),
            data_type: self.data_type,
            offset: offset,
            length: self.length,
            decimal_count: self.decimal_count,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}({},{})", self.name, self.data_type, self.length, self.decimal_count)
    }
}

pub const MAX_FIELDS: usize = 128;

/// An ordered, immutable list of fields.
///
/// Whatever offsets the supplied fields carry, the schema re-offsets them
/// contiguously: first field at 0, each following field right after the
/// previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Box<[Field]>,
    record_length: RecordLength,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Result<Schema, DbfError> {
        if fields.len() > MAX_FIELDS {
            return Err(DbfError::ValueError(format!(
                "a schema holds at most {} fields, got {}", MAX_FIELDS, fields.len()
            )));
        }

        let mut offset: u32 = 0;
        let mut placed = Vec::with_capacity(fields.len());
        for field in fields.iter() {
            placed.push(field.at_offset(offset as u16));
            offset += field.length().value() as u32;
            // 1 flag byte + fields must fit the header's 16-bit record length
            if offset + 1 > 0xffff {
                return Err(DbfError::ValueError(format!(
                    "schema exceeds the 65535-byte record limit at field {:?}", field.name()
                )));
            }
        }

        let record_length = RecordLength::new(offset as u16 + 1)
            .map_err(|err| DbfError::ValueError(format!("{}", err)))?;

        Ok(Schema {
            fields: placed.into_boxed_slice(),
            record_length: record_length,
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// One deleted-flag byte plus every field's width.
    pub fn record_length(&self) -> RecordLength {
        self.record_length
    }
}

#[cfg(test)]
mod test {
    use units::{DecimalCount, FieldLength};
    use super::*;

    fn len(n: u8) -> FieldLength {
        FieldLength::new(n).unwrap()
    }

    fn dec(n: u8) -> DecimalCount {
        DecimalCount::new(n).unwrap()
    }

    #[test]
    fn field_type_tags_round_trip() {
        for &tag in &[ b'C', b'D', b'N', b'F', b'L' ] {
            assert_eq!(tag, FieldType::from_tag(tag).unwrap().tag());
        }
        assert_eq!(None, FieldType::from_tag(b'M'));
        assert_eq!(None, FieldType::from_tag(0));
    }

    #[test]
    fn name_must_fit_eleven_bytes() {
        assert!(Field::character("NAME", len(10)).is_ok());
        assert!(Field::character("ELEVENCHARS", len(10)).is_ok());
        assert!(Field::character("TWELVECHARSX", len(10)).is_err());
        assert!(Field::character("", len(10)).is_err());
    }

    #[test]
    fn date_field_must_be_eight_bytes() {
        let date = Field::date("WHEN").unwrap();
        assert_eq!(8, date.length().value());
        assert!(Field::new("WHEN", FieldType::Date, 0, len(10), dec(0)).is_err());
    }

    #[test]
    fn logical_field_must_be_one_byte() {
        assert!(Field::logical("FLAG").is_ok());
        assert!(Field::new("FLAG", FieldType::Logical, 0, len(2), dec(0)).is_err());
    }

    #[test]
    fn character_field_rejects_decimals() {
        assert!(Field::new("NAME", FieldType::Character, 0, len(10), dec(2)).is_err());
    }

    #[test]
    fn numeric_decimals_bounded_by_length() {
        assert!(Field::number("AGE", len(3), dec(0)).is_ok());
        assert!(Field::number("RATE", len(5), dec(2)).is_ok());
        // decimal count must leave room for "x." prefix
        assert!(Field::number("RATE", len(5), dec(4)).is_err());
        // type-specific maxima
        assert!(Field::number("BIG", len(18), dec(0)).is_ok());
        assert!(Field::new("BIG", FieldType::Number, 0, len(19), dec(0)).is_err());
        assert!(Field::float("BIG", len(20), dec(0)).is_ok());
        assert!(Field::new("BIG", FieldType::Float, 0, len(21), dec(0)).is_err());
    }

    #[test]
    fn schema_reoffsets_fields() {
        // supplied offsets are wrong on purpose
        let a = Field::new("A", FieldType::Character, 99, len(10), dec(0)).unwrap();
        let b = Field::new("B", FieldType::Number, 7, len(3), dec(0)).unwrap();
        let c = Field::new("C", FieldType::Logical, 42, len(1), dec(0)).unwrap();

        let schema = Schema::new(vec![ a, b, c ]).unwrap();
        let offsets: Vec<u16> = schema.fields().iter().map(|f| f.offset()).collect();
        assert_eq!(vec![ 0, 10, 13 ], offsets);
        assert_eq!(15, schema.record_length().value()); // 14 field bytes + flag
    }

    #[test]
    fn schema_caps_at_128_fields() {
        let fields: Vec<Field> = (0..129)
            .map(|i| Field::character(&format!("F{}", i), len(1)).unwrap())
            .collect();
        assert!(Schema::new(fields).is_err());
    }

    #[test]
    fn schema_field_lookup() {
        let schema = Schema::new(vec![
            Field::character("NAME", len(10)).unwrap(),
            Field::number("AGE", len(3), dec(0)).unwrap(),
        ]).unwrap();
        assert_eq!("AGE", schema.field("AGE").unwrap().name());
        assert!(schema.field("MISSING").is_none());
    }
}
