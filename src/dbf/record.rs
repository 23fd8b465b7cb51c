//! One dBase record: the deleted-flag byte plus a value per schema field.

use std::io;
use encoding::EncodingRef;
use super::DbfError;
use super::field::Schema;
use super::value::FieldValue;

pub const FLAG_VALID: u8 = 0x20;
pub const FLAG_DELETED: u8 = 0x2a;

/// Marks the end of the record stream. A well-formed writer always emits it
/// after the last record.
pub const END_OF_FILE: u8 = 0x1a;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub deleted: bool,
    pub values: Box<[FieldValue]>,
}

impl Record {
    pub fn new(schema: &Schema, values: Vec<FieldValue>) -> Result<Record, DbfError> {
        Record::with_deleted(schema, values, false)
    }

    pub fn with_deleted(schema: &Schema, values: Vec<FieldValue>, deleted: bool) -> Result<Record, DbfError> {
        if values.len() != schema.len() {
            return Err(DbfError::ValueError(format!(
                "the schema has {} fields but the record has {} values", schema.len(), values.len()
            )));
        }
        Ok(Record {
            deleted: deleted,
            values: values.into_boxed_slice(),
        })
    }

    pub fn value(&self, schema: &Schema, name: &str) -> Option<&FieldValue> {
        schema.fields().iter().position(|field| field.name() == name).map(|i| &self.values[i])
    }

    /// Reads one record. `Ok(None)` means the stream hit the 0x1a end
    /// marker: normal termination, not malformed data.
    ///
    /// Side-effect: advances the reader to the next record.
    pub fn read<R: io::Read>(r: &mut R, schema: &Schema, encoding: EncodingRef) -> Result<Option<Record>, DbfError> {
        let mut flag = [ 0u8; 1 ];
        r.read_exact(&mut flag).map_err(DbfError::IOError)?;

        let deleted = match flag[0] {
            END_OF_FILE => return Ok(None),
            FLAG_VALID => false,
            FLAG_DELETED => true,
            other => {
                return Err(DbfError::ParseError(format!(
                    "expected a record flag of 0x{:02x} (valid) or 0x{:02x} (deleted), got 0x{:02x}",
                    FLAG_VALID, FLAG_DELETED, other
                )));
            }
        };

        let mut buf = vec![ 0u8; schema.record_length().as_usize() - 1 ];
        r.read_exact(&mut buf).map_err(DbfError::IOError)?;

        let mut values = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            let start = field.offset() as usize;
            let end = start + field.length().as_usize();
            values.push(FieldValue::read(field, &buf[start..end], encoding)?);
        }

        Ok(Some(Record {
            deleted: deleted,
            values: values.into_boxed_slice(),
        }))
    }

    /// Writes the record: exactly the schema's record length.
    pub fn write<W: io::Write>(&self, w: &mut W, schema: &Schema, encoding: EncodingRef) -> Result<(), DbfError> {
        if self.values.len() != schema.len() {
            return Err(DbfError::ValueError(format!(
                "the schema has {} fields but the record has {} values", schema.len(), self.values.len()
            )));
        }
        let flag = if self.deleted { FLAG_DELETED } else { FLAG_VALID };
        w.write_all(&[ flag ]).map_err(DbfError::IOError)?;
        for (field, value) in schema.fields().iter().zip(self.values.iter()) {
            value.write(field, encoding, w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use encoding::EncodingRef;
    use encoding::all::ASCII;
    use units::{DecimalCount, FieldLength};
    use dbf::field::{Field, Schema};
    use dbf::value::FieldValue;
    use super::Record;

    fn ascii() -> EncodingRef {
        ASCII as EncodingRef
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Field::character("NAME", FieldLength::new(10).unwrap()).unwrap(),
            Field::number("AGE", FieldLength::new(3).unwrap(), DecimalCount::new(0).unwrap()).unwrap(),
        ]).unwrap()
    }

    fn sample(schema: &Schema) -> Record {
        Record::new(schema, vec![
            FieldValue::character(&schema.fields()[0], "Alice").unwrap(),
            FieldValue::number(&schema.fields()[1], 30.).unwrap(),
        ]).unwrap()
    }

    #[test]
    fn round_trip() {
        let schema = schema();
        let record = sample(&schema);
        let mut buf = Vec::new();
        record.write(&mut buf, &schema, ascii()).unwrap();
        assert_eq!(schema.record_length().as_usize(), buf.len());
        assert_eq!(b"\x20Alice      30".to_vec(), buf);

        let parsed = Record::read(&mut Cursor::new(buf), &schema, ascii()).unwrap().unwrap();
        assert_eq!(record, parsed);
        assert!(!parsed.deleted);
    }

    #[test]
    fn deleted_flag_round_trips() {
        let schema = schema();
        let mut record = sample(&schema);
        record.deleted = true;
        let mut buf = Vec::new();
        record.write(&mut buf, &schema, ascii()).unwrap();
        assert_eq!(0x2a, buf[0]);
        let parsed = Record::read(&mut Cursor::new(buf), &schema, ascii()).unwrap().unwrap();
        assert!(parsed.deleted);
    }

    #[test]
    fn end_marker_reads_as_none() {
        let schema = schema();
        let result = Record::read(&mut Cursor::new(vec![ 0x1a ]), &schema, ascii()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn unknown_flag_is_fatal() {
        let schema = schema();
        let mut buf = Vec::new();
        sample(&schema).write(&mut buf, &schema, ascii()).unwrap();
        buf[0] = 0x00;
        assert!(Record::read(&mut Cursor::new(buf), &schema, ascii()).is_err());
    }

    #[test]
    fn arity_must_match_schema() {
        let schema = schema();
        assert!(Record::new(&schema, vec![]).is_err());
    }

    #[test]
    fn value_lookup_by_field_name() {
        let schema = schema();
        let record = sample(&schema);
        assert_eq!(
            &FieldValue::Number(Some(30.)),
            record.value(&schema, "AGE").unwrap()
        );
        assert!(record.value(&schema, "MISSING").is_none());
    }
}
