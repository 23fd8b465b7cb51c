//! The 32-byte dBase III file header and its field descriptor table.

use std::io;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{Datelike, NaiveDate};
use units::{DecimalCount, FieldLength, RecordCount};
use super::DbfError;
use super::codepage::CodePage;
use super::field::{Field, FieldType, Schema, MAX_FIELDS};

pub const HEADER_LENGTH: usize = 32;
pub const FIELD_DESCRIPTOR_LENGTH: usize = 32;
pub const HEADER_TERMINATOR: u8 = 0x0d;

/// The dBase III format byte.
const FORMAT_DBASE3: u8 = 3;

/// Everything a ".dbf" file says about itself before the records start.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub last_updated: NaiveDate,
    pub code_page: CodePage,
    pub n_records: RecordCount,
    pub schema: Schema,
}

impl FileHeader {
    pub fn new(
        last_updated: NaiveDate,
        code_page: CodePage,
        n_records: RecordCount,
        schema: Schema,
    ) -> Result<FileHeader, DbfError> {
        let year = last_updated.year();
        if year < 1900 || year > 1900 + 255 {
            return Err(DbfError::ValueError(format!(
                "the header's last-updated year must be 1900-2155, got {}", year
            )));
        }
        Ok(FileHeader {
            last_updated: last_updated,
            code_page: code_page,
            n_records: n_records,
            schema: schema,
        })
    }

    /// Bytes from the start of the file to the first record.
    pub fn header_length(&self) -> usize {
        HEADER_LENGTH + FIELD_DESCRIPTOR_LENGTH * self.schema.len() + 1
    }

    /// Reads and validates the header, the field descriptor table, the
    /// 0x0d terminator, and any residual padding up to the declared header
    /// length.
    ///
    /// Side-effect: advances the reader to the first data record.
    pub fn read<R: io::Read>(r: &mut R) -> Result<FileHeader, DbfError> {
        let mut buf = [ 0u8; HEADER_LENGTH ];
        r.read_exact(&mut buf).map_err(DbfError::IOError)?;

        if buf[0] != FORMAT_DBASE3 {
            return Err(DbfError::ParseError(format!(
                "the format byte is {}, expected {} (dBase III)", buf[0], FORMAT_DBASE3
            )));
        }

        let year = 1900 + buf[1] as i32;
        let last_updated = NaiveDate::from_ymd_opt(year, buf[2] as u32, buf[3] as u32)
            .ok_or_else(|| DbfError::ParseError(format!(
                "the header's last-updated date {:04}-{:02}-{:02} is not a real date",
                year, buf[2], buf[3]
            )))?;

        let n_records = RecordCount::new(LittleEndian::read_u32(&buf[4..8]));
        let header_length = LittleEndian::read_u16(&buf[8..10]) as usize;
        let record_length = LittleEndian::read_u16(&buf[10..12]) as usize;
        // buf[12..29] is reserved
        let code_page = CodePage::from_byte(buf[29])
            .ok_or_else(|| DbfError::ParseError(format!(
                "unsupported code page byte 0x{:02x}", buf[29]
            )))?;
        // buf[30..32] is reserved

        if header_length < HEADER_LENGTH + 1 {
            return Err(DbfError::ParseError(format!(
                "the declared header length {} cannot hold the 32-byte header and terminator",
                header_length
            )));
        }
        let n_fields = (header_length - HEADER_LENGTH - 1) / FIELD_DESCRIPTOR_LENGTH;
        if n_fields > MAX_FIELDS {
            return Err(DbfError::ParseError(format!(
                "the header declares {} fields; the format allows at most {}", n_fields, MAX_FIELDS
            )));
        }

        let mut fields = Vec::with_capacity(n_fields);
        let mut expected_offset: u64 = 0;
        for i in 0..n_fields {
            let field = FileHeader::read_field_descriptor(r, i)?;
            if field.offset() as u64 != expected_offset {
                return Err(DbfError::ParseError(format!(
                    "field {:?} is at offset {}, but the preceding fields end at byte {}",
                    field.name(), field.offset(), expected_offset
                )));
            }
            expected_offset += field.length().value() as u64;
            fields.push(field);
        }

        if expected_offset + 1 != record_length as u64 {
            return Err(DbfError::ParseError(format!(
                "the fields total {} bytes plus the flag byte, but the header declares {}-byte records",
                expected_offset, record_length
            )));
        }

        let mut terminator = [ 0u8; 1 ];
        r.read_exact(&mut terminator).map_err(DbfError::IOError)?;
        if terminator[0] != HEADER_TERMINATOR {
            return Err(DbfError::ParseError(format!(
                "expected the header terminator 0x{:02x}, got 0x{:02x}", HEADER_TERMINATOR, terminator[0]
            )));
        }

        // some writers pad the header; skip up to the declared length
        let consumed = HEADER_LENGTH + FIELD_DESCRIPTOR_LENGTH * n_fields + 1;
        if header_length > consumed {
            let mut padding = vec![ 0u8; header_length - consumed ];
            r.read_exact(&mut padding).map_err(DbfError::IOError)?;
        }

        let schema = Schema::new(fields)?;
        FileHeader::new(last_updated, code_page, n_records, schema)
    }

    fn read_field_descriptor<R: io::Read>(r: &mut R, index: usize) -> Result<Field, DbfError> {
        let mut buf = [ 0u8; FIELD_DESCRIPTOR_LENGTH ];
        r.read_exact(&mut buf).map_err(DbfError::IOError)?;

        let name_bytes: Vec<u8> = buf[0..11].iter().cloned().take_while(|&b| b != 0).collect();
        let name = String::from_utf8(name_bytes).map_err(|_| {
            DbfError::ParseError(format!("field descriptor {} has a non-ASCII name", index))
        })?;

        let data_type = FieldType::from_tag(buf[11]).ok_or_else(|| {
            DbfError::ParseError(format!(
                "field {:?} has unsupported type tag 0x{:02x} ({:?})",
                name, buf[11], buf[11] as char
            ))
        })?;

        let stored_offset = LittleEndian::read_u32(&buf[12..16]);
        if stored_offset > 0xffff {
            return Err(DbfError::ParseError(format!(
                "field {:?} declares offset {}, beyond the record limit", name, stored_offset
            )));
        }
        let length = FieldLength::new(buf[16])
            .map_err(|err| DbfError::ParseError(format!("field {:?}: {}", name, err)))?;
        let decimal_count = DecimalCount::new(buf[17])
            .map_err(|err| DbfError::ParseError(format!("field {:?}: {}", name, err)))?;
        // buf[18..32] is reserved

        Field::new(&name, data_type, stored_offset as u16, length, decimal_count)
    }

    /// The byte-for-byte inverse of `read`.
    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<(), DbfError> {
        let mut buf = [ 0u8; HEADER_LENGTH ];
        buf[0] = FORMAT_DBASE3;
        buf[1] = (self.last_updated.year() - 1900) as u8;
        buf[2] = self.last_updated.month() as u8;
        buf[3] = self.last_updated.day() as u8;
        LittleEndian::write_u32(&mut buf[4..8], self.n_records.value());
        LittleEndian::write_u16(&mut buf[8..10], self.header_length() as u16);
        LittleEndian::write_u16(&mut buf[10..12], self.schema.record_length().value());
        // buf[12..29] reserved, zero
        buf[29] = self.code_page.byte();
        // buf[30..32] reserved, zero
        w.write_all(&buf).map_err(DbfError::IOError)?;

        for field in self.schema.fields() {
            let mut descriptor = [ 0u8; FIELD_DESCRIPTOR_LENGTH ];
            descriptor[0..field.name().len()].copy_from_slice(field.name().as_bytes());
            descriptor[11] = field.data_type().tag();
            LittleEndian::write_u32(&mut descriptor[12..16], field.offset() as u32);
            descriptor[16] = field.length().value();
            descriptor[17] = field.decimal_count().value();
            // descriptor[18..32] reserved, zero
            w.write_all(&descriptor).map_err(DbfError::IOError)?;
        }

        w.write_all(&[ HEADER_TERMINATOR ]).map_err(DbfError::IOError)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use chrono::NaiveDate;
    use units::{DecimalCount, FieldLength, RecordCount};
    use dbf::codepage::CodePage;
    use dbf::field::{Field, Schema};
    use super::FileHeader;

    fn sample_header() -> FileHeader {
        let schema = Schema::new(vec![
            Field::character("NAME", FieldLength::new(10).unwrap()).unwrap(),
            Field::number("AGE", FieldLength::new(3).unwrap(), DecimalCount::new(0).unwrap()).unwrap(),
        ]).unwrap();
        FileHeader::new(
            NaiveDate::from_ymd(2024, 6, 1),
            CodePage::WINDOWS_1252,
            RecordCount::new(2),
            schema,
        ).unwrap()
    }

    #[test]
    fn round_trip() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(header.header_length(), buf.len());
        let parsed = FileHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn layout_details() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(3, buf[0]); // dBase III
        assert_eq!(124, buf[1]); // 2024 - 1900
        assert_eq!(6, buf[2]);
        assert_eq!(1, buf[3]);
        assert_eq!(2, buf[4]); // record count, LE
        assert_eq!(0x57, buf[29]); // code page
        assert_eq!(b'C', buf[32 + 11]); // first descriptor's type tag
        assert_eq!(b'N', buf[64 + 11]); // second descriptor's type tag
        assert_eq!(10, buf[64 + 12]); // AGE begins after NAME's 10 bytes
        assert_eq!(0x0d, buf[buf.len() - 1]);
    }

    #[test]
    fn wrong_format_byte_is_fatal() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        buf[0] = 5;
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn unknown_code_page_is_fatal() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        buf[29] = 0xff;
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn bad_terminator_is_fatal() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] = 0;
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn misaligned_field_offsets_are_fatal() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        // second descriptor's stored offset: bytes 64+12..64+16
        buf[64 + 12] = 9;
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn record_length_mismatch_is_fatal() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        buf[10] = 99; // declared record length, LE low byte
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn invalid_update_date_is_fatal() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        buf[2] = 13; // month 13
        assert!(FileHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn residual_header_padding_is_skipped() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        // declare 4 extra padding bytes and append them
        let declared = (buf.len() + 4) as u16;
        buf[8] = (declared & 0xff) as u8;
        buf[9] = (declared >> 8) as u8;
        buf.extend_from_slice(&[ 0, 0, 0, 0 ]);
        let parsed = FileHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header.schema, parsed.schema);
    }
}
