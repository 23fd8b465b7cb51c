//! The dBase language-driver ("code page") table.
//!
//! Byte 29 of a ".dbf" header names the text encoding of every Character
//! field in the file. The values are a fixed legacy table; anything outside
//! it is a structural error. We resolve encodings through the WHATWG labels
//! the `encoding` crate understands. The DOS OEM code pages (437, 850, 852,
//! ...) have no WHATWG equivalent, so they resolve to ASCII: the low half is
//! identical, and the crate does not invent its own single-byte decoders.

use encoding;
use encoding::EncodingRef;
use std::fmt;

/// (driver byte, WHATWG label). Labels repeat because many driver bytes name
/// the same underlying code page for different keyboard layouts.
static CODE_PAGES: &'static [(u8, &'static str)] = &[
    (0x00, "ascii"),          // unspecified
    (0x01, "ascii"),          // DOS USA, cp437
    (0x02, "ascii"),          // DOS multilingual, cp850
    (0x03, "windows-1252"),   // Windows ANSI
    (0x04, "macintosh"),      // Standard Macintosh
    (0x08, "ascii"),          // Danish DOS, cp865
    (0x09, "ascii"),          // Dutch DOS, cp437
    (0x0a, "ascii"),          // Dutch DOS international, cp850
    (0x0b, "ascii"),          // Finnish DOS, cp437
    (0x0d, "ascii"),          // French DOS, cp437
    (0x0e, "ascii"),          // French DOS international, cp850
    (0x0f, "ascii"),          // German DOS, cp437
    (0x10, "ascii"),          // German DOS international, cp850
    (0x11, "ascii"),          // Italian DOS, cp437
    (0x12, "ascii"),          // Italian DOS international, cp850
    (0x13, "shift_jis"),      // Japanese Shift-JIS, cp932
    (0x14, "ascii"),          // Spanish DOS international, cp850
    (0x15, "ascii"),          // Swedish DOS, cp437
    (0x16, "ascii"),          // Swedish DOS international, cp850
    (0x17, "ascii"),          // Norwegian DOS, cp865
    (0x18, "ascii"),          // Spanish DOS, cp437
    (0x19, "ascii"),          // English DOS (GB), cp437
    (0x1a, "ascii"),          // English DOS (GB) international, cp850
    (0x1b, "ascii"),          // English DOS (US), cp437
    (0x1c, "ascii"),          // French DOS (Canada), cp863
    (0x1d, "ascii"),          // French DOS international, cp850
    (0x1f, "ascii"),          // Czech DOS, cp852
    (0x22, "ascii"),          // Hungarian DOS, cp852
    (0x23, "ascii"),          // Polish DOS, cp852
    (0x24, "ascii"),          // Portuguese DOS, cp860
    (0x25, "ascii"),          // Portuguese DOS international, cp850
    (0x26, "ibm866"),         // Russian DOS, cp866
    (0x37, "ascii"),          // English DOS (US) international, cp850
    (0x40, "ascii"),          // Romanian DOS, cp852
    (0x4d, "gbk"),            // Chinese PRC, cp936
    (0x4e, "euc-kr"),         // Korean, cp949
    (0x4f, "big5"),           // Chinese Taiwan, cp950
    (0x50, "windows-874"),    // Thai, cp874
    (0x57, "windows-1252"),   // ANSI
    (0x58, "windows-1252"),   // Western European ANSI
    (0x59, "windows-1252"),   // Spanish ANSI
    (0x64, "ascii"),          // Eastern European DOS, cp852
    (0x65, "ibm866"),         // Russian DOS, cp866
    (0x66, "ascii"),          // Nordic DOS, cp865
    (0x67, "ascii"),          // Icelandic DOS, cp861
    (0x6a, "ascii"),          // Greek DOS, cp737
    (0x6b, "ascii"),          // Turkish DOS, cp857
    (0x6c, "ascii"),          // French DOS (Canada), cp863
    (0x78, "big5"),           // Chinese Taiwan Windows, cp950
    (0x79, "euc-kr"),         // Korean Windows, cp949
    (0x7a, "gbk"),            // Chinese PRC Windows, cp936
    (0x7b, "shift_jis"),      // Japanese Windows, cp932
    (0x7c, "windows-874"),    // Thai Windows, cp874
    (0x7d, "windows-1255"),   // Hebrew Windows
    (0x7e, "windows-1256"),   // Arabic Windows
    (0x86, "ascii"),          // Greek OEM, cp737
    (0x87, "ascii"),          // Slovenian OEM, cp852
    (0x88, "ascii"),          // Turkish OEM, cp857
    (0x96, "x-mac-cyrillic"), // Russian Macintosh
    (0x97, "macintosh"),      // Eastern European Macintosh, cp10029
    (0x98, "macintosh"),      // Greek Macintosh, cp10006
    (0xc8, "windows-1250"),   // Eastern European Windows
    (0xc9, "windows-1251"),   // Russian Windows
    (0xca, "windows-1254"),   // Turkish Windows
    (0xcb, "windows-1253"),   // Greek Windows
    (0xcc, "windows-1257"),   // Baltic Windows
];

/// A validated language-driver byte from a ".dbf" header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePage(u8);

impl CodePage {
    /// The 0x00 "unspecified" driver. Decodes as ASCII.
    pub const UNSPECIFIED: CodePage = CodePage(0x00);

    /// The common Windows ANSI driver, 0x57.
    pub const WINDOWS_1252: CodePage = CodePage(0x57);

    pub fn from_byte(byte: u8) -> Option<CodePage> {
        CODE_PAGES.iter().find(|&&(b, _)| b == byte).map(|_| CodePage(byte))
    }

    pub fn byte(&self) -> u8 {
        self.0
    }

    pub fn label(&self) -> &'static str {
        // from_byte guarantees the byte is in the table
        CODE_PAGES.iter().find(|&&(b, _)| b == self.0).map(|&(_, label)| label).unwrap()
    }

    pub fn encoding(&self) -> EncodingRef {
        // every label in the table is a valid WHATWG label
        encoding::label::encoding_from_whatwg_label(self.label()).unwrap()
    }
}

impl fmt::Display for CodePage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "code page 0x{:02x} ({})", self.0, self.label())
    }
}

#[cfg(test)]
mod test {
    use super::CodePage;

    #[test]
    fn known_bytes_resolve() {
        let ansi = CodePage::from_byte(0x57).unwrap();
        assert_eq!(0x57, ansi.byte());
        assert_eq!("windows-1252", ansi.label());
        assert_eq!("windows-1252", ansi.encoding().name());
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        assert_eq!(None, CodePage::from_byte(0xff));
        assert_eq!(None, CodePage::from_byte(0x42));
    }

    #[test]
    fn every_table_entry_resolves_to_an_encoding() {
        for byte in 0..256usize {
            if let Some(page) = CodePage::from_byte(byte as u8) {
                // panics if any label is bogus
                let _ = page.encoding();
            }
        }
    }

    #[test]
    fn unspecified_is_ascii() {
        assert_eq!("ascii", CodePage::UNSPECIFIED.label());
    }
}
