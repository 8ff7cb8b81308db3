//! C1: bidirectional translation between a named wire character encoding
//! and canonical text.
//!
//! Two dialects are supported: an EBCDIC family (`cp500`/`cp037`, the IBM
//! mainframe code pages used on the wire by clearing files) and an
//! extended-ASCII family (`latin-1`). Binary-typed field values never pass
//! through here; only character-typed field payloads and the decimal
//! length-prefix digits that ride alongside `LLVAR`/`LLLVAR` fields do.

use std::collections::HashMap;
use std::sync::OnceLock;

use cardutil_core::{Error, Result};

use crate::ebcdic::ebcdic_to_char_table;

/// The wire character encoding a message or file is read/written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// IBM code page 500 (EBCDIC International).
    Cp500,
    /// IBM code page 037 (EBCDIC US/Canada).
    Cp037,
    /// ISO-8859-1 / latin-1.
    Latin1,
}

impl TextEncoding {
    /// Parse a configuration- or CLI-supplied encoding name.
    ///
    /// `cp500` and `cp037` share a table here (see the note on
    /// [`ebcdic_to_char_table`](crate::ebcdic::ebcdic_to_char_table)); they
    /// are kept as distinct variants because the configuration and CLI
    /// surface name them separately.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cp500" => Ok(TextEncoding::Cp500),
            "cp037" => Ok(TextEncoding::Cp037),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(TextEncoding::Latin1),
            other => Err(Error::config(format!("unknown encoding {other:?}"))),
        }
    }
}

fn ebcdic_tables() -> &'static ([char; 256], HashMap<char, u8>) {
    static TABLES: OnceLock<([char; 256], HashMap<char, u8>)> = OnceLock::new();
    TABLES.get_or_init(|| {
        let to_char = ebcdic_to_char_table();
        let mut to_byte = HashMap::with_capacity(256);
        for (byte, ch) in to_char.iter().enumerate() {
            to_byte.insert(*ch, byte as u8);
        }
        (to_char, to_byte)
    })
}

/// Decode bytes under the given encoding into canonical text.
///
/// `field` is the data element index being decoded, carried by
/// [`Error::Encoding`] so a caller can point a diagnostic at the right
/// place in the message; pass `0` for file-level (non-field) decoding such
/// as a length prefix.
pub fn to_text(bytes: &[u8], encoding: TextEncoding, field: u32) -> Result<String> {
    match encoding {
        TextEncoding::Cp500 | TextEncoding::Cp037 => {
            let (to_char, _) = ebcdic_tables();
            Ok(bytes.iter().map(|&b| to_char[b as usize]).collect())
        }
        TextEncoding::Latin1 => {
            use encoding::{DecoderTrap, Encoding as _};
            encoding::all::ISO_8859_1
                .decode(bytes, DecoderTrap::Strict)
                .map_err(|e| Error::encoding(field, format!("invalid latin-1 bytes: {e}")))
        }
    }
}

/// Encode canonical text into bytes under the given encoding.
pub fn from_text(text: &str, encoding: TextEncoding, field: u32) -> Result<Vec<u8>> {
    match encoding {
        TextEncoding::Cp500 | TextEncoding::Cp037 => {
            let (_, to_byte) = ebcdic_tables();
            text.chars()
                .map(|c| {
                    to_byte.get(&c).copied().ok_or_else(|| {
                        Error::encoding(field, format!("character {c:?} has no EBCDIC representation"))
                    })
                })
                .collect()
        }
        TextEncoding::Latin1 => {
            use encoding::{EncoderTrap, Encoding as _};
            encoding::all::ISO_8859_1
                .encode(text, EncoderTrap::Strict)
                .map_err(|e| Error::encoding(field, format!("cannot represent text in latin-1: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_digits_under_cp500() {
        let bytes = from_text("1144", TextEncoding::Cp500, 0).unwrap();
        assert_eq!(bytes, vec![0xF1, 0xF1, 0xF4, 0xF4]);
        assert_eq!(to_text(&bytes, TextEncoding::Cp500, 0).unwrap(), "1144");
    }

    #[test]
    fn round_trips_under_latin1() {
        let bytes = from_text("ABC123", TextEncoding::Latin1, 2).unwrap();
        assert_eq!(bytes, b"ABC123");
        assert_eq!(to_text(&bytes, TextEncoding::Latin1, 2).unwrap(), "ABC123");
    }

    #[test]
    fn unknown_encoding_name_is_config_error() {
        assert!(TextEncoding::from_name("utf-8").is_err());
    }
}
