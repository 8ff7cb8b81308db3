//! Encoding conversion: rewrite an IPM byte stream from one wire
//! character encoding to another.
//!
//! Re-uses [`crate::ipm`]'s reader/writer for framing, and the message
//! codec (C5) to transcode text-typed fields; binary-typed field bytes
//! pass through unchanged because they are never routed through
//! [`cardutil_encoding::text`] in the first place.

use std::io::{Read, Write};

use cardutil_core::field::FieldTable;
use cardutil_core::Result;
use cardutil_encoding::TextEncoding;
use cardutil_parser::Iso8583Codec;

use crate::ipm::{IpmReader, IpmWriter};

/// Read an IPM byte stream at `in_encoding` and rewrite it at
/// `out_encoding`, preserving framing (`use_1014_blocking`) and returning
/// the finalised sink.
pub fn convert_encoding<R: Read, W: Write>(
    source: R,
    sink: W,
    table: &FieldTable,
    in_encoding: TextEncoding,
    out_encoding: TextEncoding,
    use_1014_blocking: bool,
    hex_bin: bool,
) -> Result<W> {
    let in_codec = Iso8583Codec::new(table, in_encoding, hex_bin);
    let out_codec = Iso8583Codec::new(table, out_encoding, hex_bin);

    let mut reader = IpmReader::new(source, in_codec, use_1014_blocking);
    let mut writer = IpmWriter::new(sink, out_codec, use_1014_blocking);

    while let Some(record) = reader.next_record()? {
        writer.write_record(&record)?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardutil_core::field::{DataType, FieldDescriptor, FieldType};
    use cardutil_core::Record;
    use std::collections::BTreeMap;

    fn sample_table() -> FieldTable {
        let mut fields = BTreeMap::new();
        let mut de2 = FieldDescriptor::fixed_an("PAN", 19);
        de2.field_type = FieldType::LlVar;
        de2.data_type = DataType::Numeric;
        fields.insert(2, de2);
        FieldTable::new(fields)
    }

    #[test]
    fn s6_cp500_to_latin1_preserves_records() {
        let table = sample_table();
        let cp500_codec = Iso8583Codec::new(&table, TextEncoding::Cp500, false);

        let mut cp500_bytes = Vec::new();
        {
            let mut writer = IpmWriter::new(&mut cp500_bytes, cp500_codec, false);
            let mut record = Record::new();
            record.set_mti("1100");
            record.set_de(2, "4444555566667777");
            writer.write_record(&record).unwrap();
            writer.finalize().unwrap();
        }

        let mut latin1_bytes = Vec::new();
        convert_encoding(
            cp500_bytes.as_slice(),
            &mut latin1_bytes,
            &table,
            TextEncoding::Cp500,
            TextEncoding::Latin1,
            false,
            false,
        )
        .unwrap();

        let latin1_codec = Iso8583Codec::new(&table, TextEncoding::Latin1, false);
        let mut reader = IpmReader::new(latin1_bytes.as_slice(), latin1_codec, false);
        let decoded = reader.next_record().unwrap().unwrap();
        assert_eq!(decoded.mti(), Some("1100"));
        assert_eq!(decoded.de(2).unwrap().as_text(), Some("4444555566667777"));
    }
}
