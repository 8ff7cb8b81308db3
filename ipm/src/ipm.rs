//! C8: the IPM reader/writer, composing C6/C7 framing with the C5
//! message codec.
//!
//! `IpmReader = C5 ∘ C6 [∘ C7]`: a lazy iterator over flat records.
//! `IpmWriter` is the dual: an append method plus a mandatory
//! [`finalize`](IpmWriter::finalize) that emits the VBS terminator and,
//! under 1014-blocking, pads the trailing physical block.

use std::io::{Read, Write};

use cardutil_core::{Record, Result};
use cardutil_parser::Iso8583Codec;

use crate::block1014::{Block1014Reader, Block1014Writer};
use crate::vbs::{LogicalSink, LogicalSource, VbsReader, VbsWriter};

/// Selects whether a file uses bare VBS framing or the 1014-block
/// envelope around it.
enum FramingSource<R> {
    Plain(R),
    Blocked(Block1014Reader<R>),
}

impl<R: Read> LogicalSource for FramingSource<R> {
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            FramingSource::Plain(r) => Ok(r.read(buf)?),
            FramingSource::Blocked(b) => b.read_some(buf),
        }
    }
}

enum FramingSink<W: Write> {
    Plain(W),
    Blocked(Block1014Writer<W>),
}

impl<W: Write> LogicalSink for FramingSink<W> {
    fn write_some(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            FramingSink::Plain(w) => {
                w.write_all(buf)?;
                Ok(())
            }
            FramingSink::Blocked(b) => b.write_some(buf),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            FramingSink::Plain(w) => {
                w.flush()?;
                Ok(())
            }
            FramingSink::Blocked(b) => b.finish(),
        }
    }
}

/// A lazy iterator of flat records over an IPM byte source.
pub struct IpmReader<'a, R: Read> {
    vbs: VbsReader<FramingSource<R>>,
    codec: Iso8583Codec<'a>,
}

impl<'a, R: Read> IpmReader<'a, R> {
    /// Open a reader over `source`, decoding each record with `codec`.
    /// `use_1014_blocking` selects the 1014-block envelope over bare VBS
    /// framing; a malformed final block fails unless
    /// [`with_tolerant_blocking`](Self::with_tolerant_blocking) was used
    /// to build the reader instead.
    pub fn new(source: R, codec: Iso8583Codec<'a>, use_1014_blocking: bool) -> Self {
        let framing = if use_1014_blocking {
            FramingSource::Blocked(Block1014Reader::new(source))
        } else {
            FramingSource::Plain(source)
        };
        IpmReader { vbs: VbsReader::new(framing), codec }
    }

    /// Open a 1014-blocked reader in tolerant mode: an incomplete final
    /// physical block is accepted rather than rejected.
    pub fn with_tolerant_blocking(source: R, codec: Iso8583Codec<'a>) -> Self {
        IpmReader {
            vbs: VbsReader::new(FramingSource::Blocked(Block1014Reader::tolerant(source))),
            codec,
        }
    }

    /// Decode and return the next record, or `None` once the VBS
    /// terminator has been consumed.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        match self.vbs.next_record()? {
            Some(bytes) => Ok(Some(self.codec.loads(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl<'a, R: Read> Iterator for IpmReader<'a, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// A record sink over an IPM byte destination. Must be explicitly
/// [`finalize`](Self::finalize)d; see [`VbsWriter`]'s drop behaviour.
pub struct IpmWriter<'a, W: Write> {
    vbs: VbsWriter<FramingSink<W>>,
    codec: Iso8583Codec<'a>,
}

impl<'a, W: Write> IpmWriter<'a, W> {
    /// Open a writer over `sink`, encoding each record with `codec`.
    pub fn new(sink: W, codec: Iso8583Codec<'a>, use_1014_blocking: bool) -> Self {
        let framing = if use_1014_blocking {
            FramingSink::Blocked(Block1014Writer::new(sink))
        } else {
            FramingSink::Plain(sink)
        };
        IpmWriter { vbs: VbsWriter::new(framing), codec }
    }

    /// Encode and append one record.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let bytes = self.codec.dumps(record)?;
        self.vbs.write_record(&bytes)
    }

    /// Write the VBS terminator, flush any 1014-block padding, and
    /// return the underlying sink.
    pub fn finalize(self) -> Result<W> {
        match self.vbs.finalize()? {
            FramingSink::Plain(w) => Ok(w),
            FramingSink::Blocked(b) => Ok(b.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardutil_core::field::{DataType, FieldDescriptor, FieldType};
    use cardutil_encoding::TextEncoding;
    use std::collections::BTreeMap;

    fn sample_table() -> cardutil_core::field::FieldTable {
        let mut fields = BTreeMap::new();
        let mut de2 = FieldDescriptor::fixed_an("PAN", 19);
        de2.field_type = FieldType::LlVar;
        de2.data_type = DataType::Numeric;
        fields.insert(2, de2);
        cardutil_core::field::FieldTable::new(fields)
    }

    #[test]
    fn writes_then_reads_two_records_plain_vbs() {
        let table = sample_table();
        let codec = Iso8583Codec::new(&table, TextEncoding::Latin1, false);

        let mut out = Vec::new();
        {
            let mut writer = IpmWriter::new(&mut out, codec, false);
            let mut r1 = Record::new();
            r1.set_mti("1100");
            r1.set_de(2, "4444555566667777");
            writer.write_record(&r1).unwrap();
            let mut r2 = Record::new();
            r2.set_mti("1110");
            r2.set_de(2, "1111222233334444");
            writer.write_record(&r2).unwrap();
            writer.finalize().unwrap();
        }

        let codec = Iso8583Codec::new(&table, TextEncoding::Latin1, false);
        let mut reader = IpmReader::new(out.as_slice(), codec, false);
        let r1 = reader.next_record().unwrap().unwrap();
        assert_eq!(r1.mti(), Some("1100"));
        let r2 = reader.next_record().unwrap().unwrap();
        assert_eq!(r2.mti(), Some("1110"));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn s3_round_trips_under_1014_blocking() {
        let table = sample_table();
        let codec = Iso8583Codec::new(&table, TextEncoding::Latin1, false);

        let mut out = Vec::new();
        {
            let mut writer = IpmWriter::new(&mut out, codec, true);
            let mut r1 = Record::new();
            r1.set_mti("1100");
            r1.set_de(2, "4444555566667777");
            writer.write_record(&r1).unwrap();
            writer.finalize().unwrap();
        }
        assert_eq!(out.len() % 1014, 0);

        let codec = Iso8583Codec::new(&table, TextEncoding::Latin1, false);
        let mut reader = IpmReader::new(out.as_slice(), codec, true);
        let decoded = reader.next_record().unwrap().unwrap();
        assert_eq!(decoded.mti(), Some("1100"));
        assert!(reader.next_record().unwrap().is_none());
    }
}
