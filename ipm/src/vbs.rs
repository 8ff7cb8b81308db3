//! C6: Variable Block Sequential framing.
//!
//! Each record is a 4-byte big-endian length prefix followed by that many
//! payload bytes; a zero-length record terminates the stream. This module
//! is generic over [`LogicalSource`]/[`LogicalSink`] rather than directly
//! over `std::io::Read`/`Write` so that [`crate::block1014`]'s unblocking
//! can sit underneath it without framing violations being downgraded to
//! a generic I/O error as they cross a `std::io::Read` boundary.

use std::io::{Read, Write};

use cardutil_core::{Error, Result};
use tracing::warn;

const LEN_PREFIX: usize = 4;

/// A byte source that can report a short read without necessarily being
/// a `std::io::Read` itself — implemented directly by [`Read`] types and
/// by [`crate::block1014::Block1014Reader`], whose own framing errors
/// need to surface as [`Error::Block`] rather than a wrapped I/O error.
pub trait LogicalSource {
    /// Read up to `buf.len()` bytes. Returns `0` only at a clean end of
    /// stream; a short read mid-stream should keep returning bytes until
    /// true EOF, exactly like `std::io::Read::read`.
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<R: Read> LogicalSource for R {
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.read(buf)?)
    }
}

/// The write-side dual of [`LogicalSource`].
pub trait LogicalSink {
    /// Write all of `buf`.
    fn write_some(&mut self, buf: &[u8]) -> Result<()>;
    /// Called once, after the VBS terminator has been written, to flush
    /// any buffering the sink itself introduced (1014-block padding).
    /// The default is a no-op, suitable for a plain byte sink.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<W: Write> LogicalSink for W {
    fn write_some(&mut self, buf: &[u8]) -> Result<()> {
        self.write_all(buf)?;
        Ok(())
    }
}

/// A lazy, finite, non-restartable reader over a VBS-framed byte stream.
#[derive(Debug)]
pub struct VbsReader<S> {
    source: S,
    finished: bool,
}

impl<S: LogicalSource> VbsReader<S> {
    /// Wrap a logical byte source.
    pub fn new(source: S) -> Self {
        VbsReader { source, finished: false }
    }

    /// Read exactly `buf.len()` bytes. Returns `Ok(true)` once it has
    /// done so, `Ok(false)` if the stream ended cleanly before any byte
    /// of `buf` was read, or `Err(Truncated)` if it ended partway
    /// through.
    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read_some(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(Error::truncated(format!("EOF while reading {what}")));
            }
            filled += n;
        }
        Ok(true)
    }

    /// Read the next record, or `None` once the zero-length terminator
    /// has been consumed.
    pub fn next_record(&mut self) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }
        let mut len_buf = [0u8; LEN_PREFIX];
        if !self.read_exact(&mut len_buf, "record length prefix")? {
            self.finished = true;
            return Err(Error::truncated("stream ended before the VBS zero-length terminator"));
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        if len == 0 {
            self.finished = true;
            return Ok(None);
        }
        let mut payload = vec![0u8; len];
        if !self.read_exact(&mut payload, "record payload")? {
            return Err(Error::truncated("EOF while reading record payload"));
        }
        Ok(Some(payload))
    }
}

impl<S: LogicalSource> Iterator for VbsReader<S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(payload)) => Some(Ok(payload)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// A VBS record sink. Must be explicitly [`finalize`](Self::finalize)d to
/// emit the terminating zero-length record; dropping without finalising
/// is logged (the output up to that point is not a valid VBS stream).
#[derive(Debug)]
pub struct VbsWriter<S> {
    sink: Option<S>,
}

impl<S: LogicalSink> VbsWriter<S> {
    /// Wrap a logical byte sink.
    pub fn new(sink: S) -> Self {
        VbsWriter { sink: Some(sink) }
    }

    /// Write one record: its 4-byte big-endian length prefix followed by
    /// its payload.
    pub fn write_record(&mut self, payload: &[u8]) -> Result<()> {
        let sink = self.sink.as_mut().expect("write_record called after finalize()");
        let len = u32::try_from(payload.len())
            .map_err(|_| Error::block("record exceeds the 32-bit VBS length prefix"))?;
        sink.write_some(&len.to_be_bytes())?;
        sink.write_some(payload)?;
        Ok(())
    }

    /// Write the zero-length terminator and flush any underlying framing
    /// (1014-block padding), returning the wrapped sink.
    pub fn finalize(mut self) -> Result<S> {
        let mut sink = self.sink.take().expect("finalize() called twice");
        sink.write_some(&0u32.to_be_bytes())?;
        sink.finish()?;
        Ok(sink)
    }
}

impl<S> Drop for VbsWriter<S> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            warn!("VbsWriter dropped without calling finalize(); the output is not a valid VBS stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_vbs_terminator() {
        let mut out = Vec::new();
        {
            let mut writer = VbsWriter::new(&mut out);
            writer.write_record(b"AA").unwrap();
            writer.write_record(b"BBB").unwrap();
            writer.finalize().unwrap();
        }
        assert_eq!(
            out,
            vec![0, 0, 0, 2, b'A', b'A', 0, 0, 0, 3, b'B', b'B', b'B', 0, 0, 0, 0]
        );
    }

    #[test]
    fn reads_back_what_was_written() {
        let mut out = Vec::new();
        {
            let mut writer = VbsWriter::new(&mut out);
            writer.write_record(b"hello").unwrap();
            writer.write_record(b"world!").unwrap();
            writer.finalize().unwrap();
        }
        let mut reader = VbsReader::new(out.as_slice());
        assert_eq!(reader.next_record().unwrap(), Some(b"hello".to_vec()));
        assert_eq!(reader.next_record().unwrap(), Some(b"world!".to_vec()));
        assert_eq!(reader.next_record().unwrap(), None);
    }

    #[test]
    fn zero_length_record_acts_as_terminator_not_an_empty_payload() {
        // A record with an empty payload is, by the wire format itself,
        // indistinguishable from the terminator: writing one ends the
        // stream early rather than round-tripping as an empty record.
        let mut out = Vec::new();
        {
            let mut writer = VbsWriter::new(&mut out);
            writer.write_record(b"hello").unwrap();
            writer.write_record(b"").unwrap();
            writer.finalize().unwrap();
        }
        let mut reader = VbsReader::new(out.as_slice());
        assert_eq!(reader.next_record().unwrap(), Some(b"hello".to_vec()));
        assert_eq!(reader.next_record().unwrap(), None);
    }

    #[test]
    fn truncated_mid_record_is_truncated_error() {
        let buf = vec![0, 0, 0, 10, b'a', b'b']; // declares 10 bytes, only 2 present
        let mut reader = VbsReader::new(buf.as_slice());
        assert!(reader.next_record().is_err());
    }

    #[test]
    fn missing_terminator_is_truncated_error() {
        let buf = vec![0, 0, 0, 2, b'a', b'b']; // one record, no terminator
        let mut reader = VbsReader::new(buf.as_slice());
        assert_eq!(reader.next_record().unwrap(), Some(b"ab".to_vec()));
        assert!(reader.next_record().is_err());
    }
}
