//! C7: the fixed 1014-byte physical block framing layered over the VBS
//! byte stream.
//!
//! Each physical block is 1014 bytes: the first 1012 are logical content,
//! the last 2 are a fixed `0x40 0x40` fill. [`Block1014Reader`] strips the
//! fill from every block and exposes the concatenated logical stream to
//! [`crate::vbs::VbsReader`] via [`LogicalSource`]; [`Block1014Writer`]
//! buffers logical bytes and emits full 1014-byte blocks as they fill,
//! padding the final partial block with `0x40` on
//! [`finish`](crate::vbs::LogicalSink::finish).

use std::io::Read;

use cardutil_core::{Error, Result};

use crate::vbs::{LogicalSink, LogicalSource};

const BLOCK_LEN: usize = 1014;
const LOGICAL_LEN: usize = 1012;
const FILL: [u8; 2] = [0x40, 0x40];

/// Strips the 2-byte fill from every 1014-byte physical block, exposing
/// the logical byte stream underneath.
#[derive(Debug)]
pub struct Block1014Reader<R> {
    source: R,
    buf: Vec<u8>,
    pos: usize,
    tolerant: bool,
}

impl<R: Read> Block1014Reader<R> {
    /// Wrap a byte source, requiring every block (including the last) to
    /// be a full 1014 bytes.
    pub fn new(source: R) -> Self {
        Block1014Reader { source, buf: Vec::new(), pos: 0, tolerant: false }
    }

    /// Wrap a byte source in tolerant mode: an incomplete final block is
    /// accepted as-is (its content, short fill bytes included, becomes
    /// the tail of the logical stream) instead of failing.
    pub fn tolerant(source: R) -> Self {
        Block1014Reader { source, buf: Vec::new(), pos: 0, tolerant: true }
    }

    /// Read one physical block and stage its logical content, returning
    /// `false` at a clean end of stream (no bytes of a new block read).
    fn fill_next_block(&mut self) -> Result<bool> {
        let mut block = [0u8; BLOCK_LEN];
        let mut read = 0;
        loop {
            match self.source.read(&mut block[read..])? {
                0 => break,
                n => {
                    read += n;
                    if read == BLOCK_LEN {
                        break;
                    }
                }
            }
        }
        if read == 0 {
            return Ok(false);
        }
        if read != BLOCK_LEN {
            if self.tolerant {
                self.buf = block[..read].to_vec();
                self.pos = 0;
                return Ok(true);
            }
            return Err(Error::block(format!(
                "incomplete final 1014-byte block: got {read} bytes"
            )));
        }
        self.buf = block[..LOGICAL_LEN].to_vec();
        self.pos = 0;
        Ok(true)
    }
}

impl<R: Read> LogicalSource for Block1014Reader<R> {
    fn read_some(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.pos >= self.buf.len() && !self.fill_next_block()? {
            return Ok(0);
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Buffers a logical byte stream and emits fixed 1014-byte physical
/// blocks, padding the trailing partial block with `0x40` on
/// [`finish`](LogicalSink::finish).
#[derive(Debug)]
pub struct Block1014Writer<W> {
    sink: W,
    buf: Vec<u8>,
}

impl<W: std::io::Write> Block1014Writer<W> {
    /// Wrap a byte sink.
    pub fn new(sink: W) -> Self {
        Block1014Writer { sink, buf: Vec::new() }
    }

    /// Unwrap the underlying sink. Call only after
    /// [`finish`](LogicalSink::finish) has run (normally via
    /// [`crate::vbs::VbsWriter::finalize`]).
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: std::io::Write> LogicalSink for Block1014Writer<W> {
    fn write_some(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);
        while self.buf.len() >= LOGICAL_LEN {
            let block: Vec<u8> = self.buf.drain(..LOGICAL_LEN).collect();
            self.sink.write_all(&block)?;
            self.sink.write_all(&FILL)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut last = std::mem::take(&mut self.buf);
        last.resize(LOGICAL_LEN, 0x40);
        self.sink.write_all(&last)?;
        self.sink.write_all(&FILL)?;
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_1014_padding_of_a_single_short_record() {
        let mut out = Vec::new();
        {
            let mut writer = Block1014Writer::new(&mut out);
            let mut vbs_record = Vec::new();
            vbs_record.extend_from_slice(&100u32.to_be_bytes());
            vbs_record.extend(std::iter::repeat(b'x').take(100));
            writer.write_some(&vbs_record).unwrap();
            writer.finish().unwrap();
        }
        assert_eq!(out.len(), 1014);
        assert_eq!(&out[1012..1014], &[0x40, 0x40]);
        assert!(out[104..1012].iter().all(|&b| b == 0x40));
    }

    #[test]
    fn exact_multiple_of_1012_still_emits_a_fill_terminated_block() {
        let mut out = Vec::new();
        {
            let mut writer = Block1014Writer::new(&mut out);
            writer.write_some(&vec![b'z'; LOGICAL_LEN]).unwrap();
            writer.finish().unwrap();
        }
        assert_eq!(out.len(), 2 * BLOCK_LEN);
        assert_eq!(&out[1012..1014], &[0x40, 0x40]);
        assert_eq!(&out[2026..2028], &[0x40, 0x40]);
        assert!(out[1014..2026].iter().all(|&b| b == 0x40));
    }

    #[test]
    fn unblock_then_reblock_round_trips() {
        let mut blocked = Vec::new();
        {
            let mut writer = Block1014Writer::new(&mut blocked);
            writer.write_some(b"hello world").unwrap();
            writer.finish().unwrap();
        }

        let mut reader = Block1014Reader::new(blocked.as_slice());
        let mut logical = Vec::new();
        let mut chunk = [0u8; 16];
        loop {
            let n = reader.read_some(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            logical.extend_from_slice(&chunk[..n]);
        }
        assert!(logical.starts_with(b"hello world"));
        assert_eq!(logical.len(), LOGICAL_LEN);
    }

    #[test]
    fn strict_mode_rejects_short_final_block() {
        let short = vec![b'a'; 500];
        let mut reader = Block1014Reader::new(short.as_slice());
        let mut chunk = [0u8; 16];
        assert!(reader.read_some(&mut chunk).is_err());
    }

    #[test]
    fn tolerant_mode_accepts_short_final_block() {
        let short = vec![b'a'; 500];
        let mut reader = Block1014Reader::tolerant(short.as_slice());
        let mut logical = Vec::new();
        let mut chunk = [0u8; 16];
        loop {
            let n = reader.read_some(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            logical.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(logical.len(), 500);
    }
}
