//! Frames blocks off of a byte stream and hands them to [`Block::parse`].
//!
//! Grounded in the teacher's `internal/block_reader.rs`: same
//! fill-then-frame loop, minus the `buf_redux` dependency (a plain
//! growable `Vec<u8>` plays the role of its `MinBuffered` policy here).

use std::io::{self, Read};

use bytes::Bytes;
use thiserror::Error;

use crate::block::frame::{parse_frame, FrameError};
use crate::block::util::{BlockError, Endianness};
use crate::block::{Block, BlockType};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error("file ended in the middle of a block")]
    TruncatedFile,
}

const READ_CHUNK: usize = 8 * 1024;

/// Reads length-delimited pcap-ng blocks off of `R`, tracking the
/// section's endianness as it goes (each Section Header Block can
/// switch it).
pub struct BlockReader<R> {
    rdr: R,
    buf: Vec<u8>,
    endianness: Endianness,
    eof: bool,
}

impl<R: Read> BlockReader<R> {
    pub fn new(rdr: R) -> BlockReader<R> {
        BlockReader {
            rdr,
            buf: Vec::with_capacity(READ_CHUNK),
            endianness: Endianness::Little,
            eof: false,
        }
    }

    fn fill_more(&mut self) -> Result<bool, ReaderError> {
        if self.eof {
            return Ok(false);
        }
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.rdr.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(true)
    }

    /// Returns the next block in the stream, or `None` at a clean EOF
    /// (no bytes left, no partial block pending).
    pub fn next_block(&mut self) -> Result<Option<Block>, ReaderError> {
        loop {
            match parse_frame(&self.buf, &mut self.endianness)? {
                Some((block_type, data_len)) => {
                    let data = Bytes::copy_from_slice(&self.buf[8..8 + data_len]);
                    let block_len = data_len + 12;
                    let block = Block::parse(block_type, data, self.endianness)?;
                    self.buf.drain(..block_len);
                    return Ok(Some(block));
                }
                None => {
                    if !self.fill_more()? {
                        return if self.buf.is_empty() {
                            Ok(None)
                        } else {
                            Err(ReaderError::TruncatedFile)
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shb_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0x0A0D_0D0Au32.to_le_bytes()); // block type
        b.extend_from_slice(&28u32.to_le_bytes()); // block total length
        b.extend_from_slice(&[0x4D, 0x3C, 0x2B, 0x1A]); // byte-order magic (LE)
        b.extend_from_slice(&1u16.to_le_bytes()); // major
        b.extend_from_slice(&0u16.to_le_bytes()); // minor
        b.extend_from_slice(&(-1i64).to_le_bytes()); // section length unknown
        b.extend_from_slice(&28u32.to_le_bytes()); // block total length (trailer)
        b
    }

    #[test]
    fn reads_a_bare_section_header() {
        let bytes = shb_bytes();
        let mut rdr = BlockReader::new(&bytes[..]);
        let block = rdr.next_block().unwrap().unwrap();
        assert!(matches!(block, Block::SectionHeader(_)));
        assert!(rdr.next_block().unwrap().is_none());
    }

    #[test]
    fn truncated_block_is_an_error() {
        let mut bytes = shb_bytes();
        bytes.truncate(bytes.len() - 6);
        let mut rdr = BlockReader::new(&bytes[..]);
        assert!(matches!(rdr.next_block(), Err(ReaderError::TruncatedFile)));
    }
}
