//! Bit-level readers and writers
//!
//! Forward bitstreams are built on `bitstream-io`. Formats that store their
//! bits in 32-bit words (Huffman data, MIO0/Yay0 flag tables) pick the bit
//! order inside a word and the byte order of the word independently, so the
//! writers here produce a stream in the word's natural byte order first and
//! swap each word afterwards when the other order is requested.
//!
//! Backward streams (CRILAYLA, backward LZ77) are consumed from the end of
//! an in-memory buffer towards its start through an index, never through a
//! reversed I/O stream.

use crate::common::{BitOrder, ByteOrder, LzError, Result};
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, LittleEndian};
use std::fmt;
use std::io::{self, Cursor};

/// Map an end-of-data I/O error to a truncated stream error
fn truncated(err: io::Error, available: usize) -> LzError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        LzError::TruncatedStream {
            needed: 1,
            available,
        }
    } else {
        LzError::Io(err)
    }
}

/// Reverse every 4-byte group of `bytes` in place
fn swap_words(bytes: &mut [u8]) {
    for word in bytes.chunks_exact_mut(4) {
        word.reverse();
    }
}

/// Whether words in `byte_order` store their first bit in the first byte
fn natural_order(bit_order: BitOrder, byte_order: ByteOrder) -> bool {
    matches!(
        (bit_order, byte_order),
        (BitOrder::MsbFirst, ByteOrder::BigEndian) | (BitOrder::LsbFirst, ByteOrder::LittleEndian)
    )
}

enum WriterInner {
    Msb(BitWriter<Vec<u8>, BigEndian>),
    Lsb(BitWriter<Vec<u8>, LittleEndian>),
}

/// Writes a bitstream packed into 32-bit words
pub struct WordBitWriter {
    inner: WriterInner,
    bit_order: BitOrder,
    byte_order: ByteOrder,
    written: u64,
}

impl WordBitWriter {
    /// Create a writer for words in `byte_order` filled in `bit_order`
    pub fn new(bit_order: BitOrder, byte_order: ByteOrder) -> Self {
        let inner = match bit_order {
            BitOrder::MsbFirst => WriterInner::Msb(BitWriter::endian(Vec::new(), BigEndian)),
            BitOrder::LsbFirst => WriterInner::Lsb(BitWriter::endian(Vec::new(), LittleEndian)),
        };
        Self {
            inner,
            bit_order,
            byte_order,
            written: 0,
        }
    }

    /// Append one bit
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        match &mut self.inner {
            WriterInner::Msb(w) => w.write_bit(bit)?,
            WriterInner::Lsb(w) => w.write_bit(bit)?,
        }
        self.written += 1;
        Ok(())
    }

    /// Append the low `count` bits of `value`, most significant of them first
    ///
    /// The code is emitted as a sequence of single bits so a Huffman code
    /// keeps its prefix order whatever the bit order of the word is.
    pub fn write_code(&mut self, count: u32, value: u32) -> Result<()> {
        for i in (0..count).rev() {
            self.write_bit((value >> i) & 1 != 0)?;
        }
        Ok(())
    }

    /// Number of bits written so far
    pub fn bits_written(&self) -> u64 {
        self.written
    }

    /// Pad the last word with zero bits and return the bytes
    pub fn finish(mut self) -> Result<Vec<u8>> {
        while self.written % 32 != 0 {
            self.write_bit(false)?;
        }
        let mut bytes = match self.inner {
            WriterInner::Msb(w) => w.into_writer(),
            WriterInner::Lsb(w) => w.into_writer(),
        };
        if !natural_order(self.bit_order, self.byte_order) {
            swap_words(&mut bytes);
        }
        Ok(bytes)
    }
}

impl fmt::Debug for WordBitWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordBitWriter")
            .field("bit_order", &self.bit_order)
            .field("byte_order", &self.byte_order)
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

enum ReaderInner {
    Msb(BitReader<Cursor<Vec<u8>>, BigEndian>),
    Lsb(BitReader<Cursor<Vec<u8>>, LittleEndian>),
}

/// Reads a bitstream packed into 32-bit words
pub struct WordBitReader {
    inner: ReaderInner,
    total_bits: u64,
    read: u64,
}

impl WordBitReader {
    /// Create a reader over `data`; a trailing partial word is ignored
    pub fn new(data: &[u8], bit_order: BitOrder, byte_order: ByteOrder) -> Self {
        let mut bytes = data[..data.len() - data.len() % 4].to_vec();
        if !natural_order(bit_order, byte_order) {
            swap_words(&mut bytes);
        }
        let total_bits = bytes.len() as u64 * 8;
        let inner = match bit_order {
            BitOrder::MsbFirst => ReaderInner::Msb(BitReader::endian(Cursor::new(bytes), BigEndian)),
            BitOrder::LsbFirst => {
                ReaderInner::Lsb(BitReader::endian(Cursor::new(bytes), LittleEndian))
            }
        };
        Self {
            inner,
            total_bits,
            read: 0,
        }
    }

    /// Read one bit
    pub fn read_bit(&mut self) -> Result<bool> {
        let available = ((self.total_bits - self.read.min(self.total_bits)) / 8) as usize;
        let bit = match &mut self.inner {
            ReaderInner::Msb(r) => r.read_bit(),
            ReaderInner::Lsb(r) => r.read_bit(),
        }
        .map_err(|e| truncated(e, available))?;
        self.read += 1;
        Ok(bit)
    }

    /// Bits consumed so far
    pub fn bits_read(&self) -> u64 {
        self.read
    }
}

impl fmt::Debug for WordBitReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordBitReader")
            .field("total_bits", &self.total_bits)
            .field("read", &self.read)
            .finish_non_exhaustive()
    }
}

/// Cursor that walks an in-memory buffer from `end` down to `start`
#[derive(Debug, Clone)]
pub struct BackwardCursor<'a> {
    data: &'a [u8],
    pos: usize,
    start: usize,
}

impl<'a> BackwardCursor<'a> {
    /// Cursor over `data[start..end]`, positioned at `end`
    pub fn new(data: &'a [u8], start: usize, end: usize) -> Result<Self> {
        if start > end || end > data.len() {
            return Err(LzError::InvalidHeader(format!(
                "backward region {start:#x}..{end:#x} outside a {:#x}-byte buffer",
                data.len()
            )));
        }
        Ok(Self {
            data,
            pos: end,
            start,
        })
    }

    /// Take the byte just below the cursor
    pub fn read_u8(&mut self) -> Result<u8> {
        if self.pos <= self.start {
            return Err(LzError::TruncatedStream {
                needed: 1,
                available: 0,
            });
        }
        self.pos -= 1;
        Ok(self.data[self.pos])
    }

    /// Index of the next byte that would be read, plus one
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether every byte of the region has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.pos <= self.start
    }
}

/// MSB-first bit reader over a [`BackwardCursor`]
#[derive(Debug, Clone)]
pub struct BackwardBitReader<'a> {
    cursor: BackwardCursor<'a>,
    pool: u8,
    bits_left: u32,
}

impl<'a> BackwardBitReader<'a> {
    /// Read bits from `data[start..end]`, last byte first
    pub fn new(data: &'a [u8], start: usize, end: usize) -> Result<Self> {
        Ok(Self {
            cursor: BackwardCursor::new(data, start, end)?,
            pool: 0,
            bits_left: 0,
        })
    }

    /// Read `count` bits (at most 32) as an unsigned value
    pub fn read_bits(&mut self, count: u32) -> Result<u32> {
        let mut value = 0u32;
        let mut produced = 0;
        while produced < count {
            if self.bits_left == 0 {
                self.pool = self.cursor.read_u8()?;
                self.bits_left = 8;
            }
            let take = self.bits_left.min(count - produced);
            let chunk = (self.pool as u32 >> (self.bits_left - take)) & ((1 << take) - 1);
            value = (value << take) | chunk;
            self.bits_left -= take;
            produced += take;
        }
        Ok(value)
    }
}

/// Builds a bitstream that a [`BackwardBitReader`] consumes in write order
pub struct BackwardBitWriter {
    inner: BitWriter<Vec<u8>, BigEndian>,
    written: u64,
}

impl BackwardBitWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self {
            inner: BitWriter::endian(Vec::new(), BigEndian),
            written: 0,
        }
    }

    /// Append the low `count` bits of `value`, most significant first
    pub fn write_bits(&mut self, count: u32, value: u32) -> Result<()> {
        if count > 0 {
            self.inner.write(count, value)?;
            self.written += count as u64;
        }
        Ok(())
    }

    /// Number of bits written so far
    pub fn bits_written(&self) -> u64 {
        self.written
    }

    /// Zero-pad the last byte and return the bytes in storage order
    ///
    /// The first byte written ends up last in the returned buffer.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.inner.byte_align()?;
        let mut bytes = self.inner.into_writer();
        bytes.reverse();
        Ok(bytes)
    }
}

impl fmt::Debug for BackwardBitWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackwardBitWriter")
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl Default for BackwardBitWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_writer_msb_little_endian() {
        let mut w = WordBitWriter::new(BitOrder::MsbFirst, ByteOrder::LittleEndian);
        w.write_code(3, 0b101).unwrap();
        let bytes = w.finish().unwrap();
        // 101 followed by zeros in a u32 = 0xA0000000, stored little-endian
        assert_eq!(bytes, [0x00, 0x00, 0x00, 0xA0]);
    }

    #[test]
    fn test_word_writer_msb_big_endian() {
        let mut w = WordBitWriter::new(BitOrder::MsbFirst, ByteOrder::BigEndian);
        w.write_code(3, 0b101).unwrap();
        assert_eq!(w.finish().unwrap(), [0xA0, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_word_writer_lsb_little_endian() {
        let mut w = WordBitWriter::new(BitOrder::LsbFirst, ByteOrder::LittleEndian);
        w.write_bit(true).unwrap();
        w.write_bit(false).unwrap();
        w.write_bit(true).unwrap();
        assert_eq!(w.finish().unwrap(), [0x05, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_word_round_trip_all_orders() {
        let pattern: Vec<bool> = (0..77).map(|i| (i * 7 + 3) % 5 < 2).collect();
        for bit_order in [BitOrder::MsbFirst, BitOrder::LsbFirst] {
            for byte_order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
                let mut w = WordBitWriter::new(bit_order, byte_order);
                for &bit in &pattern {
                    w.write_bit(bit).unwrap();
                }
                let bytes = w.finish().unwrap();
                assert_eq!(bytes.len(), 12);
                let mut r = WordBitReader::new(&bytes, bit_order, byte_order);
                for &bit in &pattern {
                    assert_eq!(r.read_bit().unwrap(), bit);
                }
            }
        }
    }

    #[test]
    fn test_word_reader_reports_truncation() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let mut r = WordBitReader::new(&data, BitOrder::MsbFirst, ByteOrder::BigEndian);
        for _ in 0..32 {
            assert!(r.read_bit().unwrap());
        }
        assert!(matches!(r.read_bit(), Err(LzError::TruncatedStream { .. })));
    }

    #[test]
    fn test_backward_cursor() {
        let data = [1u8, 2, 3, 4, 5];
        let mut c = BackwardCursor::new(&data, 1, 4).unwrap();
        assert_eq!(c.read_u8().unwrap(), 4);
        assert_eq!(c.read_u8().unwrap(), 3);
        assert_eq!(c.read_u8().unwrap(), 2);
        assert!(c.is_exhausted());
        assert!(matches!(c.read_u8(), Err(LzError::TruncatedStream { .. })));
        assert!(BackwardCursor::new(&data, 3, 9).is_err());
    }

    #[test]
    fn test_backward_bits_round_trip() {
        let fields = [(1u32, 1u32), (13, 0x1ABC), (2, 3), (3, 5), (8, 0xFF), (5, 0)];
        let mut w = BackwardBitWriter::new();
        for &(count, value) in &fields {
            w.write_bits(count, value).unwrap();
        }
        let bytes = w.finish().unwrap();
        let mut r = BackwardBitReader::new(&bytes, 0, bytes.len()).unwrap();
        for &(count, value) in &fields {
            assert_eq!(r.read_bits(count).unwrap(), value);
        }
    }

    #[test]
    fn test_backward_reader_reads_last_byte_first() {
        let data = [0x00, 0x80];
        let mut r = BackwardBitReader::new(&data, 0, 2).unwrap();
        assert_eq!(r.read_bits(1).unwrap(), 1);
        assert_eq!(r.read_bits(7).unwrap(), 0);
        assert_eq!(r.read_bits(8).unwrap(), 0);
        assert!(r.read_bits(1).is_err());
    }
}
