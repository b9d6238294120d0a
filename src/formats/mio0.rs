//! MIO0
//!
//! Header: `"MIO0"`, plaintext size, offset of the compressed table, offset
//! of the uncompressed table (all u32 in the selected byte order). The flag
//! stream follows the header as 32-bit words, one bit per token, set for a
//! literal. Back-references go to the compressed table as u16
//! `(len - 3) << 12 | disp - 1`; literal bytes go to the uncompressed table.

use super::{
    copy_match, encode_lz, output_buffer, read_u32, write_u16, write_u32, ByteReader, LzFormat,
};
use crate::bits::{WordBitReader, WordBitWriter};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{expect_magic, ByteOrder, FormatId, FormatOptions, LzError, Result};
use crate::matching::{FindLimitations, FlatPrice, Parse, ParseSettings, PriceCalculator, Token};

const MAGIC: &[u8; 4] = b"MIO0";
const HEADER_SIZE: usize = 0x10;

/// Search limits of MIO0
pub const LIMITATIONS: FindLimitations = FindLimitations::new(3, 0x12, 1, 0x1000);

const PRICES: FlatPrice = FlatPrice {
    literal_bits: 9,
    match_bits: 17,
};

/// MIO0 encoder and decoder
#[derive(Debug, Clone, Copy)]
pub struct Mio0 {
    options: FormatOptions,
}

impl Mio0 {
    /// MIO0 with header, tables and flag words laid out per `options`
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }
}

/// Table offsets of a decoded header, checked against the buffer
pub(crate) fn table_offsets(
    input: &[u8],
    byte_order: ByteOrder,
) -> Result<(usize, usize, usize)> {
    let size = read_u32(input, 4, byte_order)? as usize;
    let first = read_u32(input, 8, byte_order)? as usize;
    let second = read_u32(input, 12, byte_order)? as usize;
    if first < HEADER_SIZE || first > second || second > input.len() {
        return Err(LzError::InvalidHeader(format!(
            "table offsets {first:#x}/{second:#x} do not fit a {:#x}-byte buffer",
            input.len()
        )));
    }
    Ok((size, first, second))
}

impl LzFormat for Mio0 {
    fn id(&self) -> FormatId {
        match self.options.byte_order {
            ByteOrder::LittleEndian => FormatId::Mio0Le,
            ByteOrder::BigEndian => FormatId::Mio0Be,
        }
    }

    fn limitations(&self) -> FindLimitations {
        LIMITATIONS
    }

    fn prices(&self) -> &dyn PriceCalculator {
        &PRICES
    }

    fn write(&self, input: &[u8], parse: &Parse) -> Result<Vec<u8>> {
        let order = self.options.byte_order;
        let mut flags = WordBitWriter::new(self.options.bit_order, order);
        let mut compressed = Vec::new();
        let mut uncompressed = Vec::new();

        for token in parse.tokens() {
            match token {
                Token::Literal(pos) => {
                    flags.write_bit(true)?;
                    uncompressed.push(input[pos]);
                }
                Token::Match(m) => {
                    flags.write_bit(false)?;
                    let value = (m.length - 3) << 12 | (m.displacement - 1);
                    write_u16(&mut compressed, value as u16, order);
                }
            }
        }

        let flags = flags.finish()?;
        let compressed_offset = HEADER_SIZE + flags.len();
        let uncompressed_offset = compressed_offset + compressed.len();

        let mut out = Vec::with_capacity(uncompressed_offset + uncompressed.len());
        out.extend_from_slice(MAGIC);
        write_u32(&mut out, input.len() as u32, order);
        write_u32(&mut out, compressed_offset as u32, order);
        write_u32(&mut out, uncompressed_offset as u32, order);
        out.extend_from_slice(&flags);
        out.extend_from_slice(&compressed);
        out.extend_from_slice(&uncompressed);
        Ok(out)
    }
}

impl Encoder for Mio0 {
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
        encode_lz(self, input, settings)
    }
}

impl Decoder for Mio0 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        expect_magic(input, MAGIC)?;
        let order = self.options.byte_order;
        let (size, compressed_offset, uncompressed_offset) = table_offsets(input, order)?;

        let mut flags = WordBitReader::new(
            &input[HEADER_SIZE..compressed_offset],
            self.options.bit_order,
            order,
        );
        let mut compressed = ByteReader::new(&input[..uncompressed_offset], compressed_offset);
        let mut uncompressed = ByteReader::new(input, uncompressed_offset);
        let mut out = output_buffer(size);

        while out.len() < size {
            if flags.read_bit()? {
                out.push(uncompressed.read_u8()?);
            } else {
                let value = compressed.read_u16(order)? as usize;
                copy_match(&mut out, (value & 0xFFF) + 1, (value >> 12) + 3, size)?;
            }
        }

        Ok(out)
    }
}
