//! Yay0
//!
//! The table-split sibling of Yaz0. Header: `"Yay0"`, plaintext size, link
//! table offset, chunk table offset. Flag words follow the header with a set
//! bit for a literal. Back-references are u16 links `n << 12 | disp - 1`:
//! `n != 0` gives length `n + 2`, `n == 0` takes `length - 0x12` from the
//! chunk table. Literal bytes also go to the chunk table, in stream order.

use super::mio0::table_offsets;
use super::yaz0::Yaz0Price;
use super::{copy_match, encode_lz, output_buffer, write_u16, write_u32, ByteReader, LzFormat};
use crate::bits::{WordBitReader, WordBitWriter};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{expect_magic, ByteOrder, FormatId, FormatOptions, Result};
use crate::matching::{FindLimitations, Parse, ParseSettings, PriceCalculator, Token};

const MAGIC: &[u8; 4] = b"Yay0";
const HEADER_SIZE: usize = 0x10;

/// Search limits of Yay0
pub const LIMITATIONS: FindLimitations = FindLimitations::new(3, 0x111, 1, 0x1000);

/// Yay0 encoder and decoder
#[derive(Debug, Clone, Copy)]
pub struct Yay0 {
    options: FormatOptions,
}

impl Yay0 {
    /// Yay0 with header, tables and flag words laid out per `options`
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }
}

impl LzFormat for Yay0 {
    fn id(&self) -> FormatId {
        match self.options.byte_order {
            ByteOrder::LittleEndian => FormatId::Yay0Le,
            ByteOrder::BigEndian => FormatId::Yay0Be,
        }
    }

    fn limitations(&self) -> FindLimitations {
        LIMITATIONS
    }

    // token widths match Yaz0: a two-byte link, plus a chunk byte for long ones
    fn prices(&self) -> &dyn PriceCalculator {
        &Yaz0Price
    }

    fn write(&self, input: &[u8], parse: &Parse) -> Result<Vec<u8>> {
        let order = self.options.byte_order;
        let mut flags = WordBitWriter::new(self.options.bit_order, order);
        let mut links = Vec::new();
        let mut chunks = Vec::new();

        for token in parse.tokens() {
            match token {
                Token::Literal(pos) => {
                    flags.write_bit(true)?;
                    chunks.push(input[pos]);
                }
                Token::Match(m) => {
                    flags.write_bit(false)?;
                    let disp = m.displacement - 1;
                    if m.length < 0x12 {
                        write_u16(&mut links, ((m.length - 2) << 12 | disp) as u16, order);
                    } else {
                        write_u16(&mut links, disp as u16, order);
                        chunks.push((m.length - 0x12) as u8);
                    }
                }
            }
        }

        let flags = flags.finish()?;
        let link_offset = HEADER_SIZE + flags.len();
        let chunk_offset = link_offset + links.len();

        let mut out = Vec::with_capacity(chunk_offset + chunks.len());
        out.extend_from_slice(MAGIC);
        write_u32(&mut out, input.len() as u32, order);
        write_u32(&mut out, link_offset as u32, order);
        write_u32(&mut out, chunk_offset as u32, order);
        out.extend_from_slice(&flags);
        out.extend_from_slice(&links);
        out.extend_from_slice(&chunks);
        Ok(out)
    }
}

impl Encoder for Yay0 {
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
        encode_lz(self, input, settings)
    }
}

impl Decoder for Yay0 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        expect_magic(input, MAGIC)?;
        let order = self.options.byte_order;
        let (size, link_offset, chunk_offset) = table_offsets(input, order)?;

        let mut flags =
            WordBitReader::new(&input[HEADER_SIZE..link_offset], self.options.bit_order, order);
        let mut links = ByteReader::new(&input[..chunk_offset], link_offset);
        let mut chunks = ByteReader::new(input, chunk_offset);
        let mut out = output_buffer(size);

        while out.len() < size {
            if flags.read_bit()? {
                out.push(chunks.read_u8()?);
                continue;
            }
            let link = links.read_u16(order)? as usize;
            let length = match link >> 12 {
                0 => chunks.read_u8()? as usize + 0x12,
                n => n + 2,
            };
            copy_match(&mut out, (link & 0xFFF) + 1, length, size)?;
        }

        Ok(out)
    }
}
