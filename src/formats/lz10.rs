//! Nintendo LZ77 type 0x10
//!
//! Header `0x10 | u24 size`, then blocks of a flag byte followed by eight
//! tokens. A set flag bit marks a two-byte back-reference storing
//! `length - 3` in the top nibble and `displacement - 1` in the low twelve
//! bits. The Wii wraps the stream in an optional `"LZ77"` prefix, which the
//! decoder skips.

use super::{copy_match, encode_lz, output_buffer, ByteReader, FlagBlockWriter, LzFormat};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{pad_to, read_nintendo_header, write_nintendo_header, FormatId, Result};
use crate::matching::{FindLimitations, FlatPrice, Parse, ParseSettings, PriceCalculator, Token};

const TAG: u8 = 0x10;

/// Search limits of LZ10
pub const LIMITATIONS: FindLimitations = FindLimitations::new(3, 0x12, 1, 0x1000);

const PRICES: FlatPrice = FlatPrice {
    literal_bits: 9,
    match_bits: 17,
};

/// LZ10 encoder and decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz10;

impl LzFormat for Lz10 {
    fn id(&self) -> FormatId {
        FormatId::Lz10
    }

    fn limitations(&self) -> FindLimitations {
        LIMITATIONS
    }

    fn prices(&self) -> &dyn PriceCalculator {
        &PRICES
    }

    fn write(&self, input: &[u8], parse: &Parse) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(4 + input.len() + input.len() / 8 + 4);
        write_nintendo_header(&mut out, TAG, input.len());

        let mut flags = FlagBlockWriter::new();
        for token in parse.tokens() {
            match token {
                Token::Literal(pos) => {
                    flags.flag(&mut out, false);
                    out.push(input[pos]);
                }
                Token::Match(m) => {
                    flags.flag(&mut out, true);
                    let disp = m.displacement - 1;
                    out.push(((m.length - 3) << 4 | disp >> 8) as u8);
                    out.push(disp as u8);
                }
            }
        }

        pad_to(&mut out, 4, 0);
        Ok(out)
    }
}

impl Encoder for Lz10 {
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
        encode_lz(self, input, settings)
    }
}

impl Decoder for Lz10 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let data = input.strip_prefix(b"LZ77").unwrap_or(input);
        let size = read_nintendo_header(data, TAG)?;
        let mut reader = ByteReader::new(data, 4);
        let mut out = output_buffer(size);

        while out.len() < size {
            let flag = reader.read_u8()?;
            for bit in 0..8 {
                if out.len() >= size {
                    break;
                }
                if flag & (0x80 >> bit) == 0 {
                    out.push(reader.read_u8()?);
                } else {
                    let b0 = reader.read_u8()? as usize;
                    let b1 = reader.read_u8()? as usize;
                    let length = (b0 >> 4) + 3;
                    let displacement = ((b0 & 0xF) << 8 | b1) + 1;
                    copy_match(&mut out, displacement, length, size)?;
                }
            }
        }

        Ok(out)
    }
}
