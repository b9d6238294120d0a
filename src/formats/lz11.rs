//! Nintendo LZ77 type 0x11
//!
//! Same block structure as LZ10 with three back-reference widths chosen by
//! the top nibble of the first byte:
//!
//! * `2..=F`: two bytes, length `nibble + 1`
//! * `0`: three bytes, length `0x11..=0x110`
//! * `1`: four bytes, length `0x111..=0x10110`
//!
//! The displacement is always `displacement - 1` in the last twelve bits.

use super::{copy_match, encode_lz, output_buffer, ByteReader, FlagBlockWriter, LzFormat};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{pad_to, read_nintendo_header, write_nintendo_header, FormatId, Result};
use crate::matching::{
    FindLimitations, Match, Parse, ParseSettings, PriceCalculator, PriceContext, Token,
};

const TAG: u8 = 0x11;

/// Search limits of LZ11
pub const LIMITATIONS: FindLimitations = FindLimitations::new(3, 0x10110, 1, 0x1000);

/// Bit cost of LZ11 tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz11Price;

impl PriceCalculator for Lz11Price {
    fn literal_price(&self, _context: &PriceContext) -> u32 {
        9
    }

    fn match_price(&self, m: &Match, _context: &PriceContext) -> u32 {
        match m.length {
            0..=0x10 => 17,
            0x11..=0x110 => 25,
            _ => 33,
        }
    }
}

/// LZ11 encoder and decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz11;

impl LzFormat for Lz11 {
    fn id(&self) -> FormatId {
        FormatId::Lz11
    }

    fn limitations(&self) -> FindLimitations {
        LIMITATIONS
    }

    fn prices(&self) -> &dyn PriceCalculator {
        &Lz11Price
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
                    match m.length {
                        0..=0x10 => {
                            out.push(((m.length - 1) << 4 | disp >> 8) as u8);
                        }
                        0x11..=0x110 => {
                            let len = m.length - 0x11;
                            out.push((len >> 4) as u8);
                            out.push(((len & 0xF) << 4 | disp >> 8) as u8);
                        }
                        _ => {
                            let len = m.length - 0x111;
                            out.push((0x10 | len >> 12) as u8);
                            out.push((len >> 4) as u8);
                            out.push(((len & 0xF) << 4 | disp >> 8) as u8);
                        }
                    }
                    out.push(disp as u8);
                }
            }
        }

        pad_to(&mut out, 4, 0);
        Ok(out)
    }
}

impl Encoder for Lz11 {
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
        encode_lz(self, input, settings)
    }
}

impl Decoder for Lz11 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let size = read_nintendo_header(input, TAG)?;
        let mut reader = ByteReader::new(input, 4);
        let mut out = output_buffer(size);

        while out.len() < size {
            let flag = reader.read_u8()?;
            for bit in 0..8 {
                if out.len() >= size {
                    break;
                }
                if flag & (0x80 >> bit) == 0 {
                    out.push(reader.read_u8()?);
                    continue;
                }

                let b0 = reader.read_u8()? as usize;
                let (length, b1) = match b0 >> 4 {
                    0 => {
                        let b1 = reader.read_u8()? as usize;
                        (((b0 & 0xF) << 4 | b1 >> 4) + 0x11, b1)
                    }
                    1 => {
                        let b1 = reader.read_u8()? as usize;
                        let b2 = reader.read_u8()? as usize;
                        (((b0 & 0xF) << 12 | b1 << 4 | b2 >> 4) + 0x111, b2)
                    }
                    n => (n + 1, b0),
                };
                let b_last = reader.read_u8()? as usize;
                let displacement = ((b1 & 0xF) << 8 | b_last) + 1;
                copy_match(&mut out, displacement, length, size)?;
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(input: &[u8]) -> Vec<u8> {
        Lz11.encode(input, &ParseSettings::default()).unwrap().data
    }

    #[test]
    fn test_token_widths() {
        // 1 literal + one match of each width
        for (length, width) in [(0x10, 2), (0x110, 3), (0x400, 4)] {
            let input = vec![b'q'; length + 1];
            let packed = compress(&input);
            assert_eq!(packed[5], b'q');
            let token = &packed[6..6 + width];
            match width {
                2 => assert_eq!(token, [0xF0, 0x00]),
                3 => assert_eq!(token, [0x0F, 0xF0, 0x00]),
                _ => assert_eq!(token, [0x10, 0x2E, 0xF0, 0x00]),
            }
            assert_eq!(Lz11.decode(&packed).unwrap(), input);
        }
    }

    #[test]
    fn test_prices_follow_widths() {
        let ctx = PriceContext::default();
        let price = |len| Lz11Price.match_price(&Match::new(1, len, 1), &ctx);
        assert_eq!(price(3), 17);
        assert_eq!(price(0x10), 17);
        assert_eq!(price(0x11), 25);
        assert_eq!(price(0x111), 33);
    }

    #[test]
    fn test_mixed_text() {
        let input = b"LZ11 packs long runs: ".repeat(30);
        let packed = compress(&input);
        assert!(packed.len() < input.len() / 4);
        assert_eq!(Lz11.decode(&packed).unwrap(), input);
    }
}
