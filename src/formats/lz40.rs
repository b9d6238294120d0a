//! Nintendo LZ types 0x40 and 0x60
//!
//! Flag blocks as in LZ10. A back-reference starts with two bytes holding a
//! 12-bit displacement split around a 4-bit length selector `n`:
//! `b0 = disp << 4 | n`, `b1 = disp >> 4`. The length lives in one of three
//! tiers:
//!
//! * `n >= 2`: the nibble itself
//! * `n == 0`: one extra byte, `0x10..=0x10F`
//! * `n == 1`: an extra little-endian u16, `0x110..=0x1010F`
//!
//! Type 0x60 shares the layout and differs only in its tag.

use super::{copy_match, encode_lz, output_buffer, ByteReader, FlagBlockWriter, LzFormat};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{
    pad_to, read_nintendo_header, write_nintendo_header, ByteOrder, FormatId, Result,
};
use crate::matching::{
    FindLimitations, Match, Parse, ParseSettings, PriceCalculator, PriceContext, Token,
};

/// Search limits shared by LZ40 and LZ60
pub const LIMITATIONS: FindLimitations = FindLimitations::new(3, 0x1010F, 1, 0xFFF);

/// Bit cost of LZ40 tokens: the length tier decides the width
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz40Price;

impl PriceCalculator for Lz40Price {
    fn literal_price(&self, _context: &PriceContext) -> u32 {
        9
    }

    fn match_price(&self, m: &Match, _context: &PriceContext) -> u32 {
        match m.length {
            0..=0xF => 17,
            0x10..=0x10F => 25,
            _ => 33,
        }
    }
}

/// LZ40/LZ60 encoder and decoder
#[derive(Debug, Clone, Copy)]
pub struct Lz40 {
    id: FormatId,
    tag: u8,
}

impl Lz40 {
    /// Type 0x40
    pub fn lz40() -> Self {
        Self {
            id: FormatId::Lz40,
            tag: 0x40,
        }
    }

    /// Type 0x60
    pub fn lz60() -> Self {
        Self {
            id: FormatId::Lz60,
            tag: 0x60,
        }
    }
}

impl LzFormat for Lz40 {
    fn id(&self) -> FormatId {
        self.id
    }

    fn limitations(&self) -> FindLimitations {
        LIMITATIONS
    }

    fn prices(&self) -> &dyn PriceCalculator {
        &Lz40Price
    }

    fn write(&self, input: &[u8], parse: &Parse) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(4 + input.len() + input.len() / 8 + 4);
        write_nintendo_header(&mut out, self.tag, input.len());

        let mut flags = FlagBlockWriter::new();
        for token in parse.tokens() {
            match token {
                Token::Literal(pos) => {
                    flags.flag(&mut out, false);
                    out.push(input[pos]);
                }
                Token::Match(m) => {
                    flags.flag(&mut out, true);
                    let disp = m.displacement;
                    let selector = match m.length {
                        0..=0xF => m.length,
                        0x10..=0x10F => 0,
                        _ => 1,
                    };
                    out.push(((disp & 0xF) << 4 | selector) as u8);
                    out.push((disp >> 4) as u8);
                    match m.length {
                        0..=0xF => {}
                        0x10..=0x10F => out.push((m.length - 0x10) as u8),
                        _ => super::write_u16(
                            &mut out,
                            (m.length - 0x110) as u16,
                            ByteOrder::LittleEndian,
                        ),
                    }
                }
            }
        }

        pad_to(&mut out, 4, 0);
        Ok(out)
    }
}

impl Encoder for Lz40 {
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
        encode_lz(self, input, settings)
    }
}

impl Decoder for Lz40 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let size = read_nintendo_header(input, self.tag)?;
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
                let b1 = reader.read_u8()? as usize;
                let displacement = b0 >> 4 | b1 << 4;
                let length = match b0 & 0xF {
                    0 => reader.read_u8()? as usize + 0x10,
                    1 => reader.read_u16(ByteOrder::LittleEndian)? as usize + 0x110,
                    n => n,
                };
                copy_match(&mut out, displacement, length, size)?;
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::ParseStrategy;

    /// A 16-byte repeat followed by text whose source starts one byte
    /// earlier: taking 0x10 bytes forces the 3-byte tier.
    const BOUNDARY: &[u8] = b"abcdefghijklmnop#pQRSTUVWXY!abcdefghijklmnopQRSTUVWXY";

    fn compress(format: Lz40, input: &[u8], strategy: ParseStrategy) -> Vec<u8> {
        let settings = ParseSettings {
            strategy,
            ..ParseSettings::default()
        };
        format.encode(input, &settings).unwrap().data
    }

    #[test]
    fn test_optimal_avoids_tier_escalation() {
        let settings = ParseSettings::default();
        let optimal = settings.parse(BOUNDARY, LIMITATIONS, &Lz40Price);
        let greedy = ParseSettings {
            strategy: ParseStrategy::Greedy,
            ..settings
        }
        .parse(BOUNDARY, LIMITATIONS, &Lz40Price);

        assert_eq!(greedy.matches(), &[Match::new(28, 16, 28), Match::new(44, 9, 26)]);
        assert_eq!(optimal.matches(), &[Match::new(28, 15, 28), Match::new(43, 10, 26)]);
        assert_eq!(optimal.price(&Lz40Price), greedy.price(&Lz40Price) - 8);

        let a = compress(Lz40::lz40(), BOUNDARY, ParseStrategy::Optimal);
        let b = compress(Lz40::lz40(), BOUNDARY, ParseStrategy::Greedy);
        assert_eq!(Lz40::lz40().decode(&a).unwrap(), BOUNDARY);
        assert_eq!(Lz40::lz40().decode(&b).unwrap(), BOUNDARY);
    }

    #[test]
    fn test_length_tiers() {
        let lz40 = Lz40::lz40();
        for (length, token) in [
            (0x0F, vec![0x1F, 0x00]),
            (0x10, vec![0x10, 0x00, 0x00]),
            (0x10F, vec![0x10, 0x00, 0xFF]),
            (0x110, vec![0x11, 0x00, 0x00, 0x00]),
        ] {
            let input = vec![7u8; length + 1];
            let packed = compress(lz40, &input, ParseStrategy::Optimal);
            assert_eq!(&packed[6..6 + token.len()], token.as_slice(), "length {length:#x}");
            assert_eq!(lz40.decode(&packed).unwrap(), input);
        }
    }

    #[test]
    fn test_lz60_tag() {
        let packed = compress(Lz40::lz60(), b"sixty sixty sixty", ParseStrategy::Optimal);
        assert_eq!(packed[0], 0x60);
        assert_eq!(Lz40::lz60().decode(&packed).unwrap(), b"sixty sixty sixty");
        assert!(Lz40::lz40().decode(&packed).is_err());
    }
}
