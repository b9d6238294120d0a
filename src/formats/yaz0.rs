//! Yaz0
//!
//! Header: `"Yaz0"`, u32 plaintext size in the selected byte order, eight
//! reserved zero bytes. Blocks of a flag byte and eight tokens follow, but
//! here a set bit marks a *literal*. Back-references take two bytes
//! (`(len - 2) << 12 | disp - 1`) or, when the top nibble is zero, three
//! bytes with the length in the third as `len - 0x12`.

use super::{
    copy_match, encode_lz, output_buffer, read_u32, write_u32, ByteReader, FlagBlockWriter,
    LzFormat,
};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{expect_magic, ByteOrder, FormatId, Result};
use crate::matching::{
    FindLimitations, Match, Parse, ParseSettings, PriceCalculator, PriceContext, Token,
};

const MAGIC: &[u8; 4] = b"Yaz0";
const HEADER_SIZE: usize = 0x10;

/// Search limits of Yaz0; the first `min_length` bytes are always literals
pub const LIMITATIONS: FindLimitations =
    FindLimitations::new(3, 0x111, 1, 0x1000).with_search_start(3);

/// Bit cost of Yaz0 tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct Yaz0Price;

impl PriceCalculator for Yaz0Price {
    fn literal_price(&self, _context: &PriceContext) -> u32 {
        9
    }

    fn match_price(&self, m: &Match, _context: &PriceContext) -> u32 {
        if m.length < 0x12 {
            17
        } else {
            25
        }
    }
}

/// Yaz0 encoder and decoder
#[derive(Debug, Clone, Copy)]
pub struct Yaz0 {
    byte_order: ByteOrder,
}

impl Yaz0 {
    /// Yaz0 with the size field in `byte_order`
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }
}

impl LzFormat for Yaz0 {
    fn id(&self) -> FormatId {
        match self.byte_order {
            ByteOrder::LittleEndian => FormatId::Yaz0Le,
            ByteOrder::BigEndian => FormatId::Yaz0Be,
        }
    }

    fn limitations(&self) -> FindLimitations {
        LIMITATIONS
    }

    fn prices(&self) -> &dyn PriceCalculator {
        &Yaz0Price
    }

    fn write(&self, input: &[u8], parse: &Parse) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_SIZE + input.len() + input.len() / 8 + 1);
        out.extend_from_slice(MAGIC);
        write_u32(&mut out, input.len() as u32, self.byte_order);
        out.extend_from_slice(&[0; 8]);

        let mut flags = FlagBlockWriter::new();
        for token in parse.tokens() {
            match token {
                Token::Literal(pos) => {
                    flags.flag(&mut out, true);
                    out.push(input[pos]);
                }
                Token::Match(m) => {
                    flags.flag(&mut out, false);
                    let disp = m.displacement - 1;
                    if m.length < 0x12 {
                        out.push(((m.length - 2) << 4 | disp >> 8) as u8);
                        out.push(disp as u8);
                    } else {
                        out.push((disp >> 8) as u8);
                        out.push(disp as u8);
                        out.push((m.length - 0x12) as u8);
                    }
                }
            }
        }

        Ok(out)
    }
}

impl Encoder for Yaz0 {
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
        encode_lz(self, input, settings)
    }
}

impl Decoder for Yaz0 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        expect_magic(input, MAGIC)?;
        let size = read_u32(input, 4, self.byte_order)? as usize;
        let mut reader = ByteReader::new(input, HEADER_SIZE);
        let mut out = output_buffer(size);

        while out.len() < size {
            let flag = reader.read_u8()?;
            for bit in 0..8 {
                if out.len() >= size {
                    break;
                }
                if flag & (0x80 >> bit) != 0 {
                    out.push(reader.read_u8()?);
                    continue;
                }

                let b0 = reader.read_u8()? as usize;
                let b1 = reader.read_u8()? as usize;
                let displacement = ((b0 & 0xF) << 8 | b1) + 1;
                let length = match b0 >> 4 {
                    0 => reader.read_u8()? as usize + 0x12,
                    n => n + 2,
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
    use crate::common::LzError;

    #[test]
    fn test_twelve_a_is_one_match() {
        let input = b"AAAAAAAAAAAA";
        let parse = ParseSettings::default().parse(input, LIMITATIONS, &Yaz0Price);
        assert_eq!(parse.matches(), &[Match::new(3, 9, 1)]);
        assert_eq!(parse.literal_count(), 3);

        let packed = Yaz0::new(ByteOrder::BigEndian)
            .encode(input, &ParseSettings::default())
            .unwrap()
            .data;
        let mut expected = b"Yaz0\x00\x00\x00\x0C".to_vec();
        expected.extend_from_slice(&[0; 8]);
        expected.extend_from_slice(&[0xE0, b'A', b'A', b'A', 0x70, 0x00]);
        assert_eq!(packed, expected);
    }

    #[test]
    fn test_byte_orders_differ_only_in_size_field() {
        let input = b"endianness endianness endianness";
        let settings = ParseSettings::default();
        let le = Yaz0::new(ByteOrder::LittleEndian).encode(input, &settings).unwrap().data;
        let be = Yaz0::new(ByteOrder::BigEndian).encode(input, &settings).unwrap().data;
        assert_ne!(le, be);
        assert_eq!(le[8..], be[8..]);
        assert_eq!(Yaz0::new(ByteOrder::LittleEndian).decode(&le).unwrap(), input);
        assert_eq!(Yaz0::new(ByteOrder::BigEndian).decode(&be).unwrap(), input);
    }

    #[test]
    fn test_three_byte_token() {
        let input = vec![b'z'; 0x114];
        let packed = Yaz0::new(ByteOrder::BigEndian)
            .encode(&input, &ParseSettings::default())
            .unwrap()
            .data;
        // three leading literals, then the longest three-byte token
        assert_eq!(&packed[0x10..], &[0xE0, b'z', b'z', b'z', 0x00, 0x00, 0xFF]);
        assert_eq!(Yaz0::new(ByteOrder::BigEndian).decode(&packed).unwrap(), input);
    }

    #[test]
    fn test_bad_magic() {
        assert!(matches!(
            Yaz0::new(ByteOrder::BigEndian).decode(b"Yay0\0\0\0\x01\0\0\0\0\0\0\0\0"),
            Err(LzError::InvalidMagic { .. })
        ));
    }
}
