//! CRI Middleware CRILAYLA
//!
//! Layout:
//!
//! ```text
//! 0x00  "CRILAYLA"
//! 0x08  u32 LE  size of the plaintext after the raw prefix (the body)
//! 0x0C  u32 LE  size of the compressed region
//! 0x10  compressed region
//!       0x100 raw prefix bytes
//! ```
//!
//! The region is a bitstream consumed from its last byte towards its first,
//! MSB-first inside each byte, and the body is rebuilt from its last byte
//! towards its first. A token is a flag bit; `0` is followed by an 8-bit
//! literal, `1` by a 13-bit displacement (`disp - 3`) and a chained length:
//! fields of 2, 3, 5 and 8 bits are added to 3 while each reads its maximum,
//! after which 8-bit fields keep being added while they read 255.

use crate::bits::{BackwardBitReader, BackwardBitWriter};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{
    check_plaintext_size, expect_magic, FormatId, LzError, Result, CRILAYLA_RAW_PREFIX,
};
use crate::matching::{
    FindLimitations, Match, ParseSettings, PriceCalculator, PriceContext, Token,
};
use log::debug;

const MAGIC: &[u8; 8] = b"CRILAYLA";
const HEADER_SIZE: usize = 0x10;

/// Widths of the chained length fields before the open-ended 8-bit tail
const LENGTH_FIELDS: [u32; 4] = [2, 3, 5, 8];

/// Search limits of CRILAYLA; lengths are unbounded
pub const LIMITATIONS: FindLimitations = FindLimitations::new(3, u32::MAX as usize, 3, 0x2002);

/// Bit cost of CRILAYLA tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct CrilaylaPrice;

/// Bits taken by the length chain for `length - 3`
fn length_bits(extra: usize) -> u32 {
    match extra {
        0..=2 => 2,
        3..=9 => 5,
        10..=40 => 10,
        41..=295 => 18,
        _ => 18 + 8 * (1 + (extra - 296) / 255) as u32,
    }
}

impl PriceCalculator for CrilaylaPrice {
    fn literal_price(&self, _context: &PriceContext) -> u32 {
        9
    }

    fn match_price(&self, m: &Match, _context: &PriceContext) -> u32 {
        14 + length_bits(m.length - 3)
    }
}

/// CRILAYLA encoder and decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct Crilayla;

fn write_length(bits: &mut BackwardBitWriter, length: usize) -> Result<()> {
    let mut extra = length - 3;
    for width in LENGTH_FIELDS {
        let max = (1usize << width) - 1;
        if extra < max {
            return bits.write_bits(width, extra as u32);
        }
        bits.write_bits(width, max as u32)?;
        extra -= max;
    }
    loop {
        let chunk = extra.min(0xFF);
        bits.write_bits(8, chunk as u32)?;
        extra -= chunk;
        if chunk < 0xFF {
            return Ok(());
        }
    }
}

fn read_length(bits: &mut BackwardBitReader) -> Result<usize> {
    let mut length = 3usize;
    for width in LENGTH_FIELDS {
        let field = bits.read_bits(width)? as usize;
        length += field;
        if field != (1 << width) - 1 {
            return Ok(length);
        }
    }
    loop {
        let field = bits.read_bits(8)? as usize;
        length += field;
        if field != 0xFF {
            return Ok(length);
        }
    }
}

impl Encoder for Crilayla {
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
        check_plaintext_size(FormatId::Crilayla, input.len())?;
        let (prefix, body) = input.split_at(CRILAYLA_RAW_PREFIX);

        // the decoder rebuilds the body back to front, so the body is
        // parsed reversed
        let reversed: Vec<u8> = body.iter().rev().copied().collect();
        let parse = settings.parse(&reversed, LIMITATIONS, &CrilaylaPrice);

        let mut bits = BackwardBitWriter::new();
        for token in parse.tokens() {
            match token {
                Token::Literal(pos) => {
                    bits.write_bits(1, 0)?;
                    bits.write_bits(8, reversed[pos] as u32)?;
                }
                Token::Match(m) => {
                    bits.write_bits(1, 1)?;
                    bits.write_bits(13, (m.displacement - 3) as u32)?;
                    write_length(&mut bits, m.length)?;
                }
            }
        }
        let stream = bits.finish()?;

        // alignment padding sits in front, where the reader never gets to
        let padding = (4 - stream.len() % 4) % 4;
        let region_len = padding + stream.len();
        if region_len > u32::MAX as usize {
            return Err(LzError::InputTooLarge {
                size: input.len(),
                max: FormatId::Crilayla.max_plaintext_size(),
            });
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + region_len + CRILAYLA_RAW_PREFIX);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&(region_len as u32).to_le_bytes());
        out.resize(HEADER_SIZE + padding, 0);
        out.extend_from_slice(&stream);
        out.extend_from_slice(prefix);

        debug!(
            "crilayla: {} -> {} bytes ({} literals, {} matches)",
            input.len(),
            out.len(),
            parse.literal_count(),
            parse.match_count()
        );
        Ok(Encoded::from_parse(out, &parse))
    }
}

impl Decoder for Crilayla {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        expect_magic(input, MAGIC)?;
        if input.len() < HEADER_SIZE {
            return Err(LzError::TruncatedStream {
                needed: HEADER_SIZE,
                available: input.len(),
            });
        }
        let field = |at: usize| {
            u32::from_le_bytes([input[at], input[at + 1], input[at + 2], input[at + 3]]) as usize
        };
        let body_len = field(8);
        let region_len = field(12);

        let region_end = HEADER_SIZE + region_len;
        let needed = region_end + CRILAYLA_RAW_PREFIX;
        if input.len() < needed {
            return Err(LzError::TruncatedStream {
                needed,
                available: input.len(),
            });
        }
        // a byte of region expands to at most 255 bytes of body
        if body_len > region_len * 0x100 + 0x200 {
            return Err(LzError::InvalidHeader(format!(
                "body of {body_len:#x} bytes cannot come from a {region_len:#x}-byte region"
            )));
        }

        let mut out = vec![0u8; CRILAYLA_RAW_PREFIX + body_len];
        out[..CRILAYLA_RAW_PREFIX].copy_from_slice(&input[region_end..needed]);

        let mut bits = BackwardBitReader::new(input, HEADER_SIZE, region_end)?;
        let mut dst = out.len();
        while dst > CRILAYLA_RAW_PREFIX {
            if bits.read_bits(1)? == 0 {
                dst -= 1;
                out[dst] = bits.read_bits(8)? as u8;
                continue;
            }

            let displacement = bits.read_bits(13)? as usize + 3;
            let length = read_length(&mut bits)?.min(dst - CRILAYLA_RAW_PREFIX);
            if dst + displacement > out.len() {
                return Err(LzError::InvalidDisplacement {
                    displacement,
                    position: dst - CRILAYLA_RAW_PREFIX,
                });
            }
            for _ in 0..length {
                dst -= 1;
                out[dst] = out[dst + displacement];
            }
        }

        debug!("crilayla: {} -> {} bytes", input.len(), out.len());
        Ok(out)
    }
}
