//! Nintendo backward LZ77 (3DS code binaries)
//!
//! The file is `raw prefix | compressed region | 0xFF padding | footer`. The
//! decoder starts at the end of the region and walks both the region and the
//! output towards the front, so the format can be decompressed in place.
//! Footer (little-endian):
//!
//! * u32 `region + padding + 8` in the low 24 bits, `padding + 8` in the top 8
//! * u32 `plaintext size - file size`, wrapping
//!
//! Tokens are read backward: a flag byte (first token in bit 7, set for a
//! back-reference), then literals or two-byte references, high byte first,
//! with `len = (v >> 12) + 3` and `disp = (v & 0xFFF) + 3`.
//!
//! The encoder parses the reversed plaintext forward and stores the reversed
//! token stream. It stops compressing where the saving (plaintext consumed
//! minus tokens written) peaks and keeps everything in front of that point as
//! the raw prefix; otherwise in-place decoding could overwrite tokens it has
//! not read yet.

use super::{encode_lz, read_u32, FlagBlockWriter, LzFormat};
use crate::bits::BackwardCursor;
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{
    check_plaintext_size, pad_to, ByteOrder, FormatId, LzError, Result, MAX_U24_SIZE,
};
use crate::matching::{FindLimitations, FlatPrice, Parse, ParseSettings, PriceCalculator, Token};
use log::trace;

const FOOTER_SIZE: usize = 8;

/// Search limits of backward LZ77
pub const LIMITATIONS: FindLimitations = FindLimitations::new(3, 0x12, 3, 0x1002);

const PRICES: FlatPrice = FlatPrice {
    literal_bits: 9,
    match_bits: 17,
};

/// Backward LZ77 encoder and decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct BackwardLz77;

/// Append one token of the forward stream
fn push_token(stream: &mut Vec<u8>, flags: &mut FlagBlockWriter, reversed: &[u8], token: Token) {
    match token {
        Token::Literal(pos) => {
            flags.flag(stream, false);
            stream.push(reversed[pos]);
        }
        Token::Match(m) => {
            flags.flag(stream, true);
            let value = (m.length - 3) << 12 | (m.displacement - 3);
            stream.push((value >> 8) as u8);
            stream.push(value as u8);
        }
    }
}

/// Number of leading tokens worth compressing and the plaintext they cover
fn best_cut(reversed: &[u8], parse: &Parse) -> (usize, usize) {
    let mut stream = Vec::new();
    let mut flags = FlagBlockWriter::new();
    let mut consumed = 0usize;
    let (mut best_saving, mut best_tokens, mut best_consumed) = (0isize, 0, 0);

    for (index, token) in parse.tokens().enumerate() {
        push_token(&mut stream, &mut flags, reversed, token);
        consumed += match token {
            Token::Literal(_) => 1,
            Token::Match(m) => m.length,
        };
        let saving = consumed as isize - stream.len() as isize;
        if saving > best_saving {
            best_saving = saving;
            best_tokens = index + 1;
            best_consumed = consumed;
        }
    }

    (best_tokens, best_consumed)
}

impl LzFormat for BackwardLz77 {
    fn id(&self) -> FormatId {
        FormatId::BackwardLz77
    }

    fn limitations(&self) -> FindLimitations {
        LIMITATIONS
    }

    fn prices(&self) -> &dyn PriceCalculator {
        &PRICES
    }

    /// `input` is the reversed plaintext
    fn write(&self, input: &[u8], parse: &Parse) -> Result<Vec<u8>> {
        let size = input.len();
        let (token_count, compressed_len) = best_cut(input, parse);

        let mut stream = Vec::new();
        let mut flags = FlagBlockWriter::new();
        for token in parse.tokens().take(token_count) {
            push_token(&mut stream, &mut flags, input, token);
        }

        let raw_len = size - compressed_len;
        trace!(
            "backward-lz77: {raw_len} raw bytes, {compressed_len} bytes in {} region bytes",
            stream.len()
        );

        let mut out = Vec::with_capacity(raw_len + stream.len() + 3 + FOOTER_SIZE);
        out.extend(input[compressed_len..].iter().rev());
        out.extend(stream.iter().rev());
        let region_end = out.len();
        pad_to(&mut out, 4, 0xFF);
        let padding = out.len() - region_end;

        let header_len = padding + FOOTER_SIZE;
        let encoded_len = stream.len() + header_len;
        if encoded_len > MAX_U24_SIZE {
            return Err(LzError::InputTooLarge {
                size,
                max: MAX_U24_SIZE,
            });
        }
        let file_len = out.len() + FOOTER_SIZE;
        out.extend_from_slice(&((encoded_len | header_len << 24) as u32).to_le_bytes());
        out.extend_from_slice(&(size as u32).wrapping_sub(file_len as u32).to_le_bytes());
        Ok(out)
    }
}

impl Encoder for BackwardLz77 {
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
        check_plaintext_size(FormatId::BackwardLz77, input.len())?;
        let reversed: Vec<u8> = input.iter().rev().copied().collect();
        encode_lz(self, &reversed, settings)
    }
}

/// Footer fields: raw prefix end, region end and plaintext size
fn read_footer(input: &[u8]) -> Result<(usize, usize, usize)> {
    let file_len = input.len();
    if file_len < FOOTER_SIZE {
        return Err(LzError::TruncatedStream {
            needed: FOOTER_SIZE,
            available: file_len,
        });
    }
    let info = read_u32(input, file_len - 8, ByteOrder::LittleEndian)?;
    let extra = read_u32(input, file_len - 4, ByteOrder::LittleEndian)?;

    let header_len = (info >> 24) as usize;
    let encoded_len = (info & 0x00FF_FFFF) as usize;
    if header_len < FOOTER_SIZE || header_len > encoded_len || encoded_len > file_len {
        return Err(LzError::InvalidHeader(format!(
            "footer {info:#010x} does not fit a {file_len:#x}-byte file"
        )));
    }

    let size = (file_len as u32).wrapping_add(extra) as usize;
    let raw_end = file_len - encoded_len;
    if size > MAX_U24_SIZE || size < raw_end {
        return Err(LzError::InvalidHeader(format!(
            "plaintext size {size:#x} inconsistent with a {raw_end:#x}-byte raw prefix"
        )));
    }
    Ok((raw_end, file_len - header_len, size))
}

impl Decoder for BackwardLz77 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let (raw_end, region_end, size) = read_footer(input)?;
        let mut out = vec![0u8; size];
        out[..raw_end].copy_from_slice(&input[..raw_end]);

        let mut src = BackwardCursor::new(input, raw_end, region_end)?;
        let mut dst = size;
        while !src.is_exhausted() {
            let flag = src.read_u8()?;
            for bit in 0..8 {
                if src.is_exhausted() {
                    break;
                }
                if dst == raw_end {
                    return Err(LzError::InvalidHeader(
                        "compressed region decodes past the raw prefix".into(),
                    ));
                }
                if flag & (0x80 >> bit) == 0 {
                    dst -= 1;
                    out[dst] = src.read_u8()?;
                    continue;
                }

                let value = (src.read_u8()? as usize) << 8 | src.read_u8()? as usize;
                let length = ((value >> 12) + 3).min(dst - raw_end);
                let displacement = (value & 0xFFF) + 3;
                if dst + displacement > size {
                    return Err(LzError::InvalidDisplacement {
                        displacement,
                        position: dst,
                    });
                }
                for _ in 0..length {
                    dst -= 1;
                    out[dst] = out[dst + displacement];
                }
            }
        }

        if dst != raw_end {
            return Err(LzError::TruncatedStream {
                needed: dst - raw_end,
                available: 0,
            });
        }
        Ok(out)
    }
}
