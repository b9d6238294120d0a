//! Format encoders and decoders
//!
//! Each submodule implements one family of layouts. LZ formats describe
//! themselves through [`LzFormat`] (search limits, prices and a serializer for
//! a finished [`Parse`]); [`encode_lz`] runs the shared parse pipeline for
//! them. Decoders never touch the matching machinery.

pub mod backward_lz77;
pub mod crilayla;
pub mod huffman;
pub mod lz10;
pub mod lz11;
pub mod lz40;
pub mod mio0;
pub mod rle;
pub mod yay0;
pub mod yaz0;

pub use backward_lz77::BackwardLz77;
pub use crilayla::Crilayla;
pub use huffman::Huffman;
pub use lz10::Lz10;
pub use lz11::Lz11;
pub use lz40::Lz40;
pub use mio0::Mio0;
pub use rle::Rle;
pub use yay0::Yay0;
pub use yaz0::Yaz0;

use crate::codec::Encoded;
use crate::common::{check_plaintext_size, ByteOrder, FormatId, LzError, Result};
use crate::matching::{FindLimitations, Parse, ParseSettings, PriceCalculator};
use log::debug;

/// Largest buffer a decoder reserves up front from an untrusted size field
const MAX_PREALLOCATION: usize = 1 << 24;

/// An LZ layout: search limits, token prices and the serializer
pub trait LzFormat {
    /// Format identifier, used for size limits and logging
    fn id(&self) -> FormatId;

    /// Matches the layout can encode
    fn limitations(&self) -> FindLimitations;

    /// Bit cost of tokens in the layout
    fn prices(&self) -> &dyn PriceCalculator;

    /// Serialize a parse of `input`
    fn write(&self, input: &[u8], parse: &Parse) -> Result<Vec<u8>>;
}

/// Parse `input` for `format` and serialize the result
///
/// The size limit is checked before anything else so no partial output is
/// ever produced for an oversized input.
pub fn encode_lz(format: &dyn LzFormat, input: &[u8], settings: &ParseSettings) -> Result<Encoded> {
    check_plaintext_size(format.id(), input.len())?;
    let parse = settings.parse(input, format.limitations(), format.prices());
    let data = format.write(input, &parse)?;
    debug!(
        "{}: {} -> {} bytes ({} literals, {} matches)",
        format.id(),
        input.len(),
        data.len(),
        parse.literal_count(),
        parse.match_count()
    );
    Ok(Encoded::from_parse(data, &parse))
}

/// Output buffer for a declared plaintext size
pub(crate) fn output_buffer(size: usize) -> Vec<u8> {
    Vec::with_capacity(size.min(MAX_PREALLOCATION))
}

/// Writes 8-token blocks headed by a flag byte, first token in bit 7
#[derive(Debug)]
pub(crate) struct FlagBlockWriter {
    flag_index: usize,
    used: u8,
}

impl FlagBlockWriter {
    pub fn new() -> Self {
        Self {
            flag_index: 0,
            used: 8,
        }
    }

    /// Record the flag of the next token, opening a block when needed
    pub fn flag(&mut self, out: &mut Vec<u8>, set: bool) {
        if self.used == 8 {
            self.flag_index = out.len();
            out.push(0);
            self.used = 0;
        }
        if set {
            out[self.flag_index] |= 0x80 >> self.used;
        }
        self.used += 1;
    }
}

/// Forward byte reader that reports running out of data as truncation
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or(LzError::TruncatedStream {
            needed: self.pos + 1,
            available: self.data.len(),
        })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self, order: ByteOrder) -> Result<u16> {
        let bytes = [self.read_u8()?, self.read_u8()?];
        Ok(match order {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        })
    }
}

/// Read a u32 field at `offset`
pub(crate) fn read_u32(data: &[u8], offset: usize, order: ByteOrder) -> Result<u32> {
    let bytes: [u8; 4] = data
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .ok_or(LzError::TruncatedStream {
            needed: offset + 4,
            available: data.len(),
        })?;
    Ok(match order {
        ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
        ByteOrder::BigEndian => u32::from_be_bytes(bytes),
    })
}

/// Append a u32 field
pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32, order: ByteOrder) {
    match order {
        ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
    }
}

/// Append a u16 field
pub(crate) fn write_u16(out: &mut Vec<u8>, value: u16, order: ByteOrder) {
    match order {
        ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
    }
}

/// Copy a back-reference one byte at a time, stopping at `limit` bytes of
/// output
///
/// Each written byte is immediately available as a source, so a
/// displacement shorter than the length repeats the pattern.
pub(crate) fn copy_match(
    out: &mut Vec<u8>,
    displacement: usize,
    length: usize,
    limit: usize,
) -> Result<()> {
    if displacement == 0 || displacement > out.len() {
        return Err(LzError::InvalidDisplacement {
            displacement,
            position: out.len(),
        });
    }
    let length = length.min(limit.saturating_sub(out.len()));
    for _ in 0..length {
        out.push(out[out.len() - displacement]);
    }
    Ok(())
}
