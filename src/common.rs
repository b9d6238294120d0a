//! Common types and constants shared by every format
//!
//! This module defines the format identifiers, the per-format option set,
//! statistics, size limits and the crate error type used by both the
//! encoders and the decoders.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest plaintext a 24-bit size field can describe
pub const MAX_U24_SIZE: usize = 0x00FF_FFFF;

/// Largest plaintext a 32-bit size field can describe
pub const MAX_U32_SIZE: usize = u32::MAX as usize;

/// Number of raw bytes CRILAYLA keeps uncompressed in front of the body
pub const CRILAYLA_RAW_PREFIX: usize = 0x100;

/// Byte order of multi-byte header fields and table entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Least significant byte first
    LittleEndian,
    /// Most significant byte first
    BigEndian,
}

/// Order in which bits are consumed from a byte or word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOrder {
    /// Highest bit first
    MsbFirst,
    /// Lowest bit first
    LsbFirst,
}

/// Order of the two 4-bit data units packed into one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NibbleOrder {
    /// Bits 0-3 are emitted before bits 4-7
    LowFirst,
    /// Bits 4-7 are emitted before bits 0-3
    HighFirst,
}

/// Every compression format the engine can produce and consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatId {
    /// Nintendo LZ77 type 0x10
    Lz10,
    /// Nintendo LZ77 type 0x11 (extended lengths)
    Lz11,
    /// Nintendo LZ type 0x40 (nibble-swapped, three length tiers)
    Lz40,
    /// Nintendo LZ type 0x60 (LZ40 layout with a different magic)
    Lz60,
    /// Nintendo backward LZ77 used by 3DS code binaries
    BackwardLz77,
    /// Yaz0 with little-endian header
    Yaz0Le,
    /// Yaz0 with big-endian header (GameCube/Wii)
    Yaz0Be,
    /// Yay0 with little-endian header and tables
    Yay0Le,
    /// Yay0 with big-endian header and tables
    Yay0Be,
    /// MIO0 with little-endian header and tables
    Mio0Le,
    /// MIO0 with big-endian header and tables (N64)
    Mio0Be,
    /// Nintendo Huffman with 4-bit data units
    Huffman4,
    /// Nintendo Huffman with 8-bit data units
    Huffman8,
    /// Nintendo run-length encoding type 0x30
    Rle,
    /// CRI Middleware CRILAYLA (CPK archives)
    Crilayla,
}

impl FormatId {
    /// All formats, in a stable order
    pub const ALL: [FormatId; 15] = [
        FormatId::Lz10,
        FormatId::Lz11,
        FormatId::Lz40,
        FormatId::Lz60,
        FormatId::BackwardLz77,
        FormatId::Yaz0Le,
        FormatId::Yaz0Be,
        FormatId::Yay0Le,
        FormatId::Yay0Be,
        FormatId::Mio0Le,
        FormatId::Mio0Be,
        FormatId::Huffman4,
        FormatId::Huffman8,
        FormatId::Rle,
        FormatId::Crilayla,
    ];

    /// Stable kebab-case name used by the CLI and collaborators
    pub fn name(&self) -> &'static str {
        match self {
            FormatId::Lz10 => "lz10",
            FormatId::Lz11 => "lz11",
            FormatId::Lz40 => "lz40",
            FormatId::Lz60 => "lz60",
            FormatId::BackwardLz77 => "backward-lz77",
            FormatId::Yaz0Le => "yaz0-le",
            FormatId::Yaz0Be => "yaz0-be",
            FormatId::Yay0Le => "yay0-le",
            FormatId::Yay0Be => "yay0-be",
            FormatId::Mio0Le => "mio0-le",
            FormatId::Mio0Be => "mio0-be",
            FormatId::Huffman4 => "huffman4",
            FormatId::Huffman8 => "huffman8",
            FormatId::Rle => "rle",
            FormatId::Crilayla => "crilayla",
        }
    }

    /// Largest plaintext the format's size fields can describe
    pub fn max_plaintext_size(&self) -> usize {
        match self {
            FormatId::Yaz0Le
            | FormatId::Yaz0Be
            | FormatId::Yay0Le
            | FormatId::Yay0Be
            | FormatId::Mio0Le
            | FormatId::Mio0Be => MAX_U32_SIZE,
            FormatId::Crilayla => MAX_U32_SIZE + CRILAYLA_RAW_PREFIX,
            _ => MAX_U24_SIZE,
        }
    }

    /// Smallest plaintext the format can represent
    pub fn min_plaintext_size(&self) -> usize {
        match self {
            FormatId::Crilayla => CRILAYLA_RAW_PREFIX,
            _ => 0,
        }
    }

    /// Options the format uses when the caller does not override them
    pub fn default_options(&self) -> FormatOptions {
        let byte_order = match self {
            FormatId::Yaz0Be | FormatId::Yay0Be | FormatId::Mio0Be => ByteOrder::BigEndian,
            _ => ByteOrder::LittleEndian,
        };
        FormatOptions {
            byte_order,
            bit_order: BitOrder::MsbFirst,
            nibble_order: NibbleOrder::LowFirst,
        }
    }

    /// Guess the format of a compressed buffer from its signature
    ///
    /// Signature-less layouts are only reported when their first byte is a
    /// known Nintendo type tag; `BackwardLz77` has no signature and is never
    /// detected.
    pub fn detect(data: &[u8]) -> Option<FormatId> {
        if data.starts_with(b"CRILAYLA") {
            return Some(FormatId::Crilayla);
        }
        if data.len() >= 8 {
            let be = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
            let le = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
            // The size field is read both ways; the plausible reading wins.
            let big = be <= le;
            match &data[..4] {
                b"Yaz0" => return Some(if big { FormatId::Yaz0Be } else { FormatId::Yaz0Le }),
                b"Yay0" => return Some(if big { FormatId::Yay0Be } else { FormatId::Yay0Le }),
                b"MIO0" => return Some(if big { FormatId::Mio0Be } else { FormatId::Mio0Le }),
                _ => {}
            }
        }
        if data.len() < 4 {
            return None;
        }
        match data[0] {
            0x10 => Some(FormatId::Lz10),
            0x11 => Some(FormatId::Lz11),
            0x40 => Some(FormatId::Lz40),
            0x60 => Some(FormatId::Lz60),
            0x24 => Some(FormatId::Huffman4),
            0x28 => Some(FormatId::Huffman8),
            0x30 => Some(FormatId::Rle),
            _ => None,
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatId {
    type Err = LzError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        FormatId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| LzError::UnsupportedVariant(format!("unknown format '{s}'")))
    }
}

/// Format-specific configuration
///
/// Not every format honours every field; [`crate::Codec`] rejects
/// combinations a format cannot express with [`LzError::UnsupportedVariant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatOptions {
    /// Byte order of header fields, table entries and bitstream words
    pub byte_order: ByteOrder,
    /// Bit order inside bitstream words
    pub bit_order: BitOrder,
    /// Order of 4-bit data units inside a byte
    pub nibble_order: NibbleOrder,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::LittleEndian,
            bit_order: BitOrder::MsbFirst,
            nibble_order: NibbleOrder::LowFirst,
        }
    }
}

/// Error type for every compression and decompression operation
#[derive(Debug, Error)]
pub enum LzError {
    /// Plaintext does not fit the format's size fields
    #[error("Input too large: {size} bytes (format limit is {max} bytes)")]
    InputTooLarge {
        /// Size of the rejected input
        size: usize,
        /// Largest size the format accepts
        max: usize,
    },

    /// Plaintext is shorter than the format can represent
    #[error("Input too small: {size} bytes (format needs at least {min} bytes)")]
    InputTooSmall {
        /// Size of the rejected input
        size: usize,
        /// Smallest size the format accepts
        min: usize,
    },

    /// Header signature does not match the requested format
    #[error("Invalid magic: expected {expected:02X?}, found {found:02X?}")]
    InvalidMagic {
        /// Signature the format requires
        expected: Vec<u8>,
        /// Bytes found at the signature position
        found: Vec<u8>,
    },

    /// A header field is inconsistent with the rest of the buffer
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Input ended before the declared plaintext was reconstructed
    #[error("Truncated stream: needed {needed} bytes, {available} available")]
    TruncatedStream {
        /// Input bytes the decoder needed
        needed: usize,
        /// Input bytes present
        available: usize,
    },

    /// A back-reference points outside the data decoded so far
    #[error("Invalid displacement {displacement} at output position {position}")]
    InvalidDisplacement {
        /// Offending displacement
        displacement: usize,
        /// Output position of the reference
        position: usize,
    },

    /// Format or option combination is not implemented
    #[error("Unsupported variant: {0}")]
    UnsupportedVariant(String),

    /// Huffman tree table cannot be decoded or encoded
    #[error("Invalid Huffman tree: {0}")]
    HuffmanTree(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, LzError>;

/// Statistics for one compression call
#[derive(Debug, Default, Clone)]
pub struct CompressionStats {
    /// Number of literal bytes encoded
    pub literal_count: usize,
    /// Number of back-references encoded
    pub match_count: usize,
    /// Longest back-reference used
    pub longest_match: usize,
    /// Plaintext bytes consumed
    pub input_bytes: u64,
    /// Compressed bytes produced
    pub output_bytes: u64,
    /// Compressed size divided by plaintext size
    pub compression_ratio: f64,
}

/// Reject inputs whose size the format cannot describe
pub(crate) fn check_plaintext_size(format: FormatId, size: usize) -> Result<()> {
    let max = format.max_plaintext_size();
    if size > max {
        return Err(LzError::InputTooLarge { size, max });
    }
    let min = format.min_plaintext_size();
    if size < min {
        return Err(LzError::InputTooSmall { size, min });
    }
    Ok(())
}

/// Check a fixed signature at the start of `data`
pub(crate) fn expect_magic(data: &[u8], magic: &[u8]) -> Result<()> {
    if data.len() < magic.len() || &data[..magic.len()] != magic {
        let found = data[..data.len().min(magic.len())].to_vec();
        return Err(LzError::InvalidMagic {
            expected: magic.to_vec(),
            found,
        });
    }
    Ok(())
}

/// Read the Nintendo `type | u24 size` header shared by the BIOS formats
pub(crate) fn read_nintendo_header(data: &[u8], tag: u8) -> Result<usize> {
    if data.len() < 4 {
        return Err(LzError::TruncatedStream {
            needed: 4,
            available: data.len(),
        });
    }
    if data[0] != tag {
        return Err(LzError::InvalidMagic {
            expected: vec![tag],
            found: vec![data[0]],
        });
    }
    Ok(data[1] as usize | (data[2] as usize) << 8 | (data[3] as usize) << 16)
}

/// Append the Nintendo `type | u24 size` header
pub(crate) fn write_nintendo_header(out: &mut Vec<u8>, tag: u8, size: usize) {
    out.push(tag);
    out.extend_from_slice(&(size as u32).to_le_bytes()[..3]);
}

/// Pad `out` with `fill` until its length is a multiple of `alignment`
pub(crate) fn pad_to(out: &mut Vec<u8>, alignment: usize, fill: u8) {
    while out.len() % alignment != 0 {
        out.push(fill);
    }
}
