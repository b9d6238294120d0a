//! lzforge - LZ-family compression engine for console game resources
//!
//! This crate implements the compressors found in Nintendo and CRI
//! Middleware titles: a shared match finder, per-format price calculators
//! and an optimal parser feed small format-specific serializers, while the
//! decoders read each byte layout directly.
//!
//! # Features
//!
//! - Nintendo LZ10, LZ11, LZ40, LZ60 and backward LZ77 (3DS code binaries)
//! - Yaz0, Yay0 and MIO0 in both byte orders
//! - Nintendo Huffman (4-bit and 8-bit units) and RLE
//! - CRILAYLA (CPK archives)
//! - Cost-based optimal parsing, with greedy parsing selectable per call
//! - Streaming API via Read/Write traits
//!
//! # Example
//!
//! ```
//! use lzforge::{compress, decompress, FormatId};
//!
//! let data = b"Hello, World! Hello, World! Hello, World!";
//! let packed = compress(FormatId::Lz10, data)?;
//! assert_eq!(packed[0], 0x10);
//! assert_eq!(decompress(FormatId::Lz10, &packed)?, data);
//! # Ok::<(), lzforge::LzError>(())
//! ```
//!
//! # Example - Format options
//!
//! ```
//! use lzforge::{BitOrder, ByteOrder, Codec, FormatId, ParseStrategy};
//!
//! let codec = Codec::new(FormatId::Mio0Le)
//!     .byte_order(ByteOrder::BigEndian)
//!     .bit_order(BitOrder::LsbFirst)
//!     .strategy(ParseStrategy::Greedy);
//! let (packed, stats) = codec.compress_with_stats(&[0u8; 4096])?;
//! assert_eq!(&packed[..4], b"MIO0");
//! assert!(stats.match_count > 0);
//! assert_eq!(codec.decompress(&packed)?, vec![0u8; 4096]);
//! # Ok::<(), lzforge::LzError>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

// Public modules
pub mod bits;
pub mod codec;
pub mod common;
pub mod error;
pub mod formats;
pub mod matching;

// Async modules (only available with async feature)
#[cfg(feature = "async")]
pub mod async_batch;

// Re-export commonly used types
pub use codec::{Codec, Decoder, Encoded, Encoder};
pub use common::{
    BitOrder, ByteOrder, CompressionStats, FormatId, FormatOptions, LzError, NibbleOrder, Result,
    CRILAYLA_RAW_PREFIX, MAX_U24_SIZE, MAX_U32_SIZE,
};
pub use matching::{
    FindLimitations, Match, MatchFinder, MatchSearch, Parse, ParseSettings, ParseStrategy,
    PriceCalculator,
};

// Re-export async types when async feature is enabled
#[cfg(feature = "async")]
pub use async_batch::AsyncBatchProcessor;

// Convenience functions

/// Compress data with a format's default options and an optimal parse
///
/// # Arguments
/// * `format` - Target format
/// * `data` - The data to compress
///
/// # Returns
/// A vector containing the compressed data
pub fn compress(format: FormatId, data: &[u8]) -> Result<Vec<u8>> {
    Codec::new(format).compress(data)
}

/// Decompress data stored with a format's default options
///
/// # Arguments
/// * `format` - Format of the compressed data
/// * `data` - The compressed data
///
/// # Returns
/// A vector containing the decompressed data
pub fn decompress(format: FormatId, data: &[u8]) -> Result<Vec<u8>> {
    Codec::new(format).decompress(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        // Test that common types are accessible
        let _ = ByteOrder::BigEndian;
        let _ = ParseStrategy::Greedy;
        let _ = FindLimitations::new(3, 18, 1, 0x1000);

        // Test that functions are accessible
        let packed = compress(FormatId::Rle, b"test").unwrap();
        assert_eq!(decompress(FormatId::Rle, &packed).unwrap(), b"test");
    }
}
