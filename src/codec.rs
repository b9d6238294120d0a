//! Public compression contract
//!
//! A [`Codec`] names a format, carries its options and parse settings, and
//! composes the matching encoder and decoder on every call. Codecs are plain
//! values; nothing is shared between calls.
//!
//! ```
//! use lzforge::{ByteOrder, Codec, FormatId};
//!
//! let codec = Codec::new(FormatId::Yaz0Le).byte_order(ByteOrder::BigEndian);
//! let packed = codec.compress(b"hello hello hello")?;
//! assert_eq!(&packed[..4], b"Yaz0");
//! assert_eq!(codec.decompress(&packed)?, b"hello hello hello");
//! # Ok::<(), lzforge::LzError>(())
//! ```

use crate::common::{
    BitOrder, ByteOrder, CompressionStats, FormatId, FormatOptions, LzError, NibbleOrder, Result,
};
use crate::formats::{BackwardLz77, Crilayla, Huffman, Lz10, Lz11, Lz40, Mio0, Rle, Yay0, Yaz0};
use crate::matching::{MatchSearch, Parse, ParseSettings, ParseStrategy};
use log::debug;
use std::io::{Read, Write};

/// Output of an encoder together with token counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    /// Compressed bytes
    pub data: Vec<u8>,
    /// Plaintext units stored verbatim (bytes, or symbols for Huffman)
    pub literal_count: usize,
    /// Back-references or runs emitted
    pub match_count: usize,
    /// Longest back-reference or run
    pub longest_match: usize,
}

impl Encoded {
    /// Counts taken from the parse that produced `data`
    pub fn from_parse(data: Vec<u8>, parse: &Parse) -> Self {
        Self {
            data,
            literal_count: parse.literal_count(),
            match_count: parse.match_count(),
            longest_match: parse.longest_match(),
        }
    }
}

/// Turns plaintext into one format's byte layout
pub trait Encoder {
    /// Compress `input`
    fn encode(&self, input: &[u8], settings: &ParseSettings) -> Result<Encoded>;
}

/// Turns one format's byte layout back into plaintext
pub trait Decoder {
    /// Decompress `input`
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;
}

trait FormatCodec: Encoder + Decoder {}

impl<T: Encoder + Decoder> FormatCodec for T {}

/// Compressor/decompressor for one format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    format: FormatId,
    options: FormatOptions,
    settings: ParseSettings,
}

impl Codec {
    /// Codec with the format's default options and an optimal parse
    pub fn new(format: FormatId) -> Self {
        Self {
            format,
            options: format.default_options(),
            settings: ParseSettings::default(),
        }
    }

    /// Byte order of header fields, tables and bitstream words
    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.options.byte_order = byte_order;
        self
    }

    /// Bit order inside bitstream words
    pub fn bit_order(mut self, bit_order: BitOrder) -> Self {
        self.options.bit_order = bit_order;
        self
    }

    /// Order of 4-bit units inside a byte
    pub fn nibble_order(mut self, nibble_order: NibbleOrder) -> Self {
        self.options.nibble_order = nibble_order;
        self
    }

    /// Replace all format options at once
    pub fn options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }

    /// Token selection strategy
    pub fn strategy(mut self, strategy: ParseStrategy) -> Self {
        self.settings.strategy = strategy;
        self
    }

    /// Match search algorithm
    pub fn search(mut self, search: MatchSearch) -> Self {
        self.settings.search = search;
        self
    }

    /// Selected format
    pub fn format(&self) -> FormatId {
        self.format
    }

    /// Effective format options
    pub fn format_options(&self) -> FormatOptions {
        self.options
    }

    /// Effective parse settings
    pub fn parse_settings(&self) -> ParseSettings {
        self.settings
    }

    /// Compress `input`
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(self.format_codec()?.encode(input, &self.settings)?.data)
    }

    /// Compress `input` and report what the encoder emitted
    pub fn compress_with_stats(&self, input: &[u8]) -> Result<(Vec<u8>, CompressionStats)> {
        let encoded = self.format_codec()?.encode(input, &self.settings)?;
        let stats = CompressionStats {
            literal_count: encoded.literal_count,
            match_count: encoded.match_count,
            longest_match: encoded.longest_match,
            input_bytes: input.len() as u64,
            output_bytes: encoded.data.len() as u64,
            compression_ratio: if input.is_empty() {
                0.0
            } else {
                encoded.data.len() as f64 / input.len() as f64
            },
        };
        Ok((encoded.data, stats))
    }

    /// Decompress `input`
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let output = self.format_codec()?.decode(input)?;
        debug!(
            "{}: decoded {} -> {} bytes",
            self.format,
            input.len(),
            output.len()
        );
        Ok(output)
    }

    /// Compress everything `reader` yields into `writer`
    ///
    /// The whole input is buffered; the match finder needs random access to
    /// its history.
    pub fn compress_stream<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> Result<CompressionStats> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        let (data, stats) = self.compress_with_stats(&input)?;
        writer.write_all(&data)?;
        writer.flush()?;
        Ok(stats)
    }

    /// Decompress everything `reader` yields into `writer`, returning the
    /// number of plaintext bytes written
    pub fn decompress_stream<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<u64> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        let output = self.decompress(&input)?;
        writer.write_all(&output)?;
        writer.flush()?;
        Ok(output.len() as u64)
    }

    fn validate(&self) -> Result<()> {
        let format = self.format;
        let defaults = format.default_options();
        let byte_order_ok = self.options.byte_order == defaults.byte_order
            || matches!(
                format,
                FormatId::Yaz0Le
                    | FormatId::Yaz0Be
                    | FormatId::Yay0Le
                    | FormatId::Yay0Be
                    | FormatId::Mio0Le
                    | FormatId::Mio0Be
                    | FormatId::Huffman4
                    | FormatId::Huffman8
            );
        if !byte_order_ok {
            return Err(LzError::UnsupportedVariant(format!(
                "{format} has no {:?} variant",
                self.options.byte_order
            )));
        }

        let bit_order_ok = self.options.bit_order == BitOrder::MsbFirst
            || matches!(
                format,
                FormatId::Huffman4
                    | FormatId::Huffman8
                    | FormatId::Yay0Le
                    | FormatId::Yay0Be
                    | FormatId::Mio0Le
                    | FormatId::Mio0Be
            );
        if !bit_order_ok {
            return Err(LzError::UnsupportedVariant(format!(
                "{format} has no {:?} variant",
                self.options.bit_order
            )));
        }

        if self.options.nibble_order != NibbleOrder::LowFirst && format != FormatId::Huffman4 {
            return Err(LzError::UnsupportedVariant(format!(
                "{format} has no {:?} variant",
                self.options.nibble_order
            )));
        }
        Ok(())
    }

    fn format_codec(&self) -> Result<Box<dyn FormatCodec>> {
        self.validate()?;
        let options = self.options;
        Ok(match self.format {
            FormatId::Lz10 => Box::new(Lz10),
            FormatId::Lz11 => Box::new(Lz11),
            FormatId::Lz40 => Box::new(Lz40::lz40()),
            FormatId::Lz60 => Box::new(Lz40::lz60()),
            FormatId::BackwardLz77 => Box::new(BackwardLz77),
            FormatId::Yaz0Le | FormatId::Yaz0Be => Box::new(Yaz0::new(options.byte_order)),
            FormatId::Yay0Le | FormatId::Yay0Be => Box::new(Yay0::new(options)),
            FormatId::Mio0Le | FormatId::Mio0Be => Box::new(Mio0::new(options)),
            FormatId::Huffman4 => Box::new(Huffman::four_bit(options)),
            FormatId::Huffman8 => Box::new(Huffman::eight_bit(options)),
            FormatId::Rle => Box::new(Rle),
            FormatId::Crilayla => Box::new(Crilayla),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_defaults_follow_format() {
        let codec = Codec::new(FormatId::Mio0Be);
        assert_eq!(codec.format_options().byte_order, ByteOrder::BigEndian);
        assert_eq!(codec.parse_settings().strategy, ParseStrategy::Optimal);
        assert_eq!(codec.format(), FormatId::Mio0Be);
    }

    #[test]
    fn test_rejects_meaningless_options() {
        let data = b"abcabcabc";
        let err = Codec::new(FormatId::Lz10)
            .byte_order(ByteOrder::BigEndian)
            .compress(data)
            .unwrap_err();
        assert!(matches!(err, LzError::UnsupportedVariant(_)));

        assert!(Codec::new(FormatId::Yaz0Le)
            .bit_order(BitOrder::LsbFirst)
            .compress(data)
            .is_err());
        assert!(Codec::new(FormatId::Huffman8)
            .nibble_order(NibbleOrder::HighFirst)
            .decompress(data)
            .is_err());
        assert!(Codec::new(FormatId::Huffman4)
            .nibble_order(NibbleOrder::HighFirst)
            .compress(data)
            .is_ok());
    }

    #[test]
    fn test_stats() {
        let input = vec![b'z'; 1000];
        let (data, stats) = Codec::new(FormatId::Lz10).compress_with_stats(&input).unwrap();
        assert_eq!(stats.input_bytes, 1000);
        assert_eq!(stats.output_bytes, data.len() as u64);
        assert_eq!(stats.literal_count, 1);
        assert!(stats.match_count > 0);
        assert_eq!(stats.longest_match, 18);
        assert!(stats.compression_ratio < 0.2);
    }

    #[test]
    fn test_stream_round_trip() {
        let input = b"stream me, stream me again, stream me once more".repeat(20);
        let codec = Codec::new(FormatId::Yay0Be).strategy(ParseStrategy::Greedy);
        let mut packed = Vec::new();
        let stats = codec
            .compress_stream(Cursor::new(&input), &mut packed)
            .unwrap();
        assert_eq!(stats.output_bytes, packed.len() as u64);

        let mut unpacked = Vec::new();
        let written = codec
            .decompress_stream(Cursor::new(&packed), &mut unpacked)
            .unwrap();
        assert_eq!(written, input.len() as u64);
        assert_eq!(unpacked, input);
    }
}
