//! Shared LZ abstractions: matches, search limits, finders and pricing
//!
//! Every LZ format in the crate compresses the same way. A [`MatchFinder`]
//! proposes back-references for a position, a [`PriceCalculator`] tells the
//! parser what a literal or a back-reference costs in the format's bitstream,
//! and a parser from [`parser`] picks the cheapest covering sequence. The
//! resulting [`Parse`] is handed to the format encoder.

pub mod finder;
pub mod parser;

pub use finder::{HashChainFinder, MatchSearch, WindowFinder};
pub use parser::{
    GreedyParser, OptimalParser, Parse, ParseSettings, ParseStrategy, Parser, Token, Tokens,
};

use smallvec::SmallVec;

/// A back-reference into already produced plaintext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    /// Plaintext offset where the match starts
    pub position: usize,
    /// Number of bytes the match covers
    pub length: usize,
    /// Backward distance from `position` to the source of the copy
    pub displacement: usize,
}

impl Match {
    /// Create a new match
    pub fn new(position: usize, length: usize, displacement: usize) -> Self {
        Self {
            position,
            length,
            displacement,
        }
    }

    /// Offset just past the last covered byte
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    /// Whether the copy reads bytes it writes itself
    pub fn is_self_overlapping(&self) -> bool {
        self.displacement < self.length
    }
}

/// Search limits of one format
///
/// Lengths and displacements are in bytes. `unit_size` restricts both to
/// multiples of the unit for formats that address data in wider units.
/// No match starts before `search_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FindLimitations {
    /// Shortest encodable match
    pub min_length: usize,
    /// Longest encodable match
    pub max_length: usize,
    /// Smallest encodable displacement
    pub min_displacement: usize,
    /// Largest encodable displacement
    pub max_displacement: usize,
    /// Granularity of lengths and displacements
    pub unit_size: usize,
    /// First plaintext position a match may start at
    pub search_start: usize,
}

impl FindLimitations {
    /// Byte-granular limits
    pub const fn new(
        min_length: usize,
        max_length: usize,
        min_displacement: usize,
        max_displacement: usize,
    ) -> Self {
        Self {
            min_length,
            max_length,
            min_displacement,
            max_displacement,
            unit_size: 1,
            search_start: 0,
        }
    }

    /// Same limits measured in `unit_size`-byte units
    pub const fn with_unit_size(mut self, unit_size: usize) -> Self {
        self.unit_size = unit_size;
        self
    }

    /// Same limits with matches starting at `search_start` or later
    pub const fn with_search_start(mut self, search_start: usize) -> Self {
        self.search_start = search_start;
        self
    }

    /// Whether `m` is encodable under these limits
    pub fn allows(&self, m: &Match) -> bool {
        m.position >= self.search_start
            && m.length >= self.min_length
            && m.length <= self.max_length
            && m.displacement >= self.min_displacement
            && m.displacement <= self.max_displacement
            && m.length % self.unit_size == 0
            && m.displacement % self.unit_size == 0
    }
}

/// Candidate list returned by a finder; small enough to stay on the stack
pub type Candidates = SmallVec<[Match; 8]>;

/// Proposes back-references for a position
///
/// A finder is prepared once per input with [`MatchFinder::prepare`] and then
/// queried for ascending positions. Returned candidates are ordered by
/// strictly increasing length; each is the nearest occurrence of its length,
/// so the first candidate also has the smallest displacement. Any prefix of a
/// candidate at least `min_length` long is also a valid match.
pub trait MatchFinder {
    /// Index `input` before the first query
    fn prepare(&mut self, input: &[u8]);

    /// Candidates starting at `position`
    fn find_matches(&mut self, input: &[u8], position: usize) -> Candidates;

    /// Limits the finder searches under
    fn limitations(&self) -> &FindLimitations;
}

/// Lightweight context a price may depend on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceContext {
    /// Plaintext position of the token being priced
    pub position: usize,
    /// Literals emitted immediately before this token
    pub literal_run: usize,
}

/// Estimated bit cost of tokens in one format's bitstream
pub trait PriceCalculator {
    /// Cost of emitting `input[context.position]` as a literal
    fn literal_price(&self, context: &PriceContext) -> u32;

    /// Cost of emitting `m`
    fn match_price(&self, m: &Match, context: &PriceContext) -> u32;
}

/// Price of a format with one flag bit per token and fixed-size tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatPrice {
    /// Bits per literal, flag included
    pub literal_bits: u32,
    /// Bits per match, flag included
    pub match_bits: u32,
}

impl PriceCalculator for FlatPrice {
    fn literal_price(&self, _context: &PriceContext) -> u32 {
        self.literal_bits
    }

    fn match_price(&self, _m: &Match, _context: &PriceContext) -> u32 {
        self.match_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_geometry() {
        let m = Match::new(4, 10, 2);
        assert_eq!(m.end(), 14);
        assert!(m.is_self_overlapping());
        assert!(!Match::new(4, 3, 3).is_self_overlapping());
    }

    #[test]
    fn test_limitations_allow() {
        let limits = FindLimitations::new(3, 18, 1, 0x1000);
        assert!(limits.allows(&Match::new(10, 3, 1)));
        assert!(!limits.allows(&Match::new(10, 2, 1)));
        assert!(!limits.allows(&Match::new(10, 19, 1)));
        assert!(!limits.allows(&Match::new(10, 5, 0x1001)));

        let wide = FindLimitations::new(4, 32, 2, 0x100).with_unit_size(2);
        assert!(wide.allows(&Match::new(0, 4, 2)));
        assert!(!wide.allows(&Match::new(0, 5, 2)));
        assert!(!wide.allows(&Match::new(0, 4, 3)));

        let late = limits.with_search_start(3);
        assert!(!late.allows(&Match::new(1, 11, 1)));
        assert!(late.allows(&Match::new(3, 9, 1)));
    }

    #[test]
    fn test_flat_price() {
        let price = FlatPrice {
            literal_bits: 9,
            match_bits: 17,
        };
        let ctx = PriceContext::default();
        assert_eq!(price.literal_price(&ctx), 9);
        assert_eq!(price.match_price(&Match::new(0, 3, 1), &ctx), 17);
    }
}
