//! Match finders
//!
//! [`HashChainFinder`] indexes every position by a short hash of its first
//! bytes and walks the chain of earlier positions with the same hash, nearest
//! first, up to a bounded depth. [`WindowFinder`] compares against every
//! displacement in the window and is used for exhaustive searches and to
//! cross-check the hash chains.
//!
//! Both extend matches past the current position, so a candidate may read
//! bytes that the same copy produces (`displacement < length`).

use super::{Candidates, FindLimitations, Match, MatchFinder};

/// Hash table size for the chain heads (power of two)
const HASH_SIZE: usize = 1 << 16;
const HASH_MASK: usize = HASH_SIZE - 1;

/// Default number of chain links followed per position
pub const DEFAULT_CHAIN_DEPTH: usize = 256;

const NONE: u32 = u32::MAX;

/// Algorithm used to search for matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchSearch {
    /// Hash chains with bounded depth
    #[default]
    HashChain,
    /// Every displacement of the window
    Exhaustive,
}

impl MatchSearch {
    /// Build a finder for `limits`
    pub fn finder(&self, limits: FindLimitations) -> Box<dyn MatchFinder> {
        match self {
            MatchSearch::HashChain => Box::new(HashChainFinder::new(limits)),
            MatchSearch::Exhaustive => Box::new(WindowFinder::new(limits)),
        }
    }
}

/// Length of the common run of `input[source..]` and `input[position..]`
///
/// `source < position`; the comparison may run past `position`, which is
/// what makes self-overlapping matches possible.
#[inline]
fn common_length(input: &[u8], source: usize, position: usize, max_length: usize) -> usize {
    input[position..position + max_length]
        .iter()
        .zip(&input[source..])
        .take_while(|(a, b)| a == b)
        .count()
}

/// Round `length` down to the unit size and drop it if it gets too short
#[inline]
fn clip_length(length: usize, limits: &FindLimitations) -> Option<usize> {
    let length = length - length % limits.unit_size;
    (length >= limits.min_length).then_some(length)
}

/// Longest match the limits allow at `position`
#[inline]
fn max_length_at(input: &[u8], position: usize, limits: &FindLimitations) -> usize {
    limits.max_length.min(input.len().saturating_sub(position))
}

/// Add a candidate when it is longer than every nearer one
#[inline]
fn push_if_longer(found: &mut Candidates, candidate: Match) {
    match found.last() {
        Some(best) if best.length >= candidate.length => {}
        _ => found.push(candidate),
    }
}

/// Hash-chain match finder
///
/// `head[hash]` holds the most recent position with that hash and
/// `prev[pos & mask]` the previous position in its chain. The `prev` ring is
/// larger than the window, so links of positions still inside the window are
/// never overwritten.
#[derive(Debug, Clone)]
pub struct HashChainFinder {
    limits: FindLimitations,
    chain_depth: usize,
    hash_bytes: usize,
    head: Vec<u32>,
    prev: Vec<u32>,
    prev_mask: usize,
    inserted: usize,
}

impl HashChainFinder {
    /// Create a finder with the default chain depth
    pub fn new(limits: FindLimitations) -> Self {
        Self::with_chain_depth(limits, DEFAULT_CHAIN_DEPTH)
    }

    /// Create a finder following at most `chain_depth` links per position
    pub fn with_chain_depth(limits: FindLimitations, chain_depth: usize) -> Self {
        let ring = (limits.max_displacement + 1).next_power_of_two();
        Self {
            limits,
            chain_depth: chain_depth.max(1),
            hash_bytes: limits.min_length.clamp(1, 3),
            head: vec![NONE; HASH_SIZE],
            prev: vec![NONE; ring],
            prev_mask: ring - 1,
            inserted: 0,
        }
    }

    #[inline]
    fn hash(&self, input: &[u8], pos: usize) -> usize {
        let h = input[pos..pos + self.hash_bytes]
            .iter()
            .fold(0usize, |h, &b| (h << 5) ^ (h >> 11) ^ b as usize);
        (h.wrapping_mul(0x9E37_79B1) >> 8) & HASH_MASK
    }

    fn insert_up_to(&mut self, input: &[u8], position: usize) {
        let last = input.len().saturating_sub(self.hash_bytes);
        while self.inserted < position {
            let pos = self.inserted;
            if pos <= last {
                let h = self.hash(input, pos);
                self.prev[pos & self.prev_mask] = self.head[h];
                self.head[h] = pos as u32;
            }
            self.inserted += 1;
        }
    }
}

impl MatchFinder for HashChainFinder {
    fn prepare(&mut self, _input: &[u8]) {
        self.head.fill(NONE);
        self.prev.fill(NONE);
        self.inserted = 0;
    }

    fn find_matches(&mut self, input: &[u8], position: usize) -> Candidates {
        let mut found = Candidates::new();
        self.insert_up_to(input, position);

        let max_length = max_length_at(input, position, &self.limits);
        if position < self.limits.search_start
            || max_length < self.limits.min_length
            || position + self.hash_bytes > input.len()
        {
            return found;
        }

        let limits = self.limits;
        let min_source = position.saturating_sub(limits.max_displacement);
        let mut candidate = self.head[self.hash(input, position)];
        let mut depth = 0;

        while candidate != NONE && depth < self.chain_depth {
            let source = candidate as usize;
            if source < min_source || source >= position {
                break;
            }
            let displacement = position - source;
            if displacement >= limits.min_displacement && displacement % limits.unit_size == 0 {
                let length = common_length(input, source, position, max_length);
                if let Some(length) = clip_length(length, &limits) {
                    push_if_longer(&mut found, Match::new(position, length, displacement));
                    if length == max_length {
                        break;
                    }
                }
            }
            let next = self.prev[source & self.prev_mask];
            if next == NONE || next as usize >= source {
                break;
            }
            candidate = next;
            depth += 1;
        }

        found
    }

    fn limitations(&self) -> &FindLimitations {
        &self.limits
    }
}

/// Exhaustive window search
#[derive(Debug, Clone)]
pub struct WindowFinder {
    limits: FindLimitations,
}

impl WindowFinder {
    /// Create a finder for `limits`
    pub fn new(limits: FindLimitations) -> Self {
        Self { limits }
    }
}

impl MatchFinder for WindowFinder {
    fn prepare(&mut self, _input: &[u8]) {}

    fn find_matches(&mut self, input: &[u8], position: usize) -> Candidates {
        let mut found = Candidates::new();
        let limits = self.limits;
        let max_length = max_length_at(input, position, &limits);
        if position < limits.search_start || max_length < limits.min_length {
            return found;
        }

        let farthest = limits.max_displacement.min(position);
        let first = limits.min_displacement.max(1);
        for displacement in first..=farthest {
            if displacement % limits.unit_size != 0 {
                continue;
            }
            let length = common_length(input, position - displacement, position, max_length);
            if let Some(length) = clip_length(length, &limits) {
                push_if_longer(&mut found, Match::new(position, length, displacement));
                if length == max_length {
                    break;
                }
            }
        }

        found
    }

    fn limitations(&self) -> &FindLimitations {
        &self.limits
    }
}
