//! Parsers turning finder candidates into a token sequence
//!
//! [`OptimalParser`] runs a shortest-path search over plaintext positions:
//! every position is a node, a literal is an edge of length one and every
//! candidate prefix is an edge of its length, weighted by the format's
//! [`PriceCalculator`]. [`GreedyParser`] takes the longest profitable match at
//! each position and is kept as the fast alternative.

use super::{FindLimitations, Match, MatchFinder, MatchSearch, PriceCalculator, PriceContext};

/// Matches at least this long are committed without examining the positions
/// they cover
pub const FAST_LENGTH: usize = 0x120;

/// One element of a parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// The plaintext byte at this position is stored verbatim
    Literal(usize),
    /// A back-reference
    Match(Match),
}

/// Cover of a plaintext by literals and matches
///
/// Only the matches are stored; every position they do not cover is a
/// literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parse {
    matches: Vec<Match>,
    input_len: usize,
}

impl Parse {
    /// Create a parse from matches ordered by position
    pub fn new(matches: Vec<Match>, input_len: usize) -> Self {
        debug_assert!(matches.windows(2).all(|w| w[0].end() <= w[1].position));
        debug_assert!(matches.last().map_or(true, |m| m.end() <= input_len));
        Self { matches, input_len }
    }

    /// Matches in plaintext order
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Length of the parsed plaintext
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Tokens in plaintext order
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens {
            matches: &self.matches,
            position: 0,
            input_len: self.input_len,
        }
    }

    /// Number of literal tokens
    pub fn literal_count(&self) -> usize {
        self.input_len - self.matches.iter().map(|m| m.length).sum::<usize>()
    }

    /// Number of match tokens
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Length of the longest match, zero without matches
    pub fn longest_match(&self) -> usize {
        self.matches.iter().map(|m| m.length).max().unwrap_or(0)
    }

    /// Total price of the parse under `prices`
    pub fn price(&self, prices: &dyn PriceCalculator) -> u64 {
        let mut total = 0u64;
        let mut literal_run = 0;
        for token in self.tokens() {
            match token {
                Token::Literal(position) => {
                    total += prices.literal_price(&PriceContext {
                        position,
                        literal_run,
                    }) as u64;
                    literal_run += 1;
                }
                Token::Match(m) => {
                    total += prices.match_price(
                        &m,
                        &PriceContext {
                            position: m.position,
                            literal_run,
                        },
                    ) as u64;
                    literal_run = 0;
                }
            }
        }
        total
    }
}

/// Iterator over the tokens of a [`Parse`]
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    matches: &'a [Match],
    position: usize,
    input_len: usize,
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.position >= self.input_len {
            return None;
        }
        match self.matches.first() {
            Some(m) if m.position == self.position => {
                self.matches = &self.matches[1..];
                self.position = m.end();
                Some(Token::Match(*m))
            }
            _ => {
                let position = self.position;
                self.position += 1;
                Some(Token::Literal(position))
            }
        }
    }
}

/// Chooses a token sequence covering an input
pub trait Parser {
    /// Parse `input` with a prepared `finder`
    fn parse(
        &self,
        input: &[u8],
        finder: &mut dyn MatchFinder,
        prices: &dyn PriceCalculator,
    ) -> Parse;
}

/// Parsing strategy of an encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParseStrategy {
    /// Minimum total price
    #[default]
    Optimal,
    /// Longest match first
    Greedy,
}

impl ParseStrategy {
    /// Parse `input` under `limits` with a finder built from `search`
    pub fn parse(
        &self,
        input: &[u8],
        limits: FindLimitations,
        prices: &dyn PriceCalculator,
        search: MatchSearch,
    ) -> Parse {
        let mut finder = search.finder(limits);
        finder.prepare(input);
        let parse = match self {
            ParseStrategy::Optimal => OptimalParser::default().parse(input, finder.as_mut(), prices),
            ParseStrategy::Greedy => GreedyParser.parse(input, finder.as_mut(), prices),
        };
        log::trace!(
            "{:?} parse of {} bytes: {} literals, {} matches",
            self,
            input.len(),
            parse.literal_count(),
            parse.match_count()
        );
        parse
    }
}

/// How an encoder searches for and selects matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParseSettings {
    /// Token selection
    pub strategy: ParseStrategy,
    /// Match search algorithm
    pub search: MatchSearch,
}

impl ParseSettings {
    /// Parse `input` under `limits`
    pub fn parse(
        &self,
        input: &[u8],
        limits: FindLimitations,
        prices: &dyn PriceCalculator,
    ) -> Parse {
        self.strategy.parse(input, limits, prices, self.search)
    }
}

/// Edge into a node of the parse graph; `length == 0` marks a literal
#[derive(Debug, Clone, Copy)]
struct Edge {
    cost: u32,
    length: u32,
    displacement: u32,
    literal_run: u32,
}

impl Edge {
    const UNREACHED: Edge = Edge {
        cost: u32::MAX,
        length: 0,
        displacement: 0,
        literal_run: 0,
    };

    fn advance(&self) -> u32 {
        self.length.max(1)
    }
}

/// Minimum-price parser
#[derive(Debug, Clone, Copy)]
pub struct OptimalParser {
    /// Candidates at least this long are taken without further search
    pub fast_length: usize,
}

impl Default for OptimalParser {
    fn default() -> Self {
        Self {
            fast_length: FAST_LENGTH,
        }
    }
}

impl OptimalParser {
    /// Replace the edge into `target` when the new one is cheaper, or equally
    /// cheap and longer
    #[inline]
    fn relax(nodes: &mut [Edge], target: usize, edge: Edge) {
        let current = &mut nodes[target];
        if edge.cost < current.cost
            || (edge.cost == current.cost && edge.advance() > current.advance())
        {
            *current = edge;
        }
    }
}

impl Parser for OptimalParser {
    fn parse(
        &self,
        input: &[u8],
        finder: &mut dyn MatchFinder,
        prices: &dyn PriceCalculator,
    ) -> Parse {
        let n = input.len();
        let limits = *finder.limitations();
        let unit = limits.unit_size.max(1);

        let mut nodes = vec![Edge::UNREACHED; n + 1];
        nodes[0].cost = 0;

        let mut committed_until = 0;
        let mut position = 0;
        while position < n {
            let here = nodes[position];
            let context = PriceContext {
                position,
                literal_run: here.literal_run as usize,
            };

            let literal = prices.literal_price(&context);
            Self::relax(
                &mut nodes,
                position + 1,
                Edge {
                    cost: here.cost.saturating_add(literal),
                    length: 0,
                    displacement: 0,
                    literal_run: here.literal_run + 1,
                },
            );

            let candidates = finder.find_matches(input, position);
            let take = |m: Match, nodes: &mut [Edge]| {
                let price = prices.match_price(&m, &context);
                Self::relax(
                    nodes,
                    m.end(),
                    Edge {
                        cost: here.cost.saturating_add(price),
                        length: m.length as u32,
                        displacement: m.displacement as u32,
                        literal_run: 0,
                    },
                );
            };

            let longest = candidates.last().copied();
            if let Some(longest) = longest.filter(|m| m.length >= self.fast_length) {
                take(longest, &mut nodes);
                position = longest.end();
                continue;
            }

            // a match at the format's length cap is committed as well, but the
            // positions it covers keep their literal and longest match edges
            let capped = |m: &Match| m.length >= limits.max_length || position < committed_until;
            if let Some(longest) = longest.filter(capped) {
                take(longest, &mut nodes);
                if longest.length >= limits.max_length {
                    committed_until = longest.end();
                }
                position += 1;
                continue;
            }

            let mut shortest = limits.min_length.div_ceil(unit) * unit;
            for candidate in &candidates {
                let mut length = shortest;
                while length <= candidate.length {
                    take(
                        Match::new(position, length, candidate.displacement),
                        &mut nodes,
                    );
                    length += unit;
                }
                shortest = shortest.max(length);
            }

            position += 1;
        }

        let mut matches = Vec::new();
        let mut position = n;
        while position > 0 {
            let edge = nodes[position];
            if edge.length == 0 {
                position -= 1;
            } else {
                let length = edge.length as usize;
                position -= length;
                matches.push(Match::new(position, length, edge.displacement as usize));
            }
        }
        matches.reverse();

        Parse::new(matches, n)
    }
}

/// Longest-match-first parser
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyParser;

impl Parser for GreedyParser {
    fn parse(
        &self,
        input: &[u8],
        finder: &mut dyn MatchFinder,
        prices: &dyn PriceCalculator,
    ) -> Parse {
        let mut matches = Vec::new();
        let mut position = 0;
        let mut literal_run = 0;

        while position < input.len() {
            let context = PriceContext {
                position,
                literal_run,
            };
            let candidates = finder.find_matches(input, position);
            let profitable = candidates.last().copied().filter(|m| {
                let literals = prices.literal_price(&context) as u64 * m.length as u64;
                (prices.match_price(m, &context) as u64) < literals
            });

            match profitable {
                Some(m) => {
                    matches.push(m);
                    position = m.end();
                    literal_run = 0;
                }
                None => {
                    position += 1;
                    literal_run += 1;
                }
            }
        }

        Parse::new(matches, input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{FlatPrice, HashChainFinder, WindowFinder};
    use std::cell::Cell;

    const LIMITS: FindLimitations = FindLimitations::new(3, 18, 1, 0x1000);
    const PRICES: FlatPrice = FlatPrice {
        literal_bits: 9,
        match_bits: 17,
    };

    fn parse_with(parser: &dyn Parser, input: &[u8], limits: FindLimitations) -> Parse {
        let mut finder = WindowFinder::new(limits);
        finder.prepare(input);
        parser.parse(input, &mut finder, &PRICES)
    }

    fn expand(parse: &Parse, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(parse.input_len());
        for token in parse.tokens() {
            match token {
                Token::Literal(pos) => out.push(input[pos]),
                Token::Match(m) => {
                    for _ in 0..m.length {
                        out.push(out[out.len() - m.displacement]);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_empty_input() {
        let parse = parse_with(&OptimalParser::default(), &[], LIMITS);
        assert_eq!(parse.tokens().count(), 0);
        assert_eq!(parse.literal_count(), 0);
    }

    #[test]
    fn test_run_after_search_start() {
        let input = [b'A'; 12];
        let parse = parse_with(&OptimalParser::default(), &input, LIMITS.with_search_start(3));
        let tokens: Vec<_> = parse.tokens().collect();
        assert_eq!(
            tokens,
            [
                Token::Literal(0),
                Token::Literal(1),
                Token::Literal(2),
                Token::Match(Match::new(3, 9, 1))
            ]
        );
    }

    #[test]
    fn test_run_without_search_start() {
        let input = [b'A'; 12];
        let parse = parse_with(&OptimalParser::default(), &input, LIMITS);
        assert_eq!(parse.matches(), &[Match::new(1, 11, 1)]);
    }

    #[test]
    fn test_optimal_beats_greedy() {
        let input = b"abcXbcdefghijkYabcdefghijk";
        let optimal = parse_with(&OptimalParser::default(), input, LIMITS);
        let greedy = parse_with(&GreedyParser, input, LIMITS);

        assert_eq!(greedy.matches(), &[Match::new(15, 3, 15), Match::new(18, 8, 12)]);
        assert_eq!(optimal.matches(), &[Match::new(16, 10, 12)]);
        assert!(optimal.price(&PRICES) < greedy.price(&PRICES));
        assert_eq!(expand(&optimal, input), input);
        assert_eq!(expand(&greedy, input), input);
    }

    #[test]
    fn test_never_worse_than_greedy() {
        let input: Vec<u8> = b"she sells sea shells by the sea shore, the shells she sells are sea shells"
            .iter()
            .copied()
            .cycle()
            .take(600)
            .collect();
        let optimal = parse_with(&OptimalParser::default(), &input, LIMITS);
        let greedy = parse_with(&GreedyParser, &input, LIMITS);
        assert!(optimal.price(&PRICES) <= greedy.price(&PRICES));
        assert_eq!(expand(&optimal, &input), input);
    }

    #[test]
    fn test_long_matches_are_committed() {
        let limits = FindLimitations::new(3, 0x1000, 1, 0x1000);
        let input = vec![0u8; 2000];
        let parse = parse_with(&OptimalParser::default(), &input, limits);
        assert_eq!(parse.matches(), &[Match::new(1, 1999, 1)]);
        assert_eq!(parse.literal_count(), 1);
    }

    /// Counts how many match edges the parser prices
    struct CountingPrice {
        inner: FlatPrice,
        match_calls: Cell<usize>,
    }

    impl PriceCalculator for CountingPrice {
        fn literal_price(&self, context: &PriceContext) -> u32 {
            self.inner.literal_price(context)
        }

        fn match_price(&self, m: &Match, context: &PriceContext) -> u32 {
            self.match_calls.set(self.match_calls.get() + 1);
            self.inner.match_price(m, context)
        }
    }

    #[test]
    fn test_matches_at_max_length_are_committed() {
        // the format caps matches below FAST_LENGTH
        let limits = FindLimitations::new(3, 0x111, 1, 0x1000);
        let input = vec![0u8; 100_000];
        let prices = CountingPrice {
            inner: PRICES,
            match_calls: Cell::new(0),
        };
        let mut finder = HashChainFinder::new(limits);
        finder.prepare(&input);
        let parse = OptimalParser::default().parse(&input, &mut finder, &prices);

        assert_eq!(parse.literal_count(), 1);
        assert_eq!(parse.match_count(), (input.len() - 1).div_ceil(0x111));
        assert_eq!(expand(&parse, &input), input);
        // one edge per covered position instead of one per length
        assert!(prices.match_calls.get() < 2 * input.len());
    }

    #[test]
    fn test_committed_runs_stay_optimal_over_greedy() {
        let limits = FindLimitations::new(3, 0x111, 1, 0x1000);
        let mut input = b"0123456789".repeat(100);
        input.extend(b"abcdefghij0123");
        input.extend(vec![b'z'; 700]);
        let optimal = parse_with(&OptimalParser::default(), &input, limits);
        let greedy = parse_with(&GreedyParser, &input, limits);
        assert!(optimal.price(&PRICES) <= greedy.price(&PRICES));
        assert_eq!(expand(&optimal, &input), input);
    }

    #[test]
    fn test_unit_sized_lengths() {
        let limits = FindLimitations::new(2, 32, 2, 64).with_unit_size(2);
        let input = b"ababababababXY";
        let parse = parse_with(&OptimalParser::default(), input, limits);
        assert!(parse
            .matches()
            .iter()
            .all(|m| m.length % 2 == 0 && m.displacement % 2 == 0));
        assert_eq!(expand(&parse, input), input);
    }

    #[test]
    fn test_parse_counts() {
        let parse = Parse::new(vec![Match::new(2, 5, 1), Match::new(9, 3, 4)], 14);
        assert_eq!(parse.literal_count(), 6);
        assert_eq!(parse.match_count(), 2);
        assert_eq!(parse.longest_match(), 5);
        assert_eq!(parse.tokens().count(), 8);
    }

    #[test]
    fn test_strategy_dispatch() {
        let input = b"abcabcabcabcabc";
        let parse = ParseStrategy::Greedy.parse(input, LIMITS, &PRICES, MatchSearch::HashChain);
        assert_eq!(parse.matches(), &[Match::new(3, 12, 3)]);
        let parse = ParseStrategy::Optimal.parse(input, LIMITS, &PRICES, MatchSearch::Exhaustive);
        assert_eq!(parse.matches(), &[Match::new(3, 12, 3)]);
    }
}
