use super::tokens::Token;
use super::{MAX_MATCH, MIN_MATCH, WINDOW_SIZE};

const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;

/// How many chain candidates to examine per position
const MAX_CHAIN: u32 = 128;

/// Empty-chain sentinel; no valid position can reach it since a slice is
/// always shorter than `usize::MAX`
const NO_POS: usize = usize::MAX;

/// Hash-chain longest-match searcher over the whole input
///
/// Positions sharing a 3-byte-prefix hash are chained newest-first, so the
/// walk naturally prefers the shortest distance among equal-length matches.
/// The workspace is sized once from the input; nothing is retained across
/// invocations.
pub struct Matcher<'a> {
    src: &'a [u8],
    pos: usize,
    /// Most recent position per hash bucket
    head: Vec<usize>,
    /// Previous position with the same hash, per position
    prev: Vec<usize>,
}

impl<'a> Matcher<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0, head: vec![NO_POS; HASH_SIZE], prev: vec![NO_POS; src.len()] }
    }

    #[inline]
    fn hash(&self, pos: usize) -> usize {
        let v = u32::from(self.src[pos]) << 16
            | u32::from(self.src[pos + 1]) << 8
            | u32::from(self.src[pos + 2]);
        (v.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    #[inline]
    fn insert(&mut self, pos: usize) {
        if pos + MIN_MATCH <= self.src.len() {
            let h = self.hash(pos);
            self.prev[pos] = self.head[h];
            self.head[h] = pos;
        }
    }

    /// Longest match for `pos` within the 32 KiB window, or None if nothing
    /// of at least MIN_MATCH bytes exists
    fn longest_match(&self, pos: usize) -> Option<(u16, u16)> {
        if pos + MIN_MATCH > self.src.len() {
            return None;
        }
        let max_len = MAX_MATCH.min(self.src.len() - pos);

        let mut best_len = MIN_MATCH - 1;
        let mut best_dist = 0usize;
        let mut cand = self.head[self.hash(pos)];
        let mut depth = MAX_CHAIN;

        while cand != NO_POS && depth > 0 {
            let dist = pos - cand;
            if dist > WINDOW_SIZE {
                // Chains are newest-first; everything further is older still
                break;
            }

            let len = self.src[cand..]
                .iter()
                .zip(&self.src[pos..])
                .take(max_len)
                .take_while(|(a, b)| a == b)
                .count();
            if len > best_len {
                best_len = len;
                best_dist = dist;
                if len == max_len {
                    break;
                }
            }

            cand = self.prev[cand];
            depth -= 1;
        }

        if best_len >= MIN_MATCH {
            Some((best_len as u16, best_dist as u16))
        } else {
            None
        }
    }

    /// Produce the next LZ77 token, or None at end of input
    ///
    /// Lazy matching: a match at `pos` is deferred to a literal whenever the
    /// match starting at `pos + 1` is strictly longer.
    pub fn next_token(&mut self) -> Option<Token> {
        if self.pos >= self.src.len() {
            return None;
        }
        let pos = self.pos;
        let found = self.longest_match(pos);
        self.insert(pos);

        let token = match found {
            None => Token::Literal(self.src[pos]),
            Some((length, distance)) => {
                if (length as usize) < MAX_MATCH {
                    if let Some((next_len, _)) = self.longest_match(pos + 1) {
                        if next_len > length {
                            self.pos = pos + 1;
                            return Some(Token::Literal(self.src[pos]));
                        }
                    }
                }
                for p in pos + 1..pos + length as usize {
                    self.insert(p);
                }
                Token::Copy { length, distance }
            }
        };

        self.pos += token.source_len();
        Some(token)
    }
}
