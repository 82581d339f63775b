//! The 64-entry token table.

use rand::Rng;
use rand::seq::SliceRandom;

use pclock_types::{Bit, Token};

use crate::digest::{salted_index, sha_index};

pub const TABLE_SIZE: usize = 64;

/// Candidate symbols in table order. Only the first [`TABLE_SIZE`] are used.
const CANDIDATES: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+[]{};:,<.>/?";

/// Immutable lookup table holding exactly one [`Token::Reset`] and 63 symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTable {
    tokens: [Token; TABLE_SIZE],
}

impl TokenTable {
    /// Deterministic table: candidates in order, slot 0 replaced by the sentinel.
    #[must_use]
    pub fn ordered() -> Self {
        let mut tokens = [Token::Reset; TABLE_SIZE];
        for (slot, c) in tokens.iter_mut().zip(CANDIDATES.chars()) {
            *slot = Token::Symbol(c);
        }
        tokens[0] = Token::Reset;
        Self { tokens }
    }

    /// Ordered table permuted once.
    #[must_use]
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut table = Self::ordered();
        table.tokens.shuffle(rng);
        if !table.tokens.contains(&Token::Reset) {
            table.tokens[0] = Token::Reset;
        }
        table
    }

    /// Lookup by index. Indices wrap, so any `usize` is valid.
    #[must_use]
    pub fn get(&self, index: usize) -> Token {
        self.tokens[index % TABLE_SIZE]
    }

    /// Token selected by hashing `bits`.
    #[must_use]
    pub fn token_for(&self, bits: &[Bit]) -> Token {
        self.get(sha_index(bits))
    }

    /// Token selected by hashing `seed` followed by the salt.
    #[must_use]
    pub fn salted_token(&self, seed: &[Bit]) -> Token {
        self.get(salted_index(seed))
    }

    #[must_use]
    pub fn position(&self, token: Token) -> Option<usize> {
        self.tokens.iter().position(|t| *t == token)
    }

    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().copied()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        TABLE_SIZE
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::ordered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn reset_count(table: &TokenTable) -> usize {
        table.iter().filter(|t| t.is_reset()).count()
    }

    #[test]
    fn ordered_table_has_one_reset_and_64_entries() {
        let table = TokenTable::ordered();
        assert_eq!(table.iter().count(), 64);
        assert_eq!(reset_count(&table), 1);
        assert_eq!(table.get(0), Token::Reset);
        assert_eq!(table.get(1), Token::Symbol('B'));
        assert_eq!(table.get(62), Token::Symbol('!'));
        assert_eq!(table.get(63), Token::Symbol('@'));
    }

    #[test]
    fn entries_are_distinct() {
        let table = TokenTable::ordered();
        let unique: HashSet<Token> = table.iter().collect();
        assert_eq!(unique.len(), 64);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let shuffled = TokenTable::shuffled(&mut rng);
        assert_eq!(reset_count(&shuffled), 1);

        let original: HashSet<Token> = TokenTable::ordered().iter().collect();
        let permuted: HashSet<Token> = shuffled.iter().collect();
        assert_eq!(original, permuted);
    }

    #[test]
    fn same_seed_same_table() {
        let a = TokenTable::shuffled(&mut StdRng::seed_from_u64(42));
        let b = TokenTable::shuffled(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn lookup_wraps() {
        let table = TokenTable::ordered();
        assert_eq!(table.get(64), table.get(0));
        assert_eq!(table.get(130), table.get(2));
    }
}
