//! Sliding window of recent presence bits.

use std::collections::VecDeque;

use pclock_types::Bit;

pub const HISTORY_CAPACITY: usize = 64;

/// Bounded history, oldest first. Unlike the drift clock's buffer it is never
/// truncated by emission; it only slides.
#[derive(Debug, Clone)]
pub struct BitHistory {
    bits: VecDeque<Bit>,
    capacity: usize,
}

impl BitHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bits: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, bit: Bit) {
        if self.bits.len() == self.capacity {
            self.bits.pop_front();
        }
        self.bits.push_back(bit);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The most recent `n` bits (fewer if not yet available), oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Bit> {
        let skip = self.bits.len().saturating_sub(n);
        self.bits.iter().skip(skip).copied().collect()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Bit> {
        self.bits.iter().copied().collect()
    }
}

impl Default for BitHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slides_at_capacity() {
        let mut history = BitHistory::new(3);
        for bit in Bit::pattern("1100") {
            history.push(bit);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.to_vec(), Bit::pattern("100"));
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut history = BitHistory::default();
        for bit in Bit::pattern("1111000010") {
            history.push(bit);
        }
        assert_eq!(history.recent(4), Bit::pattern("0010"));
        assert_eq!(history.recent(64).len(), 10);
    }
}
