//! The drift clock: bit windows in, tokens out.
//!
//! Two observable states: filling (fewer than `cycle_bits` buffered) and ready
//! to emit. [`DriftClock::emit`] consumes one window, selects a token by hash,
//! wanders the drift accumulator, and on a drawn `RESET` token may wipe the
//! leftover bits and the drift.

use std::sync::Arc;

use rand::Rng;

use pclock_types::{Bit, Token};

use crate::{TokenTable, unit};

/// Drift is clamped to this multiple of `drift_range`.
pub const DRIFT_BOUND_FACTOR: f64 = 8.0;

/// Result of one emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub token: Token,
    /// Drift after this emission (zero if a reset fired).
    pub drift: f64,
    /// Whether the rare reset event wiped leftover bits and drift.
    pub reset: bool,
}

#[derive(Debug, Clone)]
pub struct DriftClock {
    table: Arc<TokenTable>,
    bits: Vec<Bit>,
    cycle_bits: usize,
    drift_range: f64,
    reset_prob: f64,
    drift: f64,
    windows_emitted: u64,
}

impl DriftClock {
    #[must_use]
    pub fn new(table: Arc<TokenTable>, cycle_bits: u32, drift_range: f64, reset_prob: f64) -> Self {
        let mut clock = Self {
            table,
            bits: Vec::new(),
            cycle_bits: 1,
            drift_range: 0.0,
            reset_prob: 0.0,
            drift: 0.0,
            windows_emitted: 0,
        };
        clock.reconfigure(cycle_bits, drift_range, reset_prob);
        clock
    }

    /// Apply new parameters without discarding buffered bits or drift.
    pub fn reconfigure(&mut self, cycle_bits: u32, drift_range: f64, reset_prob: f64) {
        self.cycle_bits = (cycle_bits as usize).max(1);
        self.drift_range = if drift_range.is_finite() {
            drift_range.abs()
        } else {
            0.0
        };
        self.reset_prob = if reset_prob.is_finite() {
            reset_prob.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let bound = self.drift_bound();
        self.drift = self.drift.clamp(-bound, bound);
    }

    pub fn add_bit(&mut self, bit: Bit) {
        self.bits.push(bit);
    }

    #[must_use]
    pub fn full(&self) -> bool {
        self.bits.len() >= self.cycle_bits
    }

    /// Consume one window and select a token.
    ///
    /// Normally called only when [`DriftClock::full`]; on a short buffer the
    /// window is whatever bits are present.
    pub fn emit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Emission {
        let take = self.cycle_bits.min(self.bits.len());
        let window: Vec<Bit> = self.bits.drain(..take).collect();
        let token = self.table.token_for(&window);

        let bound = self.drift_bound();
        let step = (unit(rng) * 2.0 - 1.0) * self.drift_range;
        self.drift = (self.drift + step).clamp(-bound, bound);

        let mut reset = false;
        if token.is_reset() && unit(rng) < self.reset_prob {
            tracing::info!(
                leftover = self.bits.len(),
                "Clock reset event triggered by RESET token"
            );
            self.bits.clear();
            self.drift = 0.0;
            reset = true;
        }

        self.windows_emitted += 1;
        Emission {
            token,
            drift: self.drift,
            reset,
        }
    }

    #[must_use]
    pub fn drift(&self) -> f64 {
        self.drift
    }

    #[must_use]
    pub fn drift_bound(&self) -> f64 {
        self.drift_range * DRIFT_BOUND_FACTOR
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn cycle_bits(&self) -> usize {
        self.cycle_bits
    }

    #[must_use]
    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted
    }

    #[must_use]
    pub fn table(&self) -> &Arc<TokenTable> {
        &self.table
    }
}
