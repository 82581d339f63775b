//! Liveness tokens for quiet clocks.
//!
//! With a large window the clock may go minutes between emissions. When no
//! emission has happened within the keepalive interval a token is synthesized
//! from the recent history so the display never looks frozen. This does not
//! touch the clock's state.

use std::time::{Duration, Instant};

use pclock_types::{Bit, Token};

use crate::{BitHistory, TokenTable};

/// History shorter than this is replaced by zero filler.
const MIN_SEED_BITS: usize = 8;

#[derive(Debug, Clone)]
pub struct Keepalive {
    interval: Duration,
    last_emit: Instant,
}

impl Keepalive {
    #[must_use]
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_emit: now,
        }
    }

    /// Record a real clock emission.
    pub fn note_emission(&mut self, now: Instant) {
        self.last_emit = now;
    }

    #[must_use]
    pub fn due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_emit) >= self.interval
    }

    /// Synthesize a keepalive token and restart the interval.
    pub fn fire(&mut self, table: &TokenTable, history: &BitHistory, now: Instant) -> Token {
        self.last_emit = now;
        table.salted_token(&seed(history))
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}

fn seed(history: &BitHistory) -> Vec<Bit> {
    if history.len() >= MIN_SEED_BITS {
        history.to_vec()
    } else {
        vec![Bit::Zero; MIN_SEED_BITS]
    }
}
