//! Core domain logic for Presence Clock.
//!
//! Everything in this crate is synchronous and free of UI or runtime
//! dependencies: the engine drives it from timers, tests drive it directly.
//! Randomness is always injected (`&mut impl Rng`) so behaviour can be seeded.
//!
//! ```text
//! presence label -> Bit -> DriftClock::add_bit -> [full] emit -> Token
//!                     \-> BitHistory -> ActionScheduler::plan -> Action -> Actuator
//! ```

pub mod actuator;
pub mod digest;
pub mod drift_clock;
pub mod history;
pub mod keepalive;
pub mod presence;
pub mod scheduler;
pub mod token_table;

pub use actuator::{Actuator, DryRunActuator};
pub use digest::{SALT, sha_index, window_digest};
pub use drift_clock::{DriftClock, Emission};
pub use history::BitHistory;
pub use keepalive::Keepalive;
pub use presence::{PresenceTracker, normalize_name};
pub use scheduler::{ActionOutcome, ActionScheduler, PlannedAction};
pub use token_table::{TABLE_SIZE, TokenTable};

use rand::Rng;
use rand::distr::{Distribution, StandardUniform};

/// Uniform draw in `[0, 1)`.
pub(crate) fn unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardUniform.sample(rng)
}

/// Uniform pick from a non-empty slice.
pub(crate) fn pick<T: Copy, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> T {
    debug_assert!(!items.is_empty());
    let idx = (unit(rng) * items.len() as f64) as usize;
    items[idx.min(items.len() - 1)]
}
