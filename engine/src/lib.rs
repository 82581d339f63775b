//! Session engine for Presence Clock - state machine and orchestration.
//!
//! This crate owns the running session without any terminal dependencies:
//!
//! - [`Session`]: clock, history, scheduler and keepalive state, driven by
//!   explicit tick calls
//! - [`PresenceWatcher`]: background sampling with grace and backoff
//! - [`SessionHandle`]: the tokio task that serializes both timers and
//!   front-end commands

#![allow(clippy::missing_errors_doc)]

mod runtime;
mod session;
mod watcher;

pub use runtime::{CYCLE_PERIOD, EngineError, RuntimeOptions, SessionCommand, SessionHandle};
pub use session::{Session, SessionEvent, SessionSnapshot, TokenEvent};
pub use watcher::{JsonFileSampler, PresenceSampler, PresenceWatcher, SampleError};

pub use pclock_config::{DominanceSplit, Settings};
pub use pclock_core::{ActionOutcome, Actuator, DryRunActuator, TokenTable};
pub use pclock_types::{Mode, PresenceLabel, Token};
