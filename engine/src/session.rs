//! The session object: all mutable clock state for one run.
//!
//! Constructed at start, dropped at stop. Tick methods are plain functions of
//! `(state, time, presence label, rng)` so the runtime and tests drive them
//! identically.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;

use pclock_config::{DominanceSplit, Settings};
use pclock_core::{
    ActionOutcome, ActionScheduler, BitHistory, DriftClock, Keepalive, PlannedAction, TokenTable,
};
use pclock_types::{ActionTag, DispatchError, Mode, PresenceLabel, Token};

/// A token surfaced to the display.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenEvent {
    /// Regular clock emission.
    Cycle { token: Token, reset: bool },
    /// Synthesized liveness token; not part of the clock state.
    Keepalive(Token),
    /// Action tick result.
    Action(ActionOutcome),
}

impl fmt::Display for TokenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenEvent::Cycle { token, .. } => write!(f, "[cycle] {token}"),
            TokenEvent::Keepalive(token) => write!(f, "[keepalive] {token}"),
            TokenEvent::Action(outcome) => outcome.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Presence(PresenceLabel),
    Token(TokenEvent),
    Drift(f64),
    Mode(Mode),
    Paused(bool),
    Dominance(DominanceSplit),
    Stopped,
}

/// Read-only view for displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub paused: bool,
    pub drift: f64,
    pub buffered_bits: usize,
    pub cycle_bits: usize,
    pub windows_emitted: u64,
    pub pointer_step: u32,
    pub dominance: DominanceSplit,
}

#[derive(Debug)]
pub struct Session {
    table: Arc<TokenTable>,
    clock: DriftClock,
    history: BitHistory,
    scheduler: ActionScheduler,
    keepalive: Keepalive,
    settings: Settings,
    mode: Mode,
    paused: bool,
}

impl Session {
    #[must_use]
    pub fn new(settings: Settings, table: Arc<TokenTable>, now: Instant) -> Self {
        let clock = DriftClock::new(
            Arc::clone(&table),
            settings.clock.cycle_bits,
            settings.clock.drift_range,
            settings.clock.reset_probability,
        );
        Self {
            table,
            clock,
            history: BitHistory::default(),
            scheduler: ActionScheduler::new(settings.actions.pointer_step),
            keepalive: Keepalive::new(settings.clock.keepalive, now),
            settings,
            mode: Mode::default(),
            paused: false,
        }
    }

    /// Bit ingestion tick (1 Hz in the runtime).
    ///
    /// Presence is always reported and the history always slides; while
    /// paused the clock neither ingests nor emits. A keepalive is produced when
    /// no emission happened within the keepalive interval.
    pub fn cycle_tick<R: Rng + ?Sized>(
        &mut self,
        now: Instant,
        label: PresenceLabel,
        rng: &mut R,
    ) -> Vec<SessionEvent> {
        let bit = self.settings.session.active_states.bit_for(label);
        let mut events = vec![SessionEvent::Presence(label)];

        if !self.paused {
            self.clock.add_bit(bit);
        }
        self.history.push(bit);

        if !self.paused && self.clock.full() {
            let emission = self.clock.emit(rng);
            self.keepalive.note_emission(now);
            events.push(SessionEvent::Drift(emission.drift));
            events.push(SessionEvent::Token(TokenEvent::Cycle {
                token: emission.token,
                reset: emission.reset,
            }));
        } else if self.keepalive.due(now) {
            let token = self.keepalive.fire(&self.table, &self.history, now);
            events.push(SessionEvent::Token(TokenEvent::Keepalive(token)));
        }

        events
    }

    /// First half of an action tick. `None` while paused.
    pub fn plan_action<R: Rng + ?Sized>(
        &mut self,
        label: PresenceLabel,
        rng: &mut R,
    ) -> Option<PlannedAction> {
        if self.paused {
            return None;
        }
        let current = self.settings.session.active_states.bit_for(label);
        Some(self.scheduler.plan(
            &self.table,
            &self.history,
            current,
            self.mode,
            &self.settings.actions,
            rng,
        ))
    }

    /// Second half of an action tick: turn the dispatch result into events.
    #[must_use]
    pub fn finish_action(
        &self,
        planned: PlannedAction,
        result: Result<ActionTag, DispatchError>,
    ) -> Vec<SessionEvent> {
        let outcome = ActionScheduler::finish(planned, result);
        vec![
            SessionEvent::Token(TokenEvent::Action(outcome)),
            SessionEvent::Drift(self.clock.drift()),
        ]
    }

    pub fn set_mode(&mut self, mode: Mode) -> SessionEvent {
        if mode != self.mode {
            tracing::info!(mode = mode.as_str(), "Mode changed");
        }
        self.mode = mode;
        SessionEvent::Mode(mode)
    }

    pub fn set_paused(&mut self, paused: bool) -> SessionEvent {
        self.paused = paused;
        SessionEvent::Paused(paused)
    }

    pub fn toggle_pause(&mut self) -> SessionEvent {
        self.set_paused(!self.paused)
    }

    pub fn set_pointer_dominance(&mut self, pointer: u8) -> SessionEvent {
        self.settings.set_pointer_dominance(pointer);
        SessionEvent::Dominance(self.settings.actions.dominance)
    }

    /// Adopt new settings without restarting. Buffered bits and drift are kept.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.clock.reconfigure(
            settings.clock.cycle_bits,
            settings.clock.drift_range,
            settings.clock.reset_probability,
        );
        self.keepalive.set_interval(settings.clock.keepalive);
        tracing::info!(
            cycle_bits = settings.clock.cycle_bits,
            period_ms = settings.actions.period.as_millis() as u64,
            pointer = settings.actions.dominance.pointer(),
            "Settings applied"
        );
        self.settings = settings;
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            paused: self.paused,
            drift: self.clock.drift(),
            buffered_bits: self.clock.buffered(),
            cycle_bits: self.clock.cycle_bits(),
            windows_emitted: self.clock.windows_emitted(),
            pointer_step: self.scheduler.step(),
            dominance: self.settings.actions.dominance,
        }
    }
}
