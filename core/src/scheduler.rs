//! Action cadence: one planned action per action tick.
//!
//! Planning is split from dispatch so the engine can run the (possibly
//! blocking) actuator call off its timer task:
//!
//! ```text
//! plan(history) -> PlannedAction -> Actuator::dispatch -> finish(result) -> ActionOutcome
//! ```

use std::fmt;

use rand::Rng;

use pclock_config::{ActionSettings, DominanceSplit};
use pclock_types::{
    Action, ActionDomain, ActionTag, Bit, ClickKind, Direction, DispatchError, Key, Mode,
    PointerAction, ScrollDirection, Token,
};

use crate::{BitHistory, TokenTable, pick, unit};

/// Bits of history used as the action seed.
pub const SEED_BITS: usize = 8;

// Cumulative pointer shares: 60% nudge, 25% click, 10% scroll, 5% drag.
const NUDGE_UPPER: f64 = 0.60;
const CLICK_UPPER: f64 = 0.85;
const SCROLL_UPPER: f64 = 0.95;

/// Share of key actions drawn from the fixed vocabulary; the rest echo the token.
const NAMED_KEY_SHARE: f64 = 0.85;

/// An action chosen but not yet dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedAction {
    /// Hash-selected token, for display only.
    pub token: Token,
    pub action: Action,
}

/// A dispatched action and its result tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub token: Token,
    pub action: Action,
    pub tag: ActionTag,
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {} [{}]", self.token, self.action, self.tag)
    }
}

/// Scheduler state: only the acceleration ramp survives between ticks.
#[derive(Debug, Clone)]
pub struct ActionScheduler {
    step: u32,
}

impl ActionScheduler {
    #[must_use]
    pub fn new(base_step: u32) -> Self {
        Self { step: base_step }
    }

    #[must_use]
    pub fn step(&self) -> u32 {
        self.step
    }

    /// The last [`SEED_BITS`] bits of history, or the current bit repeated
    /// when the history is still shorter than that.
    #[must_use]
    pub fn seed_bits(history: &BitHistory, current: Bit) -> Vec<Bit> {
        if history.len() < SEED_BITS {
            vec![current; SEED_BITS]
        } else {
            history.recent(SEED_BITS)
        }
    }

    /// Resolve the acting domain. In auto mode a zero weight forces the other side.
    pub fn choose_domain<R: Rng + ?Sized>(
        mode: Mode,
        dominance: DominanceSplit,
        rng: &mut R,
    ) -> ActionDomain {
        match mode {
            Mode::Pointer => ActionDomain::Pointer,
            Mode::Key => ActionDomain::Key,
            Mode::Auto => {
                if dominance.pointer() == 0 {
                    ActionDomain::Key
                } else if dominance.key() == 0 {
                    ActionDomain::Pointer
                } else if unit(rng) * f64::from(DominanceSplit::TOTAL)
                    < f64::from(dominance.pointer())
                {
                    ActionDomain::Pointer
                } else {
                    ActionDomain::Key
                }
            }
        }
    }

    pub fn plan<R: Rng + ?Sized>(
        &mut self,
        table: &TokenTable,
        history: &BitHistory,
        current: Bit,
        mode: Mode,
        settings: &ActionSettings,
        rng: &mut R,
    ) -> PlannedAction {
        let token = table.salted_token(&Self::seed_bits(history, current));
        let action = match Self::choose_domain(mode, settings.dominance, rng) {
            ActionDomain::Pointer => Action::Pointer(self.choose_pointer(settings, rng)),
            ActionDomain::Key => {
                self.step = settings.pointer_step;
                Action::Key(Self::choose_key(token, rng))
            }
        };
        PlannedAction { token, action }
    }

    fn choose_pointer<R: Rng + ?Sized>(
        &mut self,
        settings: &ActionSettings,
        rng: &mut R,
    ) -> PointerAction {
        let r = unit(rng);
        if r < NUDGE_UPPER {
            let direction = pick(&Direction::ALL, rng);
            let ramped = self.step.saturating_add(settings.pointer_accel);
            self.step = ramped
                .max(settings.pointer_step)
                .min(settings.pointer_max_step);
            return PointerAction::Nudge {
                direction,
                step: self.step,
            };
        }

        self.step = settings.pointer_step;
        if r < CLICK_UPPER {
            PointerAction::Click(pick(&ClickKind::ALL, rng))
        } else if r < SCROLL_UPPER {
            PointerAction::Scroll(pick(&ScrollDirection::ALL, rng))
        } else if unit(rng) < 0.5 {
            PointerAction::DragStart
        } else {
            PointerAction::DragEnd
        }
    }

    /// Mostly a fixed named key; sometimes the token's own character, or
    /// space when the token is not a single printable character.
    pub fn choose_key<R: Rng + ?Sized>(token: Token, rng: &mut R) -> Key {
        if unit(rng) < NAMED_KEY_SHARE {
            return Key::Named(pick(&Key::VOCABULARY, rng));
        }
        token.printable_char().map_or(Key::SPACE, Key::Char)
    }

    /// Convert a dispatch result into an outcome. Failures become `skip` tags.
    #[must_use]
    pub fn finish(
        planned: PlannedAction,
        result: Result<ActionTag, DispatchError>,
    ) -> ActionOutcome {
        let tag = match result {
            Ok(tag) => tag,
            Err(err) => {
                tracing::debug!(action = %planned.action, "Dispatch failed: {err}");
                ActionTag::from(&err)
            }
        };
        ActionOutcome {
            token: planned.token,
            action: planned.action,
            tag,
        }
    }
}
