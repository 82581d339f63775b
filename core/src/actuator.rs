//! The actuator boundary.
//!
//! Real input injection is platform specific and lives outside this crate.
//! [`DryRunActuator`] produces the same result tags a real backend would and
//! logs them, which is what the binary uses by default.

use std::time::Duration;

use pclock_config::ActionSettings;
use pclock_types::{Action, ActionTag, ClickKind, DispatchError, Key, PointerAction};

/// Executes one single-shot input action.
///
/// Implementations may block briefly (key delays); the engine calls them off
/// its timer task.
pub trait Actuator: Send {
    fn dispatch(&mut self, action: &Action) -> Result<ActionTag, DispatchError>;

    /// Pick up changed action settings. Default: nothing to update.
    fn reconfigure(&mut self, _settings: &ActionSettings) {}
}

/// Key names as the adminless backend spells them.
#[must_use]
pub fn adminless_key_name(name: &str) -> &str {
    match name {
        "page up" => "pageup",
        "page down" => "pagedown",
        "caps lock" => "capslock",
        other => other,
    }
}

/// The tag a backend reports for `action`.
#[must_use]
pub fn describe(action: &Action, adminless: bool) -> ActionTag {
    match action {
        Action::Pointer(PointerAction::Nudge { direction, step }) => {
            let (dx, dy) = direction.unit();
            let step = *step as i32;
            ActionTag::new(format!("move({},{})", dx * step, dy * step))
        }
        Action::Pointer(PointerAction::Click(kind)) => ActionTag::new(match kind {
            ClickKind::Left => "click",
            ClickKind::Right => "rclick",
            ClickKind::Double => "dblclick",
        }),
        Action::Pointer(PointerAction::Scroll(dir)) => {
            let axis = if dir.is_vertical() { 'v' } else { 'h' };
            ActionTag::new(format!("scroll_{axis}:{}", dir.delta()))
        }
        Action::Pointer(PointerAction::DragStart) => ActionTag::new("drag_start"),
        Action::Pointer(PointerAction::DragEnd) => ActionTag::new("drag_end"),
        Action::Key(Key::Named(name)) => {
            let name: &str = name;
            let name = if adminless {
                adminless_key_name(name)
            } else {
                name
            };
            ActionTag::new(format!("key:{name}"))
        }
        Action::Key(Key::Char(c)) => ActionTag::new(format!("key:{c}")),
    }
}

/// Logs actions instead of performing them.
#[derive(Debug, Clone)]
pub struct DryRunActuator {
    key_delay: Duration,
    adminless: bool,
    dispatched: u64,
}

impl DryRunActuator {
    #[must_use]
    pub fn new(settings: &ActionSettings) -> Self {
        Self {
            key_delay: settings.key_delay,
            adminless: settings.adminless_keys,
            dispatched: 0,
        }
    }

    /// Skip the post-key delay (tests, benchmarks).
    #[must_use]
    pub fn without_delay(mut self) -> Self {
        self.key_delay = Duration::ZERO;
        self
    }

    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

impl Actuator for DryRunActuator {
    fn dispatch(&mut self, action: &Action) -> Result<ActionTag, DispatchError> {
        let tag = describe(action, self.adminless);
        tracing::debug!(%action, %tag, "dry-run dispatch");
        if matches!(action, Action::Key(_)) && !self.key_delay.is_zero() {
            std::thread::sleep(self.key_delay);
        }
        self.dispatched += 1;
        Ok(tag)
    }

    fn reconfigure(&mut self, settings: &ActionSettings) {
        self.key_delay = settings.key_delay;
        self.adminless = settings.adminless_keys;
    }
}
