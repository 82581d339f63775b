//! Actuator actions, result tags and dispatch errors.

use std::fmt;
use thiserror::Error;

/// The two actuator domains an action tick can act in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionDomain {
    Pointer,
    Key,
}

/// Directional nudge of the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::UpLeft,
        Direction::UpRight,
        Direction::DownLeft,
        Direction::DownRight,
    ];

    /// Unit vector in screen coordinates (y grows downwards).
    #[must_use]
    pub const fn unit(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::UpLeft => (-1, -1),
            Direction::UpRight => (1, -1),
            Direction::DownLeft => (-1, 1),
            Direction::DownRight => (1, 1),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::UpLeft => "up_left",
            Direction::UpRight => "up_right",
            Direction::DownLeft => "down_left",
            Direction::DownRight => "down_right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickKind {
    Left,
    Right,
    Double,
}

impl ClickKind {
    pub const ALL: [ClickKind; 3] = [ClickKind::Left, ClickKind::Right, ClickKind::Double];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ClickKind::Left => "click",
            ClickKind::Right => "rclick",
            ClickKind::Double => "dblclick",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub const ALL: [ScrollDirection; 4] = [
        ScrollDirection::Up,
        ScrollDirection::Down,
        ScrollDirection::Left,
        ScrollDirection::Right,
    ];

    /// Wheel notches per scroll action.
    pub const AMOUNT: i32 = 400;

    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, ScrollDirection::Up | ScrollDirection::Down)
    }

    /// Signed wheel delta: positive is up (vertical) or right (horizontal).
    #[must_use]
    pub const fn delta(self) -> i32 {
        match self {
            ScrollDirection::Up | ScrollDirection::Right => Self::AMOUNT,
            ScrollDirection::Down | ScrollDirection::Left => -Self::AMOUNT,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ScrollDirection::Up => "scroll_up",
            ScrollDirection::Down => "scroll_down",
            ScrollDirection::Left => "scroll_left",
            ScrollDirection::Right => "scroll_right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerAction {
    /// Relative move of `step` pixels along `direction`.
    Nudge { direction: Direction, step: u32 },
    Click(ClickKind),
    Scroll(ScrollDirection),
    DragStart,
    DragEnd,
}

impl PointerAction {
    #[must_use]
    pub const fn is_nudge(self) -> bool {
        matches!(self, PointerAction::Nudge { .. })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PointerAction::Nudge { direction, .. } => direction.as_str(),
            PointerAction::Click(kind) => kind.as_str(),
            PointerAction::Scroll(dir) => dir.as_str(),
            PointerAction::DragStart => "drag_start",
            PointerAction::DragEnd => "drag_end",
        }
    }
}

/// A key to press and release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A key from the fixed vocabulary (`"space"`, `"left"`, `"w"`, ...).
    Named(&'static str),
    /// A literal printable character echoed from a token.
    Char(char),
}

impl Key {
    pub const SPACE: Key = Key::Named("space");

    /// Keys the key domain draws from most of the time.
    pub const VOCABULARY: [&'static str; 16] = [
        "w",
        "a",
        "s",
        "d",
        "space",
        "enter",
        "tab",
        "backspace",
        "left",
        "right",
        "up",
        "down",
        "ctrl",
        "alt",
        "shift",
        "esc",
    ];
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Named(name) => f.write_str(name),
            Key::Char(c) => write!(f, "{c}"),
        }
    }
}

/// A concrete action chosen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Pointer(PointerAction),
    Key(Key),
}

impl Action {
    #[must_use]
    pub const fn domain(self) -> ActionDomain {
        match self {
            Action::Pointer(_) => ActionDomain::Pointer,
            Action::Key(_) => ActionDomain::Key,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Pointer(action) => f.write_str(action.name()),
            Action::Key(key) => key.fmt(f),
        }
    }
}

/// Short human-readable result of a dispatch, e.g. `move(24,0)` or `key:space`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionTag(String);

impl ActionTag {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[must_use]
    pub fn skip(reason: &str) -> Self {
        Self(format!("skip:{reason}"))
    }

    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.0.starts_with("skip:")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure reported by an actuator backend. Never fatal to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("actuator does not support {0}")]
    Unsupported(String),
    #[error("actuator backend failed: {0}")]
    Backend(String),
    #[error("dispatch was interrupted")]
    Interrupted,
}

impl DispatchError {
    /// Short reason used in `skip:<reason>` tags.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            DispatchError::Unsupported(_) => "unsupported",
            DispatchError::Backend(_) => "backend",
            DispatchError::Interrupted => "interrupted",
        }
    }
}

impl From<&DispatchError> for ActionTag {
    fn from(err: &DispatchError) -> Self {
        ActionTag::skip(err.reason())
    }
}
