//! Core domain types for Presence Clock.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod action;
mod presence;

pub use action::{
    Action, ActionDomain, ActionTag, ClickKind, Direction, DispatchError, Key, PointerAction,
    ScrollDirection,
};
pub use presence::{ActiveStates, PresenceLabel};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Bits
// ============================================================================

/// One presence bit: `One` when the observed label is in the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bit {
    #[default]
    Zero,
    One,
}

impl Bit {
    /// Hash encoding: one byte per bit, `0x00` or `0x01`.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }

    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        if byte == 0 { Bit::Zero } else { Bit::One }
    }

    /// Parse a compact `"1011"` style pattern. Any character other than `'0'` is a one.
    #[must_use]
    pub fn pattern(bits: &str) -> Vec<Bit> {
        bits.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| Bit::from(c != '0'))
            .collect()
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        if value { Bit::One } else { Bit::Zero }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte())
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// A symbol drawn from the token table.
///
/// `Reset` is the sentinel; it is displayed as [`Token::RESET_DISPLAY`] and can
/// never be produced from a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Symbol(char),
    Reset,
}

impl Token {
    pub const RESET_DISPLAY: &'static str = "§RESET§";

    #[must_use]
    pub const fn is_reset(self) -> bool {
        matches!(self, Token::Reset)
    }

    /// The token's literal character when it is a single printable character.
    #[must_use]
    pub fn printable_char(self) -> Option<char> {
        match self {
            Token::Symbol(c) if !c.is_control() && !c.is_whitespace() => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Symbol(c) => write!(f, "{c}"),
            Token::Reset => f.write_str(Self::RESET_DISPLAY),
        }
    }
}

// ============================================================================
// Mode
// ============================================================================

/// Which actuator domain the action cadence may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Pointer,
    Key,
    #[default]
    Auto,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Pointer, Mode::Key, Mode::Auto];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Pointer => "pointer",
            Mode::Key => "key",
            Mode::Auto => "auto",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Mode::Pointer => "Pointer",
            Mode::Key => "Keyboard",
            Mode::Auto => "Auto",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
