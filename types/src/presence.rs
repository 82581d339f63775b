//! Presence labels and the active-label set.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::Bit;

/// The closed set of presence labels a sampler can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PresenceLabel {
    Online = 0,
    Idle = 1,
    Dnd = 2,
    Mobile = 3,
    #[default]
    Offline = 4,
}

impl PresenceLabel {
    pub const ALL: [PresenceLabel; 5] = [
        PresenceLabel::Online,
        PresenceLabel::Idle,
        PresenceLabel::Dnd,
        PresenceLabel::Mobile,
        PresenceLabel::Offline,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PresenceLabel::Online => "online",
            PresenceLabel::Idle => "idle",
            PresenceLabel::Dnd => "dnd",
            PresenceLabel::Mobile => "mobile",
            PresenceLabel::Offline => "offline",
        }
    }

    /// Lenient parse used for sampler output. Unknown text is `Offline`.
    ///
    /// Checks run in priority order, so `"Online via Mobile"` is `Mobile`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        if lower.contains("mobile") {
            PresenceLabel::Mobile
        } else if lower.contains("do not disturb") || lower.contains("dnd") {
            PresenceLabel::Dnd
        } else if lower.contains("idle") {
            PresenceLabel::Idle
        } else if lower.contains("online") {
            PresenceLabel::Online
        } else {
            PresenceLabel::Offline
        }
    }

    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`PresenceLabel::to_u8`]; out-of-range values are `Offline`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => PresenceLabel::Online,
            1 => PresenceLabel::Idle,
            2 => PresenceLabel::Dnd,
            3 => PresenceLabel::Mobile,
            _ => PresenceLabel::Offline,
        }
    }

    const fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for PresenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels that count as a `1` presence bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveStates(u8);

impl ActiveStates {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn from_labels(labels: impl IntoIterator<Item = PresenceLabel>) -> Self {
        labels
            .into_iter()
            .fold(Self::empty(), |acc, label| Self(acc.0 | label.mask()))
    }

    #[must_use]
    pub const fn contains(self, label: PresenceLabel) -> bool {
        self.0 & label.mask() != 0
    }

    #[must_use]
    pub const fn bit_for(self, label: PresenceLabel) -> Bit {
        if self.contains(label) { Bit::One } else { Bit::Zero }
    }

    pub fn labels(self) -> impl Iterator<Item = PresenceLabel> {
        PresenceLabel::ALL
            .into_iter()
            .filter(move |label| self.contains(*label))
    }
}

impl Default for ActiveStates {
    fn default() -> Self {
        Self::from_labels([
            PresenceLabel::Online,
            PresenceLabel::Idle,
            PresenceLabel::Dnd,
            PresenceLabel::Mobile,
        ])
    }
}

impl fmt::Debug for ActiveStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.labels()).finish()
    }
}

impl Serialize for ActiveStates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.labels())
    }
}

impl<'de> Deserialize<'de> for ActiveStates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let labels = Vec::<PresenceLabel>::deserialize(deserializer)?;
        Ok(Self::from_labels(labels))
    }
}
