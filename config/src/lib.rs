//! Settings record for a presence clock session.
//!
//! The on-disk format is TOML at `~/.pclock/config.toml`. Every field is
//! optional; missing values take the defaults below and out-of-range values
//! are clamped with a warning rather than rejected, so a typo never prevents a
//! session from starting.
//!
//! ```toml
//! [session]
//! target = "someone"
//! presence_file = "presence.json"
//! active_states = ["online", "idle", "dnd", "mobile"]
//!
//! [clock]
//! cycle_bits = 120
//! drift_range = 0.002
//! reset_probability = 0.02
//!
//! [actions]
//! period = 1.0
//! pointer_dominance = 60
//! ```

mod persist;

use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

use pclock_types::ActiveStates;

pub const CYCLE_BITS_DEFAULT: u32 = 120;
pub const DRIFT_RANGE_DEFAULT: f64 = 0.002;
pub const RESET_PROBABILITY_DEFAULT: f64 = 0.02;
pub const KEEPALIVE_SECONDS_DEFAULT: f64 = 12.0;
pub const ACTION_PERIOD_DEFAULT: f64 = 1.0;
pub const POLL_INTERVAL_DEFAULT: f64 = 0.25;
pub const OFFLINE_GRACE_DEFAULT: f64 = 4.0;
pub const POINTER_STEP_DEFAULT: u32 = 24;
pub const POINTER_ACCEL_DEFAULT: u32 = 4;
pub const POINTER_MAX_STEP_DEFAULT: u32 = 96;
pub const KEY_DELAY_DEFAULT: f64 = 0.03;
pub const POINTER_DOMINANCE_DEFAULT: u8 = 60;

pub const ENV_TARGET: &str = "PCLOCK_TARGET";
pub const ENV_PRESENCE_FILE: &str = "PCLOCK_PRESENCE_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to write config at {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config key `{0}` is not a table")]
    NotATable(String),
    #[error("could not determine config path")]
    NoPath,
}

impl ConfigError {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Write { path, .. } => Some(path),
            ConfigError::NotATable(_) | ConfigError::NoPath => None,
        }
    }
}

// ============================================================================
// Dominance
// ============================================================================

/// Pointer vs key weights for auto mode. The key weight is always
/// `100 - pointer`, so the pair sums to 100 by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DominanceSplit {
    pointer: u8,
}

impl DominanceSplit {
    pub const TOTAL: u8 = 100;

    #[must_use]
    pub fn from_pointer(pointer: u8) -> Self {
        Self {
            pointer: pointer.min(Self::TOTAL),
        }
    }

    #[must_use]
    pub fn from_key(key: u8) -> Self {
        Self::from_pointer(Self::TOTAL - key.min(Self::TOTAL))
    }

    #[must_use]
    pub const fn pointer(self) -> u8 {
        self.pointer
    }

    #[must_use]
    pub const fn key(self) -> u8 {
        Self::TOTAL - self.pointer
    }

    /// Shift weight towards the pointer domain (negative `delta` favours keys).
    #[must_use]
    pub fn adjusted(self, delta: i16) -> Self {
        let pointer = (i16::from(self.pointer) + delta).clamp(0, i16::from(Self::TOTAL));
        Self::from_pointer(pointer as u8)
    }
}

impl Default for DominanceSplit {
    fn default() -> Self {
        Self::from_pointer(POINTER_DOMINANCE_DEFAULT)
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSettings {
    /// Display name of the entity to watch.
    pub target: Option<String>,
    /// JSON file the presence sampler reads.
    pub presence_file: Option<PathBuf>,
    pub active_states: ActiveStates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClockSettings {
    /// Bits consumed per emission. Always at least 1.
    pub cycle_bits: u32,
    pub drift_range: f64,
    pub reset_probability: f64,
    pub randomize_table: bool,
    pub keepalive: Duration,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            cycle_bits: CYCLE_BITS_DEFAULT,
            drift_range: DRIFT_RANGE_DEFAULT,
            reset_probability: RESET_PROBABILITY_DEFAULT,
            randomize_table: true,
            keepalive: Duration::from_secs_f64(KEEPALIVE_SECONDS_DEFAULT),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceSettings {
    pub poll_interval: Duration,
    pub offline_grace: Duration,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs_f64(POLL_INTERVAL_DEFAULT),
            offline_grace: Duration::from_secs_f64(OFFLINE_GRACE_DEFAULT),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionSettings {
    pub period: Duration,
    pub pointer_step: u32,
    pub pointer_accel: u32,
    pub pointer_max_step: u32,
    pub key_delay: Duration,
    pub adminless_keys: bool,
    pub dominance: DominanceSplit,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_secs_f64(ACTION_PERIOD_DEFAULT),
            pointer_step: POINTER_STEP_DEFAULT,
            pointer_accel: POINTER_ACCEL_DEFAULT,
            pointer_max_step: POINTER_MAX_STEP_DEFAULT,
            key_delay: Duration::from_secs_f64(KEY_DELAY_DEFAULT),
            adminless_keys: true,
            dominance: DominanceSplit::default(),
        }
    }
}

/// Validated settings. Construct through [`Settings::from_file`] or `Default`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub session: SessionSettings,
    pub clock: ClockSettings,
    pub presence: PresenceSettings,
    pub actions: ActionSettings,
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub session: Option<SessionSection>,
    pub clock: Option<ClockSection>,
    pub presence: Option<PresenceSection>,
    pub actions: Option<ActionsSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionSection {
    pub target: Option<String>,
    pub presence_file: Option<PathBuf>,
    pub active_states: Option<ActiveStates>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClockSection {
    pub cycle_bits: Option<i64>,
    pub drift_range: Option<f64>,
    pub reset_probability: Option<f64>,
    pub randomize_table: Option<bool>,
    pub keepalive_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PresenceSection {
    pub poll_interval: Option<f64>,
    pub offline_grace: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionsSection {
    pub period: Option<f64>,
    pub pointer_step: Option<i64>,
    pub pointer_accel: Option<i64>,
    pub pointer_max_step: Option<i64>,
    pub key_delay: Option<f64>,
    pub adminless_keys: Option<bool>,
    pub pointer_dominance: Option<i64>,
    pub key_dominance: Option<i64>,
}

fn clamp_f64(field: &str, value: Option<f64>, default: f64, min: f64, max: f64) -> f64 {
    let Some(raw) = value else {
        return default;
    };
    if !raw.is_finite() {
        tracing::warn!(field, "Non-finite config value, using default {default}");
        return default;
    }
    let clamped = raw.clamp(min, max);
    if clamped != raw {
        tracing::warn!(field, raw, clamped, "Config value out of range");
    }
    clamped
}

fn clamp_int(field: &str, value: Option<i64>, default: u32, min: u32, max: u32) -> u32 {
    let Some(raw) = value else {
        return default;
    };
    let clamped = raw.clamp(i64::from(min), i64::from(max));
    if clamped != raw {
        tracing::warn!(field, raw, clamped, "Config value out of range");
    }
    clamped as u32
}

fn clamp_secs(field: &str, value: Option<f64>, default: f64, min: f64, max: f64) -> Duration {
    Duration::from_secs_f64(clamp_f64(field, value, default, min, max))
}

impl Settings {
    /// Validate a parsed config file, clamping every value into its documented range.
    #[must_use]
    pub fn from_file(file: ConfigFile) -> Self {
        let session = file.session.unwrap_or_default();
        let clock = file.clock.unwrap_or_default();
        let presence = file.presence.unwrap_or_default();
        let actions = file.actions.unwrap_or_default();

        let dominance = match (actions.pointer_dominance, actions.key_dominance) {
            (Some(pointer), key) => {
                let pointer = clamp_int("actions.pointer_dominance", Some(pointer), 0, 0, 100);
                if let Some(key) = key
                    && i64::from(pointer) + key != 100
                {
                    tracing::warn!(
                        pointer,
                        key,
                        "Dominance weights must sum to 100; key weight recomputed"
                    );
                }
                DominanceSplit::from_pointer(pointer as u8)
            }
            (None, Some(key)) => {
                let key = clamp_int("actions.key_dominance", Some(key), 0, 0, 100);
                DominanceSplit::from_key(key as u8)
            }
            (None, None) => DominanceSplit::default(),
        };

        let pointer_step = clamp_int(
            "actions.pointer_step",
            actions.pointer_step,
            POINTER_STEP_DEFAULT,
            1,
            1024,
        );
        let mut pointer_max_step = clamp_int(
            "actions.pointer_max_step",
            actions.pointer_max_step,
            POINTER_MAX_STEP_DEFAULT,
            1,
            4096,
        );
        if pointer_max_step < pointer_step {
            tracing::warn!(
                pointer_step,
                pointer_max_step,
                "pointer_max_step below pointer_step; raising it"
            );
            pointer_max_step = pointer_step;
        }

        Self {
            session: SessionSettings {
                target: session
                    .target
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
                presence_file: session.presence_file,
                active_states: session.active_states.unwrap_or_default(),
            },
            clock: ClockSettings {
                cycle_bits: clamp_int(
                    "clock.cycle_bits",
                    clock.cycle_bits,
                    CYCLE_BITS_DEFAULT,
                    1,
                    4096,
                ),
                drift_range: clamp_f64(
                    "clock.drift_range",
                    clock.drift_range,
                    DRIFT_RANGE_DEFAULT,
                    0.0,
                    0.05,
                ),
                reset_probability: clamp_f64(
                    "clock.reset_probability",
                    clock.reset_probability,
                    RESET_PROBABILITY_DEFAULT,
                    0.0,
                    1.0,
                ),
                randomize_table: clock.randomize_table.unwrap_or(true),
                keepalive: clamp_secs(
                    "clock.keepalive_seconds",
                    clock.keepalive_seconds,
                    KEEPALIVE_SECONDS_DEFAULT,
                    1.0,
                    600.0,
                ),
            },
            presence: PresenceSettings {
                poll_interval: clamp_secs(
                    "presence.poll_interval",
                    presence.poll_interval,
                    POLL_INTERVAL_DEFAULT,
                    0.05,
                    5.0,
                ),
                offline_grace: clamp_secs(
                    "presence.offline_grace",
                    presence.offline_grace,
                    OFFLINE_GRACE_DEFAULT,
                    0.0,
                    60.0,
                ),
            },
            actions: ActionSettings {
                period: clamp_secs(
                    "actions.period",
                    actions.period,
                    ACTION_PERIOD_DEFAULT,
                    0.05,
                    10.0,
                ),
                pointer_step,
                pointer_accel: clamp_int(
                    "actions.pointer_accel",
                    actions.pointer_accel,
                    POINTER_ACCEL_DEFAULT,
                    0,
                    1024,
                ),
                pointer_max_step,
                key_delay: clamp_secs(
                    "actions.key_delay",
                    actions.key_delay,
                    KEY_DELAY_DEFAULT,
                    0.0,
                    1.0,
                ),
                adminless_keys: actions.adminless_keys.unwrap_or(true),
                dominance,
            },
        }
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(Self::from_file(file))
    }

    /// Load from the default config path. `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::from_toml_str(&content) {
            Ok(settings) => Ok(Some(settings)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Apply `PCLOCK_TARGET` / `PCLOCK_PRESENCE_FILE` style overrides.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(target) = lookup(ENV_TARGET).filter(|t| !t.trim().is_empty()) {
            self.session.target = Some(target.trim().to_string());
        }
        if let Some(file) = lookup(ENV_PRESENCE_FILE).filter(|f| !f.trim().is_empty()) {
            self.session.presence_file = Some(PathBuf::from(file));
        }
        self
    }

    /// Set the pointer weight; the key weight follows.
    pub fn set_pointer_dominance(&mut self, pointer: u8) {
        self.actions.dominance = DominanceSplit::from_pointer(pointer);
    }

    /// Shift the pointer weight by `delta` and return the new split.
    pub fn adjust_pointer_dominance(&mut self, delta: i16) -> DominanceSplit {
        self.actions.dominance = self.actions.dominance.adjusted(delta);
        self.actions.dominance
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pclock").join("config.toml"))
}
