//! Presence tracking with an offline grace period and poll backoff.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use pclock_types::PresenceLabel;

/// Backoff added per empty or failed sample.
pub const BACKOFF_STEP: Duration = Duration::from_millis(100);
/// Backoff ceiling.
pub const BACKOFF_MAX: Duration = Duration::from_secs(1);
/// Floor for the delay between polls.
pub const MIN_POLL_DELAY: Duration = Duration::from_millis(50);

/// Trim, lowercase, and collapse inner whitespace.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduces a stream of samples to the target's current label.
///
/// A missing target (or an empty sample) holds the last label until the grace
/// period since it was last seen has elapsed; then it collapses to offline.
/// Before the target has ever been seen, absence is offline immediately.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    target: String,
    label: PresenceLabel,
    last_seen: Option<Instant>,
    grace: Duration,
    backoff: Duration,
}

impl PresenceTracker {
    #[must_use]
    pub fn new(target: &str, grace: Duration) -> Self {
        Self {
            target: normalize_name(target),
            label: PresenceLabel::Offline,
            last_seen: None,
            grace,
            backoff: Duration::ZERO,
        }
    }

    /// Fold one sample into the tracked state. An empty map means the sample
    /// failed or the source had nothing to report.
    pub fn observe(
        &mut self,
        now: Instant,
        members: &HashMap<String, PresenceLabel>,
    ) -> PresenceLabel {
        if members.is_empty() {
            self.expire_if_stale(now);
            self.backoff = (self.backoff + BACKOFF_STEP).min(BACKOFF_MAX);
            return self.label;
        }

        let found = members
            .iter()
            .find(|(name, _)| normalize_name(name) == self.target)
            .map(|(_, label)| *label);
        match found {
            Some(label) => {
                if label != self.label {
                    tracing::debug!(from = %self.label, to = %label, "Presence changed");
                }
                self.label = label;
                self.last_seen = Some(now);
            }
            None => self.expire_if_stale(now),
        }
        self.backoff = Duration::ZERO;
        self.label
    }

    fn expire_if_stale(&mut self, now: Instant) {
        let stale = match self.last_seen {
            Some(seen) => now.saturating_duration_since(seen) >= self.grace,
            None => true,
        };
        if stale && self.label != PresenceLabel::Offline {
            tracing::debug!(from = %self.label, "Presence collapsed to offline after grace period");
            self.label = PresenceLabel::Offline;
        }
    }

    /// Delay before the next poll: `max(50ms, poll_interval + backoff)`.
    #[must_use]
    pub fn next_delay(&self, poll_interval: Duration) -> Duration {
        (poll_interval + self.backoff).max(MIN_POLL_DELAY)
    }

    pub fn set_grace(&mut self, grace: Duration) {
        self.grace = grace;
    }

    #[must_use]
    pub fn label(&self) -> PresenceLabel {
        self.label
    }

    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(entries: &[(&str, PresenceLabel)]) -> HashMap<String, PresenceLabel> {
        entries
            .iter()
            .map(|(name, label)| ((*name).to_string(), *label))
            .collect()
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_name("  Some   One\t"), "some one");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn adopts_label_of_matching_name() {
        let mut tracker = PresenceTracker::new("Some One", Duration::from_secs(4));
        let now = Instant::now();
        let label = tracker.observe(now, &sample(&[("some  one", PresenceLabel::Dnd)]));
        assert_eq!(label, PresenceLabel::Dnd);
    }

    #[test]
    fn goes_offline_exactly_when_grace_elapses() {
        let grace = Duration::from_secs(4);
        let mut tracker = PresenceTracker::new("target", grace);
        let t0 = Instant::now();
        tracker.observe(t0, &sample(&[("target", PresenceLabel::Online)]));

        let empty = HashMap::new();
        let just_before = t0 + grace - Duration::from_millis(1);
        assert_eq!(tracker.observe(just_before, &empty), PresenceLabel::Online);

        let other = sample(&[("someone else", PresenceLabel::Online)]);
        assert_eq!(
            tracker.observe(t0 + Duration::from_secs(2), &other),
            PresenceLabel::Online
        );

        assert_eq!(tracker.observe(t0 + grace, &empty), PresenceLabel::Offline);
    }

    #[test]
    fn unseen_target_is_offline_immediately() {
        let mut tracker = PresenceTracker::new("ghost", Duration::from_secs(4));
        let label = tracker.observe(
            Instant::now(),
            &sample(&[("other", PresenceLabel::Online)]),
        );
        assert_eq!(label, PresenceLabel::Offline);
    }

    #[test]
    fn backoff_grows_on_empty_and_resets_on_data() {
        let mut tracker = PresenceTracker::new("t", Duration::from_secs(4));
        let now = Instant::now();
        let poll = Duration::from_millis(250);
        for _ in 0..15 {
            tracker.observe(now, &HashMap::new());
        }
        assert_eq!(tracker.backoff(), BACKOFF_MAX);
        assert_eq!(tracker.next_delay(poll), poll + BACKOFF_MAX);

        tracker.observe(now, &sample(&[("x", PresenceLabel::Idle)]));
        assert_eq!(tracker.backoff(), Duration::ZERO);
        assert_eq!(tracker.next_delay(Duration::ZERO), MIN_POLL_DELAY);
    }
}
