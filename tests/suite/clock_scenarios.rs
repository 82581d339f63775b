//! End-to-end clock scenarios driven through `Session` with explicit time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use pclock_config::Settings;
use pclock_core::{PresenceTracker, TokenTable, sha_index};
use pclock_engine::{Session, SessionEvent, TokenEvent};
use pclock_types::{ActionDomain, Bit, PresenceLabel, Token};

fn session_with(settings: Settings, now: Instant) -> Session {
    Session::new(settings, Arc::new(TokenTable::ordered()), now)
}

fn cycle_tokens(events: &[SessionEvent]) -> Vec<(Token, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Token(TokenEvent::Cycle { token, reset }) => Some((*token, *reset)),
            _ => None,
        })
        .collect()
}

fn label_for(bit: Bit) -> PresenceLabel {
    match bit {
        Bit::One => PresenceLabel::Online,
        Bit::Zero => PresenceLabel::Offline,
    }
}

/// Shortest window whose token in the ordered table is the reset sentinel.
fn reset_window() -> Vec<Bit> {
    let table = TokenTable::ordered();
    (8..=12)
        .flat_map(|len: u32| {
            (0u32..1 << len).map(move |n| {
                (0..len)
                    .map(|i| Bit::from(n >> (len - 1 - i) & 1 == 1))
                    .collect::<Vec<_>>()
            })
        })
        .find(|w| table.token_for(w).is_reset())
        .expect("some short window hashes to slot 0")
}

#[test]
fn eight_bit_window_emits_hash_selected_token() {
    let mut settings = Settings::default();
    settings.clock.cycle_bits = 8;
    settings.clock.reset_probability = 0.0;
    let t0 = Instant::now();
    let mut session = session_with(settings, t0);
    let mut rng = StdRng::seed_from_u64(11);

    let labels = [
        PresenceLabel::Online,
        PresenceLabel::Offline,
        PresenceLabel::Idle,
        PresenceLabel::Mobile,
        PresenceLabel::Offline,
        PresenceLabel::Offline,
        PresenceLabel::Dnd,
        PresenceLabel::Offline,
    ];
    let mut emitted = Vec::new();
    for (i, label) in labels.into_iter().enumerate() {
        let events = session.cycle_tick(t0 + Duration::from_secs(i as u64), label, &mut rng);
        emitted.extend(cycle_tokens(&events));
    }

    let bits = Bit::pattern("10110010");
    let table = TokenTable::ordered();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].0, table.token_for(&bits));
    assert_eq!(emitted[0].0, table.get(sha_index(&bits)));
    assert!(!emitted[0].1);

    let snap = session.snapshot();
    assert_eq!(snap.buffered_bits, 0);
    assert!(snap.drift.abs() <= 8.0 * 0.002);
}

#[test]
fn identical_inputs_give_identical_tokens() {
    let run = || {
        let mut settings = Settings::default();
        settings.clock.cycle_bits = 5;
        let t0 = Instant::now();
        let mut session = session_with(settings, t0);
        let mut rng = StdRng::seed_from_u64(99);
        let mut tokens = Vec::new();
        for i in 0..40u64 {
            let label = if i % 3 == 0 {
                PresenceLabel::Offline
            } else {
                PresenceLabel::Online
            };
            let events = session.cycle_tick(t0 + Duration::from_secs(i), label, &mut rng);
            tokens.extend(cycle_tokens(&events));
        }
        tokens
    };
    let a = run();
    assert_eq!(a.len(), 8);
    assert_eq!(a, run());
}

#[test]
fn certain_reset_clears_drift_and_buffer() {
    let window = reset_window();
    let mut settings = Settings::default();
    settings.clock.cycle_bits = u32::try_from(window.len()).unwrap();
    settings.clock.reset_probability = 1.0;
    let t0 = Instant::now();
    let mut session = session_with(settings, t0);
    let mut rng = StdRng::seed_from_u64(5);

    let mut emitted = Vec::new();
    for (i, bit) in window.iter().enumerate() {
        let events = session.cycle_tick(
            t0 + Duration::from_secs(i as u64),
            label_for(*bit),
            &mut rng,
        );
        emitted.extend(cycle_tokens(&events));
    }

    assert_eq!(emitted, vec![(Token::Reset, true)]);
    let snap = session.snapshot();
    assert!(snap.drift.abs() < f64::EPSILON);
    assert_eq!(snap.buffered_bits, 0);
    assert_eq!(snap.windows_emitted, 1);
}

#[test]
fn grace_period_holds_last_label_then_goes_offline() {
    let t0 = Instant::now();
    let mut tracker = PresenceTracker::new("Some One", Duration::from_secs(4));
    let seen = HashMap::from([("some  one".to_string(), PresenceLabel::Online)]);
    let empty = HashMap::new();

    assert_eq!(tracker.observe(t0, &seen), PresenceLabel::Online);
    for s in 1..4 {
        assert_eq!(
            tracker.observe(t0 + Duration::from_secs(s), &empty),
            PresenceLabel::Online
        );
    }
    assert_eq!(
        tracker.observe(t0 + Duration::from_secs(4), &empty),
        PresenceLabel::Offline
    );

    // The collapsed label feeds zero bits into the clock.
    let mut settings = Settings::default();
    settings.clock.cycle_bits = 1;
    let mut session = session_with(settings, t0);
    let mut rng = StdRng::seed_from_u64(3);
    let events = session.cycle_tick(t0, tracker.label(), &mut rng);
    let table = TokenTable::ordered();
    assert_eq!(cycle_tokens(&events)[0].0, table.token_for(&[Bit::Zero]));
}

#[test]
fn zero_pointer_dominance_only_acts_with_keys() {
    let t0 = Instant::now();
    let mut session = session_with(Settings::default(), t0);
    session.set_pointer_dominance(0);
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..1000 {
        let planned = session
            .plan_action(PresenceLabel::Online, &mut rng)
            .expect("not paused");
        assert_eq!(planned.action.domain(), ActionDomain::Key);
    }
}

#[test]
fn ordered_table_layout() {
    let table = TokenTable::ordered();
    assert_eq!(table.len(), 64);
    assert_eq!(table.get(0), Token::Reset);
    assert_eq!(table.iter().filter(|t| t.is_reset()).count(), 1);
    assert_eq!(table.get(1), Token::Symbol('B'));
    assert_eq!(table.get(63), Token::Symbol('@'));
    for (i, token) in table.iter().enumerate() {
        assert_eq!(table.position(token), Some(i), "{token} appears twice");
    }
}
