//! Session runtime: timers, commands and shutdown against real time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pclock_config::Settings;
use pclock_core::{DryRunActuator, TokenTable};
use pclock_engine::{
    EngineError, JsonFileSampler, RuntimeOptions, SessionCommand, SessionEvent, SessionHandle,
    TokenEvent,
};
use pclock_types::{Action, Mode, PresenceLabel};

use crate::common::{
    FailingActuator, FixedSampler, RecordingActuator, SlowSampler, TARGET, action_tags,
    collect_until, fast_settings, has_cycle_token,
};

const WAIT: Duration = Duration::from_secs(5);

fn options() -> RuntimeOptions {
    RuntimeOptions {
        cycle_period: Duration::from_millis(20),
        table: Some(Arc::new(TokenTable::ordered())),
        seed: Some(7),
    }
}

#[tokio::test]
async fn missing_target_is_rejected() {
    let result = SessionHandle::spawn(
        Settings::default(),
        Box::new(FixedSampler::target(PresenceLabel::Online)),
        Box::new(DryRunActuator::new(&Settings::default().actions)),
        options(),
    );
    assert!(matches!(result, Err(EngineError::NoTarget)));
}

#[tokio::test]
async fn session_emits_cycle_tokens_and_actions() {
    let settings = fast_settings();
    let actuator = DryRunActuator::new(&settings.actions).without_delay();
    let mut handle = SessionHandle::spawn(
        settings,
        Box::new(FixedSampler::target(PresenceLabel::Online)),
        Box::new(actuator),
        options(),
    )
    .unwrap();

    let events = collect_until(&mut handle, WAIT, |events| {
        has_cycle_token(events) && !action_tags(events).is_empty()
    })
    .await;

    assert!(matches!(events.first(), Some(SessionEvent::Presence(_))));
    assert!(events.contains(&SessionEvent::Mode(Mode::Auto)));
    assert!(has_cycle_token(&events));
    assert!(action_tags(&events).iter().all(|tag| !tag.starts_with("skip:")));
    assert!(handle.snapshot().windows_emitted >= 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn presence_from_json_file_reaches_the_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("presence.json");
    std::fs::write(&path, format!(r#"{{"{TARGET}": "Do Not Disturb"}}"#)).unwrap();

    let settings = fast_settings();
    let mut handle = SessionHandle::spawn(
        settings,
        Box::new(JsonFileSampler::new(&path)),
        Box::new(RecordingActuator::default()),
        options(),
    )
    .unwrap();

    let events = collect_until(&mut handle, WAIT, |events| {
        events.contains(&SessionEvent::Presence(PresenceLabel::Dnd))
    })
    .await;
    assert!(events.contains(&SessionEvent::Presence(PresenceLabel::Dnd)));

    handle.shutdown().await;
}

#[tokio::test]
async fn dispatch_failures_become_skip_tags() {
    let mut handle = SessionHandle::spawn(
        fast_settings(),
        Box::new(FixedSampler::target(PresenceLabel::Online)),
        Box::new(FailingActuator),
        options(),
    )
    .unwrap();

    let events = collect_until(&mut handle, WAIT, |events| action_tags(events).len() >= 3).await;
    let tags = action_tags(&events);
    assert!(tags.len() >= 3);
    assert!(tags.iter().all(|tag| tag == "skip:backend"));

    handle.shutdown().await;
}

#[tokio::test]
async fn pause_stops_emissions_and_actions() {
    let actuator = RecordingActuator::default();
    let recorded = Arc::clone(&actuator.actions);
    let mut handle = SessionHandle::spawn(
        fast_settings(),
        Box::new(FixedSampler::target(PresenceLabel::Online)),
        Box::new(actuator),
        options(),
    )
    .unwrap();

    assert!(handle.send(SessionCommand::Pause).await);
    let _ = collect_until(&mut handle, WAIT, |events| {
        events.contains(&SessionEvent::Paused(true))
    })
    .await;
    let dispatched_at_pause = recorded.lock().unwrap().len();

    let while_paused = collect_until(&mut handle, Duration::from_millis(300), |_| false).await;
    assert!(!has_cycle_token(&while_paused));
    assert!(action_tags(&while_paused).is_empty());
    assert_eq!(recorded.lock().unwrap().len(), dispatched_at_pause);
    // Presence keeps flowing while paused.
    assert!(
        while_paused
            .iter()
            .any(|e| matches!(e, SessionEvent::Presence(_)))
    );

    assert!(handle.send(SessionCommand::Resume).await);
    let resumed = collect_until(&mut handle, WAIT, has_cycle_token).await;
    assert!(has_cycle_token(&resumed));

    handle.shutdown().await;
}

#[tokio::test]
async fn mode_and_dominance_commands_are_applied() {
    let actuator = RecordingActuator::default();
    let recorded = Arc::clone(&actuator.actions);
    let mut handle = SessionHandle::spawn(
        fast_settings(),
        Box::new(FixedSampler::target(PresenceLabel::Online)),
        Box::new(actuator),
        options(),
    )
    .unwrap();

    assert!(handle.send(SessionCommand::SetPointerDominance(100)).await);
    assert!(handle.send(SessionCommand::SetMode(Mode::Key)).await);
    let events = collect_until(&mut handle, WAIT, |events| {
        events.contains(&SessionEvent::Mode(Mode::Key))
    })
    .await;
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Dominance(split) if split.pointer() == 100))
    );
    assert_eq!(handle.snapshot().dominance.key(), 0);

    let before = recorded.lock().unwrap().len();
    let _ = collect_until(&mut handle, WAIT, |events| action_tags(events).len() >= 3).await;
    let actions = recorded.lock().unwrap();
    assert!(actions.len() > before);
    assert!(actions[before..].iter().all(|a| matches!(a, Action::Key(_))));
    drop(actions);

    handle.shutdown().await;
}

#[tokio::test]
async fn apply_settings_reconfigures_running_session() {
    let mut handle = SessionHandle::spawn(
        fast_settings(),
        Box::new(FixedSampler::target(PresenceLabel::Online)),
        Box::new(RecordingActuator::default()),
        options(),
    )
    .unwrap();

    let mut next = fast_settings();
    next.clock.cycle_bits = 3;
    next.actions.period = Duration::from_millis(60);
    next.set_pointer_dominance(20);
    assert!(handle.send(SessionCommand::ApplySettings(Box::new(next))).await);

    let _ = collect_until(&mut handle, WAIT, |events| {
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Dominance(split) if split.pointer() == 20))
    })
    .await;
    assert_eq!(handle.snapshot().cycle_bits, 3);

    let events = collect_until(&mut handle, WAIT, |events| {
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Token(TokenEvent::Cycle { .. })))
            .count()
            >= 2
    })
    .await;
    assert!(has_cycle_token(&events));

    handle.shutdown().await;
}

#[tokio::test]
async fn stop_command_ends_event_stream() {
    let mut handle = SessionHandle::spawn(
        fast_settings(),
        Box::new(FixedSampler::target(PresenceLabel::Idle)),
        Box::new(RecordingActuator::default()),
        options(),
    )
    .unwrap();

    assert!(handle.send(SessionCommand::Stop).await);
    let events = collect_until(&mut handle, WAIT, |events| {
        events.contains(&SessionEvent::Stopped)
    })
    .await;
    assert_eq!(events.last(), Some(&SessionEvent::Stopped));
    assert!(
        tokio::time::timeout(WAIT, handle.next_event())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn shutdown_is_bounded_while_sampler_blocks() {
    let handle = SessionHandle::spawn(
        fast_settings(),
        Box::new(SlowSampler(Duration::from_secs(4))),
        Box::new(RecordingActuator::default()),
        options(),
    )
    .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    handle.shutdown().await;
    let took = started.elapsed();
    assert!(took < Duration::from_secs(2), "shutdown took {took:?}");
}
