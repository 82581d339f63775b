//! Shared test utilities and fixtures
//!
//! Samplers and actuators that stand in for the real presence source and
//! input backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pclock_config::Settings;
use pclock_core::Actuator;
use pclock_engine::{PresenceSampler, SampleError, SessionEvent, SessionHandle, TokenEvent};
use pclock_types::{Action, ActionTag, DispatchError, PresenceLabel};

pub const TARGET: &str = "Some One";

/// Always reports the same member list.
pub struct FixedSampler {
    members: HashMap<String, PresenceLabel>,
}

impl FixedSampler {
    pub fn target(label: PresenceLabel) -> Self {
        Self {
            members: HashMap::from([(TARGET.to_string(), label)]),
        }
    }
}

impl PresenceSampler for FixedSampler {
    fn sample(&mut self) -> Result<HashMap<String, PresenceLabel>, SampleError> {
        Ok(self.members.clone())
    }
}

/// Blocks in every sample, like a presence source that hangs.
pub struct SlowSampler(pub Duration);

impl PresenceSampler for SlowSampler {
    fn sample(&mut self) -> Result<HashMap<String, PresenceLabel>, SampleError> {
        std::thread::sleep(self.0);
        Ok(HashMap::new())
    }
}

/// Records every dispatched action.
#[derive(Clone, Default)]
pub struct RecordingActuator {
    pub actions: Arc<Mutex<Vec<Action>>>,
}

impl Actuator for RecordingActuator {
    fn dispatch(&mut self, action: &Action) -> Result<ActionTag, DispatchError> {
        self.actions.lock().unwrap().push(*action);
        Ok(ActionTag::new("recorded"))
    }
}

/// Rejects every action.
pub struct FailingActuator;

impl Actuator for FailingActuator {
    fn dispatch(&mut self, _action: &Action) -> Result<ActionTag, DispatchError> {
        Err(DispatchError::Backend("no input device".to_string()))
    }
}

/// Small windows and fast timers so runtime tests finish quickly.
pub fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.session.target = Some(TARGET.to_string());
    settings.clock.cycle_bits = 2;
    settings.clock.randomize_table = false;
    settings.presence.poll_interval = Duration::from_millis(10);
    settings.actions.period = Duration::from_millis(40);
    settings.actions.key_delay = Duration::ZERO;
    settings
}

/// Collect events until `done` returns true or the timeout elapses.
pub async fn collect_until(
    handle: &mut SessionHandle,
    timeout: Duration,
    mut done: impl FnMut(&[SessionEvent]) -> bool,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Some(event) = handle.next_event().await {
            events.push(event);
            if done(&events) {
                break;
            }
        }
    })
    .await;
    events
}

pub fn has_cycle_token(events: &[SessionEvent]) -> bool {
    events
        .iter()
        .any(|e| matches!(e, SessionEvent::Token(TokenEvent::Cycle { .. })))
}

pub fn action_tags(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Token(TokenEvent::Action(outcome)) => {
                Some(outcome.tag.as_str().to_string())
            }
            _ => None,
        })
        .collect()
}
