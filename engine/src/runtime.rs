//! The session runtime.
//!
//! One tokio task owns the [`Session`] and serializes everything that touches
//! it: the cycle timer, the action timer, and commands from the front end.
//! Actuator calls run on the blocking pool so a slow backend never stalls the
//! runtime's worker threads.
//!
//! ```text
//! PresenceWatcher (thread) --label--> [runtime task] --SessionEvent--> front end
//!                                       ^    |
//!                    SessionCommand ----+    +--spawn_blocking--> Actuator
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use pclock_config::Settings;
use pclock_core::{Actuator, PlannedAction, TokenTable};
use pclock_types::{ActionTag, DispatchError, Mode};

use crate::session::{Session, SessionEvent, SessionSnapshot};
use crate::watcher::{PresenceSampler, PresenceWatcher};

const COMMAND_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 256;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
/// How long the runtime waits for the watcher thread; a sampler stuck in a
/// slow read is left to exit on its own.
const WATCHER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Bit ingestion cadence.
pub const CYCLE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no target configured; set [session].target or PCLOCK_TARGET")]
    NoTarget,
    #[error("failed to start presence watcher: {0}")]
    Watcher(#[source] std::io::Error),
}

/// Requests from the front end. Applied between ticks, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Pause,
    Resume,
    TogglePause,
    SetMode(Mode),
    SetPointerDominance(u8),
    ApplySettings(Box<Settings>),
    Stop,
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub cycle_period: Duration,
    /// Fixed token table; otherwise built from `clock.randomize_table`.
    pub table: Option<Arc<TokenTable>>,
    /// RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            cycle_period: CYCLE_PERIOD,
            table: None,
            seed: None,
        }
    }
}

type SharedActuator = Arc<Mutex<Box<dyn Actuator>>>;

/// Front-end side of a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: mpsc::Receiver<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    join: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Start the watcher and the runtime task. Must be called inside a tokio runtime.
    pub fn spawn(
        settings: Settings,
        sampler: Box<dyn PresenceSampler>,
        actuator: Box<dyn Actuator>,
        options: RuntimeOptions,
    ) -> Result<Self, EngineError> {
        let Some(target) = settings.session.target.clone() else {
            return Err(EngineError::NoTarget);
        };

        let seed = options.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let table = options.table.unwrap_or_else(|| {
            Arc::new(if settings.clock.randomize_table {
                TokenTable::shuffled(&mut rng)
            } else {
                TokenTable::ordered()
            })
        });

        let watcher = PresenceWatcher::spawn(
            &target,
            sampler,
            settings.presence.poll_interval,
            settings.presence.offline_grace,
        )
        .map_err(EngineError::Watcher)?;

        let session = Session::new(settings, table, Instant::now());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        tracing::info!(watching = %target, seed, "Session started");

        let task = RuntimeTask {
            session,
            watcher,
            actuator: Arc::new(Mutex::new(actuator)),
            rng,
            events: event_tx,
            snapshot: snapshot_tx,
            cycle_period: options.cycle_period,
        };
        let join = tokio::spawn(task.run(cmd_rx));

        Ok(Self {
            commands: cmd_tx,
            events: event_rx,
            snapshot: snapshot_rx,
            join: Some(join),
        })
    }

    /// Queue a command without waiting. Returns `false` when the queue is full
    /// or the session has stopped.
    pub fn command(&self, command: SessionCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("Dropped session command: {err}");
                false
            }
        }
    }

    pub async fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Next event without waiting.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Wait for the next event. `None` once the session has stopped and drained.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        *self.snapshot.borrow()
    }

    /// Stop the session and wait (bounded) for the runtime task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(SessionCommand::Stop).await;
        if let Some(join) = self.join.take() {
            // Keep draining so the task never blocks on a full event queue.
            let drain = async {
                while self.events.recv().await.is_some() {}
            };
            let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
                let ((), joined) = tokio::join!(drain, join);
                if let Err(err) = joined {
                    tracing::warn!("Session task failed: {err}");
                }
            })
            .await;
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        // Do not block in Drop; a closed command channel stops the task.
        let _ = self.commands.try_send(SessionCommand::Stop);
    }
}

struct RuntimeTask {
    session: Session,
    watcher: PresenceWatcher,
    actuator: SharedActuator,
    rng: StdRng,
    events: mpsc::Sender<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
    cycle_period: Duration,
}

fn action_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl RuntimeTask {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let mut cycle = tokio::time::interval_at(
            tokio::time::Instant::now() + self.cycle_period,
            self.cycle_period,
        );
        cycle.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut action_period = self.session.settings().actions.period;
        let mut action = action_interval(action_period);

        let mode = self.session.mode();
        let dominance = self.session.settings().actions.dominance;
        self.publish(vec![
            SessionEvent::Presence(self.watcher.label()),
            SessionEvent::Mode(mode),
            SessionEvent::Paused(self.session.is_paused()),
            SessionEvent::Dominance(dominance),
        ]);

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.apply(command) {
                        break;
                    }
                    let period = self.session.settings().actions.period;
                    if period != action_period {
                        action_period = period;
                        action = action_interval(period);
                    }
                }
                _ = cycle.tick() => {
                    let label = self.watcher.label();
                    let events = self.session.cycle_tick(Instant::now(), label, &mut self.rng);
                    self.publish(events);
                }
                _ = action.tick() => {
                    let label = self.watcher.label();
                    if let Some(planned) = self.session.plan_action(label, &mut self.rng) {
                        let result = dispatch(&self.actuator, planned).await;
                        let events = self.session.finish_action(planned, result);
                        self.publish(events);
                    }
                }
            }
        }

        let watcher = self.watcher;
        watcher.stop();
        let joined = tokio::task::spawn_blocking(move || watcher.join());
        if tokio::time::timeout(WATCHER_JOIN_TIMEOUT, joined).await.is_err() {
            tracing::warn!("Presence watcher still sampling; detaching");
        }
        tracing::info!(
            windows = self.session.snapshot().windows_emitted,
            "Session stopped"
        );
        let _ = self.events.send(SessionEvent::Stopped).await;
    }

    /// Returns `false` when the session should stop.
    fn apply(&mut self, command: SessionCommand) -> bool {
        let event = match command {
            SessionCommand::Stop => return false,
            SessionCommand::Pause => self.session.set_paused(true),
            SessionCommand::Resume => self.session.set_paused(false),
            SessionCommand::TogglePause => self.session.toggle_pause(),
            SessionCommand::SetMode(mode) => self.session.set_mode(mode),
            SessionCommand::SetPointerDominance(pointer) => {
                self.session.set_pointer_dominance(pointer)
            }
            SessionCommand::ApplySettings(settings) => {
                if settings.session.target != self.session.settings().session.target {
                    tracing::warn!("Target changes take effect on the next session");
                }
                self.watcher.set_poll_interval(settings.presence.poll_interval);
                self.watcher.set_grace(settings.presence.offline_grace);
                match self.actuator.lock() {
                    Ok(mut actuator) => actuator.reconfigure(&settings.actions),
                    Err(_) => tracing::warn!("Actuator lock poisoned; settings not forwarded"),
                }
                let dominance = settings.actions.dominance;
                self.session.apply_settings(*settings);
                SessionEvent::Dominance(dominance)
            }
        };
        self.publish(vec![event]);
        true
    }

    fn publish(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            if let Err(err) = self.events.try_send(event) {
                tracing::debug!("Dropped session event: {err}");
            }
        }
        self.snapshot.send_replace(self.session.snapshot());
    }
}

async fn dispatch(
    actuator: &SharedActuator,
    planned: PlannedAction,
) -> Result<ActionTag, DispatchError> {
    let actuator = Arc::clone(actuator);
    let joined = tokio::task::spawn_blocking(move || {
        let mut guard = actuator.lock().map_err(|_| DispatchError::Interrupted)?;
        guard.dispatch(&planned.action)
    })
    .await;
    joined.unwrap_or(Err(DispatchError::Interrupted))
}
