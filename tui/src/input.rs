//! Input handling for the Presence Clock TUI.

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::debug;

use pclock_engine::SessionCommand;
use pclock_types::Mode;

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(25); // shutdown responsiveness
const INPUT_CHANNEL_CAPACITY: usize = 256; // bounded: no OOM
const MAX_EVENTS_PER_FRAME: usize = 64; // never starve rendering

/// Dominance change per arrow key press.
pub const DOMINANCE_STEP: i16 = 5;

/// What a key press asks the front end to do.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// Forward to the running session.
    Command(SessionCommand),
    /// Shift pointer weight by this many points (negative favours keys).
    AdjustDominance(i16),
    /// Write current settings to the config file.
    Persist,
    /// Re-read the config file and apply it to the running session.
    Reload,
    Quit,
}

enum InputMsg {
    Event(Event),
    Error(String),
}

pub struct InputPump {
    rx: mpsc::Receiver<InputMsg>,
    stop: Arc<AtomicBool>,
    join: Option<tokio::task::JoinHandle<()>>,
}

impl InputPump {
    /// Start reading terminal events. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();

        let join = tokio::task::spawn_blocking(move || input_loop(&stop2, &tx));
        Self {
            rx,
            stop,
            join: Some(join),
        }
    }

    pub async fn shutdown(&mut self) {
        // Close the receiver first so a backpressured input thread unblocks.
        self.rx.close();

        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), join).await;
        }
    }
}

impl Default for InputPump {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        // Best-effort stop if caller exits early; do not block in Drop.
        self.rx.close();
        self.stop.store(true, Ordering::Release);
    }
}

fn input_loop(stop: &AtomicBool, tx: &mpsc::Sender<InputMsg>) {
    while !stop.load(Ordering::Acquire) {
        match event::poll(INPUT_POLL_TIMEOUT) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(InputMsg::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                break;
            }
        }
    }
}

/// Map one key press to an action. Releases and unbound keys map to `None`.
#[must_use]
pub fn map_key(key: KeyEvent) -> Option<InputAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c' | 'C')).then_some(InputAction::Quit);
    }

    let action = match key.code {
        KeyCode::F(1) => InputAction::Command(SessionCommand::SetMode(Mode::Pointer)),
        KeyCode::F(2) => InputAction::Command(SessionCommand::SetMode(Mode::Key)),
        KeyCode::F(3) => InputAction::Command(SessionCommand::SetMode(Mode::Auto)),
        KeyCode::Char('p' | 'P' | ' ') => InputAction::Command(SessionCommand::TogglePause),
        KeyCode::Left => InputAction::AdjustDominance(-DOMINANCE_STEP),
        KeyCode::Right => InputAction::AdjustDominance(DOMINANCE_STEP),
        KeyCode::Char('w' | 'W') => InputAction::Persist,
        KeyCode::Char('r' | 'R') => InputAction::Reload,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => InputAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// Drain queued input (bounded per frame) into actions.
pub fn handle_events(input: &mut InputPump) -> Result<Vec<InputAction>> {
    let mut actions = Vec::new();
    for _ in 0..MAX_EVENTS_PER_FRAME {
        let ev = match input.rx.try_recv() {
            Ok(InputMsg::Event(ev)) => ev,
            Ok(InputMsg::Error(msg)) => return Err(anyhow!("input error: {msg}")),
            Err(mpsc::error::TryRecvError::Empty) => break,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                return Err(anyhow!("input pump disconnected"));
            }
        };

        if let Event::Key(key) = ev
            && let Some(action) = map_key(key)
        {
            debug!(?action, "Key action");
            actions.push(action);
        }
    }
    Ok(actions)
}
