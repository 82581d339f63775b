//! Presence Clock CLI - Binary entry point and terminal session management.
//!
//! # Architecture
//!
//! The CLI bridges [`pclock_engine`] (session runtime) and [`pclock_tui`]
//! (rendering), providing RAII-based terminal management with guaranteed cleanup.
//!
//! ```text
//! main() -> Settings::load() -> SessionHandle::spawn() -> TerminalSession::new() -> run()
//! ```
//!
//! # Event Loop
//!
//! A fixed 50ms render cadence:
//!
//! 1. Wait for frame tick
//! 2. Drain input queue (non-blocking via [`pclock_tui::InputPump`])
//! 3. Forward commands to the session
//! 4. Fold session events into the view
//! 5. Render frame
//! 6. Check for quit or session stop

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::{
    env,
    fs::{self, OpenOptions},
    io::{Stdout, stdout},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pclock_engine::{
    DryRunActuator, JsonFileSampler, RuntimeOptions, SessionCommand, SessionHandle, Settings,
};
use pclock_tui::{ClockView, InputAction, InputPump, StatusKind, UiOptions, draw, handle_events};

const ENV_ASCII: &str = "PCLOCK_ASCII";
const ENV_HIGH_CONTRAST: &str = "PCLOCK_HIGH_CONTRAST";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // If we can't open a log file, prefer "no logs" over corrupting the TUI
    // by writing to stdout/stderr.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.pclock/logs/pclock.log
    if let Some(config_path) = pclock_config::config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("pclock.log"));
    }

    // Fallback: ./.pclock/logs/pclock.log
    candidates.push(PathBuf::from(".pclock").join("logs").join("pclock.log"));

    candidates
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
}

fn ui_options() -> UiOptions {
    UiOptions {
        ascii_only: env_flag(ENV_ASCII),
        high_contrast: env_flag(ENV_HIGH_CONTRAST),
    }
}

/// Presence file from settings, else `~/.pclock/presence.json`.
fn presence_file(settings: &Settings) -> PathBuf {
    settings.session.presence_file.clone().unwrap_or_else(|| {
        pclock_config::config_path()
            .and_then(|p| p.parent().map(|dir| dir.join("presence.json")))
            .unwrap_or_else(|| PathBuf::from("presence.json"))
    })
}

/// RAII wrapper for terminal state with guaranteed cleanup on drop.
///
/// Raw mode and the alternate screen are restored on drop, so the terminal
/// stays usable after panics or early returns.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;

        let mut out = stdout();
        if let Err(err) = execute!(out, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            let _ = execute!(out, LeaveAlternateScreen);
            return Err(err.into());
        }

        let terminal = match Terminal::new(CrosstermBackend::new(out)) {
            Ok(t) => t,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(stdout(), LeaveAlternateScreen);
                return Err(err.into());
            }
        };

        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn load_settings() -> Result<Settings> {
    Ok(Settings::load()
        .context("failed to load config")?
        .unwrap_or_default()
        .with_env_overrides(|key| env::var(key).ok()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = load_settings()?;

    let sampler = JsonFileSampler::new(presence_file(&settings));
    tracing::info!(path = %sampler.path().display(), "Reading presence samples");
    let actuator = DryRunActuator::new(&settings.actions);

    let target = settings.session.target.clone().unwrap_or_default();
    let mut handle = SessionHandle::spawn(
        settings.clone(),
        Box::new(sampler),
        Box::new(actuator),
        RuntimeOptions::default(),
    )?;

    let mut view = ClockView::new(target, ui_options());
    let mut settings = settings;

    let result = {
        let mut session = TerminalSession::new()?;
        run(&mut session.terminal, &mut handle, &mut view, &mut settings).await
    };

    handle.shutdown().await;

    if let Err(err) = &result {
        eprintln!("Error: {err:?}");
    }
    result
}

const FRAME_DURATION: Duration = Duration::from_millis(50);

async fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    handle: &mut SessionHandle,
    view: &mut ClockView,
    settings: &mut Settings,
) -> Result<()> {
    let mut input = InputPump::new();
    let mut frames = tokio::time::interval(FRAME_DURATION);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result: Result<()> = loop {
        frames.tick().await;

        let actions = match handle_events(&mut input) {
            Ok(actions) => actions,
            Err(e) => break Err(e),
        };

        let mut quit = false;
        for action in actions {
            match action {
                InputAction::Quit => quit = true,
                InputAction::Command(command) => {
                    handle.command(command);
                }
                InputAction::AdjustDominance(delta) => {
                    let split = settings.adjust_pointer_dominance(delta);
                    handle.command(SessionCommand::SetPointerDominance(split.pointer()));
                }
                InputAction::Reload => match load_settings() {
                    Ok(next) => {
                        *settings = next.clone();
                        handle.command(SessionCommand::ApplySettings(Box::new(next)));
                        view.set_status(StatusKind::Success, "Reloaded config");
                    }
                    Err(err) => {
                        tracing::warn!("Failed to reload settings: {err:#}");
                        view.set_status(StatusKind::Error, format!("{err:#}"));
                    }
                },
                InputAction::Persist => match settings.persist() {
                    Ok(path) => {
                        view.set_status(StatusKind::Success, format!("Saved {}", path.display()));
                    }
                    Err(err) => {
                        tracing::warn!("Failed to persist settings: {err}");
                        view.set_status(StatusKind::Error, err.to_string());
                    }
                },
            }
        }

        while let Some(event) = handle.try_next_event() {
            view.apply(event);
        }
        view.set_snapshot(handle.snapshot());
        view.tick();

        if let Err(e) = terminal.draw(|frame| draw(frame, view)) {
            break Err(e.into());
        }

        if quit || view.is_stopped() {
            break Ok(());
        }
    };

    input.shutdown().await;
    result
}
