//! TUI rendering for Presence Clock using ratatui.

mod input;
mod theme;

pub use input::{DOMINANCE_STEP, InputAction, InputPump, handle_events, map_key};
pub use theme::{Glyphs, Palette, UiOptions, glyphs, palette, spinner_frame, styles};

use std::collections::VecDeque;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Padding, Paragraph},
};

use pclock_engine::{DominanceSplit, SessionEvent, SessionSnapshot, TokenEvent};
use pclock_types::{Mode, PresenceLabel};

/// Recent token lines kept for the history pane.
const HISTORY_LINES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Everything the screen shows, folded from session events.
#[derive(Debug, Clone)]
pub struct ClockView {
    target: String,
    options: UiOptions,
    presence: PresenceLabel,
    mode: Mode,
    paused: bool,
    dominance: DominanceSplit,
    drift: f64,
    last_cycle: Option<String>,
    last_action: Option<String>,
    resets: u64,
    history: VecDeque<String>,
    snapshot: Option<SessionSnapshot>,
    status: Option<(StatusKind, String)>,
    stopped: bool,
    tick: usize,
}

impl ClockView {
    #[must_use]
    pub fn new(target: impl Into<String>, options: UiOptions) -> Self {
        Self {
            target: target.into(),
            options,
            presence: PresenceLabel::Offline,
            mode: Mode::default(),
            paused: false,
            dominance: DominanceSplit::default(),
            drift: 0.0,
            last_cycle: None,
            last_action: None,
            resets: 0,
            history: VecDeque::with_capacity(HISTORY_LINES),
            snapshot: None,
            status: None,
            stopped: false,
            tick: 0,
        }
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Presence(label) => self.presence = label,
            SessionEvent::Drift(drift) => self.drift = drift,
            SessionEvent::Mode(mode) => self.mode = mode,
            SessionEvent::Paused(paused) => self.paused = paused,
            SessionEvent::Dominance(split) => self.dominance = split,
            SessionEvent::Stopped => self.stopped = true,
            SessionEvent::Token(token) => {
                let line = token.to_string();
                match &token {
                    TokenEvent::Cycle { reset, .. } => {
                        if *reset {
                            self.resets += 1;
                        }
                        self.last_cycle = Some(line.clone());
                    }
                    TokenEvent::Keepalive(_) => self.last_cycle = Some(line.clone()),
                    TokenEvent::Action(_) => self.last_action = Some(line.clone()),
                }
                if self.history.len() == HISTORY_LINES {
                    self.history.pop_front();
                }
                self.history.push_back(line);
            }
        }
    }

    pub fn set_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.snapshot = Some(snapshot);
    }

    pub fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.status = Some((kind, message.into()));
    }

    /// Advance the frame counter (spinner).
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    #[must_use]
    pub fn dominance(&self) -> DominanceSplit {
        self.dominance
    }

    #[must_use]
    pub fn presence(&self) -> PresenceLabel {
        self.presence
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    #[must_use]
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }
}

/// Main draw function
pub fn draw(frame: &mut Frame, view: &ClockView) {
    let palette = palette(view.options);
    let glyphs = glyphs(view.options);
    let bg_block = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(10), // Clock panel
            Constraint::Min(1),    // History
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_clock(frame, view, chunks[0], &palette, &glyphs);
    draw_history(frame, view, chunks[1], &palette);
    draw_status_bar(frame, view, chunks[2], &palette, &glyphs);
}

fn row<'a>(label: &'a str, value: Vec<Span<'a>>, palette: &Palette) -> Line<'a> {
    let mut spans = vec![Span::styled(format!("{label:<10}"), styles::label(palette))];
    spans.extend(value);
    Line::from(spans)
}

fn draw_clock(frame: &mut Frame, view: &ClockView, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let presence_glyph = if view.presence == PresenceLabel::Offline {
        glyphs.presence_off
    } else {
        glyphs.presence_on
    };
    let presence = vec![Span::styled(
        format!("{presence_glyph} {}", view.presence),
        Style::default().fg(palette.presence(view.presence)),
    )];

    let token = match &view.last_cycle {
        Some(line) => vec![Span::styled(line.clone(), styles::token(palette))],
        None => vec![Span::styled("waiting for first window", styles::label(palette))],
    };
    let action = match &view.last_action {
        Some(line) => vec![Span::styled(line.clone(), styles::value(palette))],
        None => vec![Span::styled("-", styles::label(palette))],
    };

    let mut drift = vec![Span::styled(format!("{:+.5}", view.drift), styles::value(palette))];
    if view.resets > 0 {
        drift.push(Span::styled(
            format!("  {} {}", glyphs.reset, view.resets),
            Style::default().fg(palette.peach),
        ));
    }

    let mode = vec![Span::styled(
        format!(" {} ", view.mode.display_name()),
        styles::mode_badge(palette),
    )];

    let dominance = vec![Span::styled(
        format!(
            "pointer {} {} key {}",
            view.dominance.pointer(),
            glyphs.separator,
            view.dominance.key()
        ),
        styles::value(palette),
    )];

    let state = if view.paused {
        vec![Span::styled(
            format!(" {} paused ", glyphs.paused),
            styles::paused_badge(palette),
        )]
    } else if view.stopped {
        vec![Span::styled("stopped", Style::default().fg(palette.red))]
    } else {
        vec![Span::styled(
            format!("{} running", glyphs.running),
            Style::default().fg(palette.green),
        )]
    };

    let window = match view.snapshot {
        Some(snap) => format!(
            "{}/{} bits {} {} emitted {} step {}",
            snap.buffered_bits,
            snap.cycle_bits,
            glyphs.separator,
            snap.windows_emitted,
            glyphs.separator,
            snap.pointer_step
        ),
        None => "-".to_string(),
    };

    let lines = vec![
        row("Presence", presence, palette),
        row("Token", token, palette),
        row("Action", action, palette),
        row("Drift", drift, palette),
        row("Mode", mode, palette),
        row("Dominance", dominance, palette),
        row("State", state, palette),
        row(
            "Window",
            vec![Span::styled(window, Style::default().fg(palette.text_secondary))],
            palette,
        ),
    ];

    let block = Block::default()
        .title(Span::styled(
            format!(" Presence Clock {} {} ", glyphs.separator, view.target),
            styles::title(palette),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.bg_border))
        .style(Style::default().bg(palette.bg_panel))
        .padding(Padding::horizontal(1));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_history(frame: &mut Frame, view: &ClockView, area: Rect, palette: &Palette) {
    let visible = usize::from(area.height.saturating_sub(2));
    let skip = view.history.len().saturating_sub(visible);
    let lines: Vec<Line> = view
        .history
        .iter()
        .skip(skip)
        .map(|line| Line::from(Span::styled(line.as_str(), styles::value(palette))))
        .collect();

    let block = Block::default()
        .title(Span::styled(" History ", styles::label(palette)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.bg_border))
        .padding(Padding::horizontal(1));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_status_bar(
    frame: &mut Frame,
    view: &ClockView,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let mut spans = vec![Span::raw(" ")];
    if let Some((kind, msg)) = &view.status {
        let color = match kind {
            StatusKind::Error => palette.red,
            StatusKind::Success => palette.green,
            StatusKind::Info => palette.text_secondary,
        };
        spans.push(Span::styled(msg.clone(), Style::default().fg(color)));
        spans.push(Span::styled(
            format!(" {} ", glyphs.separator),
            styles::key_hint(palette),
        ));
    } else if !view.paused && !view.stopped {
        spans.push(Span::styled(
            format!("{} ", spinner_frame(view.tick, view.options)),
            Style::default().fg(palette.primary),
        ));
    }

    let hints = [
        ("F1", "pointer"),
        ("F2", "keys"),
        ("F3", "auto"),
        ("p", "pause"),
        ("←/→", "dominance"),
        ("w", "save"),
        ("r", "reload"),
        ("q", "quit"),
    ];
    for (key, what) in hints {
        spans.push(Span::styled(key, styles::key_highlight(palette)));
        spans.push(Span::styled(format!(" {what}  "), styles::key_hint(palette)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
