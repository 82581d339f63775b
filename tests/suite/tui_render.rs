//! Rendering through ratatui's `TestBackend`.

use ratatui::{Terminal, backend::TestBackend};

use pclock_config::DominanceSplit;
use pclock_core::ActionOutcome;
use pclock_engine::{SessionEvent, SessionSnapshot, TokenEvent};
use pclock_tui::{ClockView, StatusKind, UiOptions, draw};
use pclock_types::{Action, ActionTag, Key, Mode, PresenceLabel, Token};

fn render(view: &ClockView) -> String {
    let backend = TestBackend::new(100, 24);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|frame| draw(frame, view)).unwrap();
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

fn populated_view(options: UiOptions) -> ClockView {
    let mut view = ClockView::new("Some One", options);
    view.apply(SessionEvent::Presence(PresenceLabel::Online));
    view.apply(SessionEvent::Mode(Mode::Key));
    view.apply(SessionEvent::Dominance(DominanceSplit::from_pointer(45)));
    view.apply(SessionEvent::Drift(0.001_234_5));
    view.apply(SessionEvent::Token(TokenEvent::Cycle {
        token: Token::Symbol('k'),
        reset: false,
    }));
    view.apply(SessionEvent::Token(TokenEvent::Action(ActionOutcome {
        token: Token::Symbol('Q'),
        action: Action::Key(Key::SPACE),
        tag: ActionTag::new("key:space"),
    })));
    view.set_snapshot(SessionSnapshot {
        mode: Mode::Key,
        paused: false,
        drift: 0.001_234_5,
        buffered_bits: 37,
        cycle_bits: 120,
        windows_emitted: 4,
        pointer_step: 24,
        dominance: DominanceSplit::from_pointer(45),
    });
    view
}

#[test]
fn clock_panel_shows_session_state() {
    let text = render(&populated_view(UiOptions::default()));
    assert!(text.contains("Presence Clock"), "{text}");
    assert!(text.contains("Some One"));
    assert!(text.contains("online"));
    assert!(text.contains("[cycle] k"));
    assert!(text.contains("Q → space [key:space]"));
    assert!(text.contains("+0.00123"));
    assert!(text.contains("Keyboard"));
    assert!(text.contains("pointer 45"));
    assert!(text.contains("key 55"));
    assert!(text.contains("37/120 bits"));
    assert!(text.contains("running"));
}

#[test]
fn paused_state_and_status_message_render() {
    let mut view = populated_view(UiOptions {
        ascii_only: true,
        high_contrast: true,
    });
    view.apply(SessionEvent::Paused(true));
    view.set_status(StatusKind::Success, "Saved config");
    let text = render(&view);
    assert!(text.contains("|| paused"), "{text}");
    assert!(text.contains("Saved config"));
    assert!(text.contains("* online"));
}

#[test]
fn empty_view_renders_placeholders() {
    let view = ClockView::new("nobody", UiOptions::default());
    let text = render(&view);
    assert!(text.contains("waiting for first window"), "{text}");
    assert!(text.contains("offline"));
    assert!(text.contains("+0.00000"));
}

#[test]
fn history_pane_keeps_latest_lines_visible() {
    let mut view = ClockView::new("Some One", UiOptions::default());
    for c in 'a'..='z' {
        view.apply(SessionEvent::Token(TokenEvent::Keepalive(Token::Symbol(c))));
    }
    let text = render(&view);
    // 24 rows leave nine history lines: r through z.
    assert!(text.contains("[keepalive] r"), "{text}");
    assert!(text.contains("[keepalive] z"));
    assert!(!text.contains("[keepalive] q"));
}
