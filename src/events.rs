use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, MouseEvent, MouseEventKind};

use crate::app::{App, View};

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => {
            if app.view != View::Vitals {
                app.set_view(View::Vitals);
            }
        }

        // View switching
        KeyCode::Tab | KeyCode::BackTab => app.next_view(),
        KeyCode::Char('1') => app.set_view(View::Vitals),
        KeyCode::Char('2') => app.set_view(View::Alerts),

        // Patient switching
        KeyCode::Left | KeyCode::Char('h') => app.select_prev_patient(),
        KeyCode::Right | KeyCode::Char('l') => app.select_next_patient(),

        // Alert list scrolling
        KeyCode::Up | KeyCode::Char('k') => app.scroll_alerts_up(),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_alerts_down(),

        // Connection toggle
        KeyCode::Char('c') => app.toggle_connection(),

        // Data maintenance
        KeyCode::Char('x') => app.clear_samples(),
        KeyCode::Char('a') => app.ack_alerts(),

        // Backend fetches
        KeyCode::Char('r') => {
            app.refresh_patients();
            app.request_summary();
        }
        KeyCode::Char('g') => app.generate_report(),

        // Simulator
        KeyCode::Char('s') => app.trigger_spike(),

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        // Scroll wheel drives the alert list
        MouseEventKind::ScrollUp => app.scroll_alerts_up(),
        MouseEventKind::ScrollDown => app.scroll_alerts_down(),
        _ => {}
    }
}
