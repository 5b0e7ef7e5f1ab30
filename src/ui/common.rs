//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::subscribe::LinkState;

/// Render the header bar with the link state and current patient.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.link.state();
    let status_style = match state {
        LinkState::Connected => Style::default().fg(app.theme.healthy),
        LinkState::Connecting | LinkState::Reconnecting => {
            Style::default().fg(app.theme.warning)
        }
        LinkState::Disconnected => Style::default().fg(app.theme.critical),
    };

    let patient = app
        .current_patient_name()
        .or_else(|| app.current_patient_id().map(|id| format!("patient {id}")))
        .unwrap_or_else(|| "no patient".to_string());

    let mut spans = vec![
        Span::styled(" ● ", status_style),
        Span::styled("ESANTE ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(state.label(), status_style),
        Span::raw(" │ "),
        Span::styled(patient, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if app.patients.len() > 1 {
        spans.push(Span::raw(format!(
            " ({}/{})",
            app.selected_patient + 1,
            app.patients.len()
        )));
    }
    spans.push(Span::raw(" │ "));
    spans.push(Span::styled(
        app.source_description().to_string(),
        Style::default().add_modifier(Modifier::DIM),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = [View::Vitals, View::Alerts]
        .iter()
        .enumerate()
        .map(|(i, view)| Line::from(format!(" {}:{} ", i + 1, view.label())))
        .collect();

    let selected = match app.view {
        View::Vitals => 0,
        View::Alerts => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows temporary status messages when present, otherwise the available
/// controls for the current view.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.view {
        View::Vitals => "←/→:patient c:connect x:clear r:reload g:report ?:help q:quit",
        View::Alerts => "↑↓:scroll a:ack ←/→:patient ?:help q:quit",
    };
    let paragraph =
        Paragraph::new(format!(" {} ", controls)).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  Tab 1/2     Switch views"),
        Line::from("  ←/→ h/l     Switch patient"),
        Line::from("  ↑/↓ j/k     Scroll alerts"),
        Line::from("  Esc         Back to vitals"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Data",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  c         Connect / disconnect"),
        Line::from("  r         Reload patients + summary"),
        Line::from("  x         Clear sample history"),
        Line::from("  a         Acknowledge alerts"),
        Line::from("  g         Generate report"),
        Line::from("  s         Simulator spike"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ?         Toggle this help"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 44u16.min(area.width.saturating_sub(4));
    let help_height = 26u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
