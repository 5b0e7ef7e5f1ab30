//! Alerts view: reverse-chronological alert list for the current patient.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::now_ms;

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let alerts = app.recent_alerts();

    let block = Block::default()
        .title(format!(" Alerts ({}) ", alerts.len()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if alerts.is_empty() {
        let paragraph = Paragraph::new(" No alerts recorded ")
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let now = now_ms();
    let items: Vec<ListItem> = alerts
        .iter()
        .map(|alert| {
            let line = Line::from(vec![
                Span::styled(
                    format!(" {:>8} ", format_age(now - alert.timestamp_ms)),
                    Style::default().add_modifier(Modifier::DIM),
                ),
                Span::styled(
                    format!("{:<5} ", alert.metric.label()),
                    Style::default()
                        .fg(app.theme.critical)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(alert.message.clone()),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    state.select(Some(app.alert_scroll.min(alerts.len() - 1)));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Render an age in milliseconds as a compact "12s" / "3m05s" / "2h" form.
fn format_age(age_ms: i64) -> String {
    let secs = (age_ms / 1000).max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(0), "0s");
        assert_eq!(format_age(12_400), "12s");
        assert_eq!(format_age(185_000), "3m05s");
        assert_eq!(format_age(7_200_000), "2h");
        // Clock skew never yields a negative age
        assert_eq!(format_age(-5_000), "0s");
    }
}
