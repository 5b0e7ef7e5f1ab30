//! Vitals view: latest-reading tiles plus one chart per metric.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::{range_for, Metric, VitalSample};
use crate::ui::chart::{Series, VitalsChart};
use crate::ui::Theme;

/// Tile order across the top row.
const TILE_METRICS: [Metric; 6] = [
    Metric::HeartRate,
    Metric::SpO2,
    Metric::Temperature,
    Metric::BloodPressureSys,
    Metric::Glucose,
    Metric::Weight,
];

/// Chart order; blood pressure renders systolic and diastolic together.
const CHART_METRICS: [Metric; 6] = [
    Metric::HeartRate,
    Metric::SpO2,
    Metric::Temperature,
    Metric::BloodPressureSys,
    Metric::Glucose,
    Metric::Weight,
];

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Fill(1),
    ])
    .split(area);

    render_tiles(frame, app, rows[0]);

    let top = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(rows[1]);
    let bottom = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(rows[2]);
    for (i, metric) in CHART_METRICS.iter().enumerate() {
        let cell = if i < 3 { top[i] } else { bottom[i - 3] };
        render_chart(frame, app, *metric, cell);
    }
}

fn render_tiles(frame: &mut Frame, app: &mut App, area: Rect) {
    let last = app.last_sample();
    let cells = Layout::horizontal([Constraint::Ratio(1, 6); 6]).split(area);
    for (metric, cell) in TILE_METRICS.iter().zip(cells.iter()) {
        render_tile(frame, app, *metric, last.as_ref(), *cell);
    }
}

fn render_tile(
    frame: &mut Frame,
    app: &App,
    metric: Metric,
    last: Option<&VitalSample>,
    area: Rect,
) {
    let Some(range) = range_for(metric) else {
        return;
    };

    // Blood pressure shows both readings in one tile
    let (label, value) = if metric == Metric::BloodPressureSys {
        let text = match (
            last.and_then(|s| s.bp_sys),
            last.and_then(|s| s.bp_dia),
        ) {
            (Some(sys), Some(dia)) => format!("{sys:.0}/{dia:.0}"),
            (Some(sys), None) => format!("{sys:.0}/-"),
            _ => "--".to_string(),
        };
        ("BP", text)
    } else {
        let text = match last.and_then(|s| metric.value_of(s)) {
            Some(v) => format!("{v}"),
            None => "--".to_string(),
        };
        (metric.label(), text)
    };

    let in_band = last
        .and_then(|s| metric.value_of(s))
        .map(|v| (range.warn_low..=range.warn_high).contains(&v))
        .unwrap_or(true);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(Theme::metric_color(range)));
    let line = Line::from(vec![
        Span::styled(value, app.theme.reading_style(in_band)),
        Span::styled(
            format!(" {}", range.unit),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);
    let paragraph = Paragraph::new(line).block(block.title(format!(" {label} ")));
    frame.render_widget(paragraph, area);
}

fn render_chart(frame: &mut Frame, app: &mut App, metric: Metric, area: Rect) {
    let Some(range) = range_for(metric) else {
        return;
    };

    let mut values = vec![app.chart_series(metric)];
    let mut colors = vec![Theme::metric_color(range)];
    let mut title = metric.label().to_string();
    if metric == Metric::BloodPressureSys {
        values.push(app.chart_series(Metric::BloodPressureDia));
        colors.push(app.theme.highlight);
        title = "BP sys/dia".to_string();
    }

    let series: Vec<Series> = values
        .iter()
        .zip(colors)
        .map(|(v, color)| Series {
            values: v.as_slice(),
            color,
        })
        .collect();

    let block = Block::default()
        .title(format!(" {title} ({}) ", range.unit))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    let chart = VitalsChart::new(series, (range.hard_min, range.hard_max))
        .gridline_color(app.theme.gridline)
        .label_style(Style::default().add_modifier(Modifier::DIM))
        .block(block);
    frame.render_widget(chart, area);
}
