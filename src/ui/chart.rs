//! Line chart widget for vitals series.
//!
//! A thin wrapper over the ratatui canvas: evenly spaced horizontal
//! gridlines, one or more overlaid series drawn as connected lines on one
//! shared scale, and plain min/max labels in the left corners. Values
//! outside the y range are not clamped; the canvas clips them.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols;
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points};
use ratatui::widgets::{Block, Widget};

/// One plotted series.
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub values: &'a [f64],
    pub color: Color,
}

/// Line chart over one or more series sharing a y scale.
#[derive(Debug, Clone)]
pub struct VitalsChart<'a> {
    series: Vec<Series<'a>>,
    range: (f64, f64),
    tick_count: usize,
    gridline: Color,
    label_style: Style,
    block: Option<Block<'a>>,
}

impl<'a> VitalsChart<'a> {
    /// `range` is the hard display range; it is widened if any series
    /// carries data outside it.
    pub fn new(series: Vec<Series<'a>>, range: (f64, f64)) -> Self {
        let all = series.iter().flat_map(|s| s.values.iter().copied());
        let range = compute_range(range, all);
        Self {
            series,
            range,
            tick_count: 4,
            gridline: Color::DarkGray,
            label_style: Style::default(),
            block: None,
        }
    }

    pub fn tick_count(mut self, tick_count: usize) -> Self {
        self.tick_count = tick_count;
        self
    }

    pub fn gridline_color(mut self, color: Color) -> Self {
        self.gridline = color;
        self
    }

    pub fn label_style(mut self, style: Style) -> Self {
        self.label_style = style;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for VitalsChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let longest = self
            .series
            .iter()
            .map(|s| s.values.len())
            .max()
            .unwrap_or(0);
        let x_max = longest.saturating_sub(1).max(1) as f64;
        let (y_min, y_max) = self.range;

        let mut canvas = Canvas::default()
            .marker(symbols::Marker::Braille)
            .x_bounds([0.0, x_max])
            .y_bounds([y_min, y_max])
            .paint(|ctx| {
                // Gridlines first so series draw over them
                for i in 1..=self.tick_count {
                    let y = y_min + (y_max - y_min) * i as f64 / (self.tick_count + 1) as f64;
                    ctx.draw(&CanvasLine {
                        x1: 0.0,
                        y1: y,
                        x2: x_max,
                        y2: y,
                        color: self.gridline,
                    });
                }

                for series in &self.series {
                    // A lone reading still gets a marker
                    if let [value] = series.values {
                        let coords = [(0.0, *value)];
                        ctx.draw(&Points {
                            coords: &coords,
                            color: series.color,
                        });
                        continue;
                    }
                    for pair in series.values.windows(2).enumerate() {
                        let (i, w) = pair;
                        ctx.draw(&CanvasLine {
                            x1: i as f64,
                            y1: w[0],
                            x2: (i + 1) as f64,
                            y2: w[1],
                            color: series.color,
                        });
                    }
                }

                ctx.layer();
                ctx.print(
                    0.0,
                    y_max,
                    ratatui::text::Line::styled(format!("{y_max:.0}"), self.label_style),
                );
                ctx.print(
                    0.0,
                    y_min,
                    ratatui::text::Line::styled(format!("{y_min:.0}"), self.label_style),
                );
            });
        if let Some(block) = self.block {
            canvas = canvas.block(block);
        }
        canvas.render(area, buf);
    }
}

/// Widen the hard range so it covers all data points; degenerate ranges get
/// a small pad so the y mapping never divides by zero.
pub fn compute_range(hard: (f64, f64), data: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut min, mut max) = hard;
    for value in data.filter(|v| v.is_finite()) {
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
    }
    if max - min < f64::EPSILON {
        min -= 1.0;
        max += 1.0;
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_range_keeps_hard_range_for_in_range_data() {
        let range = compute_range((30.0, 160.0), [72.0, 80.0, 76.5].into_iter());
        assert_eq!(range, (30.0, 160.0));
    }

    #[test]
    fn test_compute_range_widens_for_outliers() {
        let range = compute_range((30.0, 160.0), [20.0, 175.0].into_iter());
        assert_eq!(range, (20.0, 175.0));
    }

    #[test]
    fn test_compute_range_pads_degenerate_ranges() {
        let (min, max) = compute_range((97.0, 97.0), [97.0].into_iter());
        assert!(max > min);
    }

    #[test]
    fn test_compute_range_ignores_non_finite_values() {
        let range = compute_range((0.0, 10.0), [f64::NAN, f64::INFINITY, 5.0].into_iter());
        assert_eq!(range, (0.0, 10.0));
    }

    #[test]
    fn test_render_with_no_points_does_not_panic() {
        let chart = VitalsChart::new(vec![], (30.0, 160.0));
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        chart.render(area, &mut buf);
    }

    #[test]
    fn test_render_single_point_plots_a_marker() {
        let area = Rect::new(0, 0, 40, 10);
        let render = |chart: VitalsChart| {
            let mut buf = Buffer::empty(area);
            chart.render(area, &mut buf);
            buf
        };
        let values = [72.0];
        let with_point = render(VitalsChart::new(
            vec![Series {
                values: &values,
                color: Color::Green,
            }],
            (30.0, 160.0),
        ));
        let without = render(VitalsChart::new(vec![], (30.0, 160.0)));
        // Gridlines and labels are identical; the difference is the point
        assert_ne!(with_point, without);
    }

    #[test]
    fn test_render_overlaid_series() {
        let sys = [120.0, 125.0, 118.0];
        let dia = [80.0, 82.0, 79.0];
        let chart = VitalsChart::new(
            vec![
                Series {
                    values: &sys,
                    color: Color::Red,
                },
                Series {
                    values: &dia,
                    color: Color::Blue,
                },
            ],
            (40.0, 200.0),
        );
        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        chart.render(area, &mut buf);
    }
}
