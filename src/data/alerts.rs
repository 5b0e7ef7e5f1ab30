//! Threshold evaluation of canonical samples.
//!
//! Only heart rate, SpO2 and temperature drive alerting - a narrower policy
//! than the display set, limited to immediately actionable danger signs.
//! Evaluation is stateless and reports every breach on every sample; there
//! is no suppression window for repeated alerts.

use serde::{Deserialize, Serialize};

use super::ranges::{range_for, Metric};
use super::sample::VitalSample;

/// One threshold breach. Immutable once created; persisted per patient in a
/// bounded ring buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Epoch milliseconds, taken from the breaching sample.
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
    #[serde(rename = "type")]
    pub metric: Metric,
    pub value: f64,
    #[serde(rename = "msg")]
    pub message: String,
}

/// Metrics that drive alerting, in evaluation order.
const ALERTING: [Metric; 3] = [Metric::HeartRate, Metric::SpO2, Metric::Temperature];

/// True if the value is strictly outside the metric's normal band.
/// Boundary values equal to warn_low/warn_high are normal.
fn breaches(metric: Metric, value: f64) -> bool {
    match range_for(metric) {
        Some(range) => value < range.warn_low || value > range.warn_high,
        None => false,
    }
}

fn message_for(metric: Metric, value: f64) -> String {
    let unit = range_for(metric).map(|r| r.unit).unwrap_or("");
    match metric {
        Metric::SpO2 => format!("{} {}{}", metric.name(), value, unit),
        _ => format!("{} {} {}", metric.name(), value, unit),
    }
}

/// Classify a (possibly partial) sample against the range table.
///
/// Returns one event per present metric that breached, in a fixed order.
/// Identical input always produces identical output.
pub fn evaluate(sample: &VitalSample) -> Vec<AlertEvent> {
    let mut events = Vec::new();
    for metric in ALERTING {
        if let Some(value) = metric.value_of(sample) {
            if breaches(metric, value) {
                events.push(AlertEvent {
                    timestamp_ms: sample.timestamp_ms,
                    metric,
                    value,
                    message: message_for(metric, value),
                });
            }
        }
    }
    events
}
