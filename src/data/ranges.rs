//! Static clinical range configuration per metric.
//!
//! The metric set is closed and configuration-driven: six chart metrics ship
//! built-in (blood pressure is one chart with systolic and diastolic
//! series). Warn bounds drive alerting for heart rate, SpO2 and temperature
//! only; for the remaining metrics they are display hints.

use serde::{Deserialize, Serialize};

use super::sample::VitalSample;

/// A vital-sign metric key.
///
/// Serialized with the compact keys used by the persisted alert format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "hr")]
    HeartRate,
    #[serde(rename = "spo2")]
    SpO2,
    #[serde(rename = "temp")]
    Temperature,
    #[serde(rename = "bpSys")]
    BloodPressureSys,
    #[serde(rename = "bpDia")]
    BloodPressureDia,
    #[serde(rename = "glucose")]
    Glucose,
    #[serde(rename = "weight")]
    Weight,
    #[serde(rename = "steps")]
    Steps,
}

impl Metric {
    /// Short uppercase label for badges and tiles.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::HeartRate => "HR",
            Metric::SpO2 => "SPO2",
            Metric::Temperature => "TEMP",
            Metric::BloodPressureSys => "BP SYS",
            Metric::BloodPressureDia => "BP DIA",
            Metric::Glucose => "GLUCOSE",
            Metric::Weight => "WEIGHT",
            Metric::Steps => "STEPS",
        }
    }

    /// Human-readable name used in alert messages.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::HeartRate => "Heart rate",
            Metric::SpO2 => "SpO2",
            Metric::Temperature => "Temperature",
            Metric::BloodPressureSys => "Systolic pressure",
            Metric::BloodPressureDia => "Diastolic pressure",
            Metric::Glucose => "Glucose",
            Metric::Weight => "Weight",
            Metric::Steps => "Steps",
        }
    }

    /// Extract this metric's value from a sample.
    pub fn value_of(&self, sample: &VitalSample) -> Option<f64> {
        match self {
            Metric::HeartRate => sample.heart_rate,
            Metric::SpO2 => sample.spo2,
            Metric::Temperature => sample.temperature,
            Metric::BloodPressureSys => sample.bp_sys,
            Metric::BloodPressureDia => sample.bp_dia,
            Metric::Glucose => sample.glucose,
            Metric::Weight => sample.weight,
            Metric::Steps => sample.steps.map(f64::from),
        }
    }
}

/// Static per-metric display and threshold configuration.
#[derive(Debug, Clone, Copy)]
pub struct MetricRange {
    pub metric: Metric,
    pub unit: &'static str,
    /// RGB display color.
    pub color: (u8, u8, u8),
    /// Default chart bounds.
    pub hard_min: f64,
    pub hard_max: f64,
    /// Inclusive normal band: values strictly outside alert.
    pub warn_low: f64,
    pub warn_high: f64,
}

/// The built-in range table. Blood pressure systolic and diastolic share the
/// combined chart bounds.
pub const RANGES: &[MetricRange] = &[
    MetricRange {
        metric: Metric::HeartRate,
        unit: "bpm",
        color: (0x22, 0xc5, 0x5e),
        hard_min: 30.0,
        hard_max: 160.0,
        warn_low: 45.0,
        warn_high: 110.0,
    },
    MetricRange {
        metric: Metric::SpO2,
        unit: "%",
        color: (0x38, 0xbd, 0xf8),
        hard_min: 70.0,
        hard_max: 100.0,
        warn_low: 90.0,
        warn_high: 100.0,
    },
    MetricRange {
        metric: Metric::Temperature,
        unit: "\u{b0}C",
        color: (0xf5, 0x9e, 0x0b),
        hard_min: 34.0,
        hard_max: 42.0,
        warn_low: 36.0,
        warn_high: 38.5,
    },
    MetricRange {
        metric: Metric::BloodPressureSys,
        unit: "mmHg",
        color: (0xef, 0x44, 0x44),
        hard_min: 40.0,
        hard_max: 200.0,
        warn_low: 90.0,
        warn_high: 140.0,
    },
    MetricRange {
        metric: Metric::BloodPressureDia,
        unit: "mmHg",
        color: (0xf5, 0x9e, 0x0b),
        hard_min: 40.0,
        hard_max: 200.0,
        warn_low: 60.0,
        warn_high: 90.0,
    },
    MetricRange {
        metric: Metric::Glucose,
        unit: "mg/dL",
        color: (0xa7, 0x8b, 0xfa),
        hard_min: 40.0,
        hard_max: 250.0,
        warn_low: 70.0,
        warn_high: 180.0,
    },
    MetricRange {
        metric: Metric::Weight,
        unit: "kg",
        color: (0x34, 0xd3, 0x99),
        hard_min: 30.0,
        hard_max: 150.0,
        warn_low: 30.0,
        warn_high: 150.0,
    },
];

/// Look up the range entry for a metric. Steps has no range (count metric,
/// tile-only).
pub fn range_for(metric: Metric) -> Option<&'static MetricRange> {
    RANGES.iter().find(|r| r.metric == metric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_chart_metrics() {
        for metric in [
            Metric::HeartRate,
            Metric::SpO2,
            Metric::Temperature,
            Metric::BloodPressureSys,
            Metric::BloodPressureDia,
            Metric::Glucose,
            Metric::Weight,
        ] {
            let range = range_for(metric).expect("range should exist");
            assert!(range.hard_min < range.hard_max);
            assert!(range.warn_low <= range.warn_high);
        }
        assert!(range_for(Metric::Steps).is_none());
    }

    #[test]
    fn test_bp_series_share_chart_bounds() {
        let sys = range_for(Metric::BloodPressureSys).unwrap();
        let dia = range_for(Metric::BloodPressureDia).unwrap();
        assert_eq!(sys.hard_min, dia.hard_min);
        assert_eq!(sys.hard_max, dia.hard_max);
    }

    #[test]
    fn test_metric_serde_keys() {
        assert_eq!(serde_json::to_string(&Metric::HeartRate).unwrap(), r#""hr""#);
        assert_eq!(serde_json::to_string(&Metric::SpO2).unwrap(), r#""spo2""#);
        let back: Metric = serde_json::from_str(r#""temp""#).unwrap();
        assert_eq!(back, Metric::Temperature);
    }

    #[test]
    fn test_value_of() {
        let sample = VitalSample {
            timestamp_ms: 0,
            heart_rate: Some(72.0),
            steps: Some(1200),
            ..Default::default()
        };
        assert_eq!(Metric::HeartRate.value_of(&sample), Some(72.0));
        assert_eq!(Metric::Steps.value_of(&sample), Some(1200.0));
        assert_eq!(Metric::Glucose.value_of(&sample), None);
    }
}
