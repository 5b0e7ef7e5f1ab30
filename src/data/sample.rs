//! Canonical multi-metric vital-signs samples and normalization.
//!
//! Each inbound message carries a single metric, but tiles and charts want
//! the latest multi-metric snapshot. [`VitalSample::apply`] projects one
//! decoded message onto the matching field with unit-appropriate rounding;
//! callers merge messages into a running sample rather than replacing it,
//! so fields a message does not mention are preserved.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::message::{MeasurementType, VitalsMessage};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Round to a fixed number of decimals. Idempotent: rounding an already
/// rounded value is a no-op.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// A normalized vital-signs snapshot with a single timestamp.
///
/// All metric fields are optional; a sample with every metric absent is
/// invalid and must be discarded (see [`VitalSample::is_empty`]). The serde
/// field names match the persisted local-state format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSample {
    /// Epoch milliseconds.
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
    #[serde(rename = "hr", skip_serializing_if = "Option::is_none", default)]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub spo2: Option<f64>,
    #[serde(rename = "temp", skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f64>,
    #[serde(rename = "bpSys", skip_serializing_if = "Option::is_none", default)]
    pub bp_sys: Option<f64>,
    #[serde(rename = "bpDia", skip_serializing_if = "Option::is_none", default)]
    pub bp_dia: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub glucose: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub steps: Option<u32>,
}

impl VitalSample {
    /// True if no metric field is populated. Such a sample is invalid.
    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_none()
            && self.spo2.is_none()
            && self.temperature.is_none()
            && self.bp_sys.is_none()
            && self.bp_dia.is_none()
            && self.glucose.is_none()
            && self.weight.is_none()
            && self.steps.is_none()
    }

    /// Merge one decoded message into this sample.
    ///
    /// Only the field(s) named by the message change; everything else keeps
    /// its last-known value. Rounding per metric: heart rate and SpO2 to one
    /// decimal, temperature to two, blood pressure and glucose to integers,
    /// weight to one decimal, steps to a whole count.
    pub fn apply(&mut self, msg: &VitalsMessage) {
        match msg.kind {
            MeasurementType::HeartRate => self.heart_rate = Some(round_to(msg.value, 1)),
            MeasurementType::SpO2 => self.spo2 = Some(round_to(msg.value, 1)),
            MeasurementType::Temperature => self.temperature = Some(round_to(msg.value, 2)),
            MeasurementType::BloodPressure => {
                self.bp_sys = Some(round_to(msg.value, 0));
                if let Some(dia) = msg.value2 {
                    self.bp_dia = Some(round_to(dia, 0));
                }
            }
            MeasurementType::Glucose => self.glucose = Some(round_to(msg.value, 0)),
            MeasurementType::Weight => self.weight = Some(round_to(msg.value, 1)),
            MeasurementType::Steps => self.steps = Some(msg.value.round().max(0.0) as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(kind: MeasurementType, value: f64) -> VitalsMessage {
        VitalsMessage {
            kind,
            value,
            value2: None,
        }
    }

    #[test]
    fn test_rounding_per_metric() {
        let mut s = VitalSample::default();
        s.apply(&msg(MeasurementType::HeartRate, 72.44999));
        s.apply(&msg(MeasurementType::SpO2, 97.26));
        s.apply(&msg(MeasurementType::Temperature, 36.8251));
        s.apply(&msg(MeasurementType::Glucose, 104.6));
        s.apply(&msg(MeasurementType::Weight, 80.34));
        s.apply(&msg(MeasurementType::Steps, 1203.7));
        assert_eq!(s.heart_rate, Some(72.4));
        assert_eq!(s.spo2, Some(97.3));
        assert_eq!(s.temperature, Some(36.83));
        assert_eq!(s.glucose, Some(105.0));
        assert_eq!(s.weight, Some(80.3));
        assert_eq!(s.steps, Some(1204));
    }

    #[test]
    fn test_rounding_is_idempotent() {
        for (value, decimals) in [(72.44999, 1), (36.8251, 2), (129.5, 0), (-3.14159, 2)] {
            let once = round_to(value, decimals);
            assert_eq!(round_to(once, decimals), once);
        }
    }

    #[test]
    fn test_merge_preserves_unmentioned_fields() {
        let mut s = VitalSample::default();
        s.apply(&msg(MeasurementType::HeartRate, 72.0));
        s.apply(&VitalsMessage {
            kind: MeasurementType::BloodPressure,
            value: 130.0,
            value2: Some(85.0),
        });
        assert_eq!(s.heart_rate, Some(72.0));
        assert_eq!(s.bp_sys, Some(130.0));
        assert_eq!(s.bp_dia, Some(85.0));
    }

    #[test]
    fn test_blood_pressure_without_diastolic_keeps_previous() {
        let mut s = VitalSample::default();
        s.apply(&VitalsMessage {
            kind: MeasurementType::BloodPressure,
            value: 120.0,
            value2: Some(80.0),
        });
        s.apply(&VitalsMessage {
            kind: MeasurementType::BloodPressure,
            value: 125.0,
            value2: None,
        });
        assert_eq!(s.bp_sys, Some(125.0));
        assert_eq!(s.bp_dia, Some(80.0));
    }

    #[test]
    fn test_empty_sample_detection() {
        let mut s = VitalSample::default();
        assert!(s.is_empty());
        s.apply(&msg(MeasurementType::SpO2, 97.0));
        assert!(!s.is_empty());
    }

    #[test]
    fn test_serde_uses_compact_field_names() {
        let mut s = VitalSample {
            timestamp_ms: 1000,
            ..Default::default()
        };
        s.apply(&msg(MeasurementType::HeartRate, 72.0));
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains(r#""t":1000"#));
        assert!(json.contains(r#""hr":72.0"#));
        assert!(!json.contains("spo2"));

        let back: VitalSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
