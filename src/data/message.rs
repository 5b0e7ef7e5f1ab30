//! Decode boundary for inbound vitals messages.
//!
//! Gateways publish one measurement per MQTT message as JSON with a
//! `measurementType` tag, a numeric `value`, and (for blood pressure) a
//! `value2` carrying the diastolic reading. Payloads also carry `unit`,
//! `timestamp` and device metadata which the monitor does not use - samples
//! are stamped with their arrival time instead.
//!
//! Decoding is best-effort by design: telemetry links are noisy and a lost
//! sample is tolerable, so malformed JSON, unknown tags and non-finite
//! values are silently dropped rather than surfaced as errors.

use serde::Deserialize;

/// The closed set of measurement types a gateway can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementType {
    HeartRate,
    SpO2,
    Temperature,
    BloodPressure,
    Glucose,
    Weight,
    Steps,
}

impl MeasurementType {
    /// Parse a wire tag, case-insensitively. Unknown tags map to `None`
    /// (a rejected message), never to a default variant.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "HEART_RATE" => Some(Self::HeartRate),
            "SPO2" => Some(Self::SpO2),
            "TEMPERATURE" | "TEMP" | "BODY_TEMP" => Some(Self::Temperature),
            "BLOOD_PRESSURE" => Some(Self::BloodPressure),
            "GLUCOSE" => Some(Self::Glucose),
            "WEIGHT" => Some(Self::Weight),
            "STEPS" => Some(Self::Steps),
            _ => None,
        }
    }
}

/// Wire shape of a vitals payload. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "measurementType")]
    measurement_type: Option<String>,
    value: Option<f64>,
    value2: Option<f64>,
}

/// A decoded, validated single-measurement message.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsMessage {
    pub kind: MeasurementType,
    pub value: f64,
    /// Diastolic reading, only meaningful for blood pressure.
    pub value2: Option<f64>,
}

impl VitalsMessage {
    /// Decode a raw payload. Returns `None` for anything that should be
    /// dropped: non-JSON bytes, a missing or unknown type tag, a missing or
    /// non-finite value.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let raw: RawMessage = serde_json::from_slice(payload).ok()?;
        let kind = MeasurementType::parse(raw.measurement_type.as_deref()?)?;
        let value = raw.value.filter(|v| v.is_finite())?;
        let value2 = raw.value2.filter(|v| v.is_finite());
        Some(Self { kind, value, value2 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_heart_rate() {
        let msg = VitalsMessage::decode(br#"{"measurementType":"HEART_RATE","value":72.4}"#)
            .expect("should decode");
        assert_eq!(msg.kind, MeasurementType::HeartRate);
        assert_eq!(msg.value, 72.4);
        assert!(msg.value2.is_none());
    }

    #[test]
    fn test_decode_blood_pressure_with_value2() {
        let msg = VitalsMessage::decode(
            br#"{"measurementType":"BLOOD_PRESSURE","value":130,"value2":85}"#,
        )
        .expect("should decode");
        assert_eq!(msg.kind, MeasurementType::BloodPressure);
        assert_eq!(msg.value, 130.0);
        assert_eq!(msg.value2, Some(85.0));
    }

    #[test]
    fn test_decode_temperature_aliases() {
        for tag in ["TEMPERATURE", "TEMP", "BODY_TEMP", "temp"] {
            let payload = format!(r#"{{"measurementType":"{}","value":36.8}}"#, tag);
            let msg = VitalsMessage::decode(payload.as_bytes()).expect("should decode");
            assert_eq!(msg.kind, MeasurementType::Temperature);
        }
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let msg = VitalsMessage::decode(
            br#"{"measurementType":"SPO2","value":97.2,"unit":"%","timestamp":"2024-01-01T00:00:00Z","deviceType":"oximeter"}"#,
        )
        .expect("should decode");
        assert_eq!(msg.kind, MeasurementType::SpO2);
    }

    #[test]
    fn test_unknown_tag_is_dropped() {
        assert!(VitalsMessage::decode(br#"{"measurementType":"RESPIRATION","value":16}"#).is_none());
    }

    #[test]
    fn test_missing_tag_is_dropped() {
        assert!(VitalsMessage::decode(br#"{"value":72}"#).is_none());
    }

    #[test]
    fn test_malformed_json_is_dropped() {
        assert!(VitalsMessage::decode(b"not json at all").is_none());
        assert!(VitalsMessage::decode(b"").is_none());
    }

    #[test]
    fn test_non_finite_value_is_dropped() {
        // JSON has no literal NaN/Infinity; a string value deserializes to None
        assert!(VitalsMessage::decode(br#"{"measurementType":"HEART_RATE","value":"high"}"#)
            .is_none());
        assert!(VitalsMessage::decode(br#"{"measurementType":"HEART_RATE"}"#).is_none());
    }

    #[test]
    fn test_non_finite_value2_is_ignored_not_fatal() {
        let msg = VitalsMessage::decode(
            br#"{"measurementType":"BLOOD_PRESSURE","value":120,"value2":null}"#,
        )
        .expect("should decode");
        assert!(msg.value2.is_none());
    }
}
