//! Channel-based sample source.
//!
//! Receives `(patient_id, sample)` pairs via a tokio mpsc channel. This is
//! the integration point between the background producers (MQTT event loop,
//! simulator) and the synchronous TUI loop: producers push, the loop polls.

use tokio::sync::mpsc;

use super::SampleSource;
use crate::data::VitalSample;

/// A sample source that receives merged samples via a channel.
///
/// The producer (the broker link or the simulator) sends samples through
/// the channel, and this source hands them to the TUI one per poll.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<(String, VitalSample)>,
    description: String,
}

impl ChannelSource {
    /// Wrap the receiving end of an existing channel.
    ///
    /// `source_description` names where samples come from (e.g.
    /// "mqtt://localhost:1883", "simulator").
    pub fn new(receiver: mpsc::Receiver<(String, VitalSample)>, source_description: &str) -> Self {
        Self {
            receiver,
            description: source_description.to_string(),
        }
    }

    /// Create a channel pair for pushing samples into a `ChannelSource`.
    pub fn create(source_description: &str) -> (mpsc::Sender<(String, VitalSample)>, Self) {
        let (tx, rx) = mpsc::channel(256);
        let source = Self::new(rx, source_description);
        (tx, source)
    }
}

impl SampleSource for ChannelSource {
    fn poll(&mut self) -> Option<(String, VitalSample)> {
        self.receiver.try_recv().ok()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_source_poll() {
        let (tx, mut source) = ChannelSource::create("test");

        // Nothing queued yet
        assert!(source.poll().is_none());

        let sample = VitalSample {
            timestamp_ms: 1000,
            heart_rate: Some(72.0),
            ..Default::default()
        };
        tx.try_send(("7".to_string(), sample.clone())).unwrap();

        let (patient_id, received) = source.poll().unwrap();
        assert_eq!(patient_id, "7");
        assert_eq!(received, sample);
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_poll_after_sender_dropped() {
        let (tx, mut source) = ChannelSource::create("test");
        drop(tx);
        assert!(source.poll().is_none());
    }
}
