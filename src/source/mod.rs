//! Data source abstraction for receiving vitals samples.
//!
//! This module provides a trait-based abstraction for receiving merged
//! samples from various producers (the MQTT link, the built-in gateway
//! simulator, or tests pushing directly into a channel).

mod channel;
mod simulator;

pub use channel::ChannelSource;
pub use simulator::{SimulatorConfig, SimulatorHandle, SimulatorState};

use std::fmt::Debug;

use crate::data::VitalSample;

/// Trait for receiving vitals samples from various producers.
///
/// Implementations deliver `(patient_id, sample)` pairs from different
/// backends - broker subscriptions, the simulator, or in-memory channels.
///
/// # Example
///
/// ```
/// use esante_monitor::{ChannelSource, SampleSource};
///
/// let (_tx, mut source) = ChannelSource::create("mqtt://localhost:1883");
/// if let Some((patient_id, _sample)) = source.poll() {
///     println!("sample for patient {}", patient_id);
/// }
/// ```
pub trait SampleSource: Send + Debug {
    /// Poll for the next sample.
    ///
    /// Returns `Some((patient_id, sample))` if a sample is available,
    /// `None` otherwise. This method must be non-blocking.
    fn poll(&mut self) -> Option<(String, VitalSample)>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}
