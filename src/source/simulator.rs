//! Built-in gateway simulator.
//!
//! Produces merged samples for one patient on a fixed tick, random-walking
//! heart rate, SpO2 and temperature around healthy baselines with a gentle
//! pull back toward them. A spike can be triggered on demand to exercise
//! the alerting path without a real gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::data::{now_ms, round_to, VitalSample};
use crate::subscribe::SampleSender;

const BASE_HEART_RATE: f64 = 76.0;
const BASE_SPO2: f64 = 97.0;
const BASE_TEMPERATURE: f64 = 36.8;

/// Simulator settings.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub patient_id: String,
    /// Tick period between emitted samples.
    pub interval: Duration,
}

impl SimulatorConfig {
    pub fn new(patient_id: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            interval: Duration::from_secs(1),
        }
    }
}

/// Random-walk state for one simulated patient.
#[derive(Debug)]
pub struct SimulatorState {
    heart_rate: f64,
    spo2: f64,
    temperature: f64,
    rng: StdRng,
}

impl SimulatorState {
    pub fn new(rng: StdRng) -> Self {
        Self {
            heart_rate: BASE_HEART_RATE,
            spo2: BASE_SPO2,
            temperature: BASE_TEMPERATURE,
            rng,
        }
    }

    /// Advance the walk one tick and produce the merged sample.
    ///
    /// With `spike` set, all three metrics jump well past their alert
    /// thresholds for this tick; the pull toward the baselines brings them
    /// back over the following ticks.
    pub fn step(&mut self, spike: bool) -> VitalSample {
        if spike {
            self.heart_rate = 140.0 + self.rng.gen_range(0.0..15.0);
            self.spo2 = 86.0 - self.rng.gen_range(0.0..4.0);
            self.temperature = 39.2 + self.rng.gen_range(0.0..0.6);
        } else {
            self.heart_rate = self.walk(self.heart_rate, BASE_HEART_RATE, 2.0, 30.0, 160.0);
            self.spo2 = self.walk(self.spo2, BASE_SPO2, 0.5, 70.0, 100.0);
            self.temperature = self.walk(self.temperature, BASE_TEMPERATURE, 0.08, 34.0, 42.0);
        }

        VitalSample {
            timestamp_ms: now_ms(),
            heart_rate: Some(round_to(self.heart_rate, 1)),
            spo2: Some(round_to(self.spo2, 1)),
            temperature: Some(round_to(self.temperature, 2)),
            ..Default::default()
        }
    }

    fn walk(&mut self, value: f64, base: f64, jitter: f64, min: f64, max: f64) -> f64 {
        let drift = self.rng.gen_range(-jitter..=jitter);
        // 10% pull back toward the baseline keeps excursions short-lived
        let next = value + drift + (base - value) * 0.1;
        next.clamp(min, max)
    }
}

/// Handle to a running simulator task.
///
/// Dropping the handle stops the simulator.
#[derive(Debug)]
pub struct SimulatorHandle {
    spike: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SimulatorHandle {
    /// Start the simulator, emitting samples for `config.patient_id` into
    /// `tx` every `config.interval`.
    ///
    /// # Example
    ///
    /// ```
    /// use esante_monitor::{SimulatorConfig, SimulatorHandle};
    /// use tokio::sync::mpsc;
    ///
    /// # tokio_test::block_on(async {
    /// let (tx, mut rx) = mpsc::channel(16);
    /// let handle = SimulatorHandle::spawn(SimulatorConfig::new("1"), tx);
    /// let (patient_id, _sample) = rx.recv().await.unwrap();
    /// assert_eq!(patient_id, "1");
    /// # });
    /// ```
    pub fn spawn(config: SimulatorConfig, tx: SampleSender) -> Self {
        let spike = Arc::new(AtomicBool::new(false));
        let spike_flag = spike.clone();
        let task = tokio::spawn(async move {
            let mut state = SimulatorState::new(StdRng::from_entropy());
            let mut ticker = tokio::time::interval(config.interval);
            loop {
                ticker.tick().await;
                let sample = state.step(spike_flag.swap(false, Ordering::SeqCst));
                if tx.send((config.patient_id.clone(), sample)).await.is_err() {
                    debug!("sample channel closed, stopping simulator");
                    break;
                }
            }
        });
        Self { spike, task }
    }

    /// Force the next tick past every alert threshold.
    pub fn trigger_spike(&self) {
        self.spike.store(true, Ordering::SeqCst);
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::evaluate;

    fn state() -> SimulatorState {
        SimulatorState::new(StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_walk_stays_within_chart_ranges() {
        let mut s = state();
        for _ in 0..500 {
            let sample = s.step(false);
            let hr = sample.heart_rate.unwrap();
            let spo2 = sample.spo2.unwrap();
            let temp = sample.temperature.unwrap();
            assert!((30.0..=160.0).contains(&hr), "hr {hr}");
            assert!((70.0..=100.0).contains(&spo2), "spo2 {spo2}");
            assert!((34.0..=42.0).contains(&temp), "temp {temp}");
        }
    }

    #[test]
    fn test_walk_hugs_the_baselines() {
        let mut s = state();
        let mut last = s.step(false);
        for _ in 0..200 {
            last = s.step(false);
        }
        assert!((last.heart_rate.unwrap() - BASE_HEART_RATE).abs() < 20.0);
        assert!((last.spo2.unwrap() - BASE_SPO2).abs() < 6.0);
    }

    #[test]
    fn test_spike_breaches_every_threshold() {
        let mut s = state();
        let sample = s.step(true);
        let alerts = evaluate(&sample);
        assert_eq!(alerts.len(), 3);
    }

    #[test]
    fn test_samples_are_rounded() {
        let mut s = state();
        let sample = s.step(false);
        let hr = sample.heart_rate.unwrap();
        let temp = sample.temperature.unwrap();
        assert_eq!(round_to(hr, 1), hr);
        assert_eq!(round_to(temp, 2), temp);
    }

    #[tokio::test]
    async fn test_spawned_simulator_emits_samples() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let config = SimulatorConfig {
            patient_id: "1".to_string(),
            interval: Duration::from_millis(5),
        };
        let handle = SimulatorHandle::spawn(config, tx);
        let (patient_id, sample) = rx.recv().await.unwrap();
        assert_eq!(patient_id, "1");
        assert!(!sample.is_empty());
        drop(handle);
    }
}
