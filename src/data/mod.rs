//! Data models and processing for the vitals pipeline.
//!
//! ## Submodules
//!
//! - [`message`]: Decode boundary for inbound gateway payloads
//! - [`sample`]: Canonical multi-metric sample and normalization rules
//! - [`ranges`]: Static clinical range table per metric
//! - [`alerts`]: Threshold evaluation producing alert events
//! - [`ring`]: Bounded FIFO buffer backing all per-patient history
//! - [`store`]: Per-patient state with an injected storage backend
//!
//! ## Data Flow
//!
//! ```text
//! MQTT payload (raw JSON)
//!        │
//!        ▼
//! VitalsMessage::decode()
//!        │
//!        ▼
//! VitalSample::apply() (merge + rounding)
//!        │
//!        ├──▶ VitalsStore::push_sample() (chart history)
//!        │
//!        └──▶ alerts::evaluate() ──▶ VitalsStore::push_alert()
//! ```

pub mod alerts;
pub mod message;
pub mod ranges;
pub mod ring;
pub mod sample;
pub mod store;

pub use alerts::{evaluate, AlertEvent};
pub use message::{MeasurementType, VitalsMessage};
pub use ranges::{range_for, Metric, MetricRange, RANGES};
pub use ring::RingBuffer;
pub use sample::{now_ms, round_to, VitalSample};
pub use store::{FileBackend, MemoryBackend, StorageBackend, VitalsStore};
