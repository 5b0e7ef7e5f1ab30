// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # esante-monitor
//!
//! A remote patient-monitoring TUI and library.
//!
//! This crate subscribes to per-patient vitals telemetry over MQTT,
//! normalizes single-metric gateway messages into merged samples, evaluates
//! clinical thresholds, records and forwards alerts, and renders live
//! tiles and charts in an interactive terminal UI. A REST client fetches
//! the patient directory and server-side dashboard summaries, falling back
//! to the local sample history when the backend is unreachable.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         Application                           │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌──────────┐  │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal │  │
//! │  │ (state) │    │(pipeline)│    │(render) │    │          │  │
//! │  └────┬────┘    └──────────┘    └─────────┘    └──────────┘  │
//! │       │                                                       │
//! │       ▼                                                       │
//! │  ┌─────────┐                                                  │
//! │  │ source  │◀── ChannelSource ◀── VitalsLink | Simulator     │
//! │  │ (input) │                                                  │
//! │  └─────────┘                                                  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, patient selection, and user interaction logic
//! - **[`subscribe`]**: MQTT broker link with reconnection and per-patient
//!   topic bindings
//! - **[`source`]**: Sample source abstraction ([`SampleSource`] trait) over
//!   channels, plus the built-in gateway simulator
//! - **[`data`]**: The vitals pipeline - message decoding, sample merging and
//!   rounding, clinical ranges, threshold alerting, bounded history, and the
//!   persistence-backed store
//! - **[`api`]** / **[`relay`]**: REST clients for the backend and the
//!   notification relay
//! - **[`ui`]**: Terminal rendering using ratatui - tiles, charts, alert
//!   list, and theme support
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Live vitals from a broker
//! esante-monitor --broker mqtt://localhost:1883 --api http://localhost:8084
//!
//! # No infrastructure: built-in gateway simulator
//! esante-monitor --simulate --patient 1
//! ```
//!
//! ### As a library with a channel source
//!
//! ```
//! use esante_monitor::{
//!     AlertSink, App, ChannelSource, MemoryBackend, Settings, VitalsStore,
//! };
//!
//! // Create a channel for receiving merged samples
//! let (tx, source) = ChannelSource::create("mqtt://localhost:1883");
//!
//! let store = VitalsStore::new(Box::new(MemoryBackend::new()));
//! let app = App::new(
//!     Settings::default(),
//!     Box::new(source),
//!     tx,
//!     store,
//!     AlertSink::new(None),
//!     None,
//! );
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod relay;
pub mod source;
pub mod subscribe;
pub mod ui;

// Re-export main types for convenience
pub use api::{ApiClient, ApiError, DashboardSummary, Patient};
pub use app::App;
pub use config::Settings;
pub use data::{
    evaluate, AlertEvent, MemoryBackend, Metric, MetricRange, RingBuffer, VitalSample,
    VitalsMessage, VitalsStore,
};
pub use relay::{AlertSink, NotifyRelay};
pub use source::{ChannelSource, SampleSource, SimulatorConfig, SimulatorHandle};
pub use subscribe::{LinkState, SubscriptionHandle, VitalsLink};
