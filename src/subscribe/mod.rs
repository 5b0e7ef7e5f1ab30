//! MQTT integration for live vitals ingestion.
//!
//! Gateways publish one measurement per message on per-patient topics; this
//! module owns the broker connection and delivers merged canonical samples
//! to the TUI via a channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Gateway / Simulator                      │
//! │  ┌─────────┐  publish esante/patient/{id}/vitals/{type}         │
//! │  │ Sensors │─────────────────────────┐                          │
//! │  └─────────┘                         ▼                          │
//! │                             ┌────────────────┐                  │
//! │                             │  MQTT broker   │                  │
//! │                             └───────┬────────┘                  │
//! └─────────────────────────────────────┼───────────────────────────┘
//!                                       │ subscribe .../vitals/+
//!                                       ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      esante-monitor Process                     │
//! │  ┌────────────┐ decode + merge ┌───────────────────────────┐   │
//! │  │ VitalsLink │───────────────▶│ mpsc::Sender<VitalSample> │   │
//! │  └────────────┘                └────────────┬──────────────┘   │
//! │                                             ▼                  │
//! │                                ┌───────────────────────────┐   │
//! │                                │ ChannelSource (TUI)       │   │
//! │                                └───────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Connection lifecycle: Disconnected → Connecting on `connect()`,
//! Connecting → Connected on broker acknowledgment, Connected → Reconnecting
//! on link loss (fixed 3 s backoff), and any state → Disconnected on an
//! explicit `disconnect()` - terminal until the next `connect()`.

mod link;

pub use link::{LinkState, SampleSender, SubscriptionHandle, VitalsLink, RECONNECT_DELAY};
