//! Terminal rendering.
//!
//! Views are plain functions over `(Frame, App, Rect)`; shared chrome
//! (header, tabs, status bar, help) lives in [`common`], the chart widget in
//! [`chart`].

pub mod alerts;
pub mod chart;
pub mod common;
pub mod theme;
pub mod vitals;

pub use chart::{compute_range, Series, VitalsChart};
pub use theme::Theme;
