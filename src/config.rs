//! Settings loading.
//!
//! Settings come from three layers, later ones winning: an optional TOML
//! file, `ESANTE_*` environment variables, and CLI flags (applied by the
//! binary after loading).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_BROKER_URL: &str = "mqtt://localhost:1883";

/// Resolved application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// MQTT broker URL.
    pub broker_url: String,
    /// Backend REST base URL, e.g. `http://localhost:8084`.
    pub api_url: Option<String>,
    /// Notification relay base URL. Absent means alerts are recorded
    /// locally only.
    pub relay_url: Option<String>,
    /// Bearer token for backend requests.
    pub token: Option<String>,
    /// Initial patient id, used when the patient directory is unavailable.
    pub patient: Option<String>,
    /// Per-patient sample history cap.
    pub sample_cap: usize,
    /// Per-patient alert buffer cap.
    pub alert_cap: usize,
    /// Directory for persisted local state. Absent means in-memory only.
    pub data_dir: Option<PathBuf>,
    /// Window for dashboard summary requests, in minutes.
    pub summary_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            api_url: None,
            relay_url: None,
            token: None,
            patient: None,
            sample_cap: 600,
            alert_cap: 200,
            data_dir: None,
            summary_minutes: 60,
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus the environment.
    ///
    /// With an explicit `config_path` the file must exist; without one,
    /// `esante.toml` in the working directory is read if present.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        builder = match config_path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("esante").required(false)),
        };
        let config = builder
            .add_source(Environment::with_prefix("ESANTE"))
            .build()
            .context("failed to load configuration")?;
        config
            .try_deserialize()
            .context("invalid configuration values")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.broker_url, DEFAULT_BROKER_URL);
        assert_eq!(settings.sample_cap, 600);
        assert_eq!(settings.alert_cap, 200);
        assert_eq!(settings.summary_minutes, 60);
        assert!(settings.api_url.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("esante.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "broker_url = \"mqtt://broker:1883\"").unwrap();
        writeln!(file, "sample_cap = 100").unwrap();
        writeln!(file, "api_url = \"http://localhost:8084\"").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.broker_url, "mqtt://broker:1883");
        assert_eq!(settings.sample_cap, 100);
        assert_eq!(settings.api_url.as_deref(), Some("http://localhost:8084"));
        // Untouched keys keep their defaults
        assert_eq!(settings.alert_cap, 200);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
