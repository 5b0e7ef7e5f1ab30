//! Per-patient local state with an injected storage backend.
//!
//! Mirrors the browser-origin persisted keys: `patients`, `samples:{id}`
//! and `alerts:{id}`, each a JSON-encoded array capped at the ring-buffer
//! sizes. The backend is explicit - in-memory for tests, a JSON-file
//! adapter for production - so there is no ambient global state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::alerts::AlertEvent;
use super::ring::RingBuffer;
use super::sample::VitalSample;
use crate::api::Patient;

/// Default per-patient sample history capacity.
pub const DEFAULT_SAMPLE_CAP: usize = 600;
/// Default per-patient alert buffer capacity.
pub const DEFAULT_ALERT_CAP: usize = 200;

/// Key/value persistence for JSON-encoded local state.
///
/// Write failures are logged, not propagated: local state is a cache and a
/// failed write must never break the ingestion path.
pub trait StorageBackend: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// File-per-key backend rooted at a data directory.
///
/// Keys are sanitized (`:` becomes `_`) and stored as `<key>.json`.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key.replace(':', "_")))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(error = %e, dir = %self.dir.display(), "cannot create data dir");
            return;
        }
        if let Err(e) = fs::write(self.path_for(key), value) {
            warn!(error = %e, key, "local state write failed");
        }
    }

    fn remove(&mut self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}

/// Per-patient sample and alert history with write-through persistence.
pub struct VitalsStore {
    backend: Box<dyn StorageBackend>,
    samples: HashMap<String, RingBuffer<VitalSample>>,
    alerts: HashMap<String, RingBuffer<AlertEvent>>,
    sample_cap: usize,
    alert_cap: usize,
}

impl VitalsStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self::with_capacities(backend, DEFAULT_SAMPLE_CAP, DEFAULT_ALERT_CAP)
    }

    pub fn with_capacities(
        backend: Box<dyn StorageBackend>,
        sample_cap: usize,
        alert_cap: usize,
    ) -> Self {
        Self {
            backend,
            samples: HashMap::new(),
            alerts: HashMap::new(),
            sample_cap,
            alert_cap,
        }
    }

    fn load_list<T: DeserializeOwned>(backend: &dyn StorageBackend, key: &str) -> Vec<T> {
        backend
            .get(key)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn persist_list<T: Serialize>(backend: &mut dyn StorageBackend, key: &str, items: Vec<&T>) {
        match serde_json::to_string(&items) {
            Ok(json) => backend.set(key, &json),
            Err(e) => warn!(error = %e, key, "local state encode failed"),
        }
    }

    fn sample_buffer(&mut self, patient_id: &str) -> &mut RingBuffer<VitalSample> {
        let key = sample_key(patient_id);
        let cap = self.sample_cap;
        let backend = &*self.backend;
        self.samples.entry(patient_id.to_string()).or_insert_with(|| {
            let mut buf = RingBuffer::new(cap);
            buf.extend(Self::load_list::<VitalSample>(backend, &key));
            buf
        })
    }

    fn alert_buffer(&mut self, patient_id: &str) -> &mut RingBuffer<AlertEvent> {
        let key = alert_key(patient_id);
        let cap = self.alert_cap;
        let backend = &*self.backend;
        self.alerts.entry(patient_id.to_string()).or_insert_with(|| {
            let mut buf = RingBuffer::new(cap);
            buf.extend(Self::load_list::<AlertEvent>(backend, &key));
            buf
        })
    }

    /// Append a sample to the patient's history and persist the buffer.
    pub fn push_sample(&mut self, patient_id: &str, sample: VitalSample) {
        let buf = self.sample_buffer(patient_id);
        buf.push(sample);
        // Owned copy releases the buffer borrow before the backend write
        let items = buf.to_vec();
        Self::persist_list(
            &mut *self.backend,
            &sample_key(patient_id),
            items.iter().collect(),
        );
    }

    /// Sample history in insertion order (oldest first). Timestamps may be
    /// out of order when multiple writers interleave; this is plain append
    /// order, not sorted.
    pub fn samples(&mut self, patient_id: &str) -> Vec<VitalSample> {
        self.sample_buffer(patient_id).to_vec()
    }

    /// The most recent sample, if any.
    pub fn last_sample(&mut self, patient_id: &str) -> Option<VitalSample> {
        self.sample_buffer(patient_id).last().cloned()
    }

    pub fn clear_samples(&mut self, patient_id: &str) {
        if let Some(buf) = self.samples.get_mut(patient_id) {
            buf.clear();
        }
        self.backend.remove(&sample_key(patient_id));
    }

    /// Append an alert to the patient's buffer and persist it.
    pub fn push_alert(&mut self, patient_id: &str, event: AlertEvent) {
        let buf = self.alert_buffer(patient_id);
        buf.push(event);
        let items = buf.to_vec();
        Self::persist_list(
            &mut *self.backend,
            &alert_key(patient_id),
            items.iter().collect(),
        );
    }

    /// Alerts in reverse-chronological order (latest first).
    pub fn recent_alerts(&mut self, patient_id: &str) -> Vec<AlertEvent> {
        let mut list = self.alert_buffer(patient_id).to_vec();
        list.reverse();
        list
    }

    pub fn clear_alerts(&mut self, patient_id: &str) {
        if let Some(buf) = self.alerts.get_mut(patient_id) {
            buf.clear();
        }
        self.backend.remove(&alert_key(patient_id));
    }

    /// Cached patient list from the last successful fetch.
    pub fn cached_patients(&self) -> Vec<Patient> {
        Self::load_list(&*self.backend, "patients")
    }

    pub fn cache_patients(&mut self, patients: &[Patient]) {
        Self::persist_list(&mut *self.backend, "patients", patients.iter().collect());
    }
}

fn sample_key(patient_id: &str) -> String {
    format!("samples:{}", patient_id)
}

fn alert_key(patient_id: &str) -> String {
    format!("alerts:{}", patient_id)
}

impl std::fmt::Debug for VitalsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VitalsStore")
            .field("sample_cap", &self.sample_cap)
            .field("alert_cap", &self.alert_cap)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ranges::Metric;

    fn sample(t: i64, hr: f64) -> VitalSample {
        VitalSample {
            timestamp_ms: t,
            heart_rate: Some(hr),
            ..Default::default()
        }
    }

    fn alert(t: i64) -> AlertEvent {
        AlertEvent {
            timestamp_ms: t,
            metric: Metric::HeartRate,
            value: 130.0,
            message: "Heart rate 130 bpm".to_string(),
        }
    }

    fn memory_store() -> VitalsStore {
        VitalsStore::new(Box::new(MemoryBackend::new()))
    }

    #[test]
    fn test_push_and_read_samples() {
        let mut store = memory_store();
        store.push_sample("1", sample(1, 70.0));
        store.push_sample("1", sample(2, 71.0));
        let list = store.samples("1");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].timestamp_ms, 1);
        assert_eq!(store.last_sample("1").unwrap().timestamp_ms, 2);
    }

    #[test]
    fn test_sample_cap_evicts_oldest() {
        let mut store = VitalsStore::with_capacities(Box::new(MemoryBackend::new()), 3, 2);
        for t in 0..5 {
            store.push_sample("1", sample(t, 70.0));
        }
        let list = store.samples("1");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].timestamp_ms, 2);
    }

    #[test]
    fn test_patients_are_isolated() {
        let mut store = memory_store();
        store.push_sample("1", sample(1, 70.0));
        store.push_sample("2", sample(9, 80.0));
        assert_eq!(store.samples("1").len(), 1);
        assert_eq!(store.samples("2")[0].heart_rate, Some(80.0));
        store.clear_samples("1");
        assert!(store.samples("1").is_empty());
        assert_eq!(store.samples("2").len(), 1);
    }

    #[test]
    fn test_recent_alerts_latest_first() {
        let mut store = memory_store();
        store.push_alert("1", alert(1));
        store.push_alert("1", alert(2));
        store.push_alert("1", alert(3));
        let list = store.recent_alerts("1");
        assert_eq!(list[0].timestamp_ms, 3);
        assert_eq!(list[2].timestamp_ms, 1);
    }

    #[test]
    fn test_clear_alerts_is_total() {
        let mut store = memory_store();
        store.push_alert("1", alert(1));
        store.clear_alerts("1");
        assert!(store.recent_alerts("1").is_empty());
    }

    #[test]
    fn test_write_through_persists_capped_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VitalsStore::with_capacities(Box::new(FileBackend::new(dir.path())), 3, 2);
        for t in 0..5 {
            store.push_sample("1", sample(t, 70.0));
            store.push_alert("1", alert(t));
        }
        // Every push rewrites the backend copy; it matches the capped ring
        let raw = fs::read_to_string(dir.path().join("samples_1.json")).unwrap();
        let persisted: Vec<VitalSample> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.len(), 3);
        assert_eq!(persisted[0].timestamp_ms, 2);
        let raw = fs::read_to_string(dir.path().join("alerts_1.json")).unwrap();
        let persisted: Vec<AlertEvent> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].timestamp_ms, 3);
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = VitalsStore::new(Box::new(FileBackend::new(dir.path())));
            store.push_sample("7", sample(42, 72.5));
            store.push_alert("7", alert(42));
        }
        // A fresh store over the same directory sees the persisted state
        let mut store = VitalsStore::new(Box::new(FileBackend::new(dir.path())));
        let list = store.samples("7");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].heart_rate, Some(72.5));
        assert_eq!(store.recent_alerts("7").len(), 1);
        // Keys are sanitized for the filesystem
        assert!(dir.path().join("samples_7.json").exists());
    }

    #[test]
    fn test_file_backend_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VitalsStore::new(Box::new(FileBackend::new(dir.path())));
        store.push_sample("7", sample(1, 70.0));
        assert!(dir.path().join("samples_7.json").exists());
        store.clear_samples("7");
        assert!(!dir.path().join("samples_7.json").exists());
    }

    #[test]
    fn test_corrupt_persisted_state_is_ignored() {
        let mut backend = MemoryBackend::new();
        backend.set("samples:1", "not json");
        let mut store = VitalsStore::new(Box::new(backend));
        assert!(store.samples("1").is_empty());
    }

    #[test]
    fn test_patient_cache_round_trip() {
        let mut store = memory_store();
        let patients = vec![Patient {
            id: 1,
            prenom: "Ada".to_string(),
            nom: "Lovelace".to_string(),
            email: "ada@example.org".to_string(),
            dossier: None,
        }];
        store.cache_patients(&patients);
        let back = store.cached_patients();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].prenom, "Ada");
    }
}
