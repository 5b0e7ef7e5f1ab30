//! Broker connection and per-patient subscription management.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::data::{now_ms, VitalSample, VitalsMessage};

/// Fixed backoff between reconnection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Channel end that receives `(patient_id, merged sample)` pairs.
pub type SampleSender = mpsc::Sender<(String, VitalSample)>;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl LinkState {
    pub fn label(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "offline",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "live",
            LinkState::Reconnecting => "reconnecting",
        }
    }
}

/// One active topic binding for one patient.
///
/// Carries the last-known-value memory: each inbound message updates one
/// metric, and the merged sample combining it with every previously seen
/// metric is what gets emitted. The memory resets on rebind.
#[derive(Debug)]
struct Binding {
    patient_id: String,
    /// Topic filter used for (un)subscribing.
    filter: String,
    /// Concrete-topic prefix incoming publishes must match.
    prefix: String,
    merged: VitalSample,
    tx: SampleSender,
    active: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct Shared {
    state: LinkState,
    binding: Option<Binding>,
    /// Set by `disconnect()`; suppresses reconnection.
    explicit_disconnect: bool,
}

/// Owns the MQTT connection lifecycle and the single active patient
/// subscription.
#[derive(Debug)]
pub struct VitalsLink {
    shared: Arc<Mutex<Shared>>,
    client: Option<AsyncClient>,
    task: Option<JoinHandle<()>>,
}

impl Default for VitalsLink {
    fn default() -> Self {
        Self::new()
    }
}

impl VitalsLink {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            client: None,
            task: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.shared.lock().unwrap().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Establish the broker connection, or reuse it if one is already up.
    ///
    /// Spawns the event-loop task: it decodes publishes for the active
    /// binding and retries with a fixed backoff after link loss, until an
    /// explicit `disconnect()`.
    pub fn connect(&mut self, url: &str) -> Result<()> {
        if self.client.is_some() && self.state() != LinkState::Disconnected {
            return Ok(());
        }

        let (host, port) = parse_broker_url(url)?;
        let client_id = format!("esante-tui-{:08x}", rand::random::<u32>());
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(5));
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, 16);

        {
            let mut shared = self.shared.lock().unwrap();
            shared.explicit_disconnect = false;
            shared.state = LinkState::Connecting;
        }

        let shared = self.shared.clone();
        let task_client = client.clone();
        let task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        let filter = {
                            let mut guard = shared.lock().unwrap();
                            guard.state = LinkState::Connected;
                            guard.binding.as_ref().map(|b| b.filter.clone())
                        };
                        info!("broker connection established");
                        // Re-establish the active subscription after a
                        // (re)handshake; clean sessions drop it server-side.
                        if let Some(filter) = filter {
                            if let Err(e) = task_client.try_subscribe(&filter, QoS::AtMostOnce) {
                                warn!(error = %e, "resubscribe failed");
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        route_publish(&shared, &publish.topic, &publish.payload, now_ms());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let stop = {
                            let mut guard = shared.lock().unwrap();
                            if guard.explicit_disconnect {
                                guard.state = LinkState::Disconnected;
                                true
                            } else {
                                if guard.state == LinkState::Connected {
                                    guard.state = LinkState::Reconnecting;
                                }
                                false
                            }
                        };
                        if stop {
                            break;
                        }
                        warn!(error = %e, "broker link lost, retrying");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
            debug!("mqtt event loop stopped");
        });

        self.client = Some(client);
        self.task = Some(task);
        Ok(())
    }

    /// Tear the connection down. Idempotent: safe to call when not
    /// connected. No reconnection attempts occur afterwards.
    pub fn disconnect(&mut self) {
        {
            let mut shared = self.shared.lock().unwrap();
            shared.explicit_disconnect = true;
            shared.state = LinkState::Disconnected;
            if let Some(binding) = shared.binding.take() {
                binding.active.store(false, Ordering::SeqCst);
            }
        }
        if let Some(client) = self.client.take() {
            let _ = client.try_disconnect();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Subscribe to all measurement sub-topics for one patient.
    ///
    /// At most one binding is active per link: a new subscription replaces
    /// and deactivates the previous one, so no orphaned listener can fire
    /// after a rebind. The merged-sample memory starts empty.
    pub fn subscribe_patient_vitals(
        &mut self,
        patient_id: &str,
        tx: SampleSender,
    ) -> SubscriptionHandle {
        let filter = format!("esante/patient/{}/vitals/+", patient_id);
        let prefix = format!("esante/patient/{}/vitals/", patient_id);
        let active = Arc::new(AtomicBool::new(true));

        let previous = {
            let mut shared = self.shared.lock().unwrap();
            let previous = shared.binding.take();
            shared.binding = Some(Binding {
                patient_id: patient_id.to_string(),
                filter: filter.clone(),
                prefix,
                merged: VitalSample::default(),
                tx,
                active: active.clone(),
            });
            previous
        };

        if let Some(old) = previous {
            old.active.store(false, Ordering::SeqCst);
            if let Some(client) = &self.client {
                let _ = client.try_unsubscribe(&old.filter);
            }
        }

        if let Some(client) = &self.client {
            if let Err(e) = client.try_subscribe(&filter, QoS::AtMostOnce) {
                warn!(error = %e, "subscribe request failed");
            }
        }

        SubscriptionHandle {
            shared: self.shared.clone(),
            client: self.client.clone(),
            filter,
            active,
        }
    }
}

impl Drop for VitalsLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Live binding between a patient and their vitals topic, revocable via
/// [`SubscriptionHandle::unsubscribe`].
#[derive(Debug)]
pub struct SubscriptionHandle {
    shared: Arc<Mutex<Shared>>,
    client: Option<AsyncClient>,
    filter: String,
    active: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    /// True until `unsubscribe()` is called or the binding is replaced.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Remove exactly the listener and subscription this handle created.
    pub fn unsubscribe(self) {
        self.active.store(false, Ordering::SeqCst);
        {
            let mut shared = self.shared.lock().unwrap();
            let owns_binding = shared
                .binding
                .as_ref()
                .is_some_and(|b| Arc::ptr_eq(&b.active, &self.active));
            if owns_binding {
                shared.binding = None;
            }
        }
        if let Some(client) = &self.client {
            let _ = client.try_unsubscribe(&self.filter);
        }
    }
}

/// Decode one inbound publish and deliver the merged sample.
///
/// Anything that does not decode is dropped without signal: lost telemetry
/// samples are expected on noisy links. An empty merged sample (possible
/// only if decoding produced no fields) is never emitted.
fn route_publish(shared: &Mutex<Shared>, topic: &str, payload: &[u8], arrival_ms: i64) {
    let mut guard = shared.lock().unwrap();
    let Some(binding) = guard.binding.as_mut() else {
        return;
    };
    if !binding.active.load(Ordering::SeqCst) || !topic.starts_with(&binding.prefix) {
        return;
    }
    let Some(message) = VitalsMessage::decode(payload) else {
        debug!(topic, "dropped undecodable payload");
        return;
    };
    binding.merged.apply(&message);
    binding.merged.timestamp_ms = arrival_ms;
    if binding.merged.is_empty() {
        return;
    }
    let sample = binding.merged.clone();
    let patient_id = binding.patient_id.clone();
    if binding.tx.try_send((patient_id, sample)).is_err() {
        debug!("sample channel full or closed, dropping sample");
    }
}

/// Parse `mqtt://host:port` (also `tcp://` or bare `host:port`).
fn parse_broker_url(url: &str) -> Result<(String, u16)> {
    let rest = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);
    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>()?),
        None => (rest, 1883),
    };
    if host.is_empty() {
        bail!("broker url has no host: {url}");
    }
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_with_binding(patient_id: &str, tx: SampleSender) -> (Arc<Mutex<Shared>>, Arc<AtomicBool>) {
        let active = Arc::new(AtomicBool::new(true));
        let shared = Arc::new(Mutex::new(Shared {
            state: LinkState::Connected,
            binding: Some(Binding {
                patient_id: patient_id.to_string(),
                filter: format!("esante/patient/{}/vitals/+", patient_id),
                prefix: format!("esante/patient/{}/vitals/", patient_id),
                merged: VitalSample::default(),
                tx,
                active: active.clone(),
            }),
            explicit_disconnect: false,
        }));
        (shared, active)
    }

    #[test]
    fn test_parse_broker_url() {
        assert_eq!(
            parse_broker_url("mqtt://broker:1883").unwrap(),
            ("broker".to_string(), 1883)
        );
        assert_eq!(
            parse_broker_url("tcp://10.0.0.1:8883").unwrap(),
            ("10.0.0.1".to_string(), 8883)
        );
        assert_eq!(
            parse_broker_url("localhost").unwrap(),
            ("localhost".to_string(), 1883)
        );
        assert!(parse_broker_url("mqtt://:1883").is_err());
        assert!(parse_broker_url("mqtt://host:notaport").is_err());
    }

    #[test]
    fn test_route_merges_metrics_across_messages() {
        let (tx, mut rx) = mpsc::channel(8);
        let (shared, _active) = shared_with_binding("1", tx);

        route_publish(
            &shared,
            "esante/patient/1/vitals/heart-rate",
            br#"{"measurementType":"HEART_RATE","value":72}"#,
            100,
        );
        route_publish(
            &shared,
            "esante/patient/1/vitals/blood-pressure",
            br#"{"measurementType":"BLOOD_PRESSURE","value":130,"value2":85}"#,
            200,
        );

        let (pid, first) = rx.try_recv().unwrap();
        assert_eq!(pid, "1");
        assert_eq!(first.heart_rate, Some(72.0));
        assert!(first.bp_sys.is_none());

        let (_, second) = rx.try_recv().unwrap();
        assert_eq!(second.heart_rate, Some(72.0));
        assert_eq!(second.bp_sys, Some(130.0));
        assert_eq!(second.bp_dia, Some(85.0));
        assert_eq!(second.timestamp_ms, 200);
    }

    #[test]
    fn test_route_drops_malformed_payloads_silently() {
        let (tx, mut rx) = mpsc::channel(8);
        let (shared, _active) = shared_with_binding("1", tx);

        route_publish(&shared, "esante/patient/1/vitals/heart-rate", b"garbage", 1);
        route_publish(
            &shared,
            "esante/patient/1/vitals/x",
            br#"{"measurementType":"UNKNOWN","value":1}"#,
            2,
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_route_ignores_other_patients_topics() {
        let (tx, mut rx) = mpsc::channel(8);
        let (shared, _active) = shared_with_binding("1", tx);

        route_publish(
            &shared,
            "esante/patient/2/vitals/heart-rate",
            br#"{"measurementType":"HEART_RATE","value":72}"#,
            1,
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_deactivated_binding_never_delivers() {
        let (tx, mut rx) = mpsc::channel(8);
        let (shared, active) = shared_with_binding("1", tx);

        active.store(false, Ordering::SeqCst);
        route_publish(
            &shared,
            "esante/patient/1/vitals/heart-rate",
            br#"{"measurementType":"HEART_RATE","value":72}"#,
            1,
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rebind_deactivates_previous_handle_first() {
        let mut link = VitalsLink::new();
        let (tx, mut rx) = mpsc::channel(8);

        let first = link.subscribe_patient_vitals("1", tx.clone());
        assert!(first.is_active());

        let second = link.subscribe_patient_vitals("2", tx);
        assert!(!first.is_active());
        assert!(second.is_active());

        // Traffic for the old patient is not delivered
        route_publish(
            &link.shared,
            "esante/patient/1/vitals/heart-rate",
            br#"{"measurementType":"HEART_RATE","value":72}"#,
            1,
        );
        assert!(rx.try_recv().is_err());

        // The new binding starts with fresh merged-sample memory
        route_publish(
            &link.shared,
            "esante/patient/2/vitals/spo2",
            br#"{"measurementType":"SPO2","value":97}"#,
            2,
        );
        let (pid, sample) = rx.try_recv().unwrap();
        assert_eq!(pid, "2");
        assert_eq!(sample.spo2, Some(97.0));
        assert!(sample.heart_rate.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_then_deliver_does_not_invoke_callback() {
        let mut link = VitalsLink::new();
        let (tx, mut rx) = mpsc::channel(8);

        let handle = link.subscribe_patient_vitals("1", tx);
        handle.unsubscribe();

        route_publish(
            &link.shared,
            "esante/patient/1/vitals/heart-rate",
            br#"{"measurementType":"HEART_RATE","value":72}"#,
            1,
        );
        assert!(rx.try_recv().is_err());
        assert!(link.shared.lock().unwrap().binding.is_none());
    }

    #[tokio::test]
    async fn test_stale_handle_unsubscribe_leaves_new_binding_alone() {
        let mut link = VitalsLink::new();
        let (tx, mut rx) = mpsc::channel(8);

        let first = link.subscribe_patient_vitals("1", tx.clone());
        let _second = link.subscribe_patient_vitals("2", tx);

        // Unsubscribing the replaced handle must not tear down patient 2
        first.unsubscribe();
        route_publish(
            &link.shared,
            "esante/patient/2/vitals/spo2",
            br#"{"measurementType":"SPO2","value":97}"#,
            1,
        );
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut link = VitalsLink::new();
        assert_eq!(link.state(), LinkState::Disconnected);
        link.disconnect();
        link.disconnect();
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_enters_connecting_and_disconnect_is_terminal() {
        let mut link = VitalsLink::new();
        // Port 1 refuses connections; state still reflects the attempt
        link.connect("mqtt://127.0.0.1:1").unwrap();
        assert_ne!(link.state(), LinkState::Disconnected);
        link.disconnect();
        assert_eq!(link.state(), LinkState::Disconnected);
    }
}
