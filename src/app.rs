//! Application state and navigation logic.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{ApiClient, ApiError, DashboardSummary, Patient};
use crate::config::Settings;
use crate::data::{evaluate, AlertEvent, Metric, VitalSample, VitalsStore};
use crate::relay::AlertSink;
use crate::source::{SampleSource, SimulatorHandle};
use crate::subscribe::{LinkState, SampleSender, SubscriptionHandle, VitalsLink};
use crate::ui::Theme;

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Latest readings and one chart per metric.
    Vitals,
    /// Alert history for the selected patient.
    Alerts,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Vitals => View::Alerts,
            View::Alerts => View::Vitals,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Vitals => "Vitals",
            View::Alerts => "Alerts",
        }
    }
}

/// Results delivered by background REST fetch tasks.
///
/// Summary and report results carry the patient id they were requested for
/// so stale responses can be dropped after a patient switch.
#[derive(Debug)]
enum Fetched {
    Patients(Result<Vec<Patient>, ApiError>),
    Summary {
        patient_id: String,
        result: Result<DashboardSummary, ApiError>,
    },
    Report {
        patient_id: String,
        result: Result<(i64, String), ApiError>,
    },
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub view: View,
    pub show_help: bool,
    pub theme: Theme,

    settings: Settings,

    // Inbound samples
    source: Box<dyn SampleSource>,
    sample_tx: SampleSender,
    pub link: VitalsLink,
    subscription: Option<SubscriptionHandle>,
    simulator: Option<SimulatorHandle>,

    // Per-patient state
    pub store: VitalsStore,
    sink: AlertSink,

    // Backend
    api: Option<ApiClient>,
    fetch_tx: mpsc::Sender<Fetched>,
    fetch_rx: mpsc::Receiver<Fetched>,

    pub patients: Vec<Patient>,
    pub selected_patient: usize,
    pub summary: Option<DashboardSummary>,

    // Alerts view
    pub alert_scroll: usize,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App.
    ///
    /// `sample_tx` is the producer end of the channel behind `source`; it is
    /// handed to the broker link on every (re)subscription.
    pub fn new(
        settings: Settings,
        source: Box<dyn SampleSource>,
        sample_tx: SampleSender,
        store: VitalsStore,
        sink: AlertSink,
        api: Option<ApiClient>,
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::channel(16);
        let patients = store_patients(&store);
        Self {
            running: true,
            view: View::Vitals,
            show_help: false,
            theme: Theme::auto_detect(),
            settings,
            source,
            sample_tx,
            link: VitalsLink::new(),
            subscription: None,
            simulator: None,
            store,
            sink,
            api,
            fetch_tx,
            fetch_rx,
            patients,
            selected_patient: 0,
            summary: None,
            alert_scroll: 0,
            status_message: None,
        }
    }

    /// Attach a running simulator so the spike key has something to poke.
    pub fn set_simulator(&mut self, simulator: SimulatorHandle) {
        self.simulator = Some(simulator);
    }

    /// Returns a description of the current sample source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// The id of the currently selected patient.
    pub fn current_patient_id(&self) -> Option<String> {
        self.patients
            .get(self.selected_patient)
            .map(|p| p.id.to_string())
            .or_else(|| self.settings.patient.clone())
    }

    pub fn current_patient_name(&self) -> Option<String> {
        self.patients
            .get(self.selected_patient)
            .map(Patient::display_name)
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < std::time::Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Drain all pending channel data into the application state.
    ///
    /// Returns true if anything changed and the UI should redraw.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        let current = self.current_patient_id();

        while let Some((patient_id, sample)) = self.source.poll() {
            // Drop samples produced for a previously selected patient
            if current.as_deref() != Some(patient_id.as_str()) {
                debug!(patient_id, "dropping sample for deselected patient");
                continue;
            }
            self.store.push_sample(&patient_id, sample.clone());
            for event in evaluate(&sample) {
                self.sink.record(&mut self.store, &patient_id, event);
            }
            changed = true;
        }

        while let Ok(fetched) = self.fetch_rx.try_recv() {
            self.apply_fetched(fetched, current.as_deref());
            changed = true;
        }
        changed
    }

    fn apply_fetched(&mut self, fetched: Fetched, current: Option<&str>) {
        match fetched {
            Fetched::Patients(Ok(patients)) => {
                self.store.cache_patients(&patients);
                self.patients = patients;
                if self.selected_patient >= self.patients.len() {
                    self.selected_patient = self.patients.len().saturating_sub(1);
                }
                self.set_status_message(format!("{} patients loaded", self.patients.len()));
            }
            Fetched::Patients(Err(e)) => {
                self.handle_api_error(&e);
                // Fall back to the cached directory
                let cached = store_patients(&self.store);
                if !cached.is_empty() && self.patients.is_empty() {
                    self.patients = cached;
                    self.set_status_message(format!(
                        "patient list unavailable ({e}), using cached copy"
                    ));
                } else {
                    self.set_status_message(format!("patient list unavailable: {e}"));
                }
            }
            Fetched::Summary { patient_id, result } => {
                if current != Some(patient_id.as_str()) {
                    debug!(patient_id, "dropping summary for deselected patient");
                    return;
                }
                match result {
                    Ok(summary) => self.summary = Some(summary),
                    Err(e) => {
                        self.handle_api_error(&e);
                        self.summary = None;
                        self.set_status_message(format!("summary unavailable ({e}), using local history"));
                    }
                }
            }
            Fetched::Report { patient_id, result } => match result {
                Ok((report_id, base64)) => {
                    let path = self
                        .settings
                        .data_dir
                        .clone()
                        .unwrap_or_else(|| ".".into())
                        .join(format!("report-{report_id}.b64"));
                    match std::fs::write(&path, base64) {
                        Ok(()) => self.set_status_message(format!(
                            "report {} for patient {} saved to {}",
                            report_id,
                            patient_id,
                            path.display()
                        )),
                        Err(e) => self.set_status_message(format!("failed to save report: {e}")),
                    }
                }
                Err(e) => {
                    self.handle_api_error(&e);
                    self.set_status_message(format!("report generation failed: {e}"));
                }
            },
        }
    }

    /// A 401 invalidates the session: drop the token so subsequent requests
    /// go out unauthenticated instead of repeating the rejected one.
    fn handle_api_error(&mut self, error: &ApiError) {
        if matches!(error, ApiError::Unauthorized) {
            if let Some(api) = &mut self.api {
                api.clear_token();
            }
            self.set_status_message("session expired, token dropped".to_string());
        }
    }

    /// Select the next patient in the directory and rebind.
    pub fn select_next_patient(&mut self) {
        if self.patients.len() > 1 {
            self.selected_patient = (self.selected_patient + 1) % self.patients.len();
            self.on_patient_changed();
        }
    }

    /// Select the previous patient in the directory and rebind.
    pub fn select_prev_patient(&mut self) {
        if self.patients.len() > 1 {
            self.selected_patient =
                (self.selected_patient + self.patients.len() - 1) % self.patients.len();
            self.on_patient_changed();
        }
    }

    fn on_patient_changed(&mut self) {
        self.summary = None;
        self.alert_scroll = 0;
        self.resubscribe();
        self.request_summary();
    }

    /// (Re)bind the live subscription to the current patient.
    pub fn resubscribe(&mut self) {
        if let Some(patient_id) = self.current_patient_id() {
            let handle = self
                .link
                .subscribe_patient_vitals(&patient_id, self.sample_tx.clone());
            self.subscription = Some(handle);
        }
    }

    /// Connect to the broker if offline, disconnect if not.
    pub fn toggle_connection(&mut self) {
        if self.link.state() == LinkState::Disconnected {
            match self.link.connect(&self.settings.broker_url) {
                Ok(()) => {
                    self.resubscribe();
                    self.set_status_message(format!(
                        "connecting to {}",
                        self.settings.broker_url
                    ));
                }
                Err(e) => self.set_status_message(format!("connect failed: {e}")),
            }
        } else {
            self.subscription = None;
            self.link.disconnect();
            self.set_status_message("disconnected".to_string());
        }
    }

    /// Ask the backend for the patient directory.
    pub fn refresh_patients(&mut self) {
        let Some(api) = self.api.clone() else {
            self.set_status_message("no backend configured".to_string());
            return;
        };
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = api.patients().await;
            let _ = tx.send(Fetched::Patients(result)).await;
        });
    }

    /// Ask the backend for the dashboard summary of the current patient.
    pub fn request_summary(&mut self) {
        let (Some(api), Some(patient_id)) = (self.api.clone(), self.current_patient_id()) else {
            return;
        };
        let minutes = self.settings.summary_minutes;
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = api.patient_summary(&patient_id, minutes).await;
            let _ = tx.send(Fetched::Summary { patient_id, result }).await;
        });
    }

    /// Generate a report for the current patient and save its base64 body.
    pub fn generate_report(&mut self) {
        let Some(api) = self.api.clone() else {
            self.set_status_message("no backend configured".to_string());
            return;
        };
        let Some(patient_id) = self.current_patient_id() else {
            return;
        };
        let minutes = self.settings.summary_minutes;
        let tx = self.fetch_tx.clone();
        self.set_status_message(format!("generating report for patient {patient_id}"));
        tokio::spawn(async move {
            let result = async {
                let info = api.generate_report(&patient_id, minutes).await?;
                let base64 = api.report_base64(info.id).await?;
                Ok((info.id, base64))
            }
            .await;
            let _ = tx.send(Fetched::Report { patient_id, result }).await;
        });
    }

    /// Drop the current patient's sample history.
    pub fn clear_samples(&mut self) {
        if let Some(patient_id) = self.current_patient_id() {
            self.store.clear_samples(&patient_id);
            self.set_status_message("sample history cleared".to_string());
        }
    }

    /// Acknowledge (clear) the current patient's alerts.
    pub fn ack_alerts(&mut self) {
        if let Some(patient_id) = self.current_patient_id() {
            self.sink.clear(&mut self.store, &patient_id);
            self.alert_scroll = 0;
            self.set_status_message("alerts acknowledged".to_string());
        }
    }

    /// Alerts for the current patient, latest first.
    pub fn recent_alerts(&mut self) -> Vec<AlertEvent> {
        match self.current_patient_id() {
            Some(patient_id) => self.sink.list_recent(&mut self.store, &patient_id),
            None => Vec::new(),
        }
    }

    /// Latest merged sample for the current patient.
    pub fn last_sample(&mut self) -> Option<VitalSample> {
        let patient_id = self.current_patient_id()?;
        self.store.last_sample(&patient_id)
    }

    /// Chart series for one metric: the server summary when present,
    /// otherwise the local sample history.
    pub fn chart_series(&mut self, metric: Metric) -> Vec<f64> {
        if let Some(summary) = &self.summary {
            let series = match metric {
                Metric::HeartRate => Some(&summary.series_heart_rate),
                Metric::SpO2 => Some(&summary.series_spo2),
                Metric::BloodPressureSys => Some(&summary.series_bp_sys),
                Metric::BloodPressureDia => Some(&summary.series_bp_dia),
                Metric::Glucose => Some(&summary.series_glucose),
                Metric::Weight => Some(&summary.series_weight),
                Metric::Temperature | Metric::Steps => None,
            };
            if let Some(series) = series {
                if !series.is_empty() {
                    return series.iter().map(|p| p.value).collect();
                }
            }
        }
        let Some(patient_id) = self.current_patient_id() else {
            return Vec::new();
        };
        self.store
            .samples(&patient_id)
            .iter()
            .filter_map(|s| metric.value_of(s))
            .collect()
    }

    /// Force the simulator (when running) past every threshold next tick.
    pub fn trigger_spike(&mut self) {
        match &self.simulator {
            Some(simulator) => {
                simulator.trigger_spike();
                self.set_status_message("spike queued".to_string());
            }
            None => self.set_status_message("simulator not running".to_string()),
        }
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.view = self.view.next();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    /// Scroll down in the alerts view.
    pub fn scroll_alerts_down(&mut self) {
        let count = self.recent_alerts().len();
        if count > 0 {
            self.alert_scroll = (self.alert_scroll + 1).min(count - 1);
        }
    }

    /// Scroll up in the alerts view.
    pub fn scroll_alerts_up(&mut self) {
        self.alert_scroll = self.alert_scroll.saturating_sub(1);
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }
}

fn store_patients(store: &VitalsStore) -> Vec<Patient> {
    store.cached_patients()
}
