//! REST client for the monitoring backend.
//!
//! Covers the endpoints the dashboard consumes: the patient directory, the
//! per-patient dashboard summary, user lookup, and report generation. A
//! bearer token is attached when present; a 401 maps to
//! [`ApiError::Unauthorized`], which callers treat as session invalidation
//! (drop the token, surface a status message) rather than an inline error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from backend requests.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed or returned a non-2xx status.
    #[error("request failed: {0}")]
    Http(String),

    /// Failed to parse a response body.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The session token was rejected.
    #[error("session expired")]
    Unauthorized,

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for a response.
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Connection(err.to_string())
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}

/// A patient record as returned by `GET /api/patients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    #[serde(default)]
    pub prenom: String,
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dossier: Option<String>,
}

impl Patient {
    /// "First Last (email)" display form used by patient selectors.
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.prenom, self.nom, self.email)
    }
}

/// A user account as returned by `GET /api/users?role=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    #[serde(default)]
    pub prenom: String,
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// One point of a summary time series.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeriesPoint {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub value: f64,
}

/// Latest reading of one metric in the summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastValue {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub time: Option<String>,
}

/// A server-side alert row included in the summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteAlert {
    #[serde(default, rename = "typeAlerte", alias = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "dateCreation")]
    pub created: Option<String>,
}

/// Aggregated dashboard data for one patient, as returned by
/// `GET /api/dashboard/patient/{id}/summary?minutes=N`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardSummary {
    #[serde(default, rename = "seriesHeartRate")]
    pub series_heart_rate: Vec<SeriesPoint>,
    #[serde(default, rename = "seriesSpO2")]
    pub series_spo2: Vec<SeriesPoint>,
    #[serde(default, rename = "seriesBloodPressureSys")]
    pub series_bp_sys: Vec<SeriesPoint>,
    #[serde(default, rename = "seriesBloodPressureDia")]
    pub series_bp_dia: Vec<SeriesPoint>,
    #[serde(default, rename = "seriesGlucose")]
    pub series_glucose: Vec<SeriesPoint>,
    #[serde(default, rename = "seriesWeight")]
    pub series_weight: Vec<SeriesPoint>,
    #[serde(default, rename = "heartRate")]
    pub heart_rate: Option<LastValue>,
    #[serde(default)]
    pub spo2: Option<LastValue>,
    #[serde(default, rename = "bpSystolic")]
    pub bp_systolic: Option<LastValue>,
    #[serde(default, rename = "bpDiastolic")]
    pub bp_diastolic: Option<LastValue>,
    #[serde(default)]
    pub glucose: Option<LastValue>,
    #[serde(default)]
    pub weight: Option<LastValue>,
    #[serde(default)]
    pub steps: Option<LastValue>,
    #[serde(default, rename = "recentAlerts")]
    pub recent_alerts: Vec<RemoteAlert>,
}

/// Reference to a generated report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportInfo {
    pub id: i64,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Backend REST client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Drop the session token after a 401.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.post(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(ApiError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }
        Ok(response)
    }

    /// Fetch the patient directory.
    pub async fn patients(&self) -> Result<Vec<Patient>, ApiError> {
        let response = Self::check(self.get("/api/patients").send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Fetch user accounts filtered by role.
    pub async fn users(&self, role: &str) -> Result<Vec<UserAccount>, ApiError> {
        let path = format!("/api/users?role={}", urlencoded(role));
        let response = Self::check(self.get(&path).send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Fetch the aggregated dashboard summary for a patient over the last
    /// `minutes` minutes.
    pub async fn patient_summary(
        &self,
        patient_id: &str,
        minutes: u32,
    ) -> Result<DashboardSummary, ApiError> {
        let path = format!(
            "/api/dashboard/patient/{}/summary?minutes={}",
            urlencoded(patient_id),
            minutes
        );
        let response = Self::check(self.get(&path).send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Ask the report service to generate a custom report for a patient.
    pub async fn generate_report(
        &self,
        patient_id: &str,
        minutes: u32,
    ) -> Result<ReportInfo, ApiError> {
        let path = format!(
            "/api/reports/generate/custom?patientId={}&minutes={}",
            urlencoded(patient_id),
            minutes
        );
        let response = Self::check(self.post(&path).send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Fetch a generated report as base64 text (PDF content produced by the
    /// external report service).
    pub async fn report_base64(&self, report_id: i64) -> Result<String, ApiError> {
        let path = format!("/api/reports/{}/base64", report_id);
        let response = Self::check(self.get(&path).send().await?).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Minimal percent-encoding for path/query components.
fn urlencoded(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8084/");
        assert_eq!(client.base_url(), "http://localhost:8084");
    }

    #[test]
    fn test_urlencoded() {
        assert_eq!(urlencoded("42"), "42");
        assert_eq!(urlencoded("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn test_patient_display_name() {
        let p = Patient {
            id: 1,
            prenom: "Ada".to_string(),
            nom: "Lovelace".to_string(),
            email: "ada@example.org".to_string(),
            dossier: None,
        };
        assert_eq!(p.display_name(), "Ada Lovelace (ada@example.org)");
    }

    #[test]
    fn test_summary_deserializes_wire_names() {
        let json = r#"{
            "seriesHeartRate": [{"time": "10:00:00", "value": 72.0}],
            "seriesSpO2": [{"value": 97.1}],
            "heartRate": {"value": 72.0, "time": "10:00:00"},
            "recentAlerts": [{"typeAlerte": "WARNING", "message": "SpO2 88%"}]
        }"#;
        let summary: DashboardSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.series_heart_rate.len(), 1);
        assert_eq!(summary.series_spo2[0].value, 97.1);
        assert_eq!(summary.heart_rate.unwrap().value, Some(72.0));
        assert_eq!(summary.recent_alerts[0].kind.as_deref(), Some("WARNING"));
        assert!(summary.series_glucose.is_empty());
    }

    #[test]
    fn test_summary_tolerates_empty_object() {
        let summary: DashboardSummary = serde_json::from_str("{}").unwrap();
        assert!(summary.series_heart_rate.is_empty());
        assert!(summary.steps.is_none());
    }
}
