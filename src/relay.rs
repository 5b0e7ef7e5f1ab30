//! Notification relay client and the alert sink.
//!
//! The relay is the external notification service: alerts recorded locally
//! are forwarded to it so other open sessions receive them over its push
//! channel. Forwarding is fire-and-forget - local recording is the source
//! of truth, and a forwarding failure is swallowed (logged through tracing,
//! never visible to the caller).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::ApiError;
use crate::data::{AlertEvent, VitalsStore};

/// Payload for `POST /api/notifications/realtime/send`.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
}

impl From<&AlertEvent> for RealtimeNotification {
    fn from(event: &AlertEvent) -> Self {
        Self {
            kind: "WARNING".to_string(),
            title: format!("{} alert", event.metric.label()),
            message: event.message.clone(),
        }
    }
}

/// Payload for the email endpoints.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_content_type: Option<String>,
}

/// A sent-email record from the history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailRecord {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, rename = "sentAt")]
    pub sent_at: Option<String>,
}

/// HTTP client for the notification relay service.
#[derive(Debug, Clone)]
pub struct NotifyRelay {
    client: reqwest::Client,
    base_url: String,
}

impl NotifyRelay {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if !response.status().is_success() {
            return Err(ApiError::Http(format!(
                "relay returned status {}",
                response.status()
            )));
        }
        Ok(response)
    }

    /// Fire a real-time alert broadcast. The relay pushes it to every
    /// connected session over its push channel.
    pub async fn send_realtime(&self, note: &RealtimeNotification) -> Result<(), ApiError> {
        let url = format!("{}/api/notifications/realtime/send", self.base_url);
        Self::check(self.client.post(url).json(note).send().await?).await?;
        Ok(())
    }

    /// Send a plain-text email notification.
    pub async fn send_email(&self, request: &EmailRequest) -> Result<(), ApiError> {
        let url = format!("{}/api/notifications/email/send", self.base_url);
        Self::check(self.client.post(url).json(request).send().await?).await?;
        Ok(())
    }

    /// Send an HTML email, optionally with a base64 attachment.
    pub async fn send_email_html(&self, request: &EmailRequest) -> Result<(), ApiError> {
        let url = format!("{}/api/notifications/email/send-html", self.base_url);
        Self::check(self.client.post(url).json(request).send().await?).await?;
        Ok(())
    }

    /// Fetch sent-email history for an author.
    pub async fn email_history(
        &self,
        author_email: &str,
        limit: u32,
    ) -> Result<Vec<EmailRecord>, ApiError> {
        let url = format!(
            "{}/api/notifications/email/history?authorEmail={}&limit={}",
            self.base_url, author_email, limit
        );
        let response = Self::check(self.client.get(url).send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Records alert events locally and forwards them to the relay.
#[derive(Debug, Clone)]
pub struct AlertSink {
    relay: Option<NotifyRelay>,
}

impl AlertSink {
    /// A sink without a relay records locally only.
    pub fn new(relay: Option<NotifyRelay>) -> Self {
        Self { relay }
    }

    /// Append the event to the patient's alert buffer, then forward it in a
    /// detached task. The forward result is deliberately not awaited;
    /// failures are logged and swallowed.
    pub fn record(&self, store: &mut VitalsStore, patient_id: &str, event: AlertEvent) {
        store.push_alert(patient_id, event.clone());

        if let Some(relay) = self.relay.clone() {
            let note = RealtimeNotification::from(&event);
            tokio::spawn(async move {
                if let Err(e) = relay.send_realtime(&note).await {
                    warn!(error = %e, "alert forwarding failed");
                }
            });
        }
    }

    /// Buffer contents, latest first.
    pub fn list_recent(&self, store: &mut VitalsStore, patient_id: &str) -> Vec<AlertEvent> {
        store.recent_alerts(patient_id)
    }

    /// Empty the patient's alert buffer.
    pub fn clear(&self, store: &mut VitalsStore, patient_id: &str) {
        store.clear_alerts(patient_id);
    }
}
