use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::models::{NotificationKind, TransitionEvent};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts status-change cards to a chat webhook.
///
/// Delivery is fire-and-forget: a failed POST is logged as a warning and
/// dropped, never surfaced to the check loop.
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: String,
    channel: Option<String>,
    service_url: String,
}

impl Notifier {
    pub fn new(webhook_url: &str, channel: Option<&str>, service_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .context("Failed to create webhook HTTP client")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
            channel: channel.map(str::to_string),
            service_url: service_url.to_string(),
        })
    }

    pub async fn notify_transition(&self, event: &TransitionEvent) {
        let (status, text, color) = match event.kind {
            NotificationKind::Recovery => (
                "UP",
                "Service has recovered and is now responding normally",
                "good",
            ),
            NotificationKind::Failure => (
                "DOWN",
                "Service is not responding and appears to be down",
                "danger",
            ),
        };

        let payload = self.card(color, "Service Monitor Alert", text, status);
        self.post(payload).await;
    }

    /// Deployment-status card, posted by the `notify-deploy` command.
    pub async fn notify_deploy(&self, succeeded: bool) {
        let (status, color) = if succeeded {
            ("SUCCESS", "#36a64f")
        } else {
            ("FAILURE", "#ff0000")
        };

        let payload = self.card(
            color,
            "Deploy Notification",
            &format!("Deployment status: *{}*", status),
            status,
        );
        self.post(payload).await;
    }

    fn card(&self, color: &str, title: &str, text: &str, status: &str) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "attachments": [{
                "color": color,
                "title": title,
                "text": text,
                "fields": [
                    { "title": "Service URL", "value": self.service_url, "short": true },
                    { "title": "Status", "value": status, "short": true },
                    {
                        "title": "Timestamp",
                        "value": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                        "short": true
                    },
                ]
            }]
        });

        if let Some(channel) = &self.channel {
            payload["channel"] = serde_json::Value::String(channel.clone());
        }

        payload
    }

    async fn post(&self, payload: serde_json::Value) {
        match self.client.post(&self.webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Notification delivered");
            }
            Ok(response) => {
                warn!(
                    "Failed to send notification: webhook returned {}",
                    response.status()
                );
            }
            Err(e) => {
                warn!("Failed to send notification: {}", e);
            }
        }
    }
}
