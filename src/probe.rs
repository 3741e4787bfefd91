use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::ProbeResult;

/// Issues a single bounded HTTP GET against the monitored endpoint.
pub struct Prober {
    client: reqwest::Client,
    url: String,
}

impl Prober {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create probe HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// One probe attempt. Transport errors and non-2xx responses are both
    /// failures; neither blocks past the configured timeout.
    pub async fn probe(&self) -> ProbeResult {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    ProbeResult::ok(status.as_u16())
                } else {
                    ProbeResult::bad_status(status.as_u16())
                }
            }
            Err(e) => ProbeResult::transport_error(e.to_string()),
        }
    }
}

/// Bounded retry with a fixed inter-attempt delay.
///
/// Runs `probe` up to `attempts` times and returns true on the first
/// success. The delay is fixed, not exponential; one call blocks for at
/// most `attempts * (timeout + retry_delay)`.
pub async fn check_with_retries<F, Fut>(attempts: u32, retry_delay: Duration, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult>,
{
    for attempt in 1..=attempts.max(1) {
        info!("Health check attempt {}/{}", attempt, attempts.max(1));

        let result = probe().await;
        if result.success {
            return true;
        }

        match (result.http_status, result.error_detail) {
            (Some(status), _) => warn!("Service returned status code {}", status),
            (None, Some(detail)) => warn!("Request failed: {}", detail),
            (None, None) => warn!("Request failed"),
        }

        if attempt < attempts {
            warn!("Retrying in {}s...", retry_delay.as_secs());
            tokio::time::sleep(retry_delay).await;
        }
    }

    false
}
