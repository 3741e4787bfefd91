use anyhow::Result;
use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::models::TransitionEvent;
use crate::notify::Notifier;
use crate::probe::{check_with_retries, Prober};
use crate::shutdown::Shutdown;
use crate::tracker::StatusTracker;

/// Owns the check loop: probe with retries, feed the tracker, dispatch
/// notifications on transitions, wait out the interval.
pub struct Monitor {
    config: MonitorConfig,
    prober: Prober,
    notifier: Option<Notifier>,
    tracker: StatusTracker,
    shutdown: Shutdown,
}

impl Monitor {
    pub fn new(config: MonitorConfig, shutdown: Shutdown) -> Result<Self> {
        let prober = Prober::new(&config.service_url, config.probe_timeout)?;

        let notifier = match &config.webhook_url {
            Some(webhook_url) if config.notify => Some(Notifier::new(
                webhook_url,
                config.channel.as_deref(),
                &config.service_url,
            )?),
            _ => None,
        };

        Ok(Self {
            config,
            prober,
            notifier,
            tracker: StatusTracker::new(),
            shutdown,
        })
    }

    /// Run until shutdown is requested, or for exactly one cycle in
    /// check-once mode. Nothing inside a cycle is fatal: probe failures
    /// drive the state machine and notification failures are swallowed by
    /// the notifier, so only the shutdown flag ends the loop.
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting monitoring of {}", self.config.service_url);
        info!(
            "Check interval: {}s, Timeout: {}s, Retries: {}, Notifications: {}",
            self.config.check_interval.as_secs(),
            self.config.probe_timeout.as_secs(),
            self.config.retries,
            if self.notifier.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );

        loop {
            self.run_cycle().await;

            if self.config.check_once {
                break;
            }

            // Interruptible interval wait: a termination signal ends the
            // loop within one poll, not one interval.
            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval) => {}
                _ = self.shutdown.wait() => break,
            }
        }

        info!("Monitoring stopped");
        Ok(())
    }

    /// One check cycle: retry-wrapped probe, tracker update, notification
    /// dispatch, status log line.
    async fn run_cycle(&mut self) {
        let prober = &self.prober;
        let up = check_with_retries(self.config.retries, self.config.retry_delay, || {
            prober.probe()
        })
        .await;

        if up {
            info!("Service is responding normally");
        } else {
            error!("Service is not responding");
        }

        if let Some(event) = self.tracker.update(up) {
            self.dispatch(&event).await;
        }

        info!(
            "Status: {}, Consecutive successes: {}, Consecutive failures: {}",
            self.tracker.current(),
            self.tracker.consecutive_successes(),
            self.tracker.consecutive_failures()
        );
    }

    async fn dispatch(&self, event: &TransitionEvent) {
        if let Some(notifier) = &self.notifier {
            notifier.notify_transition(event).await;
        }
    }

    #[cfg(test)]
    fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceState;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(service_url: String, webhook_url: Option<String>, retries: u32) -> MonitorConfig {
        MonitorConfig {
            service_url,
            check_interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(2),
            retries,
            retry_delay: Duration::from_millis(0),
            webhook_url: webhook_url.clone(),
            channel: None,
            check_once: false,
            notify: webhook_url.is_some(),
        }
    }

    async fn webhook_expecting(calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(calls)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn steady_up_sends_no_notifications() {
        let service = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/greeting"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&service)
            .await;
        let webhook = webhook_expecting(0).await;

        let config = test_config(
            format!("{}/greeting", service.uri()),
            Some(webhook.uri()),
            1,
        );
        let mut monitor = Monitor::new(config, Shutdown::new()).unwrap();

        for _ in 0..3 {
            monitor.run_cycle().await;
        }

        assert_eq!(monitor.tracker().current(), ServiceState::Up);
        assert_eq!(monitor.tracker().consecutive_successes(), 3);
    }

    #[tokio::test]
    async fn blip_within_retry_budget_is_not_a_transition() {
        let service = MockServer::start().await;
        // First attempt sees a 500, the retry sees a 200.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&service)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&service)
            .await;
        let webhook = webhook_expecting(0).await;

        let config = test_config(service.uri(), Some(webhook.uri()), 2);
        let mut monitor = Monitor::new(config, Shutdown::new()).unwrap();

        monitor.run_cycle().await;

        assert_eq!(monitor.tracker().current(), ServiceState::Up);
        assert_eq!(monitor.tracker().consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn sustained_outage_notifies_exactly_once() {
        let service = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&service)
            .await;
        let webhook = webhook_expecting(1).await;

        let config = test_config(service.uri(), Some(webhook.uri()), 1);
        let mut monitor = Monitor::new(config, Shutdown::new()).unwrap();

        monitor.run_cycle().await;
        monitor.run_cycle().await;
        monitor.run_cycle().await;

        assert_eq!(monitor.tracker().current(), ServiceState::Down);
        assert_eq!(monitor.tracker().consecutive_failures(), 3);
    }

    #[tokio::test]
    async fn outage_and_recovery_notify_once_each() {
        let service = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&service)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&service)
            .await;
        let webhook = webhook_expecting(2).await;

        let config = test_config(service.uri(), Some(webhook.uri()), 1);
        let mut monitor = Monitor::new(config, Shutdown::new()).unwrap();

        monitor.run_cycle().await; // 500 -> Down, Failure notification
        monitor.run_cycle().await; // 200 -> Up, Recovery notification

        assert_eq!(monitor.tracker().current(), ServiceState::Up);
        assert_eq!(monitor.tracker().consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn check_once_runs_a_single_cycle_and_returns() {
        let service = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&service)
            .await;

        let mut config = test_config(service.uri(), None, 1);
        config.check_once = true;
        let mut monitor = Monitor::new(config, Shutdown::new()).unwrap();

        monitor.run().await.unwrap();
        assert_eq!(monitor.tracker().current(), ServiceState::Up);
    }

    #[tokio::test]
    async fn shutdown_interrupts_the_interval_wait() {
        let service = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&service)
            .await;

        let shutdown = Shutdown::new();
        let config = test_config(service.uri(), None, 1);
        let mut monitor = Monitor::new(config, shutdown.clone()).unwrap();

        let handle = tokio::spawn(async move { monitor.run().await });
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.request();

        // The 60s interval must not delay the exit.
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("shutdown should end the loop promptly")
            .unwrap()
            .unwrap();
    }
}
