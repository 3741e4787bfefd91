use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::cli::MonitorArgs;

/// Resolved monitor settings, validated once at startup.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub service_url: String,
    pub check_interval: Duration,
    pub probe_timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
    pub check_once: bool,
    pub notify: bool,
}

impl MonitorConfig {
    pub fn from_args(args: &MonitorArgs, check_once: bool) -> Result<Self> {
        let url = reqwest::Url::parse(&args.url)
            .with_context(|| format!("Invalid service URL '{}'", args.url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("Service URL must be http or https, got '{}'", url.scheme());
        }

        if args.interval == 0 {
            bail!("Check interval must be at least 1 second");
        }

        Ok(Self {
            service_url: args.url.clone(),
            check_interval: Duration::from_secs(args.interval),
            probe_timeout: Duration::from_secs(args.timeout),
            retries: args.retries.max(1),
            retry_delay: Duration::from_secs(args.retry_delay),
            webhook_url: args.webhook_url.clone(),
            channel: args.channel.clone(),
            check_once,
            notify: !args.no_notify && args.webhook_url.is_some(),
        })
    }
}
