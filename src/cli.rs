use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "svcwatch",
    version,
    about = "Service uptime monitor with debounced webhook alerts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the monitor in the foreground
    Run(RunArgs),
    /// Start the monitor as a background daemon
    Start(StartArgs),
    /// Stop the monitor daemon
    Stop(StopArgs),
    /// Show whether the monitor daemon is running
    Status(StatusArgs),
    /// Restart the monitor daemon
    Restart(StartArgs),
    /// Post a deployment status card to the webhook
    NotifyDeploy(NotifyDeployArgs),
}

/// Settings shared by `run`, `start` and `restart`.
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    /// Service URL to monitor
    #[arg(short, long)]
    pub url: String,

    /// Check interval in seconds
    #[arg(short, long, default_value_t = 30)]
    pub interval: u64,

    /// Per-attempt request timeout in seconds
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Probe attempts per check cycle before the service counts as down
    #[arg(short, long, default_value_t = 3)]
    pub retries: u32,

    /// Delay between probe attempts in seconds
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,

    /// Append-only log file, mirrored to stdout
    #[arg(short, long, default_value = "svcwatch.log")]
    pub log_file: PathBuf,

    /// Webhook URL for status-change notifications
    #[arg(short = 'w', long, env = "SVCWATCH_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Chat channel to post notifications to
    #[arg(short, long)]
    pub channel: Option<String>,

    /// Disable webhook notifications
    #[arg(long)]
    pub no_notify: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub monitor: MonitorArgs,

    /// Perform a single check and exit
    #[arg(long)]
    pub once: bool,

    /// Hold this PID file for the lifetime of the process
    #[arg(long)]
    pub pid_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct StartArgs {
    #[command(flatten)]
    pub monitor: MonitorArgs,

    /// PID file recording the daemon process
    #[arg(long, default_value = "svcwatch.pid")]
    pub pid_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct StopArgs {
    /// PID file recording the daemon process
    #[arg(long, default_value = "svcwatch.pid")]
    pub pid_file: PathBuf,

    /// Seconds to wait for graceful exit before force-killing
    #[arg(long, default_value_t = 5)]
    pub grace: u64,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// PID file recording the daemon process
    #[arg(long, default_value = "svcwatch.pid")]
    pub pid_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct NotifyDeployArgs {
    /// Deployment outcome to report
    #[arg(long, value_enum, default_value_t = DeployStatus::Success)]
    pub status: DeployStatus,

    /// Deployed application URL shown in the card
    #[arg(long)]
    pub app_url: Option<String>,

    /// Webhook URL to post to
    #[arg(short = 'w', long, env = "SVCWATCH_WEBHOOK_URL")]
    pub webhook_url: String,

    /// Chat channel to post to
    #[arg(short, long)]
    pub channel: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStatus {
    Success,
    Failure,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_monitor_flags() {
        let cli = Cli::try_parse_from([
            "svcwatch",
            "run",
            "--url",
            "http://localhost:8080/greeting",
            "--interval",
            "60",
            "--once",
        ])
        .unwrap();

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.monitor.url, "http://localhost:8080/greeting");
                assert_eq!(args.monitor.interval, 60);
                assert!(args.once);
                assert!(args.pid_file.is_none());
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn run_requires_url() {
        assert!(Cli::try_parse_from(["svcwatch", "run"]).is_err());
    }

    #[test]
    fn stop_defaults() {
        let cli = Cli::try_parse_from(["svcwatch", "stop"]).unwrap();
        match cli.command {
            Command::Stop(args) => {
                assert_eq!(args.pid_file, PathBuf::from("svcwatch.pid"));
                assert_eq!(args.grace, 5);
            }
            other => panic!("expected stop, got {:?}", other),
        }
    }
}
