use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod daemon;
mod engine;
mod logging;
mod models;
mod notify;
mod probe;
mod shutdown;
mod tracker;

use crate::cli::{Cli, Command, DeployStatus, NotifyDeployArgs, RunArgs};
use crate::config::MonitorConfig;
use crate::engine::Monitor;
use crate::notify::Notifier;
use crate::shutdown::Shutdown;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_monitor(args).await,
        Command::Start(args) => {
            logging::init_console();
            daemon::start(&args).await?;
            Ok(())
        }
        Command::Stop(args) => {
            logging::init_console();
            daemon::stop(&args.pid_file, Duration::from_secs(args.grace)).await?;
            Ok(())
        }
        Command::Status(args) => {
            logging::init_console();
            daemon::status(&args.pid_file)?;
            Ok(())
        }
        Command::Restart(args) => {
            logging::init_console();
            daemon::stop(&args.pid_file, Duration::from_secs(5)).await?;
            daemon::start(&args).await?;
            Ok(())
        }
        Command::NotifyDeploy(args) => {
            logging::init_console();
            notify_deploy(args).await
        }
    }
}

async fn run_monitor(args: RunArgs) -> Result<()> {
    let config = MonitorConfig::from_args(&args.monitor, args.once)?;
    let _log_guard = logging::init_with_file(&args.monitor.log_file)?;

    // Daemon singleton enforcement; the guard removes the file on exit.
    let _pid_file = args
        .pid_file
        .as_deref()
        .map(daemon::PidFile::acquire)
        .transpose()?;

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let mut monitor = Monitor::new(config, shutdown)?;
    monitor.run().await
}

async fn notify_deploy(args: NotifyDeployArgs) -> Result<()> {
    let app_url = args.app_url.as_deref().unwrap_or("(not provided)");
    let notifier = Notifier::new(&args.webhook_url, args.channel.as_deref(), app_url)?;
    notifier
        .notify_deploy(args.status == DeployStatus::Success)
        .await;
    Ok(())
}

/// Forward termination signals into the shutdown flag. The flag is the
/// only thing touched from signal context; the loop picks it up at its
/// next wait point.
fn spawn_signal_listener(shutdown: Shutdown) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }

        shutdown.request();
    });
}
