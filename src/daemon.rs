use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tracing::warn;

use crate::cli::StartArgs;

/// How long `start` waits for the child to claim the PID file.
const STARTUP_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("monitor is already running (PID: {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("invalid PID file {}: {reason}", .path.display())]
    InvalidPidFile { path: PathBuf, reason: String },

    #[error("monitor daemon exited during startup; check the log file")]
    StartupFailed,

    #[error("monitor daemon did not claim {} in time", .path.display())]
    StartupTimeout { path: PathBuf },

    #[error("failed to signal PID {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read the recorded daemon PID.
///
/// A missing file is "not running", not an error — the file may vanish
/// between a check and this read when a concurrent stop wins the race.
pub fn read_pid(path: &Path) -> Result<Option<u32>, DaemonError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    content
        .trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|e| DaemonError::InvalidPidFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

pub fn is_process_alive(pid: u32) -> bool {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system.process(Pid::from_u32(pid)).is_some()
}

fn remove_pid_file(path: &Path) -> Result<(), DaemonError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Owns the PID file for the lifetime of the monitor process.
///
/// Acquiring enforces the at-most-one-daemon-per-PID-file invariant: a
/// live recorded PID refuses the acquire, a dead one is a stale file and
/// is garbage-collected. The guard removes the file again on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn acquire(path: &Path) -> Result<Self, DaemonError> {
        match read_pid(path)? {
            Some(pid) if is_process_alive(pid) => {
                return Err(DaemonError::AlreadyRunning { pid });
            }
            Some(pid) => {
                warn!("Removing stale PID file (PID {} not running)", pid);
                remove_pid_file(path)?;
            }
            None => {}
        }

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, format!("{}\n", std::process::id()))?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = remove_pid_file(&self.path) {
            warn!("Failed to remove PID file {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(unix)]
fn terminate_process(pid: u32) -> Result<(), DaemonError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        // Exited between the liveness check and the signal.
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(DaemonError::SignalFailed {
            pid,
            reason: e.to_string(),
        }),
    }
}

#[cfg(unix)]
fn kill_process(pid: u32) -> Result<(), DaemonError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(DaemonError::SignalFailed {
            pid,
            reason: e.to_string(),
        }),
    }
}

#[cfg(windows)]
fn terminate_process(pid: u32) -> Result<(), DaemonError> {
    taskkill(pid, false)
}

#[cfg(windows)]
fn kill_process(pid: u32) -> Result<(), DaemonError> {
    taskkill(pid, true)
}

#[cfg(windows)]
fn taskkill(pid: u32, force: bool) -> Result<(), DaemonError> {
    let mut command = std::process::Command::new("taskkill");
    command.args(["/PID", &pid.to_string()]);
    if force {
        command.arg("/F");
    }

    let output = command.output()?;
    if output.status.success() || !is_process_alive(pid) {
        Ok(())
    } else {
        Err(DaemonError::SignalFailed {
            pid,
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Spawn the monitor as a detached background process and wait for it to
/// claim the PID file.
pub async fn start(args: &StartArgs) -> Result<(), DaemonError> {
    // Fast-path refusal before spawning anything; the child re-checks when
    // it acquires the file, which settles concurrent starts.
    match read_pid(&args.pid_file)? {
        Some(pid) if is_process_alive(pid) => {
            return Err(DaemonError::AlreadyRunning { pid });
        }
        Some(pid) => {
            println!("Removing stale PID file (PID {} not running)", pid);
            remove_pid_file(&args.pid_file)?;
        }
        None => {}
    }

    let exe = std::env::current_exe()?;
    let mut command = std::process::Command::new(exe);
    command
        .arg("run")
        .arg("--url")
        .arg(&args.monitor.url)
        .arg("--interval")
        .arg(args.monitor.interval.to_string())
        .arg("--timeout")
        .arg(args.monitor.timeout.to_string())
        .arg("--retries")
        .arg(args.monitor.retries.to_string())
        .arg("--retry-delay")
        .arg(args.monitor.retry_delay.to_string())
        .arg("--log-file")
        .arg(&args.monitor.log_file)
        .arg("--pid-file")
        .arg(&args.pid_file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    if let Some(webhook_url) = &args.monitor.webhook_url {
        command.arg("--webhook-url").arg(webhook_url);
    }
    if let Some(channel) = &args.monitor.channel {
        command.arg("--channel").arg(channel);
    }
    if args.monitor.no_notify {
        command.arg("--no-notify");
    }

    // Detach from the invoking terminal's process group.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn()?;
    let child_pid = child.id();

    let deadline = tokio::time::Instant::now() + STARTUP_CONFIRM_TIMEOUT;
    loop {
        if let Some(_status) = child.try_wait()? {
            return Err(DaemonError::StartupFailed);
        }

        if read_pid(&args.pid_file).ok().flatten() == Some(child_pid) {
            println!("Monitor daemon started (PID: {})", child_pid);
            return Ok(());
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(DaemonError::StartupTimeout {
                path: args.pid_file.clone(),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Stop the daemon recorded in the PID file: graceful signal first, then a
/// forceful kill once the grace period expires.
pub async fn stop(pid_file: &Path, grace: Duration) -> Result<(), DaemonError> {
    let pid = match read_pid(pid_file)? {
        None => {
            println!("Monitor daemon is not running");
            return Ok(());
        }
        Some(pid) if !is_process_alive(pid) => {
            remove_pid_file(pid_file)?;
            println!(
                "Monitor daemon is not running (removed stale PID file for PID {})",
                pid
            );
            return Ok(());
        }
        Some(pid) => pid,
    };

    println!("Stopping monitor daemon (PID: {})...", pid);
    terminate_process(pid)?;

    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        if !is_process_alive(pid) {
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    if is_process_alive(pid) {
        println!("Force killing PID {}", pid);
        kill_process(pid)?;
    }

    // The daemon removes its own PID file on graceful exit; clean up in
    // case it was killed before it could.
    remove_pid_file(pid_file)?;
    println!("Monitor daemon stopped (PID: {})", pid);
    Ok(())
}

/// Report whether the daemon is running; stale PID files are self-healed.
pub fn status(pid_file: &Path) -> Result<bool, DaemonError> {
    match read_pid(pid_file)? {
        None => {
            println!("Monitor daemon is not running");
            Ok(false)
        }
        Some(pid) if is_process_alive(pid) => {
            println!("Monitor daemon is running (PID: {})", pid);
            Ok(true)
        }
        Some(pid) => {
            remove_pid_file(pid_file)?;
            println!(
                "Monitor daemon is not running (removed stale PID file for PID {})",
                pid
            );
            Ok(false)
        }
    }
}
