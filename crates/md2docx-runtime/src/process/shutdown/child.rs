//! Graceful shutdown for `tokio::process::Child` with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, warn};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// How the process went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownOutcome {
    /// `None` if the process was not reaped within the kill timeout.
    pub status: Option<ExitStatus>,
    /// True when the graceful request was ignored and the process was killed.
    pub forced: bool,
}

impl ShutdownOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

/// Shut down a child process, escalating to a forced kill if needed.
///
/// # Strategy
/// 1. Ask for a graceful exit (SIGTERM) and wait up to `graceful`
/// 2. If still running, kill it (SIGKILL)
/// 3. Wait up to `kill_wait` for reaping
///
/// # Platform behavior
/// - Unix: SIGTERM via nix, then SIGKILL via `.start_kill()`
/// - Windows: no graceful signal exists, so the process is killed immediately
pub async fn shutdown_child(
    child: &mut Child,
    graceful: Duration,
    kill_wait: Duration,
) -> io::Result<ShutdownOutcome> {
    #[cfg(unix)]
    {
        if let Some(status) = request_exit_unix(child, graceful).await? {
            return Ok(ShutdownOutcome {
                status: Some(status),
                forced: false,
            });
        }
    }

    #[cfg(not(unix))]
    let _ = graceful;

    warn!(pid = ?child.id(), "Backend ignored shutdown request, killing");
    force_kill(child, kill_wait).await
}

/// Send SIGTERM and wait. `Ok(None)` means the process is still alive.
#[cfg(unix)]
async fn request_exit_unix(child: &mut Child, graceful: Duration) -> io::Result<Option<ExitStatus>> {
    let Some(pid) = child.id() else {
        // Already reaped
        return child.wait().await.map(Some);
    };
    let pid = i32::try_from(pid).map_err(io::Error::other)?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        // Process may have already exited
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await.map(Some);
        }
        return Err(io::Error::other(e));
    }
    debug!(pid, "Sent SIGTERM to backend");

    match timeout(graceful, child.wait()).await {
        Ok(status) => status.map(Some),
        Err(_) => Ok(None),
    }
}

async fn force_kill(child: &mut Child, kill_wait: Duration) -> io::Result<ShutdownOutcome> {
    if let Err(e) = child.start_kill() {
        // InvalidInput: already exited and reaped
        if e.kind() != io::ErrorKind::InvalidInput {
            return Err(e);
        }
    }

    let status = match timeout(kill_wait, child.wait()).await {
        Ok(status) => Some(status?),
        Err(_) => {
            warn!(pid = ?child.id(), "Backend not reaped after kill");
            None
        }
    };
    Ok(ShutdownOutcome {
        status,
        forced: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;
    use tokio::time::sleep;

    const GRACE: Duration = Duration::from_secs(5);
    const KILL: Duration = Duration::from_secs(2);

    #[tokio::test]
    #[cfg(unix)]
    async fn shutdown_responds_to_sigterm() {
        let mut child = Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("failed to spawn sleep");

        let outcome = shutdown_child(&mut child, GRACE, KILL).await.unwrap();
        assert!(!outcome.forced);
        assert!(outcome.status.is_some());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn shutdown_escalates_when_sigterm_ignored() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .spawn()
            .expect("failed to spawn sh");
        // Let the shell install its trap
        sleep(Duration::from_millis(200)).await;

        let outcome = shutdown_child(&mut child, Duration::from_millis(300), KILL)
            .await
            .unwrap();
        assert!(outcome.forced);
        assert!(outcome.status.is_some());
        assert_eq!(outcome.exit_code(), None);
    }

    #[tokio::test]
    async fn shutdown_handles_already_exited() {
        let mut child = Command::new("echo")
            .arg("test")
            .stdout(std::process::Stdio::null())
            .spawn()
            .expect("failed to spawn echo");

        // Give it time to exit
        sleep(Duration::from_millis(100)).await;

        let outcome = shutdown_child(&mut child, GRACE, KILL).await;
        assert!(outcome.is_ok());
    }
}
