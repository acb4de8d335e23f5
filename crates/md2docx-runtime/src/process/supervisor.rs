//! Backend process supervisor.
//!
//! The supervisor is the only writer of [`ProcessState`]. It launches the
//! backend with the chosen port in its environment, watches for an
//! unsolicited exit, and performs graceful-then-forced shutdown.
//!
//! Key design decisions:
//! - **Watcher owns the child**: one task waits on the process and on a
//!   cancellation token, so a crash and a stop request cannot both reap it
//! - **Crash only from Running**: an exit observed while `Stopping` is the
//!   stop completing, not a crash
//! - **kill_on_drop**: a dropped supervisor never leaks the backend

use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use md2docx_core::{ProcessFailure, ProcessState, ServerEndpoint, SessionEvent, SessionEventEmitter};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use super::executable::{ExecutableLocator, LaunchSpec};
use super::logs::spawn_log_readers;
use super::shutdown::shutdown_child;

/// Timeouts and environment for launching the backend.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Host the backend is reached on, used for the started event.
    pub host: String,
    /// Environment variable carrying the port to the backend.
    pub port_env_var: String,
    /// How long to wait for the OS to confirm the process started.
    pub startup_timeout: Duration,
    /// How long a graceful stop may take before the process is killed.
    pub graceful_timeout: Duration,
    /// How long to wait for reaping after a kill.
    pub kill_timeout: Duration,
    /// Additional environment for the backend.
    pub extra_env: Vec<(String, String)>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port_env_var: "SERVER_PORT".to_string(),
            startup_timeout: Duration::from_secs(10),
            graceful_timeout: Duration::from_secs(5),
            kill_timeout: Duration::from_secs(2),
            extra_env: Vec::new(),
        }
    }
}

impl SupervisorConfig {
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port_env_var(mut self, name: impl Into<String>) -> Self {
        self.port_env_var = name.into();
        self
    }

    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }
}

/// Identity of the most recent launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LaunchInfo {
    port: u16,
    pid: Option<u32>,
}

/// Handle to a launched backend.
struct RunningBackend {
    cancel: CancellationToken,
    /// Cancels the watcher (and so stops the backend) if dropped.
    _guard: DropGuard,
    /// Resolves to the exit code once the process is gone.
    watcher: JoinHandle<Option<i32>>,
}

/// Launches, watches and stops the conversion backend.
///
/// # Example
///
/// ```ignore
/// let supervisor = ProcessSupervisor::new(locator, SupervisorConfig::default(), emitter);
/// let port = supervisor.start(8081).await?;
/// supervisor.stop().await;
/// ```
pub struct ProcessSupervisor {
    locator: ExecutableLocator,
    config: SupervisorConfig,
    emitter: Arc<dyn SessionEventEmitter>,
    state_tx: Arc<watch::Sender<ProcessState>>,
    running: tokio::sync::Mutex<Option<RunningBackend>>,
    launch: Mutex<Option<LaunchInfo>>,
}

impl ProcessSupervisor {
    pub fn new(
        locator: ExecutableLocator,
        config: SupervisorConfig,
        emitter: Arc<dyn SessionEventEmitter>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ProcessState::NotStarted);
        Self {
            locator,
            config,
            emitter,
            state_tx: Arc::new(state_tx),
            running: tokio::sync::Mutex::new(None),
            launch: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        *self.state_tx.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ProcessState> {
        self.state_tx.subscribe()
    }

    /// Port of the most recent successful launch.
    pub fn port(&self) -> Option<u16> {
        self.launch_info().map(|info| info.port)
    }

    /// OS process id of the most recent successful launch.
    pub fn pid(&self) -> Option<u32> {
        self.launch_info().and_then(|info| info.pid)
    }

    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    fn launch_info(&self) -> Option<LaunchInfo> {
        *self.launch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch the backend listening on `port` and return that port.
    ///
    /// Returns immediately with the current port if already running. On
    /// failure the state goes back to `NotStarted` and the failure is both
    /// emitted and returned.
    pub async fn start(&self, port: u16) -> Result<u16, ProcessFailure> {
        let mut slot = self.running.lock().await;

        if self.state().is_running() {
            if let Some(current) = self.port() {
                debug!(port = current, "Backend already running");
                return Ok(current);
            }
        }

        // Reap the watcher of a previous crashed run
        if let Some(stale) = slot.take() {
            stale.cancel.cancel();
            reap_watcher(stale.watcher).await;
        }

        self.state_tx.send_replace(ProcessState::Starting);

        let mut child = match self.launch(port).await {
            Ok(child) => child,
            Err(failure) => {
                error!(port, error = %failure, "Backend launch failed");
                self.state_tx.send_replace(ProcessState::NotStarted);
                self.emitter.emit(SessionEvent::error(failure.clone()));
                return Err(failure);
            }
        };

        let pid = child.id();
        *self.launch.lock().unwrap_or_else(PoisonError::into_inner) = Some(LaunchInfo { port, pid });
        spawn_log_readers(&mut child, port);

        // Running must be visible before the watcher can observe an exit
        self.state_tx.send_replace(ProcessState::Running);
        info!(port, ?pid, "Backend started");
        self.emitter
            .emit(SessionEvent::started(ServerEndpoint::new(self.config.host.clone(), port)));

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_child(
            child,
            cancel.clone(),
            Arc::clone(&self.state_tx),
            Arc::clone(&self.emitter),
            self.config.graceful_timeout,
            self.config.kill_timeout,
            port,
        ));
        *slot = Some(RunningBackend {
            _guard: cancel.clone().drop_guard(),
            cancel,
            watcher,
        });

        Ok(port)
    }

    /// Stop the backend: graceful request, then kill after the timeout.
    ///
    /// No-op unless `Running`. Always ends in `Stopped` and emits exactly
    /// one stopped event. Returns the exit code when one was observed.
    pub async fn stop(&self) -> Option<i32> {
        let mut slot = self.running.lock().await;

        let stopping = self.state_tx.send_if_modified(|state| {
            if state.is_running() {
                *state = ProcessState::Stopping;
                true
            } else {
                false
            }
        });
        if !stopping {
            debug!(state = %self.state(), "Stop requested while not running");
            return None;
        }

        let Some(backend) = slot.take() else {
            self.state_tx.send_replace(ProcessState::Stopped);
            self.emitter.emit(SessionEvent::stopped(None));
            return None;
        };

        info!(port = ?self.port(), "Stopping backend");
        backend.cancel.cancel();
        let code = reap_watcher(backend.watcher).await;

        self.state_tx.send_replace(ProcessState::Stopped);
        info!(?code, "Backend stopped");
        self.emitter.emit(SessionEvent::stopped(code));
        code
    }

    async fn launch(&self, port: u16) -> Result<Child, ProcessFailure> {
        let spec = self.locator.locate()?;
        info!(command = %spec.display(), port, "Launching backend");

        let mut command = self.command(&spec, port);
        let spawn = tokio::task::spawn_blocking(move || command.spawn());

        match timeout(self.config.startup_timeout, spawn).await {
            Err(_) => Err(ProcessFailure::SupervisorTimeout {
                timeout_secs: self.config.startup_timeout.as_secs(),
            }),
            Ok(Err(join)) => Err(ProcessFailure::UnknownProcessError {
                reason: join.to_string(),
            }),
            Ok(Ok(Err(io))) => Err(ProcessFailure::LaunchFailed {
                reason: format!("{}: {io}", spec.program.display()),
            }),
            Ok(Ok(Ok(child))) => Ok(child),
        }
    }

    fn command(&self, spec: &LaunchSpec, port: u16) -> Command {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .env(&self.config.port_env_var, port.to_string())
            .envs(self.config.extra_env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("state", &self.state())
            .field("port", &self.port())
            .field("pid", &self.pid())
            .finish_non_exhaustive()
    }
}

/// Wait for a watcher task. A panicked or aborted watcher yields no code.
async fn reap_watcher(watcher: JoinHandle<Option<i32>>) -> Option<i32> {
    watcher.await.unwrap_or_else(|e| {
        warn!(error = %e, "Backend watcher task failed");
        None
    })
}

/// Wait for the backend to exit on its own or for a stop request.
async fn watch_child(
    mut child: Child,
    cancel: CancellationToken,
    state_tx: Arc<watch::Sender<ProcessState>>,
    emitter: Arc<dyn SessionEventEmitter>,
    graceful: Duration,
    kill_wait: Duration,
    port: u16,
) -> Option<i32> {
    tokio::select! {
        status = child.wait() => {
            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(port, error = %e, "Failed to wait on backend");
                    None
                }
            };
            let crashed = state_tx.send_if_modified(|state| {
                if state.is_running() {
                    *state = ProcessState::Crashed;
                    true
                } else {
                    false
                }
            });
            if crashed {
                error!(port, ?code, "Backend exited unexpectedly");
                emitter.emit(SessionEvent::stopped(code));
                emitter.emit(SessionEvent::error(ProcessFailure::CrashedWithCode { code }));
            }
            code
        }
        () = cancel.cancelled() => {
            match shutdown_child(&mut child, graceful, kill_wait).await {
                Ok(outcome) => {
                    debug!(port, forced = outcome.forced, code = ?outcome.exit_code(), "Backend shut down");
                    outcome.exit_code()
                }
                Err(e) => {
                    warn!(port, error = %e, "Backend shutdown failed");
                    None
                }
            }
        }
    }
}
