//! Session wiring.
//!
//! A [`ServerSession`] owns one supervisor, one health monitor and one API
//! client. Once the supervisor reports the backend's port, the session
//! publishes the endpoint and re-points the client; collaborators get the
//! client only while the backend is running and healthy.

use std::sync::Arc;
use std::time::Duration;

use md2docx_client::{ApiClient, ApiClientConfig, ApiError};
use md2docx_core::{
    DEFAULT_SERVER_PORT, HealthState, LocalConfig, ProcessFailure, ProcessState, ServerEndpoint,
    SessionEvent,
};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tracing::{error, info};

use crate::health::{HealthChecker, HealthConfig, HealthMonitor};
use crate::process::{
    ExecutableLocator, PortAllocator, PortError, ProcessSupervisor, SessionEventBroadcaster,
    SupervisorConfig,
};

/// Errors surfaced by [`ServerSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend is not both running and healthy.
    #[error("Backend is not ready (process {process}, health {health})")]
    NotReady {
        process: ProcessState,
        health: HealthState,
    },

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Process(#[from] ProcessFailure),

    #[error(transparent)]
    Client(#[from] ApiError),

    /// `wait_until_ready` gave up.
    #[error("Backend did not become healthy within {0:?}")]
    Timeout(Duration),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Everything a session needs to launch and reach the backend.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Host the backend is reached on.
    pub host: String,
    /// Port tried before scanning, usually from the local config file.
    pub preferred_port: Option<u16>,
    pub allocator: PortAllocator,
    pub supervisor: SupervisorConfig,
    pub health: HealthConfig,
    pub client: ApiClientConfig,
    pub executable: ExecutableLocator,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            preferred_port: Some(DEFAULT_SERVER_PORT),
            allocator: PortAllocator::default(),
            supervisor: SupervisorConfig::default(),
            health: HealthConfig::default(),
            client: ApiClientConfig::default(),
            executable: ExecutableLocator::from_current_exe(),
        }
    }
}

impl SessionConfig {
    /// Defaults, with the preferred port taken from the local config file.
    pub fn from_local_config(local: &LocalConfig) -> Self {
        Self {
            preferred_port: local.server_port.or(Some(DEFAULT_SERVER_PORT)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub const fn with_preferred_port(mut self, port: Option<u16>) -> Self {
        self.preferred_port = port;
        self
    }

    #[must_use]
    pub fn with_allocator(mut self, allocator: PortAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    #[must_use]
    pub fn with_supervisor(mut self, supervisor: SupervisorConfig) -> Self {
        self.supervisor = supervisor;
        self
    }

    #[must_use]
    pub const fn with_health(mut self, health: HealthConfig) -> Self {
        self.health = health;
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: ApiClientConfig) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_executable(mut self, executable: ExecutableLocator) -> Self {
        self.executable = executable;
        self
    }
}

/// Where the process state comes from.
enum Backend {
    /// A backend this session launches and stops.
    Supervised(ProcessSupervisor),
    /// A backend someone else runs. The state is pinned to `Running`
    /// until the session detaches.
    Attached(watch::Sender<ProcessState>),
}

/// Composition root for one backend.
///
/// Dropping the session stops a supervised backend and the health monitor.
pub struct ServerSession {
    host: String,
    preferred_port: Option<u16>,
    allocator: PortAllocator,
    backend: Backend,
    process_rx: watch::Receiver<ProcessState>,
    endpoint_tx: watch::Sender<Option<ServerEndpoint>>,
    monitor: HealthMonitor,
    client: ApiClient,
    events: SessionEventBroadcaster,
}

impl ServerSession {
    /// Build a session that supervises its own backend.
    ///
    /// Nothing is launched until [`start`](Self::start). Must be called from
    /// within a Tokio runtime.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let events = SessionEventBroadcaster::new();
        let supervisor = ProcessSupervisor::new(
            config.executable,
            config.supervisor.with_host(config.host.clone()),
            Arc::new(events.clone()),
        );
        let process_rx = supervisor.subscribe_state();
        Self::assemble(
            config.host,
            config.preferred_port,
            config.allocator,
            Backend::Supervised(supervisor),
            process_rx,
            None,
            config.health,
            &config.client,
            events,
        )
    }

    /// Build a session over a backend that is already running at `base_url`.
    ///
    /// The backend is not launched or stopped by this session, but access is
    /// still gated on health.
    pub fn attach(base_url: &str, config: SessionConfig) -> Result<Self, SessionError> {
        let endpoint = ServerEndpoint::parse(base_url)
            .ok_or_else(|| SessionError::InvalidUrl(base_url.to_string()))?;
        let (process_tx, process_rx) = watch::channel(ProcessState::Running);
        info!(base_url = %endpoint, "Attaching to running backend");
        Self::assemble(
            endpoint.host().to_string(),
            Some(endpoint.port()),
            config.allocator,
            Backend::Attached(process_tx),
            process_rx,
            Some(endpoint),
            config.health,
            &config.client,
            SessionEventBroadcaster::new(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        host: String,
        preferred_port: Option<u16>,
        allocator: PortAllocator,
        backend: Backend,
        process_rx: watch::Receiver<ProcessState>,
        endpoint: Option<ServerEndpoint>,
        health: HealthConfig,
        client_config: &ApiClientConfig,
        events: SessionEventBroadcaster,
    ) -> Result<Self, SessionError> {
        let client = ApiClient::new(client_config)?;
        if let Some(endpoint) = &endpoint {
            client.set_base_url(endpoint.base_url());
        }
        let (endpoint_tx, endpoint_rx) = watch::channel(endpoint);

        let checker = HealthChecker::new(client.backend(), health.probe_timeout);
        let monitor = HealthMonitor::spawn(
            checker,
            health,
            process_rx.clone(),
            endpoint_rx,
            Arc::new(events.clone()),
        );

        Ok(Self {
            host,
            preferred_port,
            allocator,
            backend,
            process_rx,
            endpoint_tx,
            monitor,
            client,
            events,
        })
    }

    /// Choose a port, launch the backend and re-point the client.
    ///
    /// Returns the current endpoint without relaunching when the backend is
    /// already running. Launch failures are also emitted as events.
    pub async fn start(&self) -> Result<ServerEndpoint, SessionError> {
        let supervisor = match &self.backend {
            Backend::Supervised(supervisor) => supervisor,
            Backend::Attached(_) => {
                return self.endpoint().ok_or(SessionError::NotReady {
                    process: self.process_state(),
                    health: self.health_state(),
                });
            }
        };

        if supervisor.state().is_running() {
            if let Some(endpoint) = self.endpoint() {
                return Ok(endpoint);
            }
        }

        let port = self
            .allocator
            .choose_port(self.preferred_port)
            .await
            .inspect_err(|e| error!(error = %e, "Port allocation failed"))?;

        // Published before the supervisor reports Running, so the monitor
        // never probes the endpoint of a previous run
        let mut endpoint = self.publish(port);
        if let Err(failure) = supervisor.start(port).await {
            self.endpoint_tx.send_replace(None);
            return Err(failure.into());
        }

        // The supervisor is authoritative for the port actually in use
        if let Some(actual) = supervisor.port().filter(|actual| *actual != port) {
            endpoint = self.publish(actual);
        }
        info!(base_url = %endpoint, "Backend endpoint published");
        Ok(endpoint)
    }

    fn publish(&self, port: u16) -> ServerEndpoint {
        let endpoint = ServerEndpoint::new(self.host.clone(), port);
        self.client.set_base_url(endpoint.base_url());
        self.endpoint_tx.send_replace(Some(endpoint.clone()));
        endpoint
    }

    /// Stop the backend, or detach from an attached one.
    ///
    /// Health polling ends with the process. Requests already in flight are
    /// left to fail on their own.
    pub async fn stop(&self) -> Option<i32> {
        match &self.backend {
            Backend::Supervised(supervisor) => supervisor.stop().await,
            Backend::Attached(process_tx) => {
                process_tx.send_replace(ProcessState::Stopped);
                None
            }
        }
    }

    /// Running and at least one probe since then was healthy.
    pub fn is_ready(&self) -> bool {
        self.process_state().is_running() && self.health_state().is_healthy()
    }

    /// The API client, only while the backend is ready.
    pub fn client(&self) -> Result<ApiClient, SessionError> {
        if self.is_ready() {
            Ok(self.client.clone())
        } else {
            Err(self.not_ready())
        }
    }

    /// Wait for the first healthy probe of the current run.
    ///
    /// Fails early when the process is neither starting nor running.
    pub async fn wait_until_ready(&self, limit: Duration) -> Result<ServerEndpoint, SessionError> {
        let mut health_rx = self.monitor.subscribe();
        let mut process_rx = self.process_rx.clone();

        let wait = async {
            loop {
                let process = *process_rx.borrow_and_update();
                let health = *health_rx.borrow_and_update();

                if process.is_running() && health.is_healthy() {
                    if let Some(endpoint) = self.endpoint() {
                        return Ok(endpoint);
                    }
                }
                if !matches!(process, ProcessState::Starting | ProcessState::Running) {
                    return Err(SessionError::NotReady { process, health });
                }

                tokio::select! {
                    changed = health_rx.changed() => if changed.is_err() {
                        return Err(self.not_ready());
                    },
                    changed = process_rx.changed() => if changed.is_err() {
                        return Err(self.not_ready());
                    },
                }
            }
        };

        timeout(limit, wait)
            .await
            .map_err(|_| SessionError::Timeout(limit))?
    }

    /// Probe health right away instead of waiting for the next tick.
    pub async fn probe_health(&self) -> HealthState {
        self.monitor.probe_now().await
    }

    /// Base URL of the current backend, once known.
    pub fn current_base_url(&self) -> Option<String> {
        self.endpoint().map(|endpoint| endpoint.base_url().to_string())
    }

    pub fn endpoint(&self) -> Option<ServerEndpoint> {
        self.endpoint_tx.borrow().clone()
    }

    /// Receiver that observes each newly published endpoint.
    pub fn subscribe_endpoint(&self) -> watch::Receiver<Option<ServerEndpoint>> {
        self.endpoint_tx.subscribe()
    }

    /// Watch process state changes.
    pub fn subscribe_process(&self) -> watch::Receiver<ProcessState> {
        self.process_rx.clone()
    }

    pub fn process_state(&self) -> ProcessState {
        *self.process_rx.borrow()
    }

    pub fn health_state(&self) -> HealthState {
        self.monitor.state()
    }

    /// Lifecycle and health events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Whether this session launched the backend itself.
    pub const fn is_supervised(&self) -> bool {
        matches!(self.backend, Backend::Supervised(_))
    }

    /// OS process id of a supervised backend.
    pub fn pid(&self) -> Option<u32> {
        match &self.backend {
            Backend::Supervised(supervisor) => supervisor.pid(),
            Backend::Attached(_) => None,
        }
    }

    fn not_ready(&self) -> SessionError {
        SessionError::NotReady {
            process: self.process_state(),
            health: self.health_state(),
        }
    }
}

impl std::fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSession")
            .field("supervised", &self.is_supervised())
            .field("endpoint", &self.endpoint())
            .field("process", &self.process_state())
            .field("health", &self.health_state())
            .finish_non_exhaustive()
    }
}
