//! Periodic health monitoring.
//!
//! The monitor is the only writer of [`HealthState`]. It follows the
//! process lifecycle through a `watch` receiver: probing starts a short
//! warm-up delay after the backend enters `Running` and stops as soon as
//! it leaves. Only transitions are announced.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use md2docx_core::{HealthState, ProcessState, ServerEndpoint, SessionEvent, SessionEventEmitter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::checker::{HealthChecker, ProbeError};
use super::tracker::HealthTracker;

/// Probe schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// Warm-up before the first probe of a run.
    pub initial_delay: Duration,
    /// Time between probes.
    pub interval: Duration,
    /// Per-probe timeout, independent of the interval.
    pub probe_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(3),
        }
    }
}

impl HealthConfig {
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

/// State shared between the monitor handle and its background task.
struct Shared {
    checker: HealthChecker,
    emitter: Arc<dyn SessionEventEmitter>,
    state_tx: watch::Sender<HealthState>,
    tracker: Mutex<HealthTracker>,
    endpoint_rx: watch::Receiver<Option<ServerEndpoint>>,
    process_rx: watch::Receiver<ProcessState>,
}

impl Shared {
    /// Probe the current endpoint and record the result.
    ///
    /// Returns `None` when there is nothing to probe. No request is sent
    /// unless the process is running.
    async fn probe_and_record(&self) -> Option<HealthState> {
        if !self.process_rx.borrow().is_running() {
            return None;
        }
        let base_url = self
            .endpoint_rx
            .borrow()
            .as_ref()
            .map(|endpoint| endpoint.base_url().to_string())?;

        let result = self.checker.probe(&base_url).await;
        if let Err(e) = &result {
            debug!(%base_url, error = %e, "Health probe failed");
        }
        Some(self.record(result))
    }

    fn record(&self, result: Result<(), ProbeError>) -> HealthState {
        let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);

        // The process may have stopped while the probe was in flight
        if !self.process_rx.borrow().is_running() {
            return tracker.state();
        }

        if let Some(next) = tracker.observe(result.is_ok()) {
            let reason = result.err().map(|e| e.to_string());
            match next {
                HealthState::Healthy => info!("Backend is healthy"),
                _ => warn!(reason = reason.as_deref().unwrap_or_default(), "Backend is unhealthy"),
            }
            self.state_tx.send_replace(next);
            self.emitter.emit(SessionEvent::health(next, reason));
        }
        tracker.state()
    }

    fn reset(&self) {
        let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
        tracker.reset();
        self.state_tx.send_replace(HealthState::Unknown);
    }
}

/// Polls `{base_url}/health` while the backend is running.
///
/// Dropping the monitor stops the background task.
pub struct HealthMonitor {
    shared: Arc<Shared>,
    config: HealthConfig,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start monitoring. Must be called from within a Tokio runtime.
    pub fn spawn(
        checker: HealthChecker,
        config: HealthConfig,
        process_rx: watch::Receiver<ProcessState>,
        endpoint_rx: watch::Receiver<Option<ServerEndpoint>>,
        emitter: Arc<dyn SessionEventEmitter>,
    ) -> Self {
        let (state_tx, _) = watch::channel(HealthState::Unknown);
        let shared = Arc::new(Shared {
            checker,
            emitter,
            state_tx,
            tracker: Mutex::new(HealthTracker::new()),
            endpoint_rx,
            process_rx: process_rx.clone(),
        });

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::clone(&shared),
            config,
            process_rx,
            cancel.clone(),
        ));

        Self {
            shared,
            config,
            cancel,
            task,
        }
    }

    /// Current health.
    pub fn state(&self) -> HealthState {
        *self.shared.state_tx.borrow()
    }

    /// Receiver that observes every health change, resets included.
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.shared.state_tx.subscribe()
    }

    pub const fn config(&self) -> HealthConfig {
        self.config
    }

    /// Probe right away, outside the schedule.
    ///
    /// The result feeds the same transition filter as scheduled probes. A
    /// probe while the process is not running changes nothing.
    pub async fn probe_now(&self) -> HealthState {
        self.shared
            .probe_and_record()
            .await
            .unwrap_or_else(|| self.state())
    }

    /// Stop the background task. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn run(
    shared: Arc<Shared>,
    config: HealthConfig,
    mut process_rx: watch::Receiver<ProcessState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            running = process_rx.wait_for(|state| state.is_running()) => {
                if running.is_err() {
                    return;
                }
            }
        }

        debug!(delay = ?config.initial_delay, "Backend running, health polling scheduled");
        let mut ticker = interval_at(Instant::now() + config.initial_delay, config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                changed = process_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    // Any change ends this run; a restart begins a fresh one
                    debug!(state = %*process_rx.borrow(), "Process state changed, health polling paused");
                    shared.reset();
                    break;
                }
                _ = ticker.tick() => {
                    shared.probe_and_record().await;
                }
            }
        }
    }
}
