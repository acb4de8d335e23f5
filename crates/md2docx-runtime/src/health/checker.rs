//! Single-shot liveness probe.

use std::sync::Arc;
use std::time::Duration;

use md2docx_client::{HEALTH_PATH, HttpBackend};
use thiserror::Error;
use tokio::time::timeout;

/// Why a probe counted as unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// No reply within the probe timeout.
    #[error("Health probe timed out")]
    Timeout,

    /// Connection refused, DNS failure and the like.
    #[error("Health probe failed: {0}")]
    Transport(String),

    /// The backend answered with an error status.
    #[error("Health probe returned HTTP {0}")]
    Status(u16),
}

/// Issues `GET {base_url}/health` with its own short timeout.
#[derive(Clone)]
pub struct HealthChecker {
    backend: Arc<dyn HttpBackend>,
    timeout: Duration,
}

impl HealthChecker {
    pub fn new(backend: Arc<dyn HttpBackend>, probe_timeout: Duration) -> Self {
        Self {
            backend,
            timeout: probe_timeout,
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe the backend. Any 2xx reply is healthy.
    pub async fn probe(&self, base_url: &str) -> Result<(), ProbeError> {
        let url = format!("{}{HEALTH_PATH}", base_url.trim_end_matches('/'));
        let request = self.backend.get(&url, Some(self.timeout));

        match timeout(self.timeout, request).await {
            Err(_) => Err(ProbeError::Timeout),
            Ok(Err(e)) if e.timed_out => Err(ProbeError::Timeout),
            Ok(Err(e)) => Err(ProbeError::Transport(e.detail)),
            Ok(Ok(resp)) if resp.is_success() => Ok(()),
            Ok(Ok(resp)) => Err(ProbeError::Status(resp.status)),
        }
    }
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
