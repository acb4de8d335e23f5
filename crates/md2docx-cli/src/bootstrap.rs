//! CLI bootstrap - the composition root.
//!
//! This module is the only place where the CLI wires concrete pieces
//! together: logging, the local config file, the settings store and the
//! backend session. Handlers receive a [`CliContext`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use md2docx_client::{ApiClient, ApiClientConfig};
use md2docx_core::{
    DEFAULT_SERVER_PORT, JsonSettingsStore, LocalConfig, ServerEndpoint, SettingsStore,
};
use md2docx_runtime::{ExecutableLocator, ServerSession, SessionConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;
use crate::parser::Cli;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` raises the default from `info`
/// to `debug`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .init();
}

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Explicit backend executable.
    pub server_path: Option<PathBuf>,
    /// Preferred port, overriding the local config file.
    pub port: Option<u16>,
    /// Existing backend to attach to.
    pub url: Option<String>,
    /// How long to wait for the backend to become healthy.
    pub ready_timeout: Duration,
}

impl CliConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            server_path: cli.server.clone(),
            port: cli.port,
            url: cli.url.clone(),
            ready_timeout: Duration::from_secs(cli.ready_timeout),
        }
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    config: CliConfig,
    local: LocalConfig,
    settings: Arc<dyn SettingsStore>,
}

impl CliContext {
    pub fn new(config: CliConfig, local: LocalConfig, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            config,
            local,
            settings,
        }
    }

    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    pub const fn local(&self) -> &LocalConfig {
        &self.local
    }

    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    /// Port to prefer: `--port`, then the local config file, then the default.
    pub fn preferred_port(&self) -> u16 {
        self.config
            .port
            .or(self.local.server_port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Session settings derived from flags and the local config file.
    pub fn session_config(&self) -> SessionConfig {
        let executable =
            ExecutableLocator::from_current_exe().with_override(self.config.server_path.clone());
        SessionConfig::from_local_config(&self.local)
            .with_preferred_port(Some(self.preferred_port()))
            .with_executable(executable)
    }

    /// Build a session without starting anything.
    pub fn session(&self) -> Result<ServerSession, CliError> {
        let session = match &self.config.url {
            Some(url) => ServerSession::attach(url, self.session_config())?,
            None => ServerSession::new(self.session_config())?,
        };
        Ok(session)
    }

    /// Start (or attach to) the backend and wait until it is healthy.
    pub async fn connect(&self) -> Result<ServerSession, CliError> {
        let session = self.session()?;
        let endpoint = session.start().await?;
        debug!(base_url = %endpoint, "Waiting for backend");

        if let Err(e) = session.wait_until_ready(self.config.ready_timeout).await {
            session.stop().await;
            return Err(e.into());
        }
        info!(base_url = %endpoint, "Backend ready");
        Ok(session)
    }

    /// Client pointed at `--url`, or at the local default port.
    ///
    /// Used for one-off probes that must not launch a backend.
    pub fn direct_client(&self) -> Result<ApiClient, CliError> {
        let base_url = match &self.config.url {
            Some(url) => url.clone(),
            None => ServerEndpoint::new("localhost", self.preferred_port())
                .base_url()
                .to_string(),
        };
        Ok(ApiClient::new(
            &ApiClientConfig::new().with_base_url(base_url),
        )?)
    }
}

/// Bootstrap the CLI application.
///
/// Loads the local config file next to the executable (or in the data
/// directory) and opens the JSON settings store.
pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let app_dir = ExecutableLocator::from_current_exe().app_dir().to_path_buf();
    let local = LocalConfig::discover(&app_dir)?;
    if let Some(source) = &local.source {
        debug!(path = %source.display(), "Using local config");
    }

    let settings = JsonSettingsStore::open_default()?;
    debug!(path = %settings.path().display(), "Using settings store");

    Ok(CliContext::new(config, local, Arc::new(settings)))
}
