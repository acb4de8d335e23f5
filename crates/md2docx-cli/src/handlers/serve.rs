//! Serve command handler.
//!
//! Runs the backend in the foreground, logging lifecycle and health events
//! until Ctrl-C or a crash.

use anyhow::Result;
use md2docx_core::{HealthState, SessionEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Execute the serve command.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let session = ctx.session()?;
    let mut events = session.subscribe();

    let endpoint = session.start().await.map_err(CliError::from)?;
    println!("Backend starting on {endpoint}");
    println!("Press Ctrl+C to stop");

    let outcome = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Shutting down");
                break Ok(());
            }
            event = events.recv() => match event {
                Ok(SessionEvent::ProcessError { error }) => {
                    error!(%error, "Backend failed");
                    break Err(CliError::Process(error.to_string()));
                }
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Dropped session events"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    if let Some(code) = session.stop().await {
        info!(code, "Backend exited");
    }
    outcome.map_err(Into::into)
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::ProcessStarted { endpoint } => info!(base_url = %endpoint, "Backend started"),
        SessionEvent::ProcessStopped { exit_code } => info!(?exit_code, "Backend stopped"),
        SessionEvent::HealthChanged {
            state: HealthState::Healthy,
            ..
        } => info!("Backend is healthy"),
        SessionEvent::HealthChanged { state, reason } => {
            warn!(%state, reason = reason.as_deref().unwrap_or_default(), "Backend health changed");
        }
        SessionEvent::ProcessError { error } => error!(%error, "Backend failed"),
    }
}
