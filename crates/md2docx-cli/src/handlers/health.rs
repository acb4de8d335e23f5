//! Health command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Probe the backend once without launching one.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let client = ctx.direct_client()?;
    let base_url = client.base_url();

    if client.check_health().await {
        println!("{base_url}: online");
        Ok(())
    } else {
        println!("{base_url}: offline");
        Err(CliError::Unavailable(format!("no healthy backend at {base_url}")).into())
    }
}
