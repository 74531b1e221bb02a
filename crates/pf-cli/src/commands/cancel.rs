//! Cancel command implementation

use anyhow::{Context, Result};

use crate::client::OrchestratorClient;
use crate::output::{print_success, print_warning};
use pf_core::InstallationId;

/// Ask the orchestrator to cancel a running installation
pub async fn cancel_command(server: &str, id: &str) -> Result<()> {
    let id: InstallationId = id
        .parse()
        .with_context(|| format!("Invalid installation id: {}", id))?;
    let client = OrchestratorClient::new(server)?;

    if client.cancel(id).await? {
        print_success(&format!("Cancellation requested for {}", id));
    } else {
        print_warning(&format!("Installation {} is not running", id));
    }
    Ok(())
}
