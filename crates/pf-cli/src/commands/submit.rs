//! Submit command implementation

use std::path::Path;

use anyhow::{bail, Result};

use super::job::load_job;
use super::status::follow;
use crate::client::OrchestratorClient;
use crate::output::{format_installation, print_info, print_success};

/// Send a job to a running orchestrator
pub async fn submit_command(
    server: &str,
    job_path: &Path,
    password: Option<&str>,
    wait: bool,
) -> Result<()> {
    let job = load_job(job_path, password)?;
    let client = OrchestratorClient::new(server)?;

    let id = client.submit(&job).await?;
    print_success(&format!("Submitted installation {}", id));

    if !wait {
        print_info(&format!("Follow it with: panelforge status {}", id));
        println!("{}", id);
        return Ok(());
    }

    let report = follow(&client, id).await?;
    println!();
    print!("{}", format_installation(&report.installation));
    if let Some(error) = report.installation.error_message {
        bail!("Installation failed: {}", error);
    }
    Ok(())
}
