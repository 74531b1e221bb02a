//! Install command implementation
//!
//! Runs the whole pipeline in this process against the target host, printing
//! log lines as the steps emit them. Ctrl-C cancels the run; the remote
//! session is still closed and the failure recorded before returning.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use super::job::load_job;
use super::status::LogFollower;
use crate::output::{format_logs, print_info, print_log_entry, print_outcome, print_warning};
use pf_core::config::ProvisionerConfig;
use pf_orchestrator::ProvisionerState;

/// How often the in-process log is checked for new entries
const LOG_REFRESH: Duration = Duration::from_millis(250);

/// Provision the host described by `job_path`
pub async fn install_command(
    config: ProvisionerConfig,
    job_path: &Path,
    password: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let job = load_job(job_path, password)?;
    let state = ProvisionerState::new(config);
    let installer = &state.installer;

    let id = installer.prepare(&job).await?;
    if !quiet {
        print_info(&format!(
            "Installing {} panel on {}@{} ({})",
            job.panel.tier.label(),
            job.target.username,
            job.target.address,
            id
        ));
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            print_warning("Interrupted, cancelling installation...");
            interrupt.cancel();
        }
    });

    let store = state.store();
    let mut follower = LogFollower::new();
    let mut refresh = tokio::time::interval(LOG_REFRESH);

    let run = installer.install(id, &job, cancel);
    tokio::pin!(run);

    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            _ = refresh.tick() => {
                if !quiet {
                    for entry in follower.unseen(&store.logs(id).await) {
                        print_log_entry(&entry);
                    }
                }
            }
        }
    };

    let logs = store.logs(id).await;
    if !quiet {
        for entry in follower.unseen(&logs) {
            print_log_entry(&entry);
        }
        println!();
        println!("{}", format_logs(&logs));
    }

    print_outcome(
        outcome.status,
        outcome.panel_url.as_deref(),
        outcome.error_message.as_deref(),
    );

    if !outcome.is_success() {
        bail!(
            "Installation {} failed: {}",
            id,
            outcome.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
