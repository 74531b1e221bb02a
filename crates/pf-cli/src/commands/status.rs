//! Status command implementation

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::client::OrchestratorClient;
use crate::output::{format_installation, print_log_entry, print_outcome};
use pf_core::api::StatusReport;
use pf_core::{InstallationId, StepLogEntry};

/// How often a daemon is polled while following an installation
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Tracks which log entries have already been printed
#[derive(Debug, Default)]
pub struct LogFollower {
    seen: HashSet<(u64, String, u8)>,
}

impl LogFollower {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries not returned before, in chronological order.
    ///
    /// `logs` may arrive in any order; entries sharing a timestamp keep their
    /// relative order.
    pub fn unseen<'a>(
        &mut self,
        logs: impl IntoIterator<Item = &'a StepLogEntry>,
    ) -> Vec<StepLogEntry> {
        let mut fresh: Vec<StepLogEntry> = logs
            .into_iter()
            .filter(|entry| {
                self.seen
                    .insert((entry.timestamp, entry.message.clone(), entry.progress))
            })
            .cloned()
            .collect();
        fresh.sort_by_key(|entry| entry.timestamp);
        fresh
    }
}

/// Show an installation; follows it until it finishes unless `json`
pub async fn status_command(server: &str, id: &str, json: bool) -> Result<()> {
    let id: InstallationId = id
        .parse()
        .with_context(|| format!("Invalid installation id: {}", id))?;
    let client = OrchestratorClient::new(server)?;

    if json {
        let report = client.status(id).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
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

/// Poll until the installation reaches a terminal status, printing new log
/// lines as they appear. Returns the final report.
pub(crate) async fn follow(client: &OrchestratorClient, id: InstallationId) -> Result<StatusReport> {
    let mut follower = LogFollower::new();
    let mut interval = tokio::time::interval(POLL_INTERVAL);

    loop {
        interval.tick().await;
        let report = client.status(id).await?;

        // The daemon returns the most recent entries first
        for entry in follower.unseen(report.logs.iter().rev()) {
            print_log_entry(&entry);
        }

        if report.installation.status.is_terminal() {
            print_outcome(
                report.installation.status,
                report.installation.panel_url.as_deref(),
                report.installation.error_message.as_deref(),
            );
            return Ok(report);
        }
        tracing::debug!(
            "Installation {} is {} at {}%",
            id,
            report.installation.status,
            report.installation.progress
        );
    }
}
