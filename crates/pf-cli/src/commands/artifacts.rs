//! Artifacts command implementation

use anyhow::Result;

use crate::output::{format_artifacts, print_info};
use pf_core::Tier;
use pf_orchestrator::artifacts;

/// List the files a tier's panel consists of
pub fn artifacts_command(tier: Tier) -> Result<()> {
    let files = artifacts::generate(tier);
    let profile = tier.profile();

    print_info(&format!(
        "{} tier: {} files, {} users, {} servers",
        tier.label(),
        files.len(),
        limit(profile.max_users),
        limit(profile.max_servers)
    ));
    println!("{}", format_artifacts(&files));
    Ok(())
}

fn limit(value: Option<u32>) -> String {
    match value {
        Some(n) => n.to_string(),
        None => "unlimited".to_string(),
    }
}
