//! panelforge: Command-line interface for the provisioning orchestrator
//!
//! Runs installations in-process, or submits them to a running
//! `pf-orchestrator` daemon and follows their progress.

pub mod client;
pub mod commands;
pub mod output;
