//! pf-orchestrator: Remote provisioning orchestrator
//!
//! Connects to a bare Linux host over SSH, runs the fixed provisioning
//! pipeline that turns it into a running web administration panel, and
//! records status, progress and a step log for callers to poll.

pub mod api;
pub mod artifacts;
pub mod pipeline;
pub mod secret;
pub mod session;
pub mod shell;
pub mod state;
pub mod store;

pub use pipeline::{InstallOutcome, Installer};
pub use state::ProvisionerState;
