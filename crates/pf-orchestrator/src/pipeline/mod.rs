//! Step pipeline
//!
//! A fixed, ordered list of provisioning steps run over one remote session.
//! Each step declares the cumulative progress it represents; the first
//! failing step ends the run.

mod actions;
mod context;
mod os_release;
mod runner;
mod steps;

pub use actions::panel_url;
pub use os_release::OsRelease;
pub use runner::{InstallOutcome, Installer};
pub use steps::{definition, StepDefinition, CONNECTED_PROGRESS, PIPELINE};
