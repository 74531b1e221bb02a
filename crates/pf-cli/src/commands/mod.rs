//! CLI command implementations

mod artifacts;
mod cancel;
mod config;
mod install;
mod job;
mod status;
mod submit;

pub use artifacts::artifacts_command;
pub use cancel::cancel_command;
pub use config::{config_init, config_path, config_show};
pub use install::install_command;
pub use job::load_job;
pub use status::{status_command, LogFollower, POLL_INTERVAL};
pub use submit::submit_command;
