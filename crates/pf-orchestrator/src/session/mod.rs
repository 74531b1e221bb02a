//! Remote session management

mod lease;
mod manager;
mod ssh;

pub use lease::{HostLease, HostLeases};
pub use manager::SessionManager;
pub use ssh::{answer_prompts, SshConnector};
