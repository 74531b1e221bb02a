//! Core trait definitions

mod shell;
mod store;

pub use shell::{RemoteShell, ShellConnector};
pub use store::StateStore;
