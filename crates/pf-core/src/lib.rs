//! pf-core: Core abstractions and configuration for panelforge
//!
//! Shared types, error taxonomy, configuration structures and the seam
//! traits used by the orchestrator and the CLI.

pub mod api;
pub mod config;
pub mod error;
pub mod tier;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{
    ConfigError, ConnectionError, PersistenceError, ProvisionError, SessionError, StepError,
    UploadError,
};
pub use tier::{Feature, Tier, TierProfile};
pub use types::{
    CommandOutput, Credential, InstallJob, InstallStatus, Installation, InstallationId,
    InstallationPatch, LogStatus, PanelConfig, StepLogEntry, StepName, TargetHost,
};
