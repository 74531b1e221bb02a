//! Core error types for panelforge

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::{InstallStatus, InstallationId, StepName};

/// Failure opening an authenticated remote-shell session
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The server rejected every offered authentication method
    #[error("Authentication failed for {username}@{host}")]
    AuthenticationFailed { host: String, username: String },

    /// Network or SSH transport failure
    #[error("{0}")]
    Transport(String),

    /// The TCP connect or SSH handshake did not finish in time
    #[error("Connection to {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    /// The server's host key did not match the pinned fingerprint
    #[error("Host key verification failed: {0}")]
    HostKeyRejected(String),
}

/// Errors raised while using a registered session
#[derive(Error, Debug)]
pub enum SessionError {
    /// No session is registered for the host address
    #[error("SSH connection not found for {0}")]
    NoSession(String),

    /// Opening or driving an exec channel failed
    #[error("Channel error: {0}")]
    Channel(String),

    /// The remote command did not complete within the configured timeout
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
}

/// A text upload could not be delivered
#[derive(Error, Debug)]
#[error("File upload to {path} failed: {reason}")]
pub struct UploadError {
    /// Remote destination path
    pub path: String,
    /// Underlying cause
    pub reason: String,
}

/// Failure inside a single pipeline step
#[derive(Error, Debug)]
pub enum StepError {
    /// The host is not one of the supported distributions
    #[error("Unsupported operating system '{detected}'. Supported: {supported}")]
    UnsupportedPlatform { detected: String, supported: String },

    /// A remote command exited with a non-zero status
    #[error("`{command}` exited with status {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The freshly created database user could not connect
    #[error("Database verification failed: {0}")]
    DatabaseVerification(String),

    /// Session-level failure (missing session, channel error, timeout)
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Upload failure
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// A value an earlier step should have produced is absent
    #[error("missing pipeline state: {0}")]
    MissingState(&'static str),

    /// The run was cancelled while this step was in flight
    #[error("Installation cancelled")]
    Cancelled,
}

/// Terminal outcome of an installation attempt
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The session could not be opened; no step ran
    #[error("SSH connection failed: {0}")]
    Connection(#[from] ConnectionError),

    /// A step failed; the pipeline stopped there
    #[error("Step {step} failed: {source}")]
    Step {
        step: StepName,
        #[source]
        source: StepError,
    },

    /// Cancelled before any step started
    #[error("Installation cancelled")]
    Cancelled,

    /// The job descriptor was rejected before connecting
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProvisionError {
    /// Wrap a step failure with the step's name
    pub fn step(step: StepName, source: StepError) -> Self {
        Self::Step { step, source }
    }

    /// Name of the failing step, if the failure happened inside the pipeline
    pub fn failed_step(&self) -> Option<StepName> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Installation State Store write/read failures
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Unknown installation id
    #[error("Installation not found: {0}")]
    NotFound(InstallationId),

    /// Attempted to leave a terminal state or move backwards
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: InstallStatus,
        to: InstallStatus,
    },

    /// Attempted to lower the progress of an active installation
    #[error("Progress may not decrease ({current} -> {requested})")]
    ProgressRegression { current: u8, requested: u8 },

    /// Storage backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
