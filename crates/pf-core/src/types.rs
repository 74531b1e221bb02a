//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PersistenceError;
use crate::tier::Tier;
use crate::time::current_time_millis;

/// Default remote-shell port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default install location on the target host
pub const DEFAULT_INSTALL_PATH: &str = "/var/www/html/panel";

/// Opaque identifier of one installation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub uuid::Uuid);

impl InstallationId {
    /// Create a fresh random id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for InstallationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstallationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of an installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    Pending,
    Installing,
    Completed,
    Failed,
}

impl InstallStatus {
    /// Completed and failed installations never change again
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Forward-only transition table
    pub fn can_transition_to(self, next: InstallStatus) -> bool {
        use InstallStatus::*;
        matches!(
            (self, next),
            (Pending, Installing) | (Pending, Failed) | (Installing, Completed) | (Installing, Failed)
        )
    }

    /// Lowercase wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Installing => "installing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag attached to each step log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStatus::Info => write!(f, "info"),
            LogStatus::Success => write!(f, "success"),
            LogStatus::Warning => write!(f, "warning"),
            LogStatus::Error => write!(f, "error"),
        }
    }
}

/// Names of the provisioning steps, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    SystemCheck,
    SystemUpdate,
    InstallDependencies,
    SetupWebserver,
    SetupDatabase,
    UploadFiles,
    ConfigurePanel,
    SetupPermissions,
    Finalize,
}

impl StepName {
    /// Identifier used in logs and error messages
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SystemCheck => "system_check",
            Self::SystemUpdate => "system_update",
            Self::InstallDependencies => "install_dependencies",
            Self::SetupWebserver => "setup_webserver",
            Self::SetupDatabase => "setup_database",
            Self::UploadFiles => "upload_files",
            Self::ConfigurePanel => "configure_panel",
            Self::SetupPermissions => "setup_permissions",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secret string that never shows up in `Debug` output
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the plaintext secret
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Remote host to provision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetHost {
    /// Host address; also the session registry key
    pub address: String,
    /// Remote-shell port
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    /// Login user
    pub username: String,
    /// Password, also used to answer keyboard-interactive prompts
    #[serde(default = "empty_credential")]
    pub credential: Credential,
    /// Optional pinned host key fingerprint (SHA256:...)
    #[serde(default)]
    pub host_key_fingerprint: Option<String>,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn empty_credential() -> Credential {
    Credential::new("")
}

impl TargetHost {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<Credential>,
    ) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            credential: credential.into(),
            host_key_fingerprint: None,
        }
    }

    /// `address:port` form for socket connects
    pub fn socket_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// Desired panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Absolute install directory on the target host
    #[serde(default = "default_install_path")]
    pub install_path: String,
    /// Administrator account created inside the generated panel
    pub admin_username: String,
    pub admin_password: Credential,
    #[serde(default)]
    pub tier: Tier,
}

fn default_install_path() -> String {
    DEFAULT_INSTALL_PATH.to_string()
}

impl PanelConfig {
    pub fn new(
        admin_username: impl Into<String>,
        admin_password: impl Into<Credential>,
        tier: Tier,
    ) -> Self {
        Self {
            install_path: default_install_path(),
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            tier,
        }
    }

    /// Install path without trailing slashes
    pub fn install_dir(&self) -> &str {
        let trimmed = self.install_path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/"
        } else {
            trimmed
        }
    }

    /// Final path component, used as the URL segment of the panel
    pub fn panel_segment(&self) -> &str {
        self.install_dir().rsplit('/').next().unwrap_or_default()
    }

    /// Reject paths and names the pipeline cannot safely provision
    pub fn validate(&self) -> Result<(), String> {
        let dir = self.install_dir();
        if !dir.starts_with('/') {
            return Err(format!("install path must be absolute: {}", self.install_path));
        }
        if dir == "/" {
            return Err("install path may not be the filesystem root".to_string());
        }
        if !dir
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.'))
        {
            return Err(format!(
                "install path may only contain [A-Za-z0-9/_.-]: {}",
                self.install_path
            ));
        }
        if dir.split('/').any(|part| part == ".." || part == ".") {
            return Err(format!(
                "install path may not contain relative components: {}",
                self.install_path
            ));
        }
        if is_system_path(dir) {
            return Err(format!(
                "install path may not be a system directory: {}",
                self.install_path
            ));
        }
        if self.admin_username.trim().is_empty() {
            return Err("admin username is required".to_string());
        }
        if self.admin_password.is_empty() {
            return Err("admin password is required".to_string());
        }
        Ok(())
    }
}

/// Top-level trees that hold the OS itself; nothing beneath them is accepted
const SYSTEM_TREES: &[&str] = &[
    "bin", "boot", "dev", "etc", "lib", "lib32", "lib64", "libx32", "proc", "run", "sbin",
    "sys", "usr",
];

/// Shared directories whose ownership and modes the permission step would clobber
const SHARED_DIRS: &[&str] = &[
    "/var/backups",
    "/var/cache",
    "/var/lib",
    "/var/local",
    "/var/lock",
    "/var/log",
    "/var/mail",
    "/var/opt",
    "/var/run",
    "/var/spool",
    "/var/tmp",
    "/var/www",
    "/var/www/html",
];

/// Whether `dir` (absolute, normalised) is a system location. Every
/// top-level directory counts, so an install path needs at least two
/// components.
fn is_system_path(dir: &str) -> bool {
    let parts: Vec<&str> = dir.split('/').filter(|part| !part.is_empty()).collect();
    match parts.first() {
        None => true,
        Some(_) if parts.len() < 2 => true,
        Some(top) if SYSTEM_TREES.contains(top) => true,
        Some(_) => SHARED_DIRS.contains(&format!("/{}", parts.join("/")).as_str()),
    }
}

/// A complete provisioning request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallJob {
    pub target: TargetHost,
    pub panel: PanelConfig,
}

/// Durable record of one installation attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub id: InstallationId,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub install_path: String,
    pub admin_username: String,
    pub tier: Tier,
    pub status: InstallStatus,
    pub progress: u8,
    pub panel_url: Option<String>,
    pub error_message: Option<String>,
    /// Unix millis
    pub created_at: u64,
    pub updated_at: u64,
}

impl Installation {
    /// New `pending` record for a job. Credentials are not copied.
    pub fn pending(id: InstallationId, job: &InstallJob) -> Self {
        let now = current_time_millis();
        Self {
            id,
            host: job.target.address.clone(),
            port: job.target.port,
            username: job.target.username.clone(),
            install_path: job.panel.install_path.clone(),
            admin_username: job.panel.admin_username.clone(),
            tier: job.panel.tier,
            status: InstallStatus::Pending,
            progress: 0,
            panel_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, enforcing forward-only status and monotonic progress
    pub fn apply(&mut self, patch: &InstallationPatch) -> Result<(), PersistenceError> {
        let next_status = patch.status.unwrap_or(self.status);
        if next_status != self.status && !self.status.can_transition_to(next_status) {
            return Err(PersistenceError::InvalidTransition {
                from: self.status,
                to: next_status,
            });
        }
        if patch.status.is_none() && self.status.is_terminal() && !patch.is_empty() {
            return Err(PersistenceError::InvalidTransition {
                from: self.status,
                to: self.status,
            });
        }

        if let Some(progress) = patch.progress {
            let progress = progress.min(100);
            let tracked = matches!(
                next_status,
                InstallStatus::Installing | InstallStatus::Completed
            );
            if tracked && progress < self.progress {
                return Err(PersistenceError::ProgressRegression {
                    current: self.progress,
                    requested: progress,
                });
            }
            self.progress = progress;
        }

        self.status = next_status;
        if let Some(url) = &patch.panel_url {
            self.panel_url = Some(url.clone());
        }
        if let Some(message) = &patch.error_message {
            self.error_message = Some(message.clone());
        }
        self.updated_at = current_time_millis();
        Ok(())
    }
}

/// Partial record used by `merge_fields`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallationPatch {
    pub status: Option<InstallStatus>,
    pub progress: Option<u8>,
    pub panel_url: Option<String>,
    pub error_message: Option<String>,
}

impl InstallationPatch {
    pub fn status(status: InstallStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    /// Terminal success: status, full progress and the panel URL
    pub fn completed(panel_url: impl Into<String>) -> Self {
        Self {
            status: Some(InstallStatus::Completed),
            progress: Some(100),
            panel_url: Some(panel_url.into()),
            error_message: None,
        }
    }

    /// Terminal failure with its message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(InstallStatus::Failed),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.panel_url.is_none()
            && self.error_message.is_none()
    }
}

/// Append-only event attached to an installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLogEntry {
    pub installation_id: InstallationId,
    pub message: String,
    pub status: LogStatus,
    pub progress: u8,
    /// Unix millis
    pub timestamp: u64,
}

/// Result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; -1 when the server reported none (e.g. killed by signal)
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
