//! Per-run state shared by the steps

use std::future::Future;

use tokio_util::sync::CancellationToken;

use pf_core::config::{DatabaseConfig, PlatformConfig};
use pf_core::{CommandOutput, InstallJob, StepError};

use crate::session::SessionManager;

/// Longest stderr excerpt kept in a step error
const MAX_STDERR_EXCERPT: usize = 512;

/// Everything a step needs: the session, the job, the platform layout and
/// values produced by earlier steps
pub struct StepContext<'a> {
    sessions: &'a SessionManager,
    pub(crate) job: &'a InstallJob,
    pub(crate) platform: &'a PlatformConfig,
    pub(crate) database: &'a DatabaseConfig,
    cancel: &'a CancellationToken,

    /// Database password, set by `setup_database`, consumed by `configure_panel`
    pub(crate) db_password: Option<String>,
    /// Unrendered `config.php`, set by `upload_files`
    pub(crate) config_template: Option<String>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        sessions: &'a SessionManager,
        job: &'a InstallJob,
        platform: &'a PlatformConfig,
        database: &'a DatabaseConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            sessions,
            job,
            platform,
            database,
            cancel,
            db_password: None,
            config_template: None,
        }
    }

    /// Address of the target host, the session registry key
    pub fn host(&self) -> &str {
        &self.job.target.address
    }

    /// Install directory without a trailing slash
    pub fn install_dir(&self) -> &str {
        self.job.panel.install_dir()
    }

    /// `<install dir>/<relative>`
    pub fn install_file(&self, relative: &str) -> String {
        format!("{}/{}", self.install_dir(), relative)
    }

    /// Race `fut` against cancellation of the run
    async fn guarded<T>(
        &self,
        fut: impl Future<Output = Result<T, StepError>>,
    ) -> Result<T, StepError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StepError::Cancelled),
            result = fut => result,
        }
    }

    /// Run a command and return its output whatever the exit status
    pub async fn exec(
        &self,
        command: &str,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, StepError> {
        tracing::debug!("Running `{}`", command);
        self.guarded(async {
            self.sessions
                .execute_with_input(self.host(), command, stdin)
                .await
                .map_err(StepError::from)
        })
        .await
    }

    /// Run a command; a non-zero exit status fails the step
    pub async fn run(&self, command: &str) -> Result<CommandOutput, StepError> {
        let output = self.exec(command, None).await?;
        check(command, output)
    }

    /// Run a command with `stdin` piped to it; a non-zero exit status fails
    /// the step. Secrets travel on stdin so they never show up in
    /// `command`, the process list or error messages.
    pub async fn run_with_input(
        &self,
        command: &str,
        stdin: &[u8],
    ) -> Result<CommandOutput, StepError> {
        let output = self.exec(command, Some(stdin)).await?;
        check(command, output)
    }

    /// Deliver a text file to the host
    pub async fn upload(&self, remote_path: &str, content: &str) -> Result<(), StepError> {
        self.guarded(async {
            self.sessions
                .upload_text(self.host(), remote_path, content)
                .await
                .map_err(StepError::from)
        })
        .await
    }
}

fn check(command: &str, output: CommandOutput) -> Result<CommandOutput, StepError> {
    if output.success() {
        return Ok(output);
    }
    Err(StepError::CommandFailed {
        command: command.to_string(),
        exit_code: output.exit_code,
        stderr: excerpt(&output.stderr),
    })
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(MAX_STDERR_EXCERPT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
