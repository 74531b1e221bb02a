//! Installation runner
//!
//! Drives one installation end to end: validate the job, take the host
//! lease, connect, run every step in order and record the outcome. The
//! session is disconnected exactly once for every run that reached the
//! connect stage, whichever way it ended.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use pf_core::config::ProvisionerConfig;
use pf_core::traits::StateStore;
use pf_core::{
    InstallJob, InstallStatus, Installation, InstallationId, InstallationPatch, LogStatus,
    PersistenceError, ProvisionError, StepName,
};

use super::actions::{panel_url, run_step};
use super::context::StepContext;
use super::steps::{CONNECTED_PROGRESS, PIPELINE};
use crate::session::{HostLeases, SessionManager};
use crate::shell::is_safe_identifier;

/// Final result of an installation, as returned to in-process callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallOutcome {
    pub id: InstallationId,
    pub status: InstallStatus,
    pub progress: u8,
    pub panel_url: Option<String>,
    pub error_message: Option<String>,
    pub failed_step: Option<StepName>,
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        self.status == InstallStatus::Completed
    }
}

/// Runs installations against the shared session registry and store
pub struct Installer {
    config: Arc<ProvisionerConfig>,
    sessions: Arc<SessionManager>,
    leases: Arc<HostLeases>,
    store: Arc<dyn StateStore>,
}

impl Installer {
    pub fn new(
        config: Arc<ProvisionerConfig>,
        sessions: Arc<SessionManager>,
        leases: Arc<HostLeases>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            config,
            sessions,
            leases,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Create the `pending` record for a job
    pub async fn prepare(&self, job: &InstallJob) -> Result<InstallationId, PersistenceError> {
        let id = InstallationId::new();
        self.store.create(Installation::pending(id, job)).await?;
        tracing::debug!("Created installation {} for {}", id, job.target.address);
        Ok(id)
    }

    /// Run the installation `id` to completion or failure
    pub async fn install(
        &self,
        id: InstallationId,
        job: &InstallJob,
        cancel: CancellationToken,
    ) -> InstallOutcome {
        let span = tracing::info_span!(
            "installation",
            id = %id,
            host = %job.target.address
        );
        self.run(id, job, &cancel).instrument(span).await
    }

    async fn run(
        &self,
        id: InstallationId,
        job: &InstallJob,
        cancel: &CancellationToken,
    ) -> InstallOutcome {
        let mut progress = 0;

        if let Err(e) = self.validate(job) {
            return self.record(id, progress, Err(e)).await;
        }

        self.update(id, InstallationPatch::status(InstallStatus::Installing))
            .await;
        tracing::info!("Installation started");

        let _lease = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return self.record(id, progress, Err(ProvisionError::Cancelled)).await;
            }
            lease = self.leases.acquire(&job.target.address) => lease,
        };

        let result = self.provision(id, job, cancel, &mut progress).await;
        self.sessions.disconnect(&job.target.address).await;

        self.record(id, progress, result).await
    }

    /// Connect and run every step; stops at the first failure
    async fn provision(
        &self,
        id: InstallationId,
        job: &InstallJob,
        cancel: &CancellationToken,
        progress: &mut u8,
    ) -> Result<String, ProvisionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
            connected = self.sessions.connect(&job.target) => { connected?; }
        }

        *progress = CONNECTED_PROGRESS;
        self.log(id, "Connected to server", LogStatus::Info, *progress)
            .await;

        let mut ctx = StepContext::new(
            &self.sessions,
            job,
            &self.config.platform,
            &self.config.database,
            cancel,
        );

        for step in &PIPELINE {
            if cancel.is_cancelled() {
                return Err(ProvisionError::Cancelled);
            }

            *progress = step.progress;
            self.log(id, step.message, LogStatus::Info, step.progress)
                .await;
            self.update(id, InstallationPatch::progress(step.progress))
                .await;

            tracing::info!(step = %step.name, "Running step");
            run_step(step.name, &mut ctx)
                .await
                .map_err(|e| ProvisionError::step(step.name, e))?;
        }

        Ok(panel_url(job))
    }

    /// Reject jobs the pipeline cannot safely run
    fn validate(&self, job: &InstallJob) -> Result<(), ProvisionError> {
        if job.target.address.trim().is_empty() {
            return Err(ProvisionError::InvalidConfig(
                "target address is required".to_string(),
            ));
        }
        if job.target.username.trim().is_empty() {
            return Err(ProvisionError::InvalidConfig(
                "target username is required".to_string(),
            ));
        }
        job.panel.validate().map_err(ProvisionError::InvalidConfig)?;

        let db = &self.config.database;
        for identifier in [&db.name, &db.user] {
            if !is_safe_identifier(identifier) {
                return Err(ProvisionError::InvalidConfig(format!(
                    "database identifier may only contain [A-Za-z0-9_]: {}",
                    identifier
                )));
            }
        }
        Ok(())
    }

    /// Persist the terminal state and build the outcome
    async fn record(
        &self,
        id: InstallationId,
        progress: u8,
        result: Result<String, ProvisionError>,
    ) -> InstallOutcome {
        match result {
            Ok(url) => {
                tracing::info!("Installation completed: {}", url);
                self.update(id, InstallationPatch::completed(url.clone()))
                    .await;
                self.log(
                    id,
                    "Installation completed successfully",
                    LogStatus::Success,
                    100,
                )
                .await;
                InstallOutcome {
                    id,
                    status: InstallStatus::Completed,
                    progress: 100,
                    panel_url: Some(url),
                    error_message: None,
                    failed_step: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("Installation failed: {}", message);
                self.log(id, &message, LogStatus::Error, progress).await;
                self.update(id, InstallationPatch::failed(message.clone()))
                    .await;
                InstallOutcome {
                    id,
                    status: InstallStatus::Failed,
                    progress,
                    panel_url: None,
                    error_message: Some(message),
                    failed_step: e.failed_step(),
                }
            }
        }
    }

    async fn update(&self, id: InstallationId, patch: InstallationPatch) {
        if let Err(e) = self.store.merge_fields(id, patch).await {
            tracing::warn!("Failed to update installation record: {}", e);
        }
    }

    async fn log(&self, id: InstallationId, message: &str, status: LogStatus, progress: u8) {
        if let Err(e) = self
            .store
            .append_log(id, message.to_string(), status, progress)
            .await
        {
            tracing::warn!("Failed to append installation log: {}", e);
        }
    }
}
