//! Global provisioner state

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use pf_core::config::ProvisionerConfig;
use pf_core::traits::{ShellConnector, StateStore};
use pf_core::{InstallJob, InstallationId, PersistenceError};

use crate::pipeline::Installer;
use crate::session::{HostLeases, SessionManager, SshConnector};
use crate::store::MemoryStore;

/// Global state for the provisioning daemon
pub struct ProvisionerState {
    /// Configuration
    pub config: Arc<ProvisionerConfig>,
    /// Runs installations
    pub installer: Arc<Installer>,
    /// Cancellation handles of running installations
    runs: Arc<DashMap<InstallationId, CancellationToken>>,
    /// Parent of every run's token; cancelled on shutdown
    shutdown: CancellationToken,
}

impl ProvisionerState {
    /// Create state with the SSH connector and an in-memory store
    pub fn new(config: ProvisionerConfig) -> Self {
        let connector = Arc::new(SshConnector::new(config.connect_timeout));
        Self::with_components(config, connector, Arc::new(MemoryStore::new()))
    }

    /// Create state with the provided connector and store
    pub fn with_components(
        config: ProvisionerConfig,
        connector: Arc<dyn ShellConnector>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let config = Arc::new(config);
        let sessions = Arc::new(SessionManager::new(connector, config.command_timeout));
        let installer = Installer::new(
            Arc::clone(&config),
            sessions,
            Arc::new(HostLeases::new()),
            store,
        );
        Self {
            config,
            installer: Arc::new(installer),
            runs: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Get the state store
    pub fn store(&self) -> &Arc<dyn StateStore> {
        self.installer.store()
    }

    /// Record a job as `pending` and start it in the background
    pub async fn submit(&self, job: InstallJob) -> Result<InstallationId, PersistenceError> {
        let id = self.installer.prepare(&job).await?;
        let token = self.shutdown.child_token();
        self.runs.insert(id, token.clone());

        let installer = Arc::clone(&self.installer);
        let runs = Arc::clone(&self.runs);
        tokio::spawn(async move {
            let outcome = installer.install(id, &job, token).await;
            runs.remove(&id);
            tracing::debug!("Installation {} finished: {}", id, outcome.status);
        });

        Ok(id)
    }

    /// Cancel a running installation. Returns whether it was running.
    pub fn cancel(&self, id: InstallationId) -> bool {
        match self.runs.get(&id) {
            Some(token) => {
                tracing::info!("Cancelling installation {}", id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of installations currently running
    pub fn active_installations(&self) -> usize {
        self.runs.len()
    }

    /// Cancel every running installation
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
