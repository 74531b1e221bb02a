//! In-process state store

use async_trait::async_trait;
use dashmap::DashMap;

use pf_core::time::current_time_millis;
use pf_core::traits::StateStore;
use pf_core::{
    Installation, InstallationId, InstallationPatch, LogStatus, PersistenceError, StepLogEntry,
};

/// Keeps installations and their logs in memory for the life of the process
#[derive(Default)]
pub struct MemoryStore {
    installations: DashMap<InstallationId, Installation>,
    logs: DashMap<InstallationId, Vec<StepLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked installations
    pub fn len(&self) -> usize {
        self.installations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installations.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn create(&self, installation: Installation) -> Result<(), PersistenceError> {
        let id = installation.id;
        if self.installations.contains_key(&id) {
            return Err(PersistenceError::Backend(format!(
                "installation {} already exists",
                id
            )));
        }
        self.installations.insert(id, installation);
        self.logs.insert(id, Vec::new());
        Ok(())
    }

    async fn merge_fields(
        &self,
        id: InstallationId,
        patch: InstallationPatch,
    ) -> Result<(), PersistenceError> {
        let mut record = self
            .installations
            .get_mut(&id)
            .ok_or(PersistenceError::NotFound(id))?;
        record.apply(&patch)
    }

    async fn append_log(
        &self,
        id: InstallationId,
        message: String,
        status: LogStatus,
        progress: u8,
    ) -> Result<(), PersistenceError> {
        let mut entries = self.logs.get_mut(&id).ok_or(PersistenceError::NotFound(id))?;
        entries.push(StepLogEntry {
            installation_id: id,
            message,
            status,
            progress,
            timestamp: current_time_millis(),
        });
        Ok(())
    }

    async fn get(&self, id: InstallationId) -> Option<Installation> {
        self.installations.get(&id).map(|r| r.value().clone())
    }

    async fn logs(&self, id: InstallationId) -> Vec<StepLogEntry> {
        self.logs
            .get(&id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}
