//! Installation State Store trait

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::types::{
    InstallStatus, Installation, InstallationId, InstallationPatch, LogStatus, StepLogEntry,
};

/// Durable record of installations and their step log
///
/// The pipeline treats every write as best effort: a failed write is logged
/// and the run continues.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert a new record (normally in `pending`)
    async fn create(&self, installation: Installation) -> Result<(), PersistenceError>;

    async fn set_status(
        &self,
        id: InstallationId,
        status: InstallStatus,
    ) -> Result<(), PersistenceError> {
        self.merge_fields(id, InstallationPatch::status(status))
            .await
    }

    async fn set_progress(&self, id: InstallationId, progress: u8) -> Result<(), PersistenceError> {
        self.merge_fields(id, InstallationPatch::progress(progress))
            .await
    }

    async fn merge_fields(
        &self,
        id: InstallationId,
        patch: InstallationPatch,
    ) -> Result<(), PersistenceError>;

    async fn append_log(
        &self,
        id: InstallationId,
        message: String,
        status: LogStatus,
        progress: u8,
    ) -> Result<(), PersistenceError>;

    async fn get(&self, id: InstallationId) -> Option<Installation>;

    /// Log entries in creation order
    async fn logs(&self, id: InstallationId) -> Vec<StepLogEntry>;
}
