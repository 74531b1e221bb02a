//! Wire types of the orchestrator's HTTP status surface
//!
//! JSON over HTTP on localhost. Shared by the daemon and the CLI.

use serde::{Deserialize, Serialize};

use crate::types::{Installation, InstallationId, StepLogEntry};

/// Returned by `POST /api/installations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: InstallationId,
}

/// Returned by `GET /api/installations/:id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub installation: Installation,
    /// Most recent entries first
    pub logs: Vec<StepLogEntry>,
}

/// Returned by `POST /api/installations/:id/cancel`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    /// Whether a running installation received the cancellation
    pub cancelled: bool,
}

/// Returned by `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Installations currently running
    pub active_installations: usize,
}

/// Error body for non-2xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Keep the `limit` most recent entries, newest first
pub fn most_recent_first(mut logs: Vec<StepLogEntry>, limit: usize) -> Vec<StepLogEntry> {
    logs.reverse();
    logs.truncate(limit);
    logs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogStatus;

    fn entry(id: InstallationId, n: u8) -> StepLogEntry {
        StepLogEntry {
            installation_id: id,
            message: format!("entry {}", n),
            status: LogStatus::Info,
            progress: n,
            timestamp: u64::from(n),
        }
    }

    #[test]
    fn test_most_recent_first() {
        let id = InstallationId::new();
        let logs: Vec<_> = (0..30).map(|n| entry(id, n)).collect();
        let recent = most_recent_first(logs, 20);
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0].progress, 29);
        assert_eq!(recent[19].progress, 10);
    }

    #[test]
    fn test_submit_response_json() {
        let id: InstallationId = "6f1c1f4e-2d3b-4a57-9c1e-0e8f4f5c2b11".parse().unwrap();
        let json = serde_json::to_string(&SubmitResponse { id }).unwrap();
        assert_eq!(json, r#"{"id":"6f1c1f4e-2d3b-4a57-9c1e-0e8f4f5c2b11"}"#);
    }
}
