//! Job file loading

use std::path::Path;

use anyhow::{bail, Context, Result};

use pf_core::config;
use pf_core::{Credential, InstallJob};

/// Load a job descriptor, taking the SSH password from `password` when given.
///
/// Fails when neither the file nor `password` supplies a credential.
pub fn load_job(path: &Path, password: Option<&str>) -> Result<InstallJob> {
    let mut job: InstallJob = config::load_config(path)
        .with_context(|| format!("Failed to load job file {:?}", path))?;

    if let Some(password) = password {
        job.target.credential = Credential::new(password);
    }
    if job.target.credential.is_empty() {
        bail!("SSH password required (--password or PANELFORGE_SSH_PASSWORD)");
    }
    job.panel
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid job file {:?}: {}", path, e))?;

    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
[target]
address = "203.0.113.10"
username = "root"

[panel]
admin_username = "admin"
admin_password = "s3cret-Admin!"
tier = "premium"
"#;

    fn write_job(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_password_argument_fills_credential() {
        let (_dir, path) = write_job(JOB);
        let job = load_job(&path, Some("hunter2")).unwrap();
        assert_eq!(job.target.credential.expose(), "hunter2");
        assert_eq!(job.target.port, 22);
    }

    #[test]
    fn test_missing_password_is_rejected() {
        let (_dir, path) = write_job(JOB);
        let err = load_job(&path, None).unwrap_err();
        assert!(err.to_string().contains("SSH password required"));
    }

    #[test]
    fn test_invalid_panel_is_rejected() {
        let (_dir, path) = write_job(&JOB.replace(
            "admin_username = \"admin\"",
            "admin_username = \"admin\"\ninstall_path = \"relative/path\"",
        ));
        let err = load_job(&path, Some("hunter2")).unwrap_err();
        assert!(err.to_string().contains("must be absolute"));
    }
}
