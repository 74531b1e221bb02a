//! Provisioner configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Configuration for the provisioning daemon and CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    /// Address for the HTTP status surface
    pub bind_address: String,

    /// TCP connect + SSH handshake + authentication budget
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Per-command budget; a hung command fails its step when exceeded
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,

    /// How many log entries the status endpoint returns
    pub status_log_limit: usize,

    /// Target platform layout
    pub platform: PlatformConfig,

    /// Panel database settings
    pub database: DatabaseConfig,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4000".to_string(),
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(15 * 60),
            status_log_limit: 20,
            platform: PlatformConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Packages, services and paths on the target host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// `/etc/os-release` ids accepted by the OS check
    pub supported_distributions: Vec<String>,
    /// Web server package and systemd unit
    pub web_server: String,
    /// Account the web server runs as
    pub web_user: String,
    /// Language runtime version (package prefix `php<version>`)
    pub php_version: String,
    /// Runtime extensions, installed as `php<version>-<ext>`
    pub php_extensions: Vec<String>,
    /// Database server package
    pub database_package: String,
    /// Archive and network utilities
    pub utilities: Vec<String>,
    /// Name of the site definition written by `finalize`
    pub site_name: String,
    /// Distribution default site, disabled by `finalize`
    pub default_site: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            supported_distributions: vec!["ubuntu".to_string(), "debian".to_string()],
            web_server: "apache2".to_string(),
            web_user: "www-data".to_string(),
            php_version: "8.1".to_string(),
            php_extensions: ["mysql", "curl", "json", "mbstring", "zip", "gd"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            database_package: "mysql-server".to_string(),
            utilities: ["unzip", "curl", "wget"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            site_name: "ssh-panel".to_string(),
            default_site: "000-default".to_string(),
        }
    }
}

impl PlatformConfig {
    /// Full dependency list for the batched install
    pub fn packages(&self) -> Vec<String> {
        let runtime = format!("php{}", self.php_version);
        let mut packages = vec![self.web_server.clone(), runtime.clone()];
        packages.extend(
            self.php_extensions
                .iter()
                .map(|ext| format!("{}-{}", runtime, ext)),
        );
        packages.push(self.database_package.clone());
        packages.extend(self.utilities.iter().cloned());
        packages
    }

    /// Human-readable list of supported distributions
    pub fn supported_label(&self) -> String {
        self.supported_distributions.join(", ")
    }
}

/// Panel database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    /// Length of the generated database password
    pub password_length: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "ssh_panel".to_string(),
            user: "sshpanel".to_string(),
            password_length: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_packages() {
        let packages = PlatformConfig::default().packages();
        assert_eq!(packages[0], "apache2");
        assert!(packages.contains(&"php8.1".to_string()));
        assert!(packages.contains(&"php8.1-mysql".to_string()));
        assert!(packages.contains(&"mysql-server".to_string()));
        assert_eq!(packages.last().map(String::as_str), Some("wget"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ProvisionerConfig = toml::from_str(
            r#"
            command_timeout = 60

            [platform]
            php_version = "8.2"
            "#,
        )
        .unwrap();
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.platform.php_version, "8.2");
        assert_eq!(config.platform.web_user, "www-data");
        assert_eq!(config.database.name, "ssh_panel");
    }
}
