//! Scripted remote shell used by the integration tests
//!
//! Records every command and upload per host and answers with canned
//! outputs, so the whole pipeline runs without a network.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pf_core::config::ProvisionerConfig;
use pf_core::traits::{RemoteShell, ShellConnector, StateStore};
use pf_core::{
    CommandOutput, ConnectionError, InstallJob, PanelConfig, SessionError, TargetHost, Tier,
};
use pf_orchestrator::session::{HostLeases, SessionManager};
use pf_orchestrator::store::MemoryStore;
use pf_orchestrator::Installer;

pub const UBUNTU_RELEASE: &str = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\nID_LIKE=debian\n";

pub const CENTOS_RELEASE: &str =
    "NAME=\"CentOS Linux\"\nVERSION_ID=\"7\"\nID=\"centos\"\nID_LIKE=\"rhel fedora\"\n";

pub const ADMIN_PASSWORD: &str = "s3cret-Admin!";

/// What the scripted hosts did
#[derive(Default)]
pub struct Recorder {
    commands: Mutex<Vec<(String, String)>>,
    uploads: Mutex<Vec<(String, String, String)>>,
    closes: Mutex<HashMap<String, usize>>,
}

impl Recorder {
    /// Commands run on `host`, in order (uploads included as `cat > ...`)
    pub fn commands(&self, host: &str) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// `(path, content)` of every upload to `host`, in order
    pub fn uploads(&self, host: &str) -> Vec<(String, String)> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _, _)| h == host)
            .map(|(_, p, c)| (p.clone(), c.clone()))
            .collect()
    }

    /// Last content uploaded to `path` on `host`
    pub fn uploaded(&self, host: &str, path: &str) -> Option<String> {
        self.uploads(host)
            .into_iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c)
    }

    pub fn closes(&self, host: &str) -> usize {
        self.closes.lock().unwrap().get(host).copied().unwrap_or(0)
    }
}

/// Failure injected when a command contains `pattern`
#[derive(Clone)]
pub struct Fault {
    pub pattern: String,
    pub exit_code: i32,
    pub stderr: String,
}

#[derive(Default)]
struct Script {
    os_release: HashMap<String, String>,
    faults: Vec<Fault>,
    hang_on: Option<String>,
    reject_auth: HashSet<String>,
}

/// Opens [`ScriptedShell`]s sharing one [`Recorder`]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
    pub recorder: Arc<Recorder>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            recorder: Arc::new(Recorder::default()),
        }
    }

    pub fn os_release(self, host: &str, content: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .os_release
            .insert(host.to_string(), content.to_string());
        self
    }

    pub fn fail_on(self, pattern: &str, exit_code: i32, stderr: &str) -> Self {
        self.script.lock().unwrap().faults.push(Fault {
            pattern: pattern.to_string(),
            exit_code,
            stderr: stderr.to_string(),
        });
        self
    }

    /// Commands containing `pattern` never complete
    pub fn hang_on(self, pattern: &str) -> Self {
        self.script.lock().unwrap().hang_on = Some(pattern.to_string());
        self
    }

    pub fn reject_auth(self, host: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .reject_auth
            .insert(host.to_string());
        self
    }
}

#[async_trait]
impl ShellConnector for ScriptedConnector {
    async fn connect(&self, target: &TargetHost) -> Result<Arc<dyn RemoteShell>, ConnectionError> {
        if self
            .script
            .lock()
            .unwrap()
            .reject_auth
            .contains(&target.address)
        {
            return Err(ConnectionError::AuthenticationFailed {
                host: target.address.clone(),
                username: target.username.clone(),
            });
        }
        Ok(Arc::new(ScriptedShell {
            host: target.address.clone(),
            script: Arc::clone(&self.script),
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

pub struct ScriptedShell {
    host: String,
    script: Arc<Mutex<Script>>,
    recorder: Arc<Recorder>,
}

fn unquote(word: &str) -> String {
    word.trim_matches('\'').replace("'\\''", "'")
}

#[async_trait]
impl RemoteShell for ScriptedShell {
    async fn exec(
        &self,
        command: &str,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, SessionError> {
        self.recorder
            .commands
            .lock()
            .unwrap()
            .push((self.host.clone(), command.to_string()));

        let (hang, fault, os_release) = {
            let script = self.script.lock().unwrap();
            (
                script
                    .hang_on
                    .as_ref()
                    .map_or(false, |p| command.contains(p.as_str())),
                script
                    .faults
                    .iter()
                    .find(|f| command.contains(f.pattern.as_str()))
                    .cloned(),
                script
                    .os_release
                    .get(&self.host)
                    .cloned()
                    .unwrap_or_else(|| UBUNTU_RELEASE.to_string()),
            )
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(fault) = fault {
            return Ok(CommandOutput {
                exit_code: fault.exit_code,
                stdout: String::new(),
                stderr: fault.stderr,
            });
        }

        let stdout = if let Some(path) = command.strip_prefix("cat > ") {
            let content = String::from_utf8_lossy(stdin.unwrap_or_default()).into_owned();
            self.recorder
                .uploads
                .lock()
                .unwrap()
                .push((self.host.clone(), unquote(path), content));
            String::new()
        } else if command == "cat /etc/os-release" {
            os_release
        } else if command.contains("SELECT 1") {
            "1\n".to_string()
        } else if command.starts_with("php ") {
            "$2y$10$abcdefghijklmnopqrstuuJ6yTAX3U7Yt2LzQ1xHfXn1cQ1tVvKzG".to_string()
        } else {
            String::new()
        };

        Ok(CommandOutput {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        })
    }

    async fn close(&self) {
        *self
            .recorder
            .closes
            .lock()
            .unwrap()
            .entry(self.host.clone())
            .or_insert(0) += 1;
    }
}

pub fn job(host: &str, tier: Tier) -> InstallJob {
    InstallJob {
        target: TargetHost::new(host, "root", "hunter2"),
        panel: PanelConfig::new("admin", ADMIN_PASSWORD, tier),
    }
}

pub struct Harness {
    pub installer: Arc<Installer>,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<SessionManager>,
    pub recorder: Arc<Recorder>,
}

pub fn harness(connector: ScriptedConnector) -> Harness {
    harness_with(connector, ProvisionerConfig::default())
}

pub fn harness_with(connector: ScriptedConnector, config: ProvisionerConfig) -> Harness {
    let recorder = Arc::clone(&connector.recorder);
    let store = Arc::new(MemoryStore::new());
    let sessions = Arc::new(SessionManager::new(
        Arc::new(connector),
        config.command_timeout,
    ));
    let installer = Installer::new(
        Arc::new(config),
        Arc::clone(&sessions),
        Arc::new(HostLeases::new()),
        Arc::clone(&store) as Arc<dyn StateStore>,
    );
    Harness {
        installer: Arc::new(installer),
        store,
        sessions,
        recorder,
    }
}

/// Config with a short per-command budget
pub fn short_timeout_config() -> ProvisionerConfig {
    ProvisionerConfig {
        command_timeout: Duration::from_secs(1),
        ..ProvisionerConfig::default()
    }
}
