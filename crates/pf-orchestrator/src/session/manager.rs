//! Host-keyed session registry

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use pf_core::traits::{RemoteShell, ShellConnector};
use pf_core::{CommandOutput, ConnectionError, SessionError, TargetHost, UploadError};

use crate::shell::quote;

/// Owns at most one live session per host address
pub struct SessionManager {
    /// Opens new sessions
    connector: Arc<dyn ShellConnector>,
    /// Sessions indexed by host address
    sessions: DashMap<String, Arc<dyn RemoteShell>>,
    /// Budget for a single remote command
    command_timeout: Duration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(connector: Arc<dyn ShellConnector>, command_timeout: Duration) -> Self {
        Self {
            connector,
            sessions: DashMap::new(),
            command_timeout,
        }
    }

    /// Open a session to `target` and register it under its address.
    ///
    /// An existing session for the same address is closed and replaced.
    pub async fn connect(
        &self,
        target: &TargetHost,
    ) -> Result<Arc<dyn RemoteShell>, ConnectionError> {
        tracing::debug!(
            "Connecting to {} as {}",
            target.socket_address(),
            target.username
        );
        let shell = self.connector.connect(target).await?;

        let previous = self
            .sessions
            .insert(target.address.clone(), Arc::clone(&shell));
        if let Some(previous) = previous {
            tracing::warn!("Replacing existing session for {}", target.address);
            previous.close().await;
        }

        tracing::info!("Connected to {}", target.address);
        Ok(shell)
    }

    /// Run a command on the host's active session
    pub async fn execute(&self, host: &str, command: &str) -> Result<CommandOutput, SessionError> {
        self.execute_with_input(host, command, None).await
    }

    /// Run a command with `stdin` piped to it
    pub async fn execute_with_input(
        &self,
        host: &str,
        command: &str,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, SessionError> {
        let shell = self
            .get(host)
            .ok_or_else(|| SessionError::NoSession(host.to_string()))?;

        match tokio::time::timeout(self.command_timeout, shell.exec(command, stdin)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout(self.command_timeout)),
        }
    }

    /// Write `content` byte-for-byte to `remote_path` on the host.
    ///
    /// The content is streamed over the command's stdin into `cat`, so it is
    /// never parsed by the remote shell.
    pub async fn upload_text(
        &self,
        host: &str,
        remote_path: &str,
        content: &str,
    ) -> Result<(), UploadError> {
        let command = format!("cat > {}", quote(remote_path));
        let upload_error = |reason: String| UploadError {
            path: remote_path.to_string(),
            reason,
        };

        let output = self
            .execute_with_input(host, &command, Some(content.as_bytes()))
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        if output.success() {
            tracing::debug!("Uploaded {} bytes to {}", content.len(), remote_path);
            Ok(())
        } else {
            Err(upload_error(format!(
                "exit status {}: {}",
                output.exit_code,
                output.stderr.trim()
            )))
        }
    }

    /// Close and forget the host's session. Returns whether one existed.
    pub async fn disconnect(&self, host: &str) -> bool {
        match self.sessions.remove(host) {
            Some((_, shell)) => {
                shell.close().await;
                tracing::info!("Disconnected from {}", host);
                true
            }
            None => false,
        }
    }

    /// Get the session registered for a host
    pub fn get(&self, host: &str) -> Option<Arc<dyn RemoteShell>> {
        self.sessions.get(host).map(|r| Arc::clone(r.value()))
    }

    pub fn is_connected(&self, host: &str) -> bool {
        self.sessions.contains_key(host)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoShell {
        closed: AtomicUsize,
        stdin: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl RemoteShell for EchoShell {
        async fn exec(
            &self,
            command: &str,
            stdin: Option<&[u8]>,
        ) -> Result<CommandOutput, SessionError> {
            if let Some(input) = stdin {
                self.stdin.lock().unwrap().push(input.to_vec());
            }
            if command == "sleep" {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(CommandOutput {
                exit_code: 0,
                stdout: command.to_string(),
                stderr: String::new(),
            })
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct EchoConnector {
        opened: Mutex<Vec<Arc<EchoShell>>>,
    }

    #[async_trait]
    impl ShellConnector for EchoConnector {
        async fn connect(
            &self,
            _target: &TargetHost,
        ) -> Result<Arc<dyn RemoteShell>, ConnectionError> {
            let shell = Arc::new(EchoShell::default());
            self.opened.lock().unwrap().push(Arc::clone(&shell));
            Ok(shell)
        }
    }

    fn manager(timeout: Duration) -> (SessionManager, Arc<EchoConnector>) {
        let connector = Arc::new(EchoConnector {
            opened: Mutex::new(Vec::new()),
        });
        (SessionManager::new(connector.clone(), timeout), connector)
    }

    #[tokio::test]
    async fn test_execute_without_session() {
        let (manager, _) = manager(Duration::from_secs(5));
        let err = manager.execute("10.0.0.9", "true").await.unwrap_err();
        assert!(matches!(err, SessionError::NoSession(host) if host == "10.0.0.9"));
    }

    #[tokio::test]
    async fn test_connect_replaces_existing_session() {
        let (manager, connector) = manager(Duration::from_secs(5));
        let target = TargetHost::new("10.0.0.1", "root", "pw");

        manager.connect(&target).await.unwrap();
        manager.connect(&target).await.unwrap();

        assert_eq!(manager.len(), 1);
        let opened = connector.opened.lock().unwrap();
        assert_eq!(opened[0].closed.load(Ordering::SeqCst), 1);
        assert_eq!(opened[1].closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (manager, connector) = manager(Duration::from_secs(5));
        let target = TargetHost::new("10.0.0.1", "root", "pw");
        manager.connect(&target).await.unwrap();

        assert!(manager.disconnect("10.0.0.1").await);
        assert!(!manager.disconnect("10.0.0.1").await);
        assert!(!manager.is_connected("10.0.0.1"));
        assert_eq!(
            connector.opened.lock().unwrap()[0]
                .closed
                .load(Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_upload_streams_content_on_stdin() {
        let (manager, connector) = manager(Duration::from_secs(5));
        let target = TargetHost::new("10.0.0.1", "root", "pw");
        manager.connect(&target).await.unwrap();

        let content = "line one\nEOF\n'quoted' $(not expanded)\n";
        manager
            .upload_text("10.0.0.1", "/tmp/it's.txt", content)
            .await
            .unwrap();

        let opened = connector.opened.lock().unwrap();
        let stdin = opened[0].stdin.lock().unwrap();
        assert_eq!(stdin[0], content.as_bytes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_timeout() {
        let (manager, _) = manager(Duration::from_secs(30));
        let target = TargetHost::new("10.0.0.1", "root", "pw");
        manager.connect(&target).await.unwrap();

        let err = manager.execute("10.0.0.1", "sleep").await.unwrap_err();
        assert!(matches!(err, SessionError::Timeout(d) if d == Duration::from_secs(30)));
    }
}
