//! russh-backed remote shell
//!
//! Opens one SSH connection per target, authenticates with the supplied
//! password (falling back to keyboard-interactive, answering password
//! prompts automatically) and runs each command on its own exec channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config, Handle, KeyboardInteractiveAuthResponse};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use thiserror::Error;

use pf_core::traits::{RemoteShell, ShellConnector};
use pf_core::{CommandOutput, ConnectionError, SessionError, TargetHost};

/// Upper bound on keyboard-interactive rounds before giving up
const MAX_KEYBOARD_INTERACTIVE_ROUNDS: usize = 5;

/// Extended data stream number for stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Raised from the handler when a pinned host key does not match
#[derive(Debug, Error)]
#[error("expected {expected}, got {actual}")]
struct HostKeyMismatch {
    expected: String,
    actual: String,
}

/// Opens [`SshShell`] sessions
pub struct SshConnector {
    connect_timeout: Duration,
}

impl SshConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn open(&self, target: &TargetHost) -> Result<SshShell, ConnectionError> {
        let config = Arc::new(Config::default());
        let handler = ClientHandler {
            expected_host_key: target.host_key_fingerprint.clone(),
        };
        let address = target.socket_address();

        let mut handle = client::connect(config, address.as_str(), handler)
            .await
            .map_err(|e| {
                if let Some(mismatch) = e.downcast_ref::<HostKeyMismatch>() {
                    return ConnectionError::HostKeyRejected(mismatch.to_string());
                }
                ConnectionError::Transport(format!("Failed to connect to {}: {}", address, e))
            })?;

        authenticate(&mut handle, target).await?;

        Ok(SshShell {
            host: target.address.clone(),
            handle,
        })
    }
}

#[async_trait]
impl ShellConnector for SshConnector {
    async fn connect(&self, target: &TargetHost) -> Result<Arc<dyn RemoteShell>, ConnectionError> {
        let shell = tokio::time::timeout(self.connect_timeout, self.open(target))
            .await
            .map_err(|_| ConnectionError::Timeout {
                host: target.address.clone(),
                timeout: self.connect_timeout,
            })??;
        Ok(Arc::new(shell))
    }
}

/// Password first, then keyboard-interactive with the same credential
async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    target: &TargetHost,
) -> Result<(), ConnectionError> {
    let password = target.credential.expose();
    let transport = |e: russh::Error| ConnectionError::Transport(format!("Authentication error: {}", e));
    let rejected = || ConnectionError::AuthenticationFailed {
        host: target.address.clone(),
        username: target.username.clone(),
    };

    if handle
        .authenticate_password(target.username.as_str(), password)
        .await
        .map_err(transport)?
    {
        tracing::debug!("Password authentication accepted");
        return Ok(());
    }

    tracing::debug!("Password rejected, trying keyboard-interactive");
    let mut response = handle
        .authenticate_keyboard_interactive_start(target.username.as_str(), None)
        .await
        .map_err(transport)?;

    for _ in 0..MAX_KEYBOARD_INTERACTIVE_ROUNDS {
        match response {
            KeyboardInteractiveAuthResponse::Success => return Ok(()),
            KeyboardInteractiveAuthResponse::Failure => return Err(rejected()),
            KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => {
                let texts: Vec<&str> = prompts.iter().map(|p| p.prompt.as_str()).collect();
                let answers = answer_prompts(&texts, password).ok_or_else(rejected)?;
                response = handle
                    .authenticate_keyboard_interactive_respond(answers)
                    .await
                    .map_err(transport)?;
            }
        }
    }

    Err(rejected())
}

/// Answer a keyboard-interactive info request.
///
/// Prompts mentioning a password get the credential; other prompts get an
/// empty answer. An empty prompt list (servers send one as a final round)
/// gets an empty answer list. Returns `None` if the server asks only
/// questions the credential cannot answer.
pub fn answer_prompts(prompts: &[&str], password: &str) -> Option<Vec<String>> {
    if prompts.is_empty() {
        return Some(Vec::new());
    }
    let is_password = |p: &&str| p.to_ascii_lowercase().contains("password");
    if !prompts.iter().any(is_password) {
        return None;
    }
    Some(
        prompts
            .iter()
            .map(|p| {
                if is_password(p) {
                    password.to_string()
                } else {
                    String::new()
                }
            })
            .collect(),
    )
}

/// An authenticated SSH connection
struct SshShell {
    host: String,
    handle: Handle<ClientHandler>,
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn exec(
        &self,
        command: &str,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, SessionError> {
        let channel_error = |what: &str, e: russh::Error| {
            SessionError::Channel(format!("{} on {}: {}", what, self.host, e))
        };

        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| channel_error("Failed to open channel", e))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| channel_error("Failed to execute command", e))?;

        if let Some(input) = stdin {
            channel
                .data(input)
                .await
                .map_err(|e| channel_error("Failed to write stdin", e))?;
        }
        channel
            .eof()
            .await
            .map_err(|e| channel_error("Failed to send EOF", e))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status as i32),
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    tracing::warn!("Remote command killed by signal {:?}", signal_name);
                }
                _ => {}
            }
        }

        Ok(CommandOutput {
            exit_code: exit_code.unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    async fn close(&self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "closing", "en")
            .await
        {
            tracing::debug!("Error while disconnecting from {}: {}", self.host, e);
        }
    }
}

/// SSH client handler
struct ClientHandler {
    /// Pinned host key fingerprint, if any
    expected_host_key: Option<String>,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    /// Verify the server's host key against the pinned fingerprint.
    ///
    /// Without a pin every key is accepted and its fingerprint logged.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        match &self.expected_host_key {
            Some(expected) if !fingerprint_matches(expected, &fingerprint) => {
                Err(HostKeyMismatch {
                    expected: expected.clone(),
                    actual: fingerprint,
                }
                .into())
            }
            Some(_) => {
                tracing::debug!("Host key verified against pinned fingerprint");
                Ok(true)
            }
            None => {
                tracing::info!("Accepting unpinned host key {}", fingerprint);
                Ok(true)
            }
        }
    }
}

/// Compare fingerprints, tolerating a `SHA256:` prefix on either side
fn fingerprint_matches(expected: &str, actual: &str) -> bool {
    let strip = |s: &str| s.trim().trim_start_matches("SHA256:").to_string();
    strip(expected) == strip(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_password_prompt() {
        let answers = answer_prompts(&["Password: "], "pw").unwrap();
        assert_eq!(answers, vec!["pw".to_string()]);
    }

    #[test]
    fn test_answer_mixed_prompts() {
        let answers = answer_prompts(&["Banner ack", "root's password:"], "pw").unwrap();
        assert_eq!(answers, vec![String::new(), "pw".to_string()]);
    }

    #[test]
    fn test_unanswerable_prompts() {
        assert!(answer_prompts(&["Verification code:"], "pw").is_none());
        assert_eq!(answer_prompts(&[], "pw"), Some(Vec::new()));
    }

    #[test]
    fn test_fingerprint_matches() {
        assert!(fingerprint_matches("SHA256:abc", "abc"));
        assert!(fingerprint_matches("abc", "SHA256:abc"));
        assert!(!fingerprint_matches("abc", "abd"));
    }
}
