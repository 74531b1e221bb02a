//! Remote shell traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{ConnectionError, SessionError};
use crate::types::{CommandOutput, TargetHost};

/// An authenticated remote-shell session to one host
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run one command to completion.
    ///
    /// `stdin`, when given, is written to the command's standard input
    /// followed by EOF.
    async fn exec(&self, command: &str, stdin: Option<&[u8]>)
        -> Result<CommandOutput, SessionError>;

    /// Close the session. Errors are swallowed; closing is best effort.
    async fn close(&self);
}

/// Opens remote-shell sessions
#[async_trait]
pub trait ShellConnector: Send + Sync {
    async fn connect(&self, target: &TargetHost) -> Result<Arc<dyn RemoteShell>, ConnectionError>;
}
