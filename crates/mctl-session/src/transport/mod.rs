//! Remote channel abstraction
//!
//! The console only talks to these traits. [`ssh`] provides the real
//! implementation; tests plug in in-memory fakes.

pub mod ssh;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::event::EventSender;
use crate::interactive::InteractiveSession;

pub use ssh::{decide_trust, SshChannel, SshConnector};

/// Where and as whom to connect
#[derive(Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl ConnectTarget {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a one-shot command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Missing when the server closed the channel without reporting one
    pub exit_code: Option<u32>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one-shot commands
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` on its own sub-channel, failing after `timeout`
    async fn exec(&self, command: &str, timeout: Duration) -> Result<ExecOutput, ChannelError>;
}

/// An authenticated connection to a remote host
#[async_trait]
pub trait RemoteChannel: CommandExecutor {
    /// Request a PTY and shell. Fails with `SessionAlreadyActive` while a
    /// previous session on this channel is still running.
    async fn open_interactive(
        &self,
        events: EventSender,
    ) -> Result<InteractiveSession, ChannelError>;

    /// Release the connection. Idempotent.
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Opens [`RemoteChannel`]s
#[async_trait]
pub trait Connector: Send + Sync {
    /// `timeout` bounds the TCP connect and the authentication, not the
    /// host key decision.
    async fn connect(
        &self,
        target: &ConnectTarget,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteChannel>, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let target = ConnectTarget::new("srv01", 22, "operator", "hunter2");
        let shown = format!("{:?}", target);
        assert!(shown.contains("srv01"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_exec_success_requires_zero_status() {
        let mut output = ExecOutput::default();
        assert!(!output.success());
        output.exit_code = Some(0);
        assert!(output.success());
        output.exit_code = Some(1);
        assert!(!output.success());
    }
}
