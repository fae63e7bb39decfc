//! SSH transport
//!
//! Password-authenticated russh client. The server's host key is checked
//! against the [`TrustStore`] during the handshake, asking the
//! [`HostKeyApprover`] about keys that have never been seen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use russh_keys::PublicKeyBase64;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use mctl_core::{PresentedKey, TrustDecision, TrustStore};

use super::{CommandExecutor, ConnectTarget, Connector, ExecOutput, RemoteChannel};
use crate::approval::{ApprovalDecision, ApprovalRequest, HostKeyApprover};
use crate::error::ChannelError;
use crate::event::EventSender;
use crate::interactive::{InteractiveSession, InteractiveSlot};

/// SSH extended data type for stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Terminal requested for the interactive shell
const PTY_TERM: &str = "xterm";
const PTY_COLUMNS: u32 = 80;
const PTY_ROWS: u32 = 24;

/// Opens SSH connections that share one trust store
pub struct SshConnector {
    trust: Arc<Mutex<TrustStore>>,
    approver: Arc<dyn HostKeyApprover>,
}

impl SshConnector {
    pub fn new(trust: TrustStore, approver: Arc<dyn HostKeyApprover>) -> Self {
        Self {
            trust: Arc::new(Mutex::new(trust)),
            approver,
        }
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(
        &self,
        target: &ConnectTarget,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteChannel>, ChannelError> {
        tracing::debug!("Connecting to {}:{}", target.host, target.port);

        let stream = tokio::time::timeout(
            timeout,
            TcpStream::connect((target.host.as_str(), target.port)),
        )
        .await
        .map_err(|_| ChannelError::Timeout {
            operation: format!("Connecting to {}:{}", target.host, target.port),
            after: timeout,
        })??;

        let handler = TrustingHandler {
            host: target.host.clone(),
            port: target.port,
            trust: Arc::clone(&self.trust),
            approver: Arc::clone(&self.approver),
        };

        // Not bounded by `timeout`: the host key decision may wait on a human
        let mut handle = client::connect_stream(Arc::new(Config::default()), stream, handler).await?;

        tracing::debug!("Authenticating as user '{}'", target.user);
        let authenticated = tokio::time::timeout(
            timeout,
            handle.authenticate_password(&target.user, &target.password),
        )
        .await
        .map_err(|_| ChannelError::Timeout {
            operation: "Authentication".to_string(),
            after: timeout,
        })??;

        if !authenticated {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "authentication failed", "en")
                .await;
            return Err(ChannelError::AuthFailure {
                user: target.user.clone(),
            });
        }

        tracing::info!(
            "Connected to {}:{} as {}",
            target.host,
            target.port,
            target.user
        );

        Ok(Box::new(SshChannel {
            handle,
            slot: InteractiveSlot::new(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// An authenticated SSH connection
pub struct SshChannel {
    handle: Handle<TrustingHandler>,
    slot: InteractiveSlot,
    closed: AtomicBool,
}

impl SshChannel {
    fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Acquire) || self.handle.is_closed() {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    async fn run(&self, command: &str) -> Result<ExecOutput, ChannelError> {
        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                _ => {}
            }
        }

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
        })
    }
}

#[async_trait]
impl CommandExecutor for SshChannel {
    async fn exec(&self, command: &str, timeout: Duration) -> Result<ExecOutput, ChannelError> {
        self.ensure_open()?;
        tracing::debug!("exec: {}", command);

        tokio::time::timeout(timeout, self.run(command))
            .await
            .map_err(|_| ChannelError::Timeout {
                operation: format!("Command '{}'", command),
                after: timeout,
            })?
    }
}

#[async_trait]
impl RemoteChannel for SshChannel {
    async fn open_interactive(
        &self,
        events: EventSender,
    ) -> Result<InteractiveSession, ChannelError> {
        self.ensure_open()?;
        let lease = self.slot.try_acquire()?;

        let channel = self.handle.channel_open_session().await?;
        channel
            .request_pty(false, PTY_TERM, PTY_COLUMNS, PTY_ROWS, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        tracing::debug!("Interactive shell started");

        let (reader, writer) = tokio::io::split(channel.into_stream());
        Ok(InteractiveSession::spawn(
            reader,
            Box::new(writer),
            events,
            Some(lease),
        ))
    }

    async fn close(&self) -> Result<(), ChannelError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if self.handle.is_closed() {
            return Ok(());
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "closing", "en")
            .await?;
        tracing::debug!("SSH connection closed");
        Ok(())
    }
}

/// russh handler that consults the trust store
struct TrustingHandler {
    host: String,
    port: u16,
    trust: Arc<Mutex<TrustStore>>,
    approver: Arc<dyn HostKeyApprover>,
}

#[async_trait]
impl client::Handler for TrustingHandler {
    type Error = ChannelError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let key = PresentedKey::new(server_public_key.name(), server_public_key.public_key_bytes());

        // Held across the approval so decisions are serialized
        let mut trust = self.trust.lock().await;
        decide_trust(&mut trust, &self.host, self.port, &key, self.approver.as_ref()).await
    }
}

/// Accept or refuse `key` for `host:port`, asking `approver` about keys the
/// store has never seen. A remembered approval that cannot be written is
/// still trusted for this process.
pub async fn decide_trust(
    trust: &mut TrustStore,
    host: &str,
    port: u16,
    key: &PresentedKey,
    approver: &dyn HostKeyApprover,
) -> Result<bool, ChannelError> {
    match trust.verify(host, port, key) {
        TrustDecision::Trusted => {
            tracing::debug!("Host key for {} is known", host);
            Ok(true)
        }
        TrustDecision::KeyChanged {
            expected,
            presented,
        } => {
            tracing::error!(
                "Host key for {} changed: expected SHA256:{}, got SHA256:{}",
                host,
                expected,
                presented
            );
            Err(ChannelError::HostRejected {
                host: host.to_string(),
                reason: format!(
                    "host key changed (expected SHA256:{}, presented SHA256:{})",
                    expected, presented
                ),
            })
        }
        TrustDecision::RequiresApproval { fingerprint } => {
            let request = ApprovalRequest {
                host: host.to_string(),
                port,
                key_type: key.key_type.clone(),
                fingerprint,
            };

            match approver.decide(request).await {
                ApprovalDecision::Accept { remember } => {
                    if let Err(e) = trust.approve(host, port, key, remember) {
                        tracing::warn!("Could not remember host key: {}", e);
                    }
                    Ok(true)
                }
                ApprovalDecision::Reject => Err(ChannelError::HostRejected {
                    host: host.to_string(),
                    reason: "host key not accepted".to_string(),
                }),
            }
        }
    }
}
