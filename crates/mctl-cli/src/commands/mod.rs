//! CLI command implementations

mod config;
mod exec;
mod kill;
mod lookup;
mod ps;
mod shell;

pub use config::{config_get, config_init, config_path, config_set, config_show};
pub use exec::exec_command;
pub use kill::kill_command;
pub use lookup::lookup_command;
pub use ps::ps_command;
pub use shell::shell_command;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use mctl_core::config::{self as core_config, AdminConfig, ClientConfig};
use mctl_core::error::ConfigError;
use mctl_core::history::HostHistory;
use mctl_core::TrustStore;
use mctl_session::{
    event_channel, ApprovalDecision, ClientEvent, ConnectTarget, EventReceiver, HostKeyApprover,
    RemoteConsole, SshConnector, StaticApprover,
};

use crate::approver::TerminalApprover;
use crate::output::print_info;

/// Where the local configuration lives
#[derive(Debug, Clone, Default)]
pub struct Paths {
    pub config: Option<PathBuf>,
    pub admin: Option<PathBuf>,
}

impl Paths {
    pub fn config(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(core_config::default_config_path)
    }

    pub fn admin(&self) -> PathBuf {
        self.admin
            .clone()
            .unwrap_or_else(core_config::default_admin_config_path)
    }

    /// Client configuration; a missing file means defaults
    pub fn load_client_config(&self) -> Result<ClientConfig> {
        let path = self.config();
        match core_config::load_config(&path) {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(ClientConfig::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to load config from {:?}", path)),
        }
    }
}

/// Connection options shared by all remote commands
#[derive(Debug, Clone, Default)]
pub struct RemoteOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub accept_new_host: bool,
}

/// A connected console plus the task printing its events
pub struct Remote {
    pub console: RemoteConsole,
    printer: JoinHandle<()>,
}

impl Remote {
    /// Disconnect and wait for the last events to be printed
    pub async fn finish(mut self) {
        self.console.disconnect().await;
        drop(self.console);
        let _ = self.printer.await;
    }
}

/// Load configuration, connect, and start printing events.
///
/// With `echo` set, shell output is copied to stdout.
pub async fn connect(paths: &Paths, options: &RemoteOptions, echo: bool) -> Result<Remote> {
    let config = paths.load_client_config()?;
    let admin = AdminConfig::load_or_default(&paths.admin());
    let history = HostHistory::load(core_config::default_history_path());

    let host = options
        .host
        .clone()
        .or_else(|| history.last().map(str::to_string))
        .context("No host given and no previous host in history (use --host)")?;
    let user = options
        .user
        .clone()
        .context("No user given (use --user)")?;
    let password = options
        .password
        .clone()
        .context("No password given (use --password or MENUCTL_PASSWORD)")?;
    let port = options.port.unwrap_or(config.default_port);

    let trust = TrustStore::load(&config.known_hosts_path)
        .with_context(|| format!("Failed to load {:?}", config.known_hosts_path))?;
    let approver: Arc<dyn HostKeyApprover> = if options.accept_new_host {
        Arc::new(StaticApprover(ApprovalDecision::Accept { remember: true }))
    } else {
        Arc::new(TerminalApprover)
    };

    let (events, rx) = event_channel(config.event_capacity);
    let printer = spawn_event_printer(rx, echo);

    let connector = Arc::new(SshConnector::new(trust, approver));
    let mut console =
        RemoteConsole::new(config, admin, connector, events).with_history(history);

    print_info(&format!("Connecting to {}:{} as {}...", host, port, user));
    let target = ConnectTarget::new(host.as_str(), port, user, password);
    console
        .connect(&target)
        .await
        .with_context(|| format!("Failed to connect to {}", host))?;

    Ok(Remote { console, printer })
}

fn spawn_event_printer(mut rx: EventReceiver, echo: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ClientEvent::Output(text) => {
                    if echo {
                        let mut stdout = std::io::stdout();
                        let _ = stdout.write_all(text.as_bytes());
                        let _ = stdout.flush();
                    }
                }
                ClientEvent::StateChanged(state) => tracing::debug!("Connection {}", state),
                ClientEvent::SessionClosed { reason } => {
                    tracing::info!("Remote shell closed: {}", reason)
                }
                ClientEvent::WorkflowFinished(report) => {
                    tracing::debug!("Workflow finished: {:?}", report.workflow)
                }
                ClientEvent::ChannelError { message } => {
                    tracing::warn!("Connection lost: {}", message)
                }
                ClientEvent::HostKeyApproval(pending) => {
                    // The terminal approver answers directly; nothing should queue here
                    pending.respond(ApprovalDecision::Reject);
                }
            }
        }
    })
}
