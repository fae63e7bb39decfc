//! Application context
//!
//! [`RemoteConsole`] owns the connection, the interactive shell and the
//! process snapshot. Everything it wants to tell the presentation layer goes
//! out as [`ClientEvent`]s.

use std::sync::Arc;

use mctl_core::config::{AdminConfig, ClientConfig};
use mctl_core::history::HostHistory;
use mctl_core::{LookupKind, ProcessRecord, SessionState, VolatileFilter};

use crate::automation::MenuAutomation;
use crate::batch::{self, CommandReport};
use crate::error::{ChannelError, ConsoleError};
use crate::event::{ClientEvent, EventSender, WorkflowKind, WorkflowReport};
use crate::interactive::InteractiveSession;
use crate::inventory::Inventory;
use crate::transport::{ConnectTarget, Connector, RemoteChannel};

/// Lines that end the interactive shell when sent raw
const CLOSING_LINES: &[&str] = &["exit", "quit"];

struct Connection {
    host: String,
    channel: Box<dyn RemoteChannel>,
    interactive: Option<InteractiveSession>,
}

/// Drives one remote host at a time
pub struct RemoteConsole {
    config: ClientConfig,
    admin: AdminConfig,
    connector: Arc<dyn Connector>,
    events: EventSender,
    history: Option<HostHistory>,
    inventory: Inventory,
    state: SessionState,
    connection: Option<Connection>,
    snapshot: Vec<ProcessRecord>,
    volatile: VolatileFilter,
}

impl RemoteConsole {
    pub fn new(
        config: ClientConfig,
        admin: AdminConfig,
        connector: Arc<dyn Connector>,
        events: EventSender,
    ) -> Self {
        let inventory = Inventory::new(
            config.inventory.clone(),
            admin.permanent_filter(),
            config.exec_timeout,
        );

        Self {
            config,
            admin,
            connector,
            events,
            history: None,
            inventory,
            state: SessionState::Disconnected,
            connection: None,
            snapshot: Vec::new(),
            volatile: VolatileFilter::default(),
        }
    }

    /// Record successful connections in `history`
    pub fn with_history(mut self, history: HostHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn admin(&self) -> &AdminConfig {
        &self.admin
    }

    pub fn history(&self) -> Option<&HostHistory> {
        self.history.as_ref()
    }

    /// Host of the open connection
    pub fn host(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.host.as_str())
    }

    /// Last refreshed snapshot, permanent filter applied
    pub fn snapshot(&self) -> &[ProcessRecord] {
        &self.snapshot
    }

    /// Snapshot with the current volatile filter applied
    pub fn visible(&self) -> Vec<ProcessRecord> {
        self.volatile.apply(&self.snapshot)
    }

    /// Replace the admin settings and re-filter the current snapshot
    pub fn set_admin(&mut self, admin: AdminConfig) {
        let filter = admin.permanent_filter();
        self.snapshot = filter.apply(std::mem::take(&mut self.snapshot));
        self.inventory.set_filter(filter);
        self.admin = admin;
    }

    /// Open a channel to `target`, closing any existing connection first
    pub async fn connect(&mut self, target: &ConnectTarget) -> Result<(), ConsoleError> {
        if self.connection.is_some() {
            self.disconnect().await;
        }

        self.set_state(SessionState::Connecting).await;

        match self
            .connector
            .connect(target, self.config.connect_timeout)
            .await
        {
            Ok(channel) => {
                self.connection = Some(Connection {
                    host: target.host.clone(),
                    channel,
                    interactive: None,
                });
                if let Some(history) = self.history.as_mut() {
                    history.record(&target.host);
                }
                self.set_state(SessionState::Connected).await;
                Ok(())
            }
            Err(e) => {
                let err = ConsoleError::from(e);
                self.fail(&err).await;
                Err(err)
            }
        }
    }

    /// Close the shell and the channel. Does nothing when disconnected.
    pub async fn disconnect(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };

        self.set_state(SessionState::Closing).await;

        if let Some(mut session) = connection.interactive.take() {
            session.close(self.config.menu.timings.exit_grace).await;
        }
        if let Err(e) = connection.channel.close().await {
            tracing::debug!("Error closing connection to {}: {}", connection.host, e);
        }

        self.snapshot.clear();
        self.set_state(SessionState::Disconnected).await;
        tracing::info!("Disconnected from {}", connection.host);
    }

    /// Start the interactive shell on the open channel
    pub async fn open_interactive(&mut self) -> Result<(), ConsoleError> {
        self.reap_closed_session().await;

        let result = match self.connection.as_ref() {
            None => Err(ConsoleError::NotConnected),
            Some(connection) if connection.interactive.is_some() => {
                Err(ChannelError::SessionAlreadyActive.into())
            }
            Some(connection) => connection
                .channel
                .open_interactive(self.events.clone())
                .await
                .map_err(ConsoleError::from),
        };

        let session = self.guard(result).await?;
        if let Some(connection) = self.connection.as_mut() {
            connection.interactive = Some(session);
        }
        self.set_state(SessionState::InteractiveActive).await;
        Ok(())
    }

    /// Re-list remote processes; returns the snapshot with the volatile
    /// filter applied
    pub async fn refresh_inventory(&mut self) -> Result<Vec<ProcessRecord>, ConsoleError> {
        let result = match self.connection.as_ref() {
            None => Err(ConsoleError::NotConnected),
            Some(connection) => self
                .inventory
                .refresh(connection.channel.as_ref())
                .await
                .map_err(ConsoleError::from),
        };

        self.snapshot = self.guard(result).await?;
        Ok(self.visible())
    }

    /// Narrow the visible snapshot; the snapshot itself is untouched
    pub fn apply_volatile_filter(
        &mut self,
        user: Option<&str>,
        pid: Option<&str>,
        command: Option<&str>,
    ) -> Vec<ProcessRecord> {
        self.volatile = VolatileFilter::new(user, pid, command);
        self.visible()
    }

    pub fn clear_volatile_filter(&mut self) -> Vec<ProcessRecord> {
        self.volatile.clear();
        self.visible()
    }

    /// Kill `pids` through the remote menu
    pub async fn run_kill(&mut self, pids: &[u32]) -> Result<WorkflowReport, ConsoleError> {
        self.reap_closed_session().await;

        let result = match self.session() {
            Ok(session) => MenuAutomation::new(session, self.config.menu.timings)
                .kill_pids(pids)
                .await
                .map_err(ConsoleError::from),
            Err(e) => Err(e),
        };
        self.guard(result).await?;

        let report = WorkflowReport {
            workflow: WorkflowKind::Kill {
                pids: pids.to_vec(),
            },
            entries: Vec::new(),
        };
        self.publish(report.clone()).await;
        Ok(report)
    }

    /// Run a lookup through the remote menu and scrape the result
    pub async fn run_lookup(
        &mut self,
        kind: LookupKind,
        query: &str,
    ) -> Result<WorkflowReport, ConsoleError> {
        self.reap_closed_session().await;

        let base_path = match kind {
            LookupKind::ById => self.config.menu.work_path.clone(),
            LookupKind::ByScreen => self.config.menu.data_path.clone(),
        };

        let result = match self.session() {
            Ok(session) => MenuAutomation::new(session, self.config.menu.timings)
                .lookup(kind, query, &base_path)
                .await
                .map_err(ConsoleError::from),
            Err(e) => Err(e),
        };
        let entries = self.guard(result).await?;

        let report = WorkflowReport {
            workflow: WorkflowKind::Lookup {
                kind,
                query: query.trim().to_string(),
            },
            entries,
        };
        self.publish(report.clone()).await;
        Ok(report)
    }

    /// Send one line to the shell. `exit` and `quit` close it gracefully.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        self.reap_closed_session().await;

        let closing = CLOSING_LINES
            .iter()
            .any(|c| line.trim().eq_ignore_ascii_case(c));

        if closing {
            self.session()?;
            let grace = self.config.menu.timings.exit_grace;
            if let Some(mut session) = self
                .connection
                .as_mut()
                .and_then(|c| c.interactive.take())
            {
                session.close(grace).await;
            }
            self.set_state(SessionState::Connected).await;
            return Ok(());
        }

        let result = match self.session() {
            Ok(session) => session.send(line).await.map_err(ConsoleError::from),
            Err(e) => Err(e),
        };
        self.guard(result).await
    }

    /// Run one-shot commands in order
    pub async fn run_batch<S: AsRef<str>>(
        &mut self,
        commands: &[S],
    ) -> Result<Vec<CommandReport>, ConsoleError> {
        let result = match self.connection.as_ref() {
            None => Err(ConsoleError::NotConnected),
            Some(connection) => batch::run_batch(
                connection.channel.as_ref(),
                commands,
                self.config.exec_timeout,
            )
            .await
            .map_err(ConsoleError::from),
        };
        self.guard(result).await
    }

    fn session(&self) -> Result<&InteractiveSession, ConsoleError> {
        let connection = self.connection.as_ref().ok_or(ConsoleError::NotConnected)?;
        connection
            .interactive
            .as_ref()
            .ok_or(ConsoleError::NoInteractiveSession)
    }

    /// Drop a shell that ended on its own
    async fn reap_closed_session(&mut self) {
        let ended = self
            .connection
            .as_mut()
            .filter(|c| c.interactive.as_ref().is_some_and(|s| s.is_closed()))
            .and_then(|c| c.interactive.take());

        if let Some(mut session) = ended {
            session.shutdown().await;
            self.set_state(SessionState::Connected).await;
        }
    }

    /// Tear down on transport errors, pass everything through
    async fn guard<T>(&mut self, result: Result<T, ConsoleError>) -> Result<T, ConsoleError> {
        if let Err(e) = &result {
            if e.is_transport() {
                self.fail(e).await;
            }
        }
        result
    }

    async fn fail(&mut self, err: &ConsoleError) {
        tracing::error!("{}", err);

        if let Some(mut connection) = self.connection.take() {
            if let Some(mut session) = connection.interactive.take() {
                session.shutdown().await;
            }
            if let Err(e) = connection.channel.close().await {
                tracing::debug!("Error closing connection to {}: {}", connection.host, e);
            }
        }
        self.snapshot.clear();

        self.set_state(SessionState::Disconnected).await;
        let _ = self
            .events
            .send(ClientEvent::ChannelError {
                message: err.to_string(),
            })
            .await;
    }

    async fn publish(&self, report: WorkflowReport) {
        let _ = self
            .events
            .send(ClientEvent::WorkflowFinished(report))
            .await;
    }

    async fn set_state(&mut self, state: SessionState) {
        if self.state == state {
            return;
        }
        tracing::debug!("State: {} -> {}", self.state, state);
        self.state = state;
        let _ = self.events.send(ClientEvent::StateChanged(state)).await;
    }
}
