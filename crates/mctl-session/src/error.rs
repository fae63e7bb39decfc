//! Error types for channels, sessions and workflows

use std::time::Duration;

use thiserror::Error;

/// Failures establishing or using the SSH channel
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Host key was refused by the operator or has changed
    #[error("Host {host} rejected: {reason}")]
    HostRejected { host: String, reason: String },

    /// Password authentication was refused
    #[error("Authentication failed for user '{user}'")]
    AuthFailure { user: String },

    /// SSH protocol error
    #[error("SSH error: {0}")]
    Protocol(String),

    /// An operation did not finish in time
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// The channel already has a live interactive session
    #[error("An interactive session is already active on this channel")]
    SessionAlreadyActive,

    /// The channel was closed
    #[error("Channel is closed")]
    Closed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<russh::Error> for ChannelError {
    fn from(e: russh::Error) -> Self {
        ChannelError::Protocol(e.to_string())
    }
}

/// Failures on an interactive session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The remote shell ended or the session was closed
    #[error("Interactive session is closed")]
    ChannelUnusable,

    /// Only one capture window may be open at a time
    #[error("A capture window is already open")]
    CaptureAlreadyOpen,

    /// Writing to the remote shell failed
    #[error("Failed to write to remote shell: {0}")]
    WriteFailed(#[source] std::io::Error),
}

/// Failures while scripting the remote menu
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Kill was requested without any PID
    #[error("No PID specified")]
    EmptyPidList,

    /// The channel failed part-way through
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// Another workflow holds the capture window
    #[error("Another workflow is capturing output")]
    CaptureBusy,
}

impl From<SessionError> for WorkflowError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::CaptureAlreadyOpen => WorkflowError::CaptureBusy,
            other => WorkflowError::Disconnected(other.to_string()),
        }
    }
}

/// Failures refreshing the process inventory
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The listing command wrote to stderr
    #[error("Listing processes failed: {0}")]
    RemoteCommand(String),

    /// Channel error
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors surfaced by [`crate::RemoteConsole`]
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// No connection is open
    #[error("Not connected")]
    NotConnected,

    /// Connected, but the interactive shell is not running
    #[error("Interactive session is not active")]
    NoInteractiveSession,
}

impl ConsoleError {
    /// Whether the error means the connection can no longer be used
    pub fn is_transport(&self) -> bool {
        match self {
            ConsoleError::Channel(ChannelError::SessionAlreadyActive) => false,
            ConsoleError::Channel(_) => true,
            ConsoleError::Session(SessionError::CaptureAlreadyOpen) => false,
            ConsoleError::Session(_) => true,
            ConsoleError::Workflow(WorkflowError::Disconnected(_)) => true,
            ConsoleError::Workflow(_) => false,
            ConsoleError::Inventory(InventoryError::Channel(_)) => true,
            ConsoleError::Inventory(_) => false,
            ConsoleError::NotConnected | ConsoleError::NoInteractiveSession => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_maps_to_workflow_error() {
        assert!(matches!(
            WorkflowError::from(SessionError::CaptureAlreadyOpen),
            WorkflowError::CaptureBusy
        ));
        assert!(matches!(
            WorkflowError::from(SessionError::ChannelUnusable),
            WorkflowError::Disconnected(_)
        ));
    }

    #[test]
    fn test_transport_classification() {
        assert!(ConsoleError::Channel(ChannelError::Closed).is_transport());
        assert!(ConsoleError::Workflow(WorkflowError::Disconnected("eof".into())).is_transport());
        assert!(!ConsoleError::Workflow(WorkflowError::EmptyPidList).is_transport());
        assert!(!ConsoleError::Inventory(InventoryError::RemoteCommand("x".into())).is_transport());
        assert!(!ConsoleError::Channel(ChannelError::SessionAlreadyActive).is_transport());
    }

    #[test]
    fn test_errors_carry_cause_text() {
        let err = ConsoleError::from(InventoryError::RemoteCommand(
            "ps: command not found".into(),
        ));
        assert!(err.to_string().contains("ps: command not found"));
    }
}
