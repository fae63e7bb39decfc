//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the remote process table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Owning user as printed by the remote `ps`
    pub user: String,
    /// Process id
    pub pid: u32,
    /// Value of the configured metric column
    pub metric: String,
    /// Command line (free text, may contain whitespace)
    pub command: String,
}

/// A `user pid label` triple scraped from menu output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedEntry {
    pub user: String,
    pub pid: u32,
    pub label: String,
}

impl ScrapedEntry {
    /// Create a new entry
    pub fn new(user: impl Into<String>, pid: u32, label: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pid,
            label: label.into(),
        }
    }
}

/// Connection lifecycle state of the application context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No channel is open
    Disconnected,
    /// Handshake, host key approval or authentication in progress
    Connecting,
    /// Channel is open, no interactive session
    Connected,
    /// Channel is open and the interactive shell is running
    InteractiveActive,
    /// Teardown in progress
    Closing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::InteractiveActive => write!(f, "interactive"),
            SessionState::Closing => write!(f, "closing"),
        }
    }
}

/// Which lookup the remote menu should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupKind {
    /// Search the work directory by id (registration/manifest number)
    ById,
    /// Search the data directory by screen name
    ByScreen,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::ById => write!(f, "id"),
            LookupKind::ByScreen => write!(f, "screen"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_display() {
        assert_eq!(format!("{}", SessionState::InteractiveActive), "interactive");
        assert_eq!(
            format!("{}", SessionState::Disconnected),
            "disconnected"
        );
    }
}
