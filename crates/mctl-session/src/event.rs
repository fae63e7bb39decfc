//! Events delivered to the presentation layer
//!
//! Background tasks never touch UI state. Everything they want to report is
//! sent as a [`ClientEvent`] over one bounded queue with a single consumer.

use tokio::sync::mpsc;

use mctl_core::{LookupKind, ScrapedEntry, SessionState};

use crate::approval::PendingApproval;

/// Sending half of the event queue
pub type EventSender = mpsc::Sender<ClientEvent>;

/// Receiving half of the event queue
pub type EventReceiver = mpsc::Receiver<ClientEvent>;

/// Create the event queue
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}

/// Everything the core reports asynchronously
#[derive(Debug)]
pub enum ClientEvent {
    /// Decoded text from the interactive shell, in arrival order
    Output(String),
    /// The connection state changed
    StateChanged(SessionState),
    /// The interactive shell ended
    SessionClosed { reason: String },
    /// A menu workflow completed
    WorkflowFinished(WorkflowReport),
    /// A transport failure forced a disconnect
    ChannelError { message: String },
    /// A new host key needs an accept/reject decision
    HostKeyApproval(PendingApproval),
}

/// Which workflow ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowKind {
    Kill { pids: Vec<u32> },
    Lookup { kind: LookupKind, query: String },
}

/// Result of a completed workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub workflow: WorkflowKind,
    /// Scraped rows; always empty for kills
    pub entries: Vec<ScrapedEntry>,
}
