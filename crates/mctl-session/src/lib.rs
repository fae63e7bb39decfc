//! mctl-session: SSH channel, interactive shell and menu automation
//!
//! Connects to a remote host with password authentication, verifies its
//! host key against a trust-on-first-use store, and drives the remote admin
//! menu through an interactive shell. [`RemoteConsole`] ties it together and
//! reports progress as [`ClientEvent`]s.

pub mod approval;
pub mod automation;
pub mod batch;
pub mod capture;
pub mod console;
pub mod decode;
pub mod error;
pub mod event;
pub mod interactive;
pub mod inventory;
pub mod transport;

pub use approval::{
    ApprovalDecision, ApprovalRequest, ChannelApprover, HostKeyApprover, PendingApproval,
    StaticApprover,
};
pub use automation::MenuAutomation;
pub use batch::{run_batch, CommandReport};
pub use capture::{CaptureWindow, Captured};
pub use console::RemoteConsole;
pub use error::{ChannelError, ConsoleError, InventoryError, SessionError, WorkflowError};
pub use event::{event_channel, ClientEvent, EventReceiver, EventSender, WorkflowKind, WorkflowReport};
pub use interactive::{InteractiveSession, InteractiveSlot, SlotLease};
pub use inventory::Inventory;
pub use transport::{
    CommandExecutor, ConnectTarget, Connector, ExecOutput, RemoteChannel, SshChannel, SshConnector,
};
