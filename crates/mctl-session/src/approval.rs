//! Host key approval
//!
//! When the trust store has never seen a server's key, the handshake waits on
//! a [`HostKeyApprover`]. The decision is an ordinary async call, so the
//! presentation layer can answer it whenever it likes.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::event::{ClientEvent, EventSender};

/// Details shown to the operator for an unknown key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub host: String,
    pub port: u16,
    pub key_type: String,
    /// SHA-256 fingerprint, base64 without padding
    pub fingerprint: String,
}

/// The operator's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Trust the key; `remember` also appends it to known_hosts
    Accept { remember: bool },
    Reject,
}

/// Decides whether an unknown host key may be trusted
#[async_trait]
pub trait HostKeyApprover: Send + Sync {
    async fn decide(&self, request: ApprovalRequest) -> ApprovalDecision;
}

/// Always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct StaticApprover(pub ApprovalDecision);

#[async_trait]
impl HostKeyApprover for StaticApprover {
    async fn decide(&self, request: ApprovalRequest) -> ApprovalDecision {
        tracing::debug!(
            "Answering {:?} for {} key of {}:{}",
            self.0,
            request.key_type,
            request.host,
            request.port
        );
        self.0
    }
}

/// A request waiting for an answer from the event consumer
#[derive(Debug)]
pub struct PendingApproval {
    pub request: ApprovalRequest,
    responder: oneshot::Sender<ApprovalDecision>,
}

impl PendingApproval {
    /// Answer the request. Dropping it without answering rejects the key.
    pub fn respond(self, decision: ApprovalDecision) {
        let _ = self.responder.send(decision);
    }
}

/// Forwards requests over the event queue as [`ClientEvent::HostKeyApproval`].
///
/// The consumer must run on a different task than the one connecting,
/// otherwise the handshake waits forever.
#[derive(Debug, Clone)]
pub struct ChannelApprover {
    events: EventSender,
}

impl ChannelApprover {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

#[async_trait]
impl HostKeyApprover for ChannelApprover {
    async fn decide(&self, request: ApprovalRequest) -> ApprovalDecision {
        let (responder, response) = oneshot::channel();
        let pending = PendingApproval {
            request,
            responder,
        };

        if self
            .events
            .send(ClientEvent::HostKeyApproval(pending))
            .await
            .is_err()
        {
            tracing::warn!("No event consumer for host key approval, rejecting");
            return ApprovalDecision::Reject;
        }

        response.await.unwrap_or(ApprovalDecision::Reject)
    }
}
