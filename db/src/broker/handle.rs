//! Caller-side handles for deferred replies and subscription pushes
//!
//! A query produces a `PendingHandle` (broker side, completed at most once)
//! paired with a `QueryTicket` (caller side, a future resolved by that
//! completion). A subscription produces a `SubscriptionHandle` (broker side,
//! notified zero-to-many times) paired with a `Subscription` stream.

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::error::RelayError;
use super::messages::{ReplyPayload, RequestKind};

/// One-shot completion side of an in-flight query
///
/// Completion consumes the handle, so a handle can never fire twice. An
/// overwritten handle is simply dropped and its ticket learns it was
/// superseded.
#[derive(Debug)]
pub struct PendingHandle {
    kind: RequestKind,
    request_id: String,
    created_at: Instant,
    tx: oneshot::Sender<Result<ReplyPayload, RelayError>>,
}

impl PendingHandle {
    /// Create a handle/ticket pair for a new query
    pub fn new(kind: RequestKind, request_id: impl Into<String>) -> (Self, QueryTicket) {
        let request_id = request_id.into();
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            kind,
            request_id: request_id.clone(),
            created_at: Instant::now(),
            tx,
        };
        let ticket = QueryTicket {
            kind,
            request_id,
            rx,
        };
        (handle, ticket)
    }

    /// The request kind this handle answers
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Identity of the request this handle was issued for
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// How long this handle has been waiting; used when logging stuck or
    /// abandoned handles
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Complete the handle with the aggregated reply
    pub fn complete(self, payload: ReplyPayload) {
        debug!(kind = ?self.kind, request_id = %self.request_id, "Completing pending handle");
        // The ticket may have been dropped; a completion with no listener is fine
        let _ = self.tx.send(Ok(payload));
    }

    /// Complete the handle with an error signal
    pub fn fail(self, error: RelayError) {
        debug!(kind = ?self.kind, request_id = %self.request_id, %error, "Failing pending handle");
        let _ = self.tx.send(Err(error));
    }
}

/// Caller-side future for a one-shot query
///
/// Resolves exactly once when the pending handle completes. If the handle was
/// abandoned by a newer query for the same kind, `wait` yields
/// [`RelayError::Superseded`]. Dropping the ticket is the caller-side
/// cancellation: the eventual completion becomes a no-op.
#[derive(Debug)]
pub struct QueryTicket {
    kind: RequestKind,
    request_id: String,
    rx: oneshot::Receiver<Result<ReplyPayload, RelayError>>,
}

impl QueryTicket {
    /// The request kind this ticket tracks
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Identity of the request, echoed on the wire so callers can correlate
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the reply
    pub async fn wait(self) -> Result<ReplyPayload, RelayError> {
        self.rx.await.map_err(|_| RelayError::Superseded)?
    }
}

/// Reusable notification side of a subscription
///
/// Cloneable so the correlation store can hand out the sender without giving
/// up its own copy.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    kind: RequestKind,
    tx: mpsc::UnboundedSender<Value>,
}

impl SubscriptionHandle {
    /// Create a handle/stream pair for a new subscription
    pub fn new(kind: RequestKind) -> (Self, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { kind, tx }, Subscription { kind, rx })
    }

    /// The request kind this handle notifies
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Whether the subscriber is still listening
    pub fn is_active(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Push a payload to the subscriber; returns false if the stream is gone
    pub fn notify(&self, payload: Value) -> bool {
        self.tx.send(payload).is_ok()
    }
}

/// Caller-side stream of subscription pushes
#[derive(Debug)]
pub struct Subscription {
    kind: RequestKind,
    rx: mpsc::UnboundedReceiver<Value>,
}

impl Subscription {
    /// The request kind this subscription receives
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Wait for the next push; None once the broker side is gone
    pub async fn next(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Take a push without waiting, if one is already buffered
    pub fn try_next(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }
}
