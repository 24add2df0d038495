//! Message types for the relay broker

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use super::error::RelayError;
use super::handle::{QueryTicket, Subscription};

/// Interaction categories the broker understands
///
/// Fixed, small, closed set: every caller action and every inbound broadcast
/// resolves to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    /// One-shot: which drawings does the viewer know for an equipment id
    CheckEquipment,

    /// One-shot: does the viewer know a drawing id
    CheckDrawing,

    /// Persistent: the viewer asked the shell to open an app
    OpenHostApp,

    /// Persistent: the user selected an object on the viewer screen
    EquipmentSelected,
}

impl RequestKind {
    /// Whether unsolicited events of this kind are cached one-deep while no
    /// subscriber is armed
    pub fn backlogs(&self) -> bool {
        matches!(self, RequestKind::OpenHostApp)
    }
}

/// Aggregated outcome of a one-shot query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyPayload {
    /// Ordered opaque string tokens; order is caller-meaningful
    Tokens(Vec<String>),

    /// Boolean outcome
    Outcome(bool),
}

impl ReplyPayload {
    /// JSON shape crossing the callback bridge
    pub fn to_value(&self) -> Value {
        match self {
            ReplyPayload::Tokens(tokens) => Value::Array(tokens.iter().cloned().map(Value::String).collect()),
            ReplyPayload::Outcome(outcome) => Value::Bool(*outcome),
        }
    }
}

/// Requests into the relay dispatcher task
#[derive(Debug)]
pub enum RelayRequest {
    /// A named caller action from the embedded UI layer
    Action {
        name: String,
        args: Vec<Value>,
        reply_tx: oneshot::Sender<DispatchReply>,
    },

    /// Stop the dispatcher
    Shutdown,
}

/// Immediate outcome of a dispatched action
///
/// The dispatcher always answers right away: data now, a ticket for later, an
/// armed subscription stream, or a rejection.
#[derive(Debug)]
pub enum DispatchReply {
    /// Fire-and-forget action completed
    Done(Value),

    /// Query accepted; the ticket resolves with the reply later
    Pending(QueryTicket),

    /// Subscription armed; pushes arrive on the stream
    Subscribed(Subscription),

    /// The action was rejected
    Failed(RelayError),
}
