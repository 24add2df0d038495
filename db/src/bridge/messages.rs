//! Bridge wire protocol
//!
//! JSON-over-newline, one message per line. The embedded UI layer (or the
//! `db send` client standing in for it) writes requests; the daemon answers
//! with an immediate status line, then pushes deferred results and
//! subscription events as further lines on the same connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound event name: the viewer announced an equipment selection
pub const EVENT_EQUIPMENT_SELECTED: &str = "equipment-selected";

/// Inbound event name: the viewer asked the shell to open an app
pub const EVENT_OPEN_HOST_APP: &str = "open-host-app";

/// Requests from the UI layer (or the external-viewer side) to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireRequest {
    /// A named caller action with ordered arguments
    Action {
        action: String,
        #[serde(default)]
        args: Vec<Value>,
    },

    /// An unsolicited event, as the external viewer process would send it
    Deliver {
        event: String,
        #[serde(default)]
        payload: Value,
    },
}

/// Responses and pushes from the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum WireResponse {
    /// Immediate success with data
    Ok { data: Value },

    /// Query accepted; a `result` line with the same request id follows
    Pending { request: String },

    /// Deferred completion of a pending query
    Result { request: String, data: Value },

    /// Subscription armed; zero or more `event` lines follow
    Armed,

    /// Subscription push
    Event { data: Value },

    /// Rejection or failure
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request: Option<String>,
    },
}
