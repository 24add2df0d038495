//! Broadcast transport between the shell app and the external viewer
//!
//! Models the platform's inter-process messaging as an in-process ordered
//! bus: a broadcast message is a wire action name plus a JSON extras map, and
//! ordered delivery walks a priority-sorted receiver list sharing one
//! mutable reply bundle.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod fanout;
pub mod inbound;
pub mod platform;

pub use fanout::{Broadcast, BroadcastReceiver, OrderedBus, ReplyBundle, TransportError};
pub use inbound::{CheckObjectReceiver, LandingHandler};
pub use platform::{HostPlatform, LoggingPlatform, PlatformCall, RecordingPlatform};

/// Wire action names and extras keys
///
/// Every request kind carries its own action constant; nothing reuses an
/// extras key as an action name.
pub mod wire {
    /// Launch the viewer and show a drawing/equipment payload
    pub const ACTION_OPEN_DRAWING: &str = "drawbridge.action.OPEN_DRAWING";

    /// Ask the viewer which drawings it knows for an equipment id
    pub const ACTION_CHECK_EQUIPMENT: &str = "drawbridge.action.CHECK_EQUIPMENT";

    /// Ask the viewer whether it knows a drawing id
    pub const ACTION_CHECK_DRAWING: &str = "drawbridge.action.CHECK_DRAWING";

    /// Announce a capability the shell app can execute
    pub const ACTION_SUPPORTED_INFO: &str = "drawbridge.action.SUPPORTED_INFO";

    /// Callback action the viewer uses to reach back into the shell app
    pub const ACTION_CALL_HOST: &str = "drawbridge.action.CALL_HOST";

    pub const EXTRA_EQUIPMENT_ID: &str = "drawbridge.extra.equipmentId";
    pub const EXTRA_DRAWING_ID: &str = "drawbridge.extra.drawingId";
    pub const EXTRA_PAYLOAD: &str = "drawbridge.extra.PAYLOAD";
    pub const EXTRA_SUPPORTED_INFO: &str = "drawbridge.extra.SUPPORTED_INFO";
}

/// A broadcast message: wire action plus JSON extras
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub action: String,

    #[serde(default)]
    pub extras: serde_json::Map<String, Value>,
}

impl Message {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            extras: serde_json::Map::new(),
        }
    }

    /// Attach an extra, builder style
    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extras.insert(key.to_string(), value.into());
        self
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extras.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_builder() {
        let message = Message::new(wire::ACTION_CHECK_EQUIPMENT).with_extra(wire::EXTRA_EQUIPMENT_ID, "E1");

        assert_eq!(message.action, wire::ACTION_CHECK_EQUIPMENT);
        assert_eq!(message.extra_str(wire::EXTRA_EQUIPMENT_ID), Some("E1"));
        assert!(message.extra(wire::EXTRA_DRAWING_ID).is_none());
    }

    #[test]
    fn test_extra_str_rejects_non_string() {
        let message = Message::new(wire::ACTION_OPEN_DRAWING).with_extra(wire::EXTRA_PAYLOAD, 42);

        assert!(message.extra_str(wire::EXTRA_PAYLOAD).is_none());
        assert_eq!(message.extra(wire::EXTRA_PAYLOAD), Some(&serde_json::json!(42)));
    }

    #[test]
    fn test_message_serialization_roundtrip() {
        let message = Message::new(wire::ACTION_CHECK_DRAWING).with_extra(wire::EXTRA_DRAWING_ID, "D7");

        let json = serde_json::to_string(&message).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
    }
}
