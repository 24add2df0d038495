//! Static action table
//!
//! The mapping from caller action name to request kind, channel type, and
//! outbound wire action is fixed at compile time; nothing here is discovered
//! at runtime.

use super::messages::RequestKind;
use crate::transport::wire;

/// How an action is carried to the other side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    /// One-shot query with a deferred reply
    Query,

    /// Persistent subscription
    Subscription,

    /// Fire-and-forget, immediate outcome
    FireAndForget,
}

/// One row of the action table
#[derive(Debug)]
pub struct ActionSpec {
    pub name: &'static str,
    pub channel: ChannelType,
    pub kind: Option<RequestKind>,
    /// Required argument count; checked before anything else runs
    pub arity: usize,
}

pub const SHOW_EQUIPMENT: &str = "show-equipment";
pub const SHOW_DRAWING: &str = "show-drawing";
pub const SHOW_DATA: &str = "show-data";
pub const CAN_SHOW_EQUIPMENT: &str = "can-show-equipment";
pub const CAN_SHOW_DRAWING: &str = "can-show-drawing";
pub const SUBSCRIBE_CHECK_OBJECT_ACTION: &str = "subscribe-check-object-action";
pub const NOTIFY_ACTION_AVAILABLE: &str = "notify-action-available";
pub const REGISTER_DEFAULT_ACTIONS: &str = "register-default-actions";
pub const SUBSCRIBE_OPEN_EXTERNAL_APP: &str = "subscribe-open-external-app";
pub const RETURN_TO_CALLER_APP: &str = "return-to-caller-app";
pub const SHOW_TOAST: &str = "show-toast";

/// Every action the dispatcher understands
pub const ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: SHOW_EQUIPMENT,
        channel: ChannelType::FireAndForget,
        kind: None,
        arity: 1,
    },
    ActionSpec {
        name: SHOW_DRAWING,
        channel: ChannelType::FireAndForget,
        kind: None,
        arity: 1,
    },
    ActionSpec {
        name: SHOW_DATA,
        channel: ChannelType::FireAndForget,
        kind: None,
        arity: 1,
    },
    ActionSpec {
        name: CAN_SHOW_EQUIPMENT,
        channel: ChannelType::Query,
        kind: Some(RequestKind::CheckEquipment),
        arity: 1,
    },
    ActionSpec {
        name: CAN_SHOW_DRAWING,
        channel: ChannelType::Query,
        kind: Some(RequestKind::CheckDrawing),
        arity: 1,
    },
    ActionSpec {
        name: SUBSCRIBE_CHECK_OBJECT_ACTION,
        channel: ChannelType::Subscription,
        kind: Some(RequestKind::EquipmentSelected),
        arity: 0,
    },
    ActionSpec {
        name: NOTIFY_ACTION_AVAILABLE,
        channel: ChannelType::FireAndForget,
        kind: None,
        arity: 1,
    },
    ActionSpec {
        name: REGISTER_DEFAULT_ACTIONS,
        channel: ChannelType::FireAndForget,
        kind: None,
        arity: 1,
    },
    ActionSpec {
        name: SUBSCRIBE_OPEN_EXTERNAL_APP,
        channel: ChannelType::Subscription,
        kind: Some(RequestKind::OpenHostApp),
        arity: 0,
    },
    ActionSpec {
        name: RETURN_TO_CALLER_APP,
        channel: ChannelType::FireAndForget,
        kind: None,
        arity: 0,
    },
    ActionSpec {
        name: SHOW_TOAST,
        channel: ChannelType::FireAndForget,
        kind: None,
        arity: 2,
    },
];

/// Find the table row for an action name
pub fn lookup(name: &str) -> Option<&'static ActionSpec> {
    ACTIONS.iter().find(|spec| spec.name == name)
}

/// Outbound wire action for a request kind
pub fn wire_action(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::CheckEquipment => wire::ACTION_CHECK_EQUIPMENT,
        RequestKind::CheckDrawing => wire::ACTION_CHECK_DRAWING,
        RequestKind::OpenHostApp => wire::ACTION_CALL_HOST,
        RequestKind::EquipmentSelected => wire::ACTION_CHECK_EQUIPMENT,
    }
}
