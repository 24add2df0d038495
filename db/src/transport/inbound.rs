//! Bridge-local broadcast receivers
//!
//! The broker's own side of the inbound interfaces: the check receiver that
//! answers "user selected an equipment" broadcasts, and the landing handler
//! that accepts "open this app" calls from the external viewer.

use std::sync::Arc;

use actionstore::ActionStore;
use serde_json::Value;
use tracing::{debug, warn};

use super::fanout::{BroadcastReceiver, ReplyBundle};
use super::{Message, wire};
use crate::broker::{RequestKind, SubscriptionChannel};

/// Answers equipment-check broadcasts
///
/// On every check-equipment dispatch this receiver notifies the armed
/// equipment-selected subscriber (if any) and appends the persisted default
/// actions to the shared bundle, each record augmented with the equipment id
/// and this app's callback identity so the viewer can render and route the
/// action.
pub struct CheckObjectReceiver {
    subscriptions: SubscriptionChannel,
    actions: Arc<ActionStore>,
    package_name: String,
}

impl CheckObjectReceiver {
    pub fn new(subscriptions: SubscriptionChannel, actions: Arc<ActionStore>, package_name: impl Into<String>) -> Self {
        Self {
            subscriptions,
            actions,
            package_name: package_name.into(),
        }
    }
}

impl BroadcastReceiver for CheckObjectReceiver {
    fn on_receive(&self, message: &Message, bundle: &mut ReplyBundle) {
        if message.action != wire::ACTION_CHECK_EQUIPMENT {
            return;
        }
        let Some(equipment_id) = message.extra_str(wire::EXTRA_EQUIPMENT_ID) else {
            debug!("Check-equipment broadcast without an equipment id, ignoring");
            return;
        };
        debug!(%equipment_id, "Equipment check received");

        self.subscriptions
            .publish(RequestKind::EquipmentSelected, Value::String(equipment_id.to_string()));

        let records = match self.actions.load() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to load default actions, answering without them");
                return;
            }
        };

        for mut record in records {
            if let Value::Object(fields) = &mut record {
                fields.insert("equipmentId".to_string(), Value::String(equipment_id.to_string()));
                fields.insert("packageName".to_string(), Value::String(self.package_name.clone()));
                fields.insert("action".to_string(), Value::String(wire::ACTION_CALL_HOST.to_string()));
            }
            bundle.append(record.to_string());
        }
    }
}

/// Accepts open-app calls from the external viewer
///
/// The payload carries the callback context the shell app needs to navigate
/// to the right screen. Delivery goes through the subscription channel, which
/// stashes the payload one-deep when no listener is armed yet.
#[derive(Clone)]
pub struct LandingHandler {
    subscriptions: SubscriptionChannel,
}

impl LandingHandler {
    pub fn new(subscriptions: SubscriptionChannel) -> Self {
        Self { subscriptions }
    }

    /// Deliver an open-app request into the broker
    pub fn deliver(&self, context: Value) {
        if context.is_null() || context.as_str().is_some_and(str::is_empty) {
            debug!("Open-app call without context, ignoring");
            return;
        }
        debug!("Open-app call received");
        self.subscriptions.publish(RequestKind::OpenHostApp, context);
    }
}
