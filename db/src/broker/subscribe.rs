//! Subscription channel - durable listeners for unsolicited events

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::handle::{Subscription, SubscriptionHandle};
use super::messages::RequestKind;
use super::store::CorrelationStore;

/// Registers durable listeners and routes unsolicited events to them
///
/// Cheap to clone; every clone shares the one correlation store.
#[derive(Debug, Clone)]
pub struct SubscriptionChannel {
    store: Arc<CorrelationStore>,
}

impl SubscriptionChannel {
    pub fn new(store: Arc<CorrelationStore>) -> Self {
        Self { store }
    }

    /// Register (or supersede) the subscriber for a kind
    ///
    /// Returns immediately with the armed stream. A payload waiting in the
    /// kind's backlog slot is delivered as the first notification and the
    /// slot cleared.
    pub fn subscribe(&self, kind: RequestKind) -> Subscription {
        let (handle, subscription) = SubscriptionHandle::new(kind);

        if let Some(backlogged) = self.store.take_backlog(kind) {
            debug!(?kind, "Flushing backlogged payload to new subscriber");
            handle.notify(backlogged);
        }

        self.store.put(kind, handle.into());
        subscription
    }

    /// Deliver an unsolicited event to the armed subscriber, if any
    ///
    /// The subscription stays armed for future publishes. With no subscriber
    /// the event is dropped, except for backlogging kinds which cache it
    /// one-deep for the next `subscribe`.
    pub fn publish(&self, kind: RequestKind, payload: Value) {
        match self.store.peek(kind) {
            Some(handle) => {
                if !handle.notify(payload) {
                    debug!(?kind, "Subscriber stream gone, event dropped");
                }
            }
            None if kind.backlogs() => {
                debug!(?kind, "No subscriber armed, stashing payload");
                self.store.stash_backlog(kind, payload);
            }
            None => {
                debug!(?kind, "No subscriber armed, event dropped");
            }
        }
    }
}
