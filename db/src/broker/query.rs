//! Inter-process query channel - one broadcast, one reply

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::error::RelayError;
use super::handle::{PendingHandle, QueryTicket};
use super::messages::{ReplyPayload, RequestKind};
use super::store::CorrelationStore;
use crate::transport::{Broadcast, Message, ReplyBundle};

/// Performs a single broadcast-style query and delivers exactly one reply
pub struct QueryChannel {
    store: Arc<CorrelationStore>,
    bus: Arc<dyn Broadcast>,
}

impl QueryChannel {
    pub fn new(store: Arc<CorrelationStore>, bus: Arc<dyn Broadcast>) -> Self {
        Self { store, bus }
    }

    /// Issue a one-shot query and return the caller's ticket
    ///
    /// The handle goes into the store before the fan-out runs, superseding
    /// any in-flight query of the same kind. The aggregated bundle is fed to
    /// [`deliver`](Self::deliver); a delivery failure fails the stored handle
    /// instead so nothing leaks.
    pub fn issue(&self, kind: RequestKind, message: Message) -> QueryTicket {
        let request_id = Uuid::now_v7().to_string();
        debug!(?kind, %request_id, action = %message.action, "Issuing query");

        let (handle, ticket) = PendingHandle::new(kind, request_id);
        self.store.put(kind, handle.into());

        match self.bus.send_ordered(&message) {
            Ok(bundle) => self.deliver(kind, bundle),
            Err(e) => {
                warn!(?kind, error = %e, "Query fan-out failed");
                if let Some(pending) = self.store.take(kind) {
                    pending.fail(RelayError::DeliveryFailed(e.to_string()));
                }
            }
        }

        ticket
    }

    /// Completion callback: hand an aggregated reply to the pending handle
    ///
    /// Takes the kind's slot and completes whatever handle occupies it; a
    /// reply with nothing pending (late duplicate, or the query was
    /// superseded and already answered) is a no-op.
    pub fn deliver(&self, kind: RequestKind, bundle: ReplyBundle) {
        if let Some(pending) = self.store.take(kind) {
            pending.complete(shape_reply(kind, bundle));
        } else {
            debug!(?kind, "Reply with no pending handle, dropping");
        }
    }
}

/// Shape the aggregated bundle into the kind's reply form
///
/// Check-drawing resolves to whether any receiver acknowledged; everything
/// else resolves to the ordered token sequence (empty is a valid reply, not
/// an error).
fn shape_reply(kind: RequestKind, bundle: ReplyBundle) -> ReplyPayload {
    match kind {
        RequestKind::CheckDrawing => ReplyPayload::Outcome(bundle.acknowledged),
        _ => ReplyPayload::Tokens(bundle.entries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{BroadcastReceiver, OrderedBus, TransportError, wire};

    struct DrawingList {
        drawings: Vec<&'static str>,
    }

    impl BroadcastReceiver for DrawingList {
        fn on_receive(&self, message: &Message, bundle: &mut ReplyBundle) {
            if message.action == wire::ACTION_CHECK_EQUIPMENT {
                for drawing in &self.drawings {
                    bundle.append(*drawing);
                }
            }
        }
    }

    struct KnowsDrawing;

    impl BroadcastReceiver for KnowsDrawing {
        fn on_receive(&self, message: &Message, bundle: &mut ReplyBundle) {
            if message.action == wire::ACTION_CHECK_DRAWING {
                bundle.acknowledge();
            }
        }
    }

    struct BrokenBus;

    impl Broadcast for BrokenBus {
        fn send_ordered(&self, _message: &Message) -> Result<ReplyBundle, TransportError> {
            Err(TransportError::SendFailed("no delivery".to_string()))
        }

        fn send(&self, _message: &Message) -> Result<(), TransportError> {
            Err(TransportError::SendFailed("no delivery".to_string()))
        }
    }

    fn channel_with_bus(bus: Arc<dyn Broadcast>) -> (QueryChannel, Arc<CorrelationStore>) {
        let store = Arc::new(CorrelationStore::new());
        (QueryChannel::new(store.clone(), bus), store)
    }

    #[tokio::test]
    async fn test_query_resolves_with_aggregated_tokens() {
        let bus = Arc::new(OrderedBus::new());
        bus.register(0, Box::new(DrawingList { drawings: vec!["D1", "D2"] }));
        let (channel, _store) = channel_with_bus(bus);

        let ticket = channel.issue(
            RequestKind::CheckEquipment,
            Message::new(wire::ACTION_CHECK_EQUIPMENT).with_extra(wire::EXTRA_EQUIPMENT_ID, "E1"),
        );

        let payload = ticket.wait().await.unwrap();
        assert_eq!(payload, ReplyPayload::Tokens(vec!["D1".to_string(), "D2".to_string()]));
    }

    #[tokio::test]
    async fn test_query_with_no_responder_yields_empty_tokens() {
        let (channel, _store) = channel_with_bus(Arc::new(OrderedBus::new()));

        let ticket = channel.issue(
            RequestKind::CheckEquipment,
            Message::new(wire::ACTION_CHECK_EQUIPMENT).with_extra(wire::EXTRA_EQUIPMENT_ID, "E1"),
        );

        assert_eq!(ticket.wait().await.unwrap(), ReplyPayload::Tokens(Vec::new()));
    }

    #[tokio::test]
    async fn test_check_drawing_resolves_boolean() {
        let bus = Arc::new(OrderedBus::new());
        bus.register(0, Box::new(KnowsDrawing));
        let (channel, _store) = channel_with_bus(bus);

        let ticket = channel.issue(
            RequestKind::CheckDrawing,
            Message::new(wire::ACTION_CHECK_DRAWING).with_extra(wire::EXTRA_DRAWING_ID, "D7"),
        );

        assert_eq!(ticket.wait().await.unwrap(), ReplyPayload::Outcome(true));
    }

    #[tokio::test]
    async fn test_check_drawing_unacknowledged_is_false() {
        let (channel, _store) = channel_with_bus(Arc::new(OrderedBus::new()));

        let ticket = channel.issue(RequestKind::CheckDrawing, Message::new(wire::ACTION_CHECK_DRAWING));

        assert_eq!(ticket.wait().await.unwrap(), ReplyPayload::Outcome(false));
    }

    #[tokio::test]
    async fn test_delivery_failure_fails_ticket_and_clears_slot() {
        let (channel, store) = channel_with_bus(Arc::new(BrokenBus));

        let ticket = channel.issue(RequestKind::CheckEquipment, Message::new(wire::ACTION_CHECK_EQUIPMENT));

        let err = ticket.wait().await.unwrap_err();
        assert!(matches!(err, RelayError::DeliveryFailed(_)));
        assert!(store.take(RequestKind::CheckEquipment).is_none());
    }

    #[tokio::test]
    async fn test_slot_is_clear_after_completion() {
        let (channel, store) = channel_with_bus(Arc::new(OrderedBus::new()));

        let ticket = channel.issue(RequestKind::CheckEquipment, Message::new(wire::ACTION_CHECK_EQUIPMENT));
        ticket.wait().await.unwrap();

        assert!(store.take(RequestKind::CheckEquipment).is_none());
    }

    #[tokio::test]
    async fn test_deferred_reply_completes_latest_handle_only() {
        let (channel, store) = channel_with_bus(Arc::new(OrderedBus::new()));

        // Two queries in flight before any reply lands
        let (first, first_ticket) = PendingHandle::new(RequestKind::CheckEquipment, "req-1");
        store.put(RequestKind::CheckEquipment, first.into());
        let (second, second_ticket) = PendingHandle::new(RequestKind::CheckEquipment, "req-2");
        store.put(RequestKind::CheckEquipment, second.into());

        let mut bundle = ReplyBundle::default();
        bundle.append("D1");
        channel.deliver(RequestKind::CheckEquipment, bundle);

        // Only the handle registered last is completed
        assert_eq!(
            second_ticket.wait().await.unwrap(),
            ReplyPayload::Tokens(vec!["D1".to_string()])
        );
        assert!(matches!(first_ticket.wait().await.unwrap_err(), RelayError::Superseded));
    }

    #[tokio::test]
    async fn test_duplicate_reply_delivers_to_nothing() {
        let (channel, store) = channel_with_bus(Arc::new(OrderedBus::new()));

        let (handle, ticket) = PendingHandle::new(RequestKind::CheckEquipment, "req-1");
        store.put(RequestKind::CheckEquipment, handle.into());

        channel.deliver(RequestKind::CheckEquipment, ReplyBundle::default());
        // Must not panic and must not double-invoke
        channel.deliver(RequestKind::CheckEquipment, ReplyBundle::default());

        assert_eq!(ticket.wait().await.unwrap(), ReplyPayload::Tokens(Vec::new()));
    }
}
