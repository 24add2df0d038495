//! Relay dispatcher - single entry point for caller actions
//!
//! Runs as one tokio task consuming an mpsc queue, so every action handler
//! and every query completion executes on the same logical worker. Argument
//! shape is validated against the static action table before any channel is
//! touched.

use std::sync::Arc;

use actionstore::ActionStore;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::actions::{self, ChannelType};
use super::config::BrokerConfig;
use super::error::RelayError;
use super::messages::{DispatchReply, RelayRequest, RequestKind};
use super::query::QueryChannel;
use super::store::CorrelationStore;
use super::subscribe::SubscriptionChannel;
use crate::transport::{Broadcast, HostPlatform, Message, wire};

/// Handle for callers to reach the dispatcher task
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayRequest>,
}

impl RelayHandle {
    /// Dispatch a named action and wait for its immediate outcome
    ///
    /// The outcome is always immediate: data, a pending ticket, an armed
    /// subscription, or a rejection. Deferred results come through the
    /// ticket, never through this call.
    pub async fn dispatch(&self, name: &str, args: Vec<Value>) -> Result<DispatchReply, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RelayRequest::Action {
                name: name.to_string(),
                args,
                reply_tx,
            })
            .await
            .map_err(|_| RelayError::ChannelClosed)?;

        reply_rx.await.map_err(|_| RelayError::ChannelClosed)
    }

    /// Ask the dispatcher task to stop
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        self.tx.send(RelayRequest::Shutdown).await.map_err(|_| RelayError::ChannelClosed)
    }
}

/// The dispatcher task and the channels it routes to
pub struct RelayDispatcher {
    config: BrokerConfig,
    tx: mpsc::Sender<RelayRequest>,
    rx: mpsc::Receiver<RelayRequest>,
    queries: QueryChannel,
    subscriptions: SubscriptionChannel,
    actions: Arc<ActionStore>,
    platform: Arc<dyn HostPlatform>,
    bus: Arc<dyn Broadcast>,
}

impl RelayDispatcher {
    /// Assemble a dispatcher over the injected store, bus, platform and
    /// persisted-actions store
    pub fn new(
        config: BrokerConfig,
        store: Arc<CorrelationStore>,
        bus: Arc<dyn Broadcast>,
        platform: Arc<dyn HostPlatform>,
        actions: Arc<ActionStore>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Self {
            config,
            tx,
            rx,
            queries: QueryChannel::new(store.clone(), bus.clone()),
            subscriptions: SubscriptionChannel::new(store),
            actions,
            platform,
            bus,
        }
    }

    /// Get a handle for callers
    pub fn handle(&self) -> RelayHandle {
        RelayHandle { tx: self.tx.clone() }
    }

    /// Run the dispatcher task until shutdown
    pub async fn run(mut self) {
        info!("Relay dispatcher started");

        while let Some(request) = self.rx.recv().await {
            match request {
                RelayRequest::Action { name, args, reply_tx } => {
                    debug!(action = %name, args = args.len(), "Dispatching action");
                    let reply = self.dispatch(&name, &args);
                    if reply_tx.send(reply).is_err() {
                        debug!(action = %name, "Caller gone before reply");
                    }
                }

                RelayRequest::Shutdown => {
                    info!("Relay dispatcher shutting down");
                    break;
                }
            }
        }

        info!("Relay dispatcher stopped");
    }

    fn dispatch(&self, name: &str, args: &[Value]) -> DispatchReply {
        let Some(spec) = actions::lookup(name) else {
            return DispatchReply::Failed(RelayError::InvalidAction(name.to_string()));
        };

        if args.len() != spec.arity {
            return DispatchReply::Failed(RelayError::MalformedInput {
                action: name.to_string(),
                reason: format!("expected {} argument(s), got {}", spec.arity, args.len()),
            });
        }

        match self.route(spec.name, spec.channel, spec.kind, args) {
            Ok(reply) => reply,
            Err(e) => DispatchReply::Failed(e),
        }
    }

    fn route(
        &self,
        name: &'static str,
        channel: ChannelType,
        kind: Option<RequestKind>,
        args: &[Value],
    ) -> Result<DispatchReply, RelayError> {
        match (channel, kind) {
            (ChannelType::Query, Some(kind)) => self.issue_query(name, kind, args),
            (ChannelType::Subscription, Some(kind)) => {
                Ok(DispatchReply::Subscribed(self.subscriptions.subscribe(kind)))
            }
            (ChannelType::FireAndForget, _) => self.fire_and_forget(name, args),
            // A channeled action with no kind would be a broken table row
            _ => Err(RelayError::InvalidAction(name.to_string())),
        }
    }

    fn issue_query(&self, name: &'static str, kind: RequestKind, args: &[Value]) -> Result<DispatchReply, RelayError> {
        let record = object_arg(name, &args[0])?;
        let id = string_field(name, record, "id")?;

        let extra_key = match kind {
            RequestKind::CheckDrawing => wire::EXTRA_DRAWING_ID,
            _ => wire::EXTRA_EQUIPMENT_ID,
        };
        let message = Message::new(actions::wire_action(kind)).with_extra(extra_key, id);

        Ok(DispatchReply::Pending(self.queries.issue(kind, message)))
    }

    fn fire_and_forget(&self, name: &'static str, args: &[Value]) -> Result<DispatchReply, RelayError> {
        match name {
            actions::SHOW_EQUIPMENT | actions::SHOW_DRAWING | actions::SHOW_DATA => {
                let record = object_arg(name, &args[0])?;
                let payload = Value::Object(record.clone()).to_string();
                let message = Message::new(wire::ACTION_OPEN_DRAWING).with_extra(wire::EXTRA_PAYLOAD, payload);

                self.platform
                    .launch_viewer(&message)
                    .map_err(|e| RelayError::DeliveryFailed(e.to_string()))?;
                Ok(DispatchReply::Done(Value::Null))
            }

            actions::NOTIFY_ACTION_AVAILABLE => {
                // The viewer needs to know who to call back and how
                let mut record = object_arg(name, &args[0])?.clone();
                record.insert("packageName".to_string(), Value::String(self.config.package_name.clone()));
                record.insert("action".to_string(), Value::String(wire::ACTION_CALL_HOST.to_string()));

                let message = Message::new(wire::ACTION_SUPPORTED_INFO)
                    .with_extra(wire::EXTRA_SUPPORTED_INFO, Value::Object(record).to_string());

                self.bus.send(&message).map_err(|e| RelayError::DeliveryFailed(e.to_string()))?;
                Ok(DispatchReply::Done(Value::Null))
            }

            actions::REGISTER_DEFAULT_ACTIONS => {
                let records = array_arg(name, &args[0])?;
                self.actions.save(&records).map_err(|e| RelayError::Storage(e.to_string()))?;
                Ok(DispatchReply::Done(Value::Null))
            }

            actions::RETURN_TO_CALLER_APP => {
                self.platform.return_to_caller();
                Ok(DispatchReply::Done(Value::Null))
            }

            actions::SHOW_TOAST => {
                let title = string_arg(name, &args[0])?;
                let text = string_arg(name, &args[1])?;
                // Outcome of the toast itself is never reported back
                self.platform.show_toast(&title, &text);
                Ok(DispatchReply::Done(Value::Null))
            }

            other => {
                warn!(action = %other, "Action in table but not routed");
                Err(RelayError::InvalidAction(other.to_string()))
            }
        }
    }
}

fn object_arg<'a>(action: &str, value: &'a Value) -> Result<&'a serde_json::Map<String, Value>, RelayError> {
    value.as_object().ok_or_else(|| RelayError::MalformedInput {
        action: action.to_string(),
        reason: "expected a JSON object argument".to_string(),
    })
}

fn array_arg(action: &str, value: &Value) -> Result<Vec<Value>, RelayError> {
    value.as_array().cloned().ok_or_else(|| RelayError::MalformedInput {
        action: action.to_string(),
        reason: "expected a JSON array argument".to_string(),
    })
}

fn string_arg(action: &str, value: &Value) -> Result<String, RelayError> {
    value.as_str().map(str::to_string).ok_or_else(|| RelayError::MalformedInput {
        action: action.to_string(),
        reason: "expected a string argument".to_string(),
    })
}

fn string_field(action: &str, record: &serde_json::Map<String, Value>, field: &str) -> Result<String, RelayError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RelayError::MalformedInput {
            action: action.to_string(),
            reason: format!("missing string field '{}'", field),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::messages::ReplyPayload;
    use crate::transport::{BroadcastReceiver, CheckObjectReceiver, OrderedBus, PlatformCall, RecordingPlatform, ReplyBundle};
    use serde_json::json;
    use tempfile::TempDir;

    struct Harness {
        relay: RelayHandle,
        platform: Arc<RecordingPlatform>,
        actions: Arc<ActionStore>,
        bus: Arc<OrderedBus>,
        _temp: TempDir,
    }

    fn harness() -> Harness {
        harness_with_platform(Arc::new(RecordingPlatform::new()))
    }

    fn harness_with_platform(platform: Arc<RecordingPlatform>) -> Harness {
        let temp = TempDir::new().unwrap();
        let actions = Arc::new(ActionStore::open(temp.path()).unwrap());
        let store = Arc::new(CorrelationStore::new());
        let bus = Arc::new(OrderedBus::new());

        // The broker answers its own check-equipment broadcasts
        bus.register(
            0,
            Box::new(CheckObjectReceiver::new(
                SubscriptionChannel::new(store.clone()),
                actions.clone(),
                BrokerConfig::default().package_name,
            )),
        );

        let dispatcher = RelayDispatcher::new(
            BrokerConfig::default(),
            store,
            bus.clone(),
            platform.clone(),
            actions.clone(),
        );
        let relay = dispatcher.handle();
        tokio::spawn(dispatcher.run());

        Harness {
            relay,
            platform,
            actions,
            bus,
            _temp: temp,
        }
    }

    async fn expect_done(h: &Harness, action: &str, args: Vec<Value>) {
        match h.relay.dispatch(action, args).await.unwrap() {
            DispatchReply::Done(_) => {}
            other => panic!("expected Done, got {:?}", other),
        }
    }

    async fn expect_failed(h: &Harness, action: &str, args: Vec<Value>) -> RelayError {
        match h.relay.dispatch(action, args).await.unwrap() {
            DispatchReply::Failed(e) => e,
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected() {
        let h = harness();
        let err = expect_failed(&h, "definitely-not-an-action", vec![]).await;
        assert!(matches!(err, RelayError::InvalidAction(_)));
    }

    #[tokio::test]
    async fn test_wrong_arity_is_rejected_before_dispatch() {
        let h = harness();

        let err = expect_failed(&h, actions::CAN_SHOW_EQUIPMENT, vec![]).await;
        assert!(matches!(err, RelayError::MalformedInput { .. }));

        let err = expect_failed(&h, actions::CAN_SHOW_EQUIPMENT, vec![json!({"id": "E1"}), json!({"id": "E2"})]).await;
        assert!(matches!(err, RelayError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn test_query_missing_id_field_is_rejected() {
        let h = harness();
        let err = expect_failed(&h, actions::CAN_SHOW_EQUIPMENT, vec![json!({"identifier": "E1"})]).await;
        match err {
            RelayError::MalformedInput { reason, .. } => assert!(reason.contains("'id'")),
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_can_show_equipment_resolves_with_defaults() {
        let h = harness();

        expect_done(
            &h,
            actions::REGISTER_DEFAULT_ACTIONS,
            vec![json!([{"a": 1}, {"b": 2}])],
        )
        .await;

        let reply = h
            .relay
            .dispatch(actions::CAN_SHOW_EQUIPMENT, vec![json!({"id": "E1"})])
            .await
            .unwrap();
        let ticket = match reply {
            DispatchReply::Pending(ticket) => ticket,
            other => panic!("expected Pending, got {:?}", other),
        };

        let payload = ticket.wait().await.unwrap();
        let tokens = match payload {
            ReplyPayload::Tokens(tokens) => tokens,
            other => panic!("expected Tokens, got {:?}", other),
        };

        assert_eq!(tokens.len(), 2);
        let first: Value = serde_json::from_str(&tokens[0]).unwrap();
        let second: Value = serde_json::from_str(&tokens[1]).unwrap();
        assert_eq!(first["a"], 1);
        assert_eq!(first["equipmentId"], "E1");
        assert_eq!(second["b"], 2);
        assert_eq!(second["equipmentId"], "E1");
    }

    #[tokio::test]
    async fn test_can_show_drawing_without_responder_is_false() {
        let h = harness();

        let reply = h
            .relay
            .dispatch(actions::CAN_SHOW_DRAWING, vec![json!({"id": "D1"})])
            .await
            .unwrap();
        let ticket = match reply {
            DispatchReply::Pending(ticket) => ticket,
            other => panic!("expected Pending, got {:?}", other),
        };

        assert_eq!(ticket.wait().await.unwrap(), ReplyPayload::Outcome(false));
    }

    #[tokio::test]
    async fn test_sequential_queries_each_resolve() {
        let h = harness();

        // The dispatcher serializes actions, so each query's reply lands
        // before the next query is issued; neither is abandoned
        for id in ["E1", "E2"] {
            let reply = h
                .relay
                .dispatch(actions::CAN_SHOW_EQUIPMENT, vec![json!({"id": id})])
                .await
                .unwrap();
            let ticket = match reply {
                DispatchReply::Pending(t) => t,
                other => panic!("expected Pending, got {:?}", other),
            };
            assert!(ticket.wait().await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_show_equipment_launches_viewer() {
        let h = harness();

        expect_done(&h, actions::SHOW_EQUIPMENT, vec![json!({"equipmentId": "E1", "color": "#ff0000"})]).await;

        let calls = h.platform.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            PlatformCall::Launched(message) => {
                assert_eq!(message.action, wire::ACTION_OPEN_DRAWING);
                let payload: Value =
                    serde_json::from_str(message.extra_str(wire::EXTRA_PAYLOAD).unwrap()).unwrap();
                assert_eq!(payload["equipmentId"], "E1");
            }
            other => panic!("expected Launched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_show_equipment_launch_failure_is_delivery_error() {
        let h = harness_with_platform(Arc::new(RecordingPlatform::failing()));

        let err = expect_failed(&h, actions::SHOW_EQUIPMENT, vec![json!({"equipmentId": "E1"})]).await;
        assert!(matches!(err, RelayError::DeliveryFailed(_)));
    }

    #[tokio::test]
    async fn test_notify_action_available_augments_identity() {
        struct Capture {
            seen: Arc<std::sync::Mutex<Vec<Message>>>,
        }
        impl BroadcastReceiver for Capture {
            fn on_receive(&self, message: &Message, _bundle: &mut ReplyBundle) {
                self.seen.lock().unwrap().push(message.clone());
            }
        }

        let h = harness();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        h.bus.register(0, Box::new(Capture { seen: seen.clone() }));

        expect_done(
            &h,
            actions::NOTIFY_ACTION_AVAILABLE,
            vec![json!({"name": "Inspector", "actionLabel": "Inspect"})],
        )
        .await;

        let seen = seen.lock().unwrap();
        let announce = seen
            .iter()
            .find(|m| m.action == wire::ACTION_SUPPORTED_INFO)
            .expect("capability broadcast not seen");
        let info: Value = serde_json::from_str(announce.extra_str(wire::EXTRA_SUPPORTED_INFO).unwrap()).unwrap();
        assert_eq!(info["name"], "Inspector");
        assert_eq!(info["packageName"], "com.drawbridge.shell");
        assert_eq!(info["action"], wire::ACTION_CALL_HOST);
    }

    #[tokio::test]
    async fn test_register_default_actions_persists() {
        let h = harness();

        expect_done(&h, actions::REGISTER_DEFAULT_ACTIONS, vec![json!([{"n": 1}])]).await;

        assert_eq!(h.actions.load().unwrap(), vec![json!({"n": 1})]);
    }

    #[tokio::test]
    async fn test_register_default_actions_rejects_non_array() {
        let h = harness();
        let err = expect_failed(&h, actions::REGISTER_DEFAULT_ACTIONS, vec![json!({"n": 1})]).await;
        assert!(matches!(err, RelayError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn test_show_toast_always_succeeds() {
        let h = harness();

        expect_done(&h, actions::SHOW_TOAST, vec![json!("T"), json!("M")]).await;

        assert_eq!(
            h.platform.calls(),
            vec![PlatformCall::Toast {
                title: "T".to_string(),
                message: "M".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_show_toast_rejects_non_string_args() {
        let h = harness();
        let err = expect_failed(&h, actions::SHOW_TOAST, vec![json!(1), json!("M")]).await;
        assert!(matches!(err, RelayError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn test_return_to_caller_app() {
        let h = harness();

        expect_done(&h, actions::RETURN_TO_CALLER_APP, vec![]).await;

        assert_eq!(h.platform.calls(), vec![PlatformCall::ReturnedToCaller]);
    }

    #[tokio::test]
    async fn test_subscribe_returns_armed_stream() {
        let h = harness();

        let reply = h
            .relay
            .dispatch(actions::SUBSCRIBE_CHECK_OBJECT_ACTION, vec![])
            .await
            .unwrap();
        let mut subscription = match reply {
            DispatchReply::Subscribed(s) => s,
            other => panic!("expected Subscribed, got {:?}", other),
        };

        assert_eq!(subscription.kind(), RequestKind::EquipmentSelected);
        assert!(subscription.try_next().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_dispatcher() {
        let h = harness();

        h.relay.shutdown().await.unwrap();

        // Give the task a moment to drain
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(h.relay.dispatch(actions::SHOW_TOAST, vec![json!("a"), json!("b")]).await.is_err());
    }
}
