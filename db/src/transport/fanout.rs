//! Ordered broadcast fan-out
//!
//! The platform's ordered broadcast is modeled as a single sequential reduce:
//! receivers run one at a time, highest priority first (registration order
//! breaking ties), each free to append to the shared reply bundle before the
//! final aggregate is handed back to the sender.

use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use super::Message;

/// Errors from the send primitives
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Broadcast send failed: {0}")]
    SendFailed(String),

    #[error("Viewer launch failed: {0}")]
    LaunchFailed(String),
}

/// Shared aggregation buffer for one ordered dispatch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplyBundle {
    /// Ordered opaque entries appended by receivers
    pub entries: Vec<String>,

    /// Set when any receiver recognised the request
    pub acknowledged: bool,
}

impl ReplyBundle {
    pub fn append(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A receiver participating in ordered dispatch
pub trait BroadcastReceiver: Send + Sync {
    fn on_receive(&self, message: &Message, bundle: &mut ReplyBundle);
}

/// Send side of the broadcast transport
///
/// `send_ordered` runs the full fan-out and returns the aggregated bundle;
/// `send` is fire-and-forget and discards it.
pub trait Broadcast: Send + Sync {
    fn send_ordered(&self, message: &Message) -> Result<ReplyBundle, TransportError>;

    fn send(&self, message: &Message) -> Result<(), TransportError>;
}

struct Registration {
    priority: i32,
    receiver: Box<dyn BroadcastReceiver>,
}

/// In-process ordered broadcast bus
#[derive(Default)]
pub struct OrderedBus {
    // Kept sorted: priority descending, registration order within a priority
    receivers: Mutex<Vec<Registration>>,
}

impl OrderedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver at the given priority
    pub fn register(&self, priority: i32, receiver: Box<dyn BroadcastReceiver>) {
        let mut receivers = self.receivers.lock().expect("bus registry poisoned");
        receivers.push(Registration { priority, receiver });
        // Stable sort keeps registration order within equal priorities
        receivers.sort_by_key(|r| std::cmp::Reverse(r.priority));
    }

    /// Number of registered receivers
    pub fn receiver_count(&self) -> usize {
        self.receivers.lock().expect("bus registry poisoned").len()
    }
}

impl Broadcast for OrderedBus {
    fn send_ordered(&self, message: &Message) -> Result<ReplyBundle, TransportError> {
        let receivers = self.receivers.lock().expect("bus registry poisoned");
        debug!(action = %message.action, receivers = receivers.len(), "Ordered dispatch");

        let mut bundle = ReplyBundle::default();
        for registration in receivers.iter() {
            registration.receiver.on_receive(message, &mut bundle);
        }
        Ok(bundle)
    }

    fn send(&self, message: &Message) -> Result<(), TransportError> {
        self.send_ordered(message).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::wire;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Appender {
        entry: &'static str,
    }

    impl BroadcastReceiver for Appender {
        fn on_receive(&self, _message: &Message, bundle: &mut ReplyBundle) {
            bundle.append(self.entry);
        }
    }

    struct Acker;

    impl BroadcastReceiver for Acker {
        fn on_receive(&self, _message: &Message, bundle: &mut ReplyBundle) {
            bundle.acknowledge();
        }
    }

    struct Counter {
        count: std::sync::Arc<AtomicUsize>,
    }

    impl BroadcastReceiver for Counter {
        fn on_receive(&self, _message: &Message, _bundle: &mut ReplyBundle) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_empty_bus_yields_empty_bundle() {
        let bus = OrderedBus::new();
        let bundle = bus.send_ordered(&Message::new(wire::ACTION_CHECK_EQUIPMENT)).unwrap();

        assert!(bundle.is_empty());
        assert!(!bundle.acknowledged);
    }

    #[test]
    fn test_priority_order_highest_first() {
        let bus = OrderedBus::new();
        bus.register(1, Box::new(Appender { entry: "low" }));
        bus.register(10, Box::new(Appender { entry: "high" }));
        bus.register(5, Box::new(Appender { entry: "mid" }));

        let bundle = bus.send_ordered(&Message::new(wire::ACTION_CHECK_EQUIPMENT)).unwrap();
        assert_eq!(bundle.entries, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let bus = OrderedBus::new();
        bus.register(0, Box::new(Appender { entry: "first" }));
        bus.register(0, Box::new(Appender { entry: "second" }));
        bus.register(0, Box::new(Appender { entry: "third" }));

        let bundle = bus.send_ordered(&Message::new(wire::ACTION_CHECK_EQUIPMENT)).unwrap();
        assert_eq!(bundle.entries, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_acknowledge_flag_survives_later_receivers() {
        let bus = OrderedBus::new();
        bus.register(10, Box::new(Acker));
        bus.register(0, Box::new(Appender { entry: "tail" }));

        let bundle = bus.send_ordered(&Message::new(wire::ACTION_CHECK_DRAWING)).unwrap();
        assert!(bundle.acknowledged);
        assert_eq!(bundle.entries, vec!["tail"]);
    }

    #[test]
    fn test_fire_and_forget_reaches_all_receivers() {
        let count = std::sync::Arc::new(AtomicUsize::new(0));
        let bus = OrderedBus::new();
        bus.register(0, Box::new(Counter { count: count.clone() }));
        bus.register(1, Box::new(Counter { count: count.clone() }));

        bus.send(&Message::new(wire::ACTION_SUPPORTED_INFO)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
