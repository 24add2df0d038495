//! Drawbridge - cross-process request/response correlation broker
//!
//! Drawbridge bridges two independently installed apps: a host "shell" app
//! carrying an embedded UI layer, and an external drawing viewer. The bridge
//! speaks the platform's broadcast-style IPC on one side and an asynchronous
//! callback protocol on the other, pairing each outbound query with its
//! eventual reply and multiplexing a small set of persistent subscription
//! channels over single listener slots.
//!
//! # Core Concepts
//!
//! - **One slot per kind**: the newest query or subscription for a request
//!   kind silently supersedes the previous one
//! - **Deferred completion**: callers get a "pending" marker immediately and
//!   the data later, never a blocking wait
//! - **Ordered fan-out**: a broadcast walks receivers highest-priority first,
//!   all appending to one shared reply bundle
//! - **Single worker**: one dispatcher task serializes every action handler
//!   and completion
//!
//! # Modules
//!
//! - [`broker`] - correlation store, query/subscription channels, dispatcher
//! - [`transport`] - ordered broadcast bus, bridge-local receivers, platform surface
//! - [`bridge`] - JSON-over-newline callback bridge and its client
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod bridge;
pub mod broker;
pub mod cli;
pub mod config;
pub mod transport;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeClient, WireRequest, WireResponse};
pub use broker::{
    BrokerConfig, CorrelationStore, DispatchReply, QueryChannel, QueryTicket, RelayDispatcher, RelayError, RelayHandle,
    ReplyPayload, RequestKind, Subscription, SubscriptionChannel,
};
pub use config::Config;
pub use transport::{
    Broadcast, BroadcastReceiver, CheckObjectReceiver, HostPlatform, LandingHandler, Message, OrderedBus, ReplyBundle,
};
