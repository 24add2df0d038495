//! Relay broker - correlation of cross-process requests and replies
//!
//! The broker pairs an outbound query with its asynchronous reply and
//! multiplexes persistent subscription channels over single listener slots:
//! - **Query:** one broadcast, exactly one aggregated reply, newest query wins
//! - **Subscription:** one durable listener per kind, zero-to-many pushes
//! - **Dispatch:** a static action table routed on a single worker task

pub mod actions;
mod config;
mod dispatcher;
mod error;
mod handle;
mod messages;
mod query;
mod store;
mod subscribe;

pub use config::BrokerConfig;
pub use dispatcher::{RelayDispatcher, RelayHandle};
pub use error::RelayError;
pub use handle::{PendingHandle, QueryTicket, Subscription, SubscriptionHandle};
pub use messages::{DispatchReply, RelayRequest, ReplyPayload, RequestKind};
pub use query::QueryChannel;
pub use store::{CorrelationStore, StoredHandle};
pub use subscribe::SubscriptionChannel;
