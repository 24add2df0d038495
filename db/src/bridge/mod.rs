//! Callback bridge between the embedded UI layer and the broker
//!
//! A Unix Domain Socket carrying a JSON-over-newline protocol. Each request
//! is one line; the daemon's immediate outcome comes back first, and
//! deferred query results and subscription events follow as further lines on
//! the same connection.

mod client;
mod listener;
pub mod messages;

pub use client::{BridgeClient, BridgeSubscription};
pub use listener::{Bridge, cleanup_socket, create_listener_at, get_socket_path};
pub use messages::{WireRequest, WireResponse};
