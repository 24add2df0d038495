//! Bridge listener for the daemon side
//!
//! Accepts Unix Domain Socket connections carrying the JSON-over-newline
//! protocol. Each connection gets a writer task so deferred query results and
//! subscription pushes can land while further requests are still being read,
//! which is what makes the callback-bridge semantics work over a stream.

use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::messages::{EVENT_EQUIPMENT_SELECTED, EVENT_OPEN_HOST_APP, WireRequest, WireResponse};
use crate::broker::{DispatchReply, RelayError, RelayHandle};
use crate::transport::{Broadcast, LandingHandler, Message, wire};

/// Get the socket path for the bridge daemon
pub fn get_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("drawbridge")
        .join("bridge.sock")
}

/// Create and bind the bridge socket listener
///
/// Handles cleanup of stale socket files from previous runs.
pub fn create_listener_at(socket_path: &PathBuf) -> Result<(UnixListener, PathBuf)> {
    debug!(?socket_path, "create_listener: creating bridge socket");

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }

    if socket_path.exists() {
        debug!(?socket_path, "create_listener: removing stale socket");
        std::fs::remove_file(socket_path).context("Failed to remove stale socket")?;
    }

    let listener = UnixListener::bind(socket_path).context("Failed to bind bridge socket")?;
    debug!(?socket_path, "create_listener: socket bound successfully");

    Ok((listener, socket_path.clone()))
}

/// Remove the socket file on shutdown
pub fn cleanup_socket(socket_path: &PathBuf) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}

/// The daemon-side bridge: connections in, dispatcher and inbound paths out
#[derive(Clone)]
pub struct Bridge {
    relay: RelayHandle,
    bus: Arc<dyn Broadcast>,
    landing: LandingHandler,
}

impl Bridge {
    pub fn new(relay: RelayHandle, bus: Arc<dyn Broadcast>, landing: LandingHandler) -> Self {
        Self { relay, bus, landing }
    }

    /// Accept connections until the listener fails
    pub async fn serve(self, listener: UnixListener) -> Result<()> {
        loop {
            let (stream, _) = listener.accept().await.context("Failed to accept bridge connection")?;
            let bridge = self.clone();
            tokio::spawn(async move {
                if let Err(e) = bridge.handle_connection(stream).await {
                    debug!(error = %e, "Bridge connection closed with error");
                }
            });
        }
    }

    async fn handle_connection(self, stream: UnixStream) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();

        // All responses funnel through one writer task to keep lines whole
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WireResponse>();
        let writer = tokio::spawn(async move {
            while let Some(response) = out_rx.recv().await {
                let json = match serde_json::to_string(&response) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Unserializable response, dropping");
                        continue;
                    }
                };
                if write_half.write_all(json.as_bytes()).await.is_err()
                    || write_half.write_all(b"\n").await.is_err()
                    || write_half.flush().await.is_err()
                {
                    break;
                }
            }
        });

        let mut lines = BufReader::new(read_half).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read bridge request")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<WireRequest>(line) {
                Ok(request) => self.handle_request(request, &out_tx).await,
                Err(e) => {
                    let _ = out_tx.send(WireResponse::Error {
                        message: format!("Unparseable request: {}", e),
                        request: None,
                    });
                }
            }
        }

        drop(out_tx);
        let _ = writer.await;
        Ok(())
    }

    async fn handle_request(&self, request: WireRequest, out_tx: &mpsc::UnboundedSender<WireResponse>) {
        match request {
            WireRequest::Action { action, args } => {
                debug!(%action, "Bridge action");
                let reply = match self.relay.dispatch(&action, args).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        let _ = out_tx.send(WireResponse::Error {
                            message: e.to_string(),
                            request: None,
                        });
                        return;
                    }
                };

                match reply {
                    DispatchReply::Done(data) => {
                        let _ = out_tx.send(WireResponse::Ok { data });
                    }

                    DispatchReply::Pending(ticket) => {
                        let request_id = ticket.request_id().to_string();
                        let _ = out_tx.send(WireResponse::Pending {
                            request: request_id.clone(),
                        });

                        let out_tx = out_tx.clone();
                        tokio::spawn(async move {
                            match ticket.wait().await {
                                Ok(payload) => {
                                    let _ = out_tx.send(WireResponse::Result {
                                        request: request_id,
                                        data: payload.to_value(),
                                    });
                                }
                                // An abandoned query is never answered
                                Err(RelayError::Superseded) => {
                                    debug!(request_id = %request_id, "Query superseded, no result sent");
                                }
                                Err(e) => {
                                    let _ = out_tx.send(WireResponse::Error {
                                        message: e.to_string(),
                                        request: Some(request_id),
                                    });
                                }
                            }
                        });
                    }

                    DispatchReply::Subscribed(mut subscription) => {
                        let _ = out_tx.send(WireResponse::Armed);

                        let out_tx = out_tx.clone();
                        tokio::spawn(async move {
                            while let Some(payload) = subscription.next().await {
                                if out_tx.send(WireResponse::Event { data: payload }).is_err() {
                                    break;
                                }
                            }
                        });
                    }

                    DispatchReply::Failed(e) => {
                        let _ = out_tx.send(WireResponse::Error {
                            message: e.to_string(),
                            request: None,
                        });
                    }
                }
            }

            WireRequest::Deliver { event, payload } => {
                debug!(%event, "Bridge inbound delivery");
                let _ = out_tx.send(self.handle_deliver(&event, payload));
            }
        }
    }

    /// Play the external viewer's side of an inbound interface
    fn handle_deliver(&self, event: &str, payload: Value) -> WireResponse {
        match event {
            EVENT_EQUIPMENT_SELECTED => {
                let id = payload
                    .as_str()
                    .map(str::to_string)
                    .or_else(|| payload.get("id").and_then(Value::as_str).map(str::to_string));
                let Some(id) = id else {
                    return WireResponse::Error {
                        message: "equipment-selected delivery needs an id".to_string(),
                        request: None,
                    };
                };

                let message = Message::new(wire::ACTION_CHECK_EQUIPMENT).with_extra(wire::EXTRA_EQUIPMENT_ID, id);
                match self.bus.send_ordered(&message) {
                    // The aggregated bundle is what a real viewer would see
                    Ok(bundle) => WireResponse::Ok {
                        data: json!(bundle.entries),
                    },
                    Err(e) => WireResponse::Error {
                        message: e.to_string(),
                        request: None,
                    },
                }
            }

            EVENT_OPEN_HOST_APP => {
                self.landing.deliver(payload);
                WireResponse::Ok { data: Value::Null }
            }

            other => WireResponse::Error {
                message: format!("Unknown inbound event: {}", other),
                request: None,
            },
        }
    }
}
