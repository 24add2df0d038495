//! Bridge client
//!
//! Connects to a running bridge daemon over its Unix Domain Socket. Used by
//! `db send` / `db deliver` and by integration tests standing in for the
//! embedded UI layer.

use std::path::PathBuf;
use std::time::Duration;

use eyre::{Context, Result, eyre};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;

use super::listener::get_socket_path;
use super::messages::{WireRequest, WireResponse};

/// Default timeout for bridge operations
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the bridge daemon
#[derive(Debug, Clone)]
pub struct BridgeClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl Default for BridgeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeClient {
    /// Create a client with the default socket path
    pub fn new() -> Self {
        Self {
            socket_path: get_socket_path(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a client with a custom socket path (for testing)
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the daemon socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Dispatch an action and wait until it fully settles
    ///
    /// A `pending` status is followed through to the matching `result` (or
    /// error) line, so the caller always gets the final outcome.
    pub async fn call(&self, action: &str, args: Vec<Value>) -> Result<WireResponse> {
        debug!(%action, "BridgeClient: dispatching action");
        let mut conn = self.connect().await?;
        conn.send(&WireRequest::Action {
            action: action.to_string(),
            args,
        })
        .await?;

        let first = conn.read_response(self.timeout).await?;
        let WireResponse::Pending { request } = &first else {
            return Ok(first);
        };
        let request_id = request.clone();

        loop {
            let response = conn.read_response(self.timeout).await?;
            match &response {
                WireResponse::Result { request, .. } if *request == request_id => return Ok(response),
                WireResponse::Error { request: Some(request), .. } if *request == request_id => return Ok(response),
                other => debug!(?other, "BridgeClient: skipping interleaved response"),
            }
        }
    }

    /// Deliver an inbound event, as the external viewer process would
    pub async fn deliver(&self, event: &str, payload: Value) -> Result<WireResponse> {
        debug!(%event, "BridgeClient: delivering inbound event");
        let mut conn = self.connect().await?;
        conn.send(&WireRequest::Deliver {
            event: event.to_string(),
            payload,
        })
        .await?;
        conn.read_response(self.timeout).await
    }

    /// Arm a subscription and return the event stream
    ///
    /// The returned stream holds its connection open; dropping it tears the
    /// subscription's transport down.
    pub async fn subscribe(&self, action: &str) -> Result<BridgeSubscription> {
        debug!(%action, "BridgeClient: subscribing");
        let mut conn = self.connect().await?;
        conn.send(&WireRequest::Action {
            action: action.to_string(),
            args: vec![],
        })
        .await?;

        match conn.read_response(self.timeout).await? {
            WireResponse::Armed => Ok(BridgeSubscription { conn }),
            WireResponse::Error { message, .. } => Err(eyre!("Bridge error: {}", message)),
            other => Err(eyre!("Unexpected response: {:?}", other)),
        }
    }

    async fn connect(&self) -> Result<Connection> {
        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to bridge socket")?;

        let (read_half, write_half) = stream.into_split();
        Ok(Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }
}

/// An armed subscription's connection
pub struct BridgeSubscription {
    conn: Connection,
}

impl BridgeSubscription {
    /// Wait for the next pushed event
    pub async fn next_event(&mut self, timeout: Duration) -> Result<Value> {
        match self.conn.read_response(timeout).await? {
            WireResponse::Event { data } => Ok(data),
            other => Err(eyre!("Unexpected response: {:?}", other)),
        }
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn send(&mut self, request: &WireRequest) -> Result<()> {
        let json = serde_json::to_string(request).context("Failed to serialize request")?;
        self.writer.write_all(json.as_bytes()).await.context("Failed to write request")?;
        self.writer.write_all(b"\n").await.context("Failed to write newline")?;
        self.writer.flush().await.context("Failed to flush request")?;
        Ok(())
    }

    async fn read_response(&mut self, timeout: Duration) -> Result<WireResponse> {
        let mut line = String::new();
        let bytes_read = tokio::time::timeout(timeout, self.reader.read_line(&mut line))
            .await
            .context("Read timeout")?
            .context("Failed to read response")?;

        if bytes_read == 0 {
            return Err(eyre!("Bridge connection closed"));
        }

        serde_json::from_str(line.trim()).context("Failed to parse bridge response")
    }
}
