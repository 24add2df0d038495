//! Relay error types

use thiserror::Error;

/// Errors surfaced to the caller of the relay dispatcher
///
/// Every failure is reported once to the immediate caller; nothing here is
/// retried or escalated further.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Malformed input for {action}: {reason}")]
    MalformedInput { action: String, reason: String },

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Query superseded by a newer request")]
    Superseded,

    #[error("Dispatcher channel closed")]
    ChannelClosed,
}

impl RelayError {
    /// Check if the caller sent something the dispatcher could never accept
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, RelayError::InvalidAction(_) | RelayError::MalformedInput { .. })
    }

    /// Stable wire identifier for the error class
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidAction(_) => "invalid-action",
            RelayError::MalformedInput { .. } => "malformed-input",
            RelayError::DeliveryFailed(_) => "delivery-failed",
            RelayError::Storage(_) => "storage",
            RelayError::Superseded => "superseded",
            RelayError::ChannelClosed => "channel-closed",
        }
    }
}
