//! Protocol and transport errors.

use ipk25chat_types::{FieldError, MessageKind, Transport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The bytes do not form any valid message for the transport.
    #[error("malformed {transport} frame: {reason}")]
    Malformed {
        transport: Transport,
        reason: String,
    },

    /// The message kind has no encoding on the transport. This is a caller
    /// bug, not something a peer can trigger.
    #[error("{kind} messages cannot be sent over {transport}")]
    Unsupported {
        kind: MessageKind,
        transport: Transport,
    },

    #[error("invalid field: {0}")]
    InvalidField(#[from] FieldError),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("stream closed by peer")]
    StreamClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    pub(crate) fn malformed(transport: Transport, reason: impl Into<String>) -> Self {
        Self::Malformed {
            transport,
            reason: reason.into(),
        }
    }

    /// Whether this is an ordinary parse failure of received bytes.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}
