//! Client errors.

use ipk25chat_types::{FieldError, MessageId, MessageKind};
use thiserror::Error;

use crate::state::SessionState;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    /// The session state forbids the action. Nothing was transmitted.
    #[error("cannot {action} in state {state}")]
    NotPermitted {
        action: &'static str,
        state: SessionState,
    },

    /// A user-supplied field breaks protocol limits. Nothing was transmitted.
    #[error(transparent)]
    InvalidField(#[from] FieldError),

    /// A well-formed message arrived that the current state does not allow.
    #[error("unexpected {kind} message in state {state}")]
    UnexpectedMessage {
        kind: MessageKind,
        state: SessionState,
    },

    #[error("{kind} message {id} was never confirmed")]
    Undelivered { kind: MessageKind, id: MessageId },

    #[error("protocol error: {0}")]
    Protocol(#[from] ipk25chat_protocol::ProtocolError),
}

impl ClientError {
    /// Local refusals the user can correct; the session carries on unchanged.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotPermitted { .. } | Self::InvalidField(_))
    }
}
