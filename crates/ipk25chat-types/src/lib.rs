//! Shared types for ipk25chat.
//!
//! This crate contains the types shared across the ipk25chat workspace:
//! protocol messages, the transport selector, and the field limits both wire
//! encodings enforce.

pub mod field;
pub mod message;
pub mod transport;

pub use field::FieldError;
pub use message::{Message, MessageId, MessageKind, Payload};
pub use transport::Transport;
