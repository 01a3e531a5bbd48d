//! Wire protocol and socket handling for ipk25chat.
//!
//! This crate encodes and decodes protocol messages for the two transports
//! (CRLF text lines over TCP, binary frames over UDP), resolves the server
//! endpoint, and owns the socket through [`Connection`].

pub mod connection;
pub mod error;
pub mod transport;
pub mod wire;

pub use connection::Connection;
pub use error::ProtocolError;
pub use transport::resolve;
