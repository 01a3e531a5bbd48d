//! Chat client core for ipk25chat.
//!
//! Implements the session state machine, the confirmation and retransmission
//! layer for the datagram transport, interactive command handling, and the
//! per-transport event loops.

pub mod client;
pub mod command;
pub mod config;
mod datagram_loop;
pub mod error;
pub mod output;
pub mod reliability;
pub mod session;
pub mod setup;
pub mod state;
mod stream_loop;

pub use client::{Client, ClientEvent};
pub use config::ClientConfig;
pub use error::ClientError;
pub use output::{Presenter, StdioPresenter};
pub use session::Session;
pub use state::SessionState;
