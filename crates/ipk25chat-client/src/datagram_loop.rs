//! Event loop for the datagram transport.

use tokio::time::Instant;
use tracing::debug;

use crate::client::Client;
use crate::error::ClientError;
use crate::output::Presenter;
use crate::reliability::PendingConfirmations;
use crate::state::SessionState;

impl<P: Presenter> Client<P> {
    /// Wait on the socket, the event channel and the earliest retransmit
    /// deadline. Exits once the session has ended and every tracked message
    /// has been confirmed or given up on.
    pub(crate) async fn run_datagram(&mut self) -> Result<(), ClientError> {
        while !self.datagram_done() {
            let deadline = self
                .pending
                .as_ref()
                .and_then(PendingConfirmations::next_deadline);

            tokio::select! {
                result = self.session.handle_incoming_data() => {
                    self.handle_frames(result).await;
                }
                event = self.event_rx.recv() => {
                    self.handle_event(event).await;
                }
                () = wait_until(deadline) => {
                    self.handle_timeout().await;
                }
            }
        }
        Ok(())
    }

    fn datagram_done(&self) -> bool {
        if self.session.state() != SessionState::End {
            return false;
        }
        match &self.pending {
            Some(pending) if !pending.is_empty() => {
                debug!(pending = pending.len(), "waiting for final confirmations");
                false
            }
            _ => true,
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
