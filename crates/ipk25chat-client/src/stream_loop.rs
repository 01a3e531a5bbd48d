//! Event loop for the stream transport.

use crate::client::Client;
use crate::error::ClientError;
use crate::output::Presenter;
use crate::state::SessionState;

impl<P: Presenter> Client<P> {
    /// Wait on the socket and the event channel with no timeout. Exits once
    /// the session has ended; TCP delivery needs no confirmation round.
    pub(crate) async fn run_stream(&mut self) -> Result<(), ClientError> {
        while self.session.state() != SessionState::End {
            tokio::select! {
                result = self.session.handle_incoming_data() => {
                    self.handle_frames(result).await;
                }
                event = self.event_rx.recv() => {
                    self.handle_event(event).await;
                }
            }
        }
        Ok(())
    }
}
