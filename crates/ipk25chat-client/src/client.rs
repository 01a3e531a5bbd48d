//! Client orchestration: the event channel and the handlers shared by both
//! transport loops.

use ipk25chat_protocol::ProtocolError;
use ipk25chat_types::Message;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::command;
use crate::config::ReliabilityConfig;
use crate::error::ClientError;
use crate::output::Presenter;
use crate::reliability::{Expiry, PendingConfirmations};
use crate::session::{Inbound, Session};
use crate::state::SessionState;

/// Events fed into the client's loop from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// One line typed by the user.
    Input(String),
    /// The user input source hung up.
    InputClosed,
    /// Termination signal.
    Shutdown,
}

/// Drives one session until it ends.
pub struct Client<P: Presenter> {
    pub(crate) session: Session,
    /// Present only on the datagram transport.
    pub(crate) pending: Option<PendingConfirmations>,
    presenter: P,
    event_tx: mpsc::Sender<ClientEvent>,
    pub(crate) event_rx: mpsc::Receiver<ClientEvent>,
}

impl<P: Presenter> Client<P> {
    pub fn new(session: Session, reliability: &ReliabilityConfig, presenter: P) -> Self {
        let pending = session
            .transport()
            .needs_confirmation()
            .then(|| PendingConfirmations::from_config(reliability));
        let (event_tx, event_rx) = mpsc::channel(256);

        Self {
            session,
            pending,
            presenter,
            event_tx,
            event_rx,
        }
    }

    /// Get a clone of the event sender for feeding events into the client.
    pub fn event_sender(&self) -> mpsc::Sender<ClientEvent> {
        self.event_tx.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn pending(&self) -> Option<&PendingConfirmations> {
        self.pending.as_ref()
    }

    /// Run the event loop for the session's transport until the session ends.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        info!(
            transport = %self.session.transport(),
            peer = %self.session.peer_addr(),
            "client running"
        );
        if self.pending.is_some() {
            self.run_datagram().await?;
        } else {
            self.run_stream().await?;
        }
        info!(failed = self.session.ended_in_error(), "client stopped");
        Ok(())
    }

    pub(crate) async fn handle_event(&mut self, event: Option<ClientEvent>) {
        match event {
            Some(ClientEvent::Input(line)) => self.handle_line(&line).await,
            Some(ClientEvent::InputClosed) => {
                debug!("input closed");
                self.say_goodbye().await;
            }
            Some(ClientEvent::Shutdown) | None => {
                info!("shutting down");
                self.say_goodbye().await;
            }
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let command = match command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(e) => {
                self.presenter.local_error(&e.to_string());
                return;
            }
        };

        let result = command::dispatch(
            command,
            &mut self.session,
            self.pending.as_mut(),
            &mut self.presenter,
        )
        .await;
        match result {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => self.presenter.local_error(&e.to_string()),
            Err(e) => self.fail(e).await,
        }
    }

    /// Process the outcome of one socket read.
    pub(crate) async fn handle_frames(
        &mut self,
        result: Result<Vec<Result<Message, ProtocolError>>, ProtocolError>,
    ) {
        let messages = match result {
            Ok(messages) => messages,
            Err(ProtocolError::StreamClosed) => {
                info!(state = %self.session.state(), "server closed the connection");
                self.session.close();
                return;
            }
            Err(e) => {
                self.fail(e.into()).await;
                return;
            }
        };

        for message in messages {
            match message {
                Ok(msg) => self.handle_message(msg).await,
                Err(e) => {
                    self.fail(e.into()).await;
                    return;
                }
            }
        }
    }

    async fn handle_message(&mut self, msg: Message) {
        debug!(id = msg.id, kind = %msg.kind(), state = %self.session.state(), "received");

        if self.session.needs_confirm(&msg) {
            if let Err(e) = self.session.send_confirm(msg.id).await {
                self.fail(e).await;
                return;
            }
        }

        match self.session.receive(msg) {
            Ok(Inbound::Confirmed(id)) => {
                if let Some(pending) = self.pending.as_mut() {
                    if pending.on_confirm(id).is_none() {
                        debug!(id, "confirm for nothing pending");
                    }
                }
            }
            Ok(Inbound::Reply { result, content }) => self.presenter.reply(result, &content),
            Ok(Inbound::Chat {
                display_name,
                content,
            }) => self.presenter.chat(&display_name, &content),
            Ok(Inbound::ServerError {
                display_name,
                content,
            }) => {
                self.presenter.server_error(&display_name, &content);
                self.say_goodbye().await;
            }
            Ok(Inbound::Closed) => self.presenter.info("Connection closed by server."),
            Ok(Inbound::Ignored) => {}
            Err(e) => self.fail(e).await,
        }
    }

    /// Handle the earliest pending deadline (datagram only).
    pub(crate) async fn handle_timeout(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let result = match pending.on_timeout(Instant::now()) {
            None => return,
            Some(Expiry::Retransmit(msg)) => self.session.retransmit(msg).await,
            Some(Expiry::Exhausted(msg)) => Err(ClientError::Undelivered {
                kind: msg.kind(),
                id: msg.id,
            }),
        };
        if let Err(e) = result {
            self.fail(e).await;
        }
    }

    /// Report a fatal condition, move to Error and attempt the final Bye.
    async fn fail(&mut self, err: ClientError) {
        self.presenter.local_error(&err.to_string());
        match self.session.state() {
            SessionState::End => return,
            SessionState::Error => {}
            SessionState::Start | SessionState::Auth | SessionState::Open => {
                self.session.fail(&err);
            }
        }
        self.say_goodbye().await;
    }

    /// Best-effort Bye (or silent close before authenticating).
    async fn say_goodbye(&mut self) {
        if let Err(e) = command::leave(&mut self.session, self.pending.as_mut()).await {
            warn!(error = %e, "failed to send bye");
            self.session.close();
        }
    }
}
