//! The chat session: state machine, outbound ids and inbound dispatch.

use std::collections::VecDeque;
use std::net::SocketAddr;

use ipk25chat_protocol::{wire, Connection, ProtocolError};
use ipk25chat_types::{field, Message, MessageId, MessageKind, Payload, Transport};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::state::SessionState;

/// How many recent inbound datagrams are remembered for duplicate detection.
const RECENT_WINDOW: usize = 256;

/// What the event loop should do with an inbound message that the session
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The server confirmed one of our datagrams.
    Confirmed(MessageId),
    /// Outcome of our last Auth or Join.
    Reply { result: bool, content: String },
    Chat {
        display_name: String,
        content: String,
    },
    /// The server reported a fatal error. The caller must send Bye.
    ServerError {
        display_name: String,
        content: String,
    },
    /// The server closed the session.
    Closed,
    /// Nothing to show: a Ping, a duplicate, or a stale Reply.
    Ignored,
}

/// The single chat session of this process.
pub struct Session {
    connection: Connection,
    state: SessionState,
    display_name: String,
    next_id: MessageId,
    /// Id of the Auth or Join whose Reply we expect.
    awaiting_reply: Option<MessageId>,
    /// Recently processed inbound datagrams, oldest first.
    recent: VecDeque<Message>,
    failed: bool,
}

impl Session {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            state: SessionState::Start,
            display_name: String::new(),
            next_id: 0,
            awaiting_reply: None,
            recent: VecDeque::with_capacity(RECENT_WINDOW),
            failed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transport(&self) -> Transport {
        self.connection.transport()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.connection.peer_addr()
    }

    /// Whether the session passed through the Error state.
    pub fn ended_in_error(&self) -> bool {
        self.failed
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), ClientError> {
        if allowed {
            Ok(())
        } else {
            Err(ClientError::NotPermitted {
                action,
                state: self.state,
            })
        }
    }

    /// Validate `payload`, give it the next id and transmit it.
    async fn transmit(&mut self, payload: Payload) -> Result<Message, ClientError> {
        payload.validate()?;
        let msg = Message::new(self.allocate_id(), payload);
        self.connection.send(&msg).await?;
        debug!(id = msg.id, kind = %msg.kind(), state = %self.state, "sent");
        Ok(msg)
    }

    /// Authenticate, or retry after a negative Reply.
    ///
    /// Returns the sent message so the caller can track its confirmation.
    pub async fn send_auth(
        &mut self,
        username: &str,
        secret: &str,
        display_name: &str,
    ) -> Result<Message, ClientError> {
        self.require(self.state.can_authenticate(), "authenticate")?;
        let msg = self
            .transmit(Payload::Auth {
                username: username.to_string(),
                display_name: display_name.to_string(),
                secret: secret.to_string(),
            })
            .await?;
        self.display_name = display_name.to_string();
        self.awaiting_reply = Some(msg.id);
        self.state = SessionState::Auth;
        info!(username, display_name, "authenticating");
        Ok(msg)
    }

    pub async fn send_join(&mut self, channel_id: &str) -> Result<Message, ClientError> {
        self.require(self.state.can_chat(), "join a channel")?;
        let msg = self
            .transmit(Payload::Join {
                channel_id: channel_id.to_string(),
                display_name: self.display_name.clone(),
            })
            .await?;
        self.awaiting_reply = Some(msg.id);
        info!(channel_id, "joining channel");
        Ok(msg)
    }

    pub async fn send_msg(&mut self, content: &str) -> Result<Message, ClientError> {
        self.require(self.state.can_chat(), "send a message")?;
        self.transmit(Payload::Msg {
            display_name: self.display_name.clone(),
            content: content.to_string(),
        })
        .await
    }

    /// Say goodbye. The session is over afterwards even if the transmission
    /// fails.
    pub async fn send_bye(&mut self) -> Result<Message, ClientError> {
        self.require(self.state.can_say_bye(), "say goodbye")?;
        self.state = SessionState::End;
        let msg = self.transmit(Payload::Bye).await?;
        info!("session closed");
        Ok(msg)
    }

    /// Acknowledge an inbound datagram. Does not consume an id.
    pub async fn send_confirm(&mut self, id: MessageId) -> Result<(), ClientError> {
        self.connection.send(&Message::confirm(id)).await?;
        Ok(())
    }

    /// Send an already tracked message again, unchanged.
    pub async fn retransmit(&mut self, msg: &Message) -> Result<(), ClientError> {
        self.connection.send(msg).await?;
        Ok(())
    }

    /// Change the display name used by subsequent messages. Purely local.
    pub fn rename(&mut self, display_name: &str) -> Result<(), ClientError> {
        field::validate_display_name(display_name)?;
        debug!(old = %self.display_name, new = display_name, "renamed");
        self.display_name = display_name.to_string();
        Ok(())
    }

    /// Mark the session as failed. The caller should follow up with
    /// [`Session::send_bye`].
    pub fn fail(&mut self, reason: &ClientError) {
        warn!(state = %self.state, error = %reason, "session failed");
        self.failed = true;
        self.state = SessionState::Error;
    }

    /// End the session without telling the server, e.g. before
    /// authenticating or after the peer went away.
    pub fn close(&mut self) {
        debug!(state = %self.state, "session closed locally");
        self.state = SessionState::End;
    }

    /// Perform one read and decode everything it produced, in arrival order.
    ///
    /// A frame that matches no message kind is returned as an error in its
    /// place; the caller decides whether to continue.
    pub async fn handle_incoming_data(
        &mut self,
    ) -> Result<Vec<Result<Message, ProtocolError>>, ProtocolError> {
        let transport = self.transport();
        let frames = self.connection.read_frames().await?;
        Ok(frames
            .iter()
            .map(|frame| wire::deserialize(frame, transport))
            .collect())
    }

    /// Whether an inbound message must be answered with a Confirm.
    pub fn needs_confirm(&self, msg: &Message) -> bool {
        self.transport().needs_confirmation() && msg.kind() != MessageKind::Confirm
    }

    /// Apply an inbound message to the state machine.
    ///
    /// Messages the current state does not allow move the session to Error
    /// and are returned as [`ClientError::UnexpectedMessage`].
    pub fn receive(&mut self, msg: Message) -> Result<Inbound, ClientError> {
        let kind = msg.kind();

        if self.transport().needs_confirmation() && kind != MessageKind::Confirm {
            if self.recent.contains(&msg) {
                debug!(id = msg.id, kind = %kind, "duplicate datagram");
                return Ok(Inbound::Ignored);
            }
            self.remember(msg.clone());
        }

        if self.state == SessionState::End {
            return Ok(match msg.payload {
                Payload::Confirm => Inbound::Confirmed(msg.id),
                _ => {
                    debug!(id = msg.id, kind = %kind, "ignoring message after session end");
                    Inbound::Ignored
                }
            });
        }

        match msg.payload {
            Payload::Confirm => Ok(Inbound::Confirmed(msg.id)),
            Payload::Ping => Ok(Inbound::Ignored),
            Payload::Reply {
                result,
                ref_message_id,
                content,
            } => self.receive_reply(result, ref_message_id, content),
            Payload::Msg {
                display_name,
                content,
            } if self.state == SessionState::Open => Ok(Inbound::Chat {
                display_name,
                content,
            }),
            Payload::Err {
                display_name,
                content,
            } if matches!(self.state, SessionState::Auth | SessionState::Open) => {
                Ok(Inbound::ServerError {
                    display_name,
                    content,
                })
            }
            Payload::Bye => {
                info!("server closed the session");
                self.state = SessionState::End;
                Ok(Inbound::Closed)
            }
            _ => Err(self.unexpected(kind)),
        }
    }

    fn receive_reply(
        &mut self,
        result: bool,
        ref_message_id: MessageId,
        content: String,
    ) -> Result<Inbound, ClientError> {
        if !matches!(self.state, SessionState::Auth | SessionState::Open) {
            return Err(self.unexpected(MessageKind::Reply));
        }

        // Stream replies carry no reference id.
        let matches = match self.awaiting_reply {
            Some(id) => self.transport() == Transport::Tcp || id == ref_message_id,
            None => false,
        };
        if !matches {
            warn!(
                ref_message_id,
                awaiting = ?self.awaiting_reply,
                "ignoring unsolicited reply"
            );
            return Ok(Inbound::Ignored);
        }
        self.awaiting_reply = None;

        if self.state == SessionState::Auth && result {
            info!(display_name = %self.display_name, "authenticated");
            self.state = SessionState::Open;
        }
        Ok(Inbound::Reply { result, content })
    }

    /// A retransmission repeats the id and the payload; a server id that
    /// wrapped around arrives with new content or after the window moved on.
    fn remember(&mut self, msg: Message) {
        if self.recent.len() == RECENT_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(msg);
    }

    fn unexpected(&mut self, kind: MessageKind) -> ClientError {
        let err = ClientError::UnexpectedMessage {
            kind,
            state: self.state,
        };
        self.fail(&err);
        err
    }
}
