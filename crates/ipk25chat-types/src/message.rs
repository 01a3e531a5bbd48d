//! Protocol message types.
//!
//! A [`Message`] is a closed tagged union: the [`Payload`] variant determines
//! the [`MessageKind`] and therefore the wire tag. The 16-bit id is only
//! meaningful on the datagram transport.

use crate::field::{
    validate_channel_id, validate_content, validate_display_name, validate_secret,
    validate_username, FieldError,
};

/// Identifier carried by every datagram frame.
pub type MessageId = u16;

/// Wire tag of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Confirm = 0x00,
    Reply = 0x01,
    Auth = 0x02,
    Join = 0x03,
    Msg = 0x04,
    Ping = 0xFD,
    Err = 0xFE,
    Bye = 0xFF,
}

impl MessageKind {
    /// The one-byte tag used in the datagram header.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a kind by its datagram tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::Confirm),
            0x01 => Some(Self::Reply),
            0x02 => Some(Self::Auth),
            0x03 => Some(Self::Join),
            0x04 => Some(Self::Msg),
            0xFD => Some(Self::Ping),
            0xFE => Some(Self::Err),
            0xFF => Some(Self::Bye),
            _ => None,
        }
    }

    /// Whether an outbound message of this kind must be confirmed when sent
    /// over the datagram transport.
    pub fn requires_confirmation(self) -> bool {
        !matches!(self, Self::Confirm | Self::Ping)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Confirm => "CONFIRM",
            Self::Reply => "REPLY",
            Self::Auth => "AUTH",
            Self::Join => "JOIN",
            Self::Msg => "MSG",
            Self::Ping => "PING",
            Self::Err => "ERR",
            Self::Bye => "BYE",
        };
        f.write_str(name)
    }
}

/// Kind-specific message fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Acknowledges the datagram whose id equals the message id.
    Confirm,
    /// Outcome of a previous Auth or Join.
    Reply {
        result: bool,
        ref_message_id: MessageId,
        content: String,
    },
    Auth {
        username: String,
        display_name: String,
        secret: String,
    },
    Join {
        channel_id: String,
        display_name: String,
    },
    Msg {
        display_name: String,
        content: String,
    },
    Err {
        display_name: String,
        content: String,
    },
    Ping,
    Bye,
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Confirm => MessageKind::Confirm,
            Self::Reply { .. } => MessageKind::Reply,
            Self::Auth { .. } => MessageKind::Auth,
            Self::Join { .. } => MessageKind::Join,
            Self::Msg { .. } => MessageKind::Msg,
            Self::Err { .. } => MessageKind::Err,
            Self::Ping => MessageKind::Ping,
            Self::Bye => MessageKind::Bye,
        }
    }

    /// Check every string field against its protocol limits.
    pub fn validate(&self) -> Result<(), FieldError> {
        match self {
            Self::Confirm | Self::Ping | Self::Bye => Ok(()),
            Self::Reply { content, .. } => validate_content(content),
            Self::Auth {
                username,
                display_name,
                secret,
            } => {
                validate_username(username)?;
                validate_display_name(display_name)?;
                validate_secret(secret)
            }
            Self::Join {
                channel_id,
                display_name,
            } => {
                validate_channel_id(channel_id)?;
                validate_display_name(display_name)
            }
            Self::Msg {
                display_name,
                content,
            }
            | Self::Err {
                display_name,
                content,
            } => {
                validate_display_name(display_name)?;
                validate_content(content)
            }
        }
    }
}

/// A protocol message: id plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub payload: Payload,
}

impl Message {
    pub fn new(id: MessageId, payload: Payload) -> Self {
        Self { id, payload }
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    /// A Confirm for the message with id `ref_id`.
    pub fn confirm(ref_id: MessageId) -> Self {
        Self::new(ref_id, Payload::Confirm)
    }

    pub fn auth(
        id: MessageId,
        username: impl Into<String>,
        display_name: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            Payload::Auth {
                username: username.into(),
                display_name: display_name.into(),
                secret: secret.into(),
            },
        )
    }

    pub fn join(
        id: MessageId,
        channel_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            Payload::Join {
                channel_id: channel_id.into(),
                display_name: display_name.into(),
            },
        )
    }

    pub fn msg(id: MessageId, display_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            id,
            Payload::Msg {
                display_name: display_name.into(),
                content: content.into(),
            },
        )
    }

    pub fn err(id: MessageId, display_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            id,
            Payload::Err {
                display_name: display_name.into(),
                content: content.into(),
            },
        )
    }

    pub fn reply(
        id: MessageId,
        result: bool,
        ref_message_id: MessageId,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            Payload::Reply {
                result,
                ref_message_id,
                content: content.into(),
            },
        )
    }

    pub fn ping(id: MessageId) -> Self {
        Self::new(id, Payload::Ping)
    }

    pub fn bye(id: MessageId) -> Self {
        Self::new(id, Payload::Bye)
    }
}
