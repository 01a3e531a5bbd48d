//! Binary datagram encoding.
//!
//! Every datagram starts with a 3-byte header, followed by a kind-specific
//! payload. All multi-byte integers are big-endian; text fields are
//! NUL-terminated.
//!
//! ```text
//! +--------+--------+--------+---------------------------------+
//! |  type  |   message id    |  payload ...                    |
//! +--------+--------+--------+---------------------------------+
//!
//! CONFIRM, PING, BYE   (no payload)
//! REPLY    result(1) ref_id(2) content\0
//! AUTH     username\0 display_name\0 secret\0
//! JOIN     channel_id\0 display_name\0
//! MSG/ERR  display_name\0 content\0
//! ```

use ipk25chat_types::{Message, MessageKind, Payload, Transport};

use crate::error::ProtocolError;

pub const HEADER_LEN: usize = 3;

fn malformed(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::malformed(Transport::Udp, reason)
}

/// Append the datagram encoding of `msg` to `buf`.
///
/// Every kind has a datagram encoding, so this cannot fail. Field limits are
/// the caller's concern (see [`super::serialize`]).
pub fn serialize(msg: &Message, buf: &mut Vec<u8>) {
    buf.push(msg.kind().tag());
    buf.extend_from_slice(&msg.id.to_be_bytes());

    match &msg.payload {
        Payload::Confirm | Payload::Ping | Payload::Bye => {}
        Payload::Reply {
            result,
            ref_message_id,
            content,
        } => {
            buf.push(u8::from(*result));
            buf.extend_from_slice(&ref_message_id.to_be_bytes());
            put_str(buf, content);
        }
        Payload::Auth {
            username,
            display_name,
            secret,
        } => {
            put_str(buf, username);
            put_str(buf, display_name);
            put_str(buf, secret);
        }
        Payload::Join {
            channel_id,
            display_name,
        } => {
            put_str(buf, channel_id);
            put_str(buf, display_name);
        }
        Payload::Msg {
            display_name,
            content,
        }
        | Payload::Err {
            display_name,
            content,
        } => {
            put_str(buf, display_name);
            put_str(buf, content);
        }
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

/// Parse one datagram.
///
/// Never reads past `buf`; truncated frames, unknown tags, unterminated
/// strings and trailing bytes are all rejected.
pub fn deserialize(buf: &[u8]) -> Result<Message, ProtocolError> {
    let mut reader = Reader::new(buf);
    let tag = reader.u8().map_err(|_| malformed("empty datagram"))?;
    let kind = MessageKind::from_tag(tag).ok_or_else(|| malformed(format!("unknown type 0x{tag:02x}")))?;
    let id = reader
        .u16()
        .map_err(|_| malformed(format!("truncated {kind} header")))?;

    let payload = match kind {
        MessageKind::Confirm => Payload::Confirm,
        MessageKind::Ping => Payload::Ping,
        MessageKind::Bye => Payload::Bye,
        MessageKind::Reply => decode_reply(&mut reader)?,
        MessageKind::Auth => Payload::Auth {
            username: reader.string()?,
            display_name: reader.string()?,
            secret: reader.string()?,
        },
        MessageKind::Join => Payload::Join {
            channel_id: reader.string()?,
            display_name: reader.string()?,
        },
        MessageKind::Msg => Payload::Msg {
            display_name: reader.string()?,
            content: reader.string()?,
        },
        MessageKind::Err => Payload::Err {
            display_name: reader.string()?,
            content: reader.string()?,
        },
    };
    reader.finish(kind)?;

    Ok(Message { id, payload })
}

fn decode_reply(reader: &mut Reader<'_>) -> Result<Payload, ProtocolError> {
    let result = match reader.u8()? {
        0 => false,
        1 => true,
        other => return Err(malformed(format!("invalid REPLY result byte {other}"))),
    };
    let ref_message_id = reader.u16()?;
    let content = reader.string()?;
    Ok(Payload::Reply {
        result,
        ref_message_id,
        content,
    })
}

/// Bounds-checked cursor over a received datagram.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| malformed("datagram truncated"))?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ProtocolError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn string(&mut self) -> Result<String, ProtocolError> {
        let rest = &self.buf[self.pos..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| malformed("unterminated string"))?;
        let text = std::str::from_utf8(&rest[..len])
            .map_err(|_| malformed("string is not valid UTF-8"))?
            .to_string();
        self.pos += len + 1;
        Ok(text)
    }

    fn finish(self, kind: MessageKind) -> Result<(), ProtocolError> {
        let extra = self.buf.len() - self.pos;
        if extra == 0 {
            Ok(())
        } else {
            Err(malformed(format!("{extra} trailing bytes after {kind}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: MessageKind, id: u16) -> Vec<u8> {
        let mut buf = vec![kind.tag()];
        buf.extend_from_slice(&id.to_be_bytes());
        buf
    }

    fn encode(msg: &Message) -> Vec<u8> {
        let mut buf = Vec::new();
        serialize(msg, &mut buf);
        buf
    }

    #[test]
    fn auth_layout() {
        let bytes = encode(&Message::auth(1, "bob", "Bob", "s3cr3t"));
        let mut expected = vec![0x02, 0x00, 0x01];
        expected.extend_from_slice(b"bob\0Bob\0s3cr3t\0");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn confirm_is_header_only() {
        assert_eq!(encode(&Message::confirm(0x1234)), [0x00, 0x12, 0x34]);
    }

    #[test]
    fn reply_layout() {
        let bytes = encode(&Message::reply(0x1234, true, 0x5678, "Hi"));
        let mut expected = header(MessageKind::Reply, 0x1234);
        expected.extend_from_slice(&[0x01, 0x56, 0x78]);
        expected.extend_from_slice(b"Hi\0");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn decodes_reply() {
        let mut buf = header(MessageKind::Reply, 0x1234);
        buf.extend_from_slice(&[0x01, 0x56, 0x78]);
        buf.extend_from_slice(b"Hello\0");
        let msg = deserialize(&buf).unwrap();
        assert_eq!(msg, Message::reply(0x1234, true, 0x5678, "Hello"));
    }

    #[test]
    fn one_byte_reply_is_rejected() {
        let err = deserialize(&[MessageKind::Reply.tag()]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn every_truncation_of_a_reply_is_rejected() {
        let full = encode(&Message::reply(9, false, 3, "nope"));
        for len in 0..full.len() {
            assert!(deserialize(&full[..len]).is_err(), "prefix of {len} bytes");
        }
        assert!(deserialize(&full).is_ok());
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let mut buf = header(MessageKind::Msg, 1);
        buf.extend_from_slice(b"Bob\0hello");
        assert!(deserialize(&buf).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut buf = encode(&Message::bye(4));
        buf.push(0);
        assert!(deserialize(&buf).is_err());

        let mut buf = encode(&Message::msg(1, "Bob", "hi"));
        buf.extend_from_slice(b"junk");
        assert!(deserialize(&buf).is_err());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(deserialize(&[0x42, 0, 1]).is_err());
    }

    #[test]
    fn bad_result_byte_is_rejected() {
        let mut buf = header(MessageKind::Reply, 1);
        buf.extend_from_slice(&[0x02, 0, 0]);
        buf.extend_from_slice(b"x\0");
        assert!(deserialize(&buf).is_err());
    }

    #[test]
    fn ping_and_err_decode() {
        assert_eq!(deserialize(&[0xFD, 0xAB, 0xCD]).unwrap(), Message::ping(0xABCD));

        let mut buf = header(MessageKind::Err, 2);
        buf.extend_from_slice(b"Server\0bad things\0");
        assert_eq!(
            deserialize(&buf).unwrap(),
            Message::err(2, "Server", "bad things")
        );
    }
}
