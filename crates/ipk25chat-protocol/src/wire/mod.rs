//! Wire formats for both transports.
//!
//! Each transport has its own codec module. [`serialize`] and [`deserialize`]
//! select the codec for a transport; within a codec a single match on the
//! message kind (datagram tag byte, or leading keyword of a text line) picks
//! the per-variant routine.

pub mod datagram;
pub mod stream;

use ipk25chat_types::{Message, Transport};

use crate::error::ProtocolError;

/// Largest datagram the client will read in one receive.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Longest text line accepted on the stream transport, terminator included.
pub const MAX_LINE_SIZE: usize = 2048;

/// Append the wire encoding of `msg` to `buf`.
///
/// Field limits are checked first; on error nothing is appended.
pub fn serialize(
    msg: &Message,
    transport: Transport,
    buf: &mut Vec<u8>,
) -> Result<(), ProtocolError> {
    msg.payload.validate()?;
    match transport {
        Transport::Tcp => stream::serialize(msg, buf),
        Transport::Udp => {
            datagram::serialize(msg, buf);
            Ok(())
        }
    }
}

/// Encode `msg` into a fresh buffer.
pub fn encode(msg: &Message, transport: Transport) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    serialize(msg, transport, &mut buf)?;
    Ok(buf)
}

/// Parse exactly one message from `buf`.
///
/// For the stream transport `buf` must be one complete CRLF-terminated line.
/// For the datagram transport it must be one whole datagram.
pub fn deserialize(buf: &[u8], transport: Transport) -> Result<Message, ProtocolError> {
    let msg = match transport {
        Transport::Tcp => stream::deserialize(buf)?,
        Transport::Udp => datagram::deserialize(buf)?,
    };
    msg.payload
        .validate()
        .map_err(|e| ProtocolError::malformed(transport, e.to_string()))?;
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipk25chat_types::{MessageKind, Payload};

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::reply(3, true, 1, "Auth success."),
            Message::reply(4, false, 2, "Channel is full"),
            Message::auth(1, "bob", "Bob", "s3cr3t"),
            Message::join(2, "general", "Bob"),
            Message::msg(5, "Bob", "hello there, world!"),
            Message::err(6, "Server", "something broke"),
            Message::bye(7),
        ]
    }

    #[test]
    fn both_transports_reproduce_fields() {
        for transport in [Transport::Tcp, Transport::Udp] {
            for msg in sample_messages() {
                let bytes = encode(&msg, transport).unwrap();
                let decoded = deserialize(&bytes, transport).unwrap();
                let mut expected = msg.payload.clone();
                // Text lines carry no ids at all.
                if let (Transport::Tcp, Payload::Reply { ref_message_id, .. }) =
                    (transport, &mut expected)
                {
                    *ref_message_id = 0;
                }
                assert_eq!(decoded.payload, expected, "{transport} {}", msg.kind());
                if transport == Transport::Udp {
                    assert_eq!(decoded.id, msg.id);
                }
            }
        }
    }

    #[test]
    fn confirm_and_ping_round_trip_only_over_udp() {
        for msg in [Message::confirm(0x1234), Message::ping(9)] {
            let bytes = encode(&msg, Transport::Udp).unwrap();
            assert_eq!(deserialize(&bytes, Transport::Udp).unwrap(), msg);

            let err = encode(&msg, Transport::Tcp).unwrap_err();
            assert!(matches!(err, ProtocolError::Unsupported { transport: Transport::Tcp, .. }));
            assert!(!err.is_malformed());
        }
    }

    #[test]
    fn invalid_fields_append_nothing() {
        let mut buf = b"prefix".to_vec();
        let msg = Message::msg(1, "has space", "hi");
        let err = serialize(&msg, Transport::Udp, &mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField(_)));
        assert_eq!(buf, b"prefix");
    }

    #[test]
    fn decoded_fields_are_validated() {
        // Well-formed datagram, but the display name contains a space.
        let mut bytes = vec![MessageKind::Msg.tag(), 0, 1];
        bytes.extend_from_slice(b"B ob\0hi\0");
        let err = deserialize(&bytes, Transport::Udp).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn stream_reply_payload_ignores_ids() {
        let msg = Message::reply(42, true, 17, "Success");
        let decoded = deserialize(&encode(&msg, Transport::Tcp).unwrap(), Transport::Tcp).unwrap();
        assert_eq!(
            decoded.payload,
            Payload::Reply {
                result: true,
                ref_message_id: 0,
                content: "Success".to_string()
            }
        );
    }
}
