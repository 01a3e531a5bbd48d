//! Text line encoding for the stream transport.
//!
//! ```text
//! AUTH {username} AS {display_name} USING {secret}\r\n
//! JOIN {channel_id} AS {display_name}\r\n
//! MSG FROM {display_name} IS {content}\r\n
//! ERR FROM {display_name} IS {content}\r\n
//! REPLY {OK|NOK} IS {content}\r\n
//! BYE\r\n
//! ```
//!
//! Keywords are case-insensitive. Tokens are separated by exactly one space
//! and a line must match one grammar rule in full; there is no CONFIRM or
//! PING on this transport.

use ipk25chat_types::{Message, Payload, Transport};

use crate::error::ProtocolError;

pub const TERMINATOR: &[u8] = b"\r\n";

fn malformed(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::malformed(Transport::Tcp, reason)
}

/// Append the text line for `msg` to `buf`.
pub fn serialize(msg: &Message, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
    let line = match &msg.payload {
        Payload::Confirm | Payload::Ping => {
            return Err(ProtocolError::Unsupported {
                kind: msg.kind(),
                transport: Transport::Tcp,
            });
        }
        Payload::Reply {
            result, content, ..
        } => {
            let status = if *result { "OK" } else { "NOK" };
            format!("REPLY {status} IS {content}")
        }
        Payload::Auth {
            username,
            display_name,
            secret,
        } => format!("AUTH {username} AS {display_name} USING {secret}"),
        Payload::Join {
            channel_id,
            display_name,
        } => format!("JOIN {channel_id} AS {display_name}"),
        Payload::Msg {
            display_name,
            content,
        } => format!("MSG FROM {display_name} IS {content}"),
        Payload::Err {
            display_name,
            content,
        } => format!("ERR FROM {display_name} IS {content}"),
        Payload::Bye => "BYE".to_string(),
    };
    buf.extend_from_slice(line.as_bytes());
    buf.extend_from_slice(TERMINATOR);
    Ok(())
}

/// Parse one complete line, terminator included.
///
/// Stream messages carry no id; the returned message always has id 0.
pub fn deserialize(buf: &[u8]) -> Result<Message, ProtocolError> {
    let body = buf
        .strip_suffix(TERMINATOR)
        .ok_or_else(|| malformed("line is not CRLF-terminated"))?;
    if body.iter().any(|b| *b == b'\r' || *b == b'\n') {
        return Err(malformed("embedded line break"));
    }
    let line = std::str::from_utf8(body).map_err(|_| malformed("line is not valid UTF-8"))?;

    let verb = line.split(' ').next().unwrap_or_default();
    let payload = match verb.to_ascii_uppercase().as_str() {
        "AUTH" => parse_auth(line)?,
        "JOIN" => parse_join(line)?,
        "MSG" => {
            let (display_name, content) = parse_from_is(line)?;
            Payload::Msg {
                display_name,
                content,
            }
        }
        "ERR" => {
            let (display_name, content) = parse_from_is(line)?;
            Payload::Err {
                display_name,
                content,
            }
        }
        "REPLY" => parse_reply(line)?,
        "BYE" if line.len() == verb.len() => Payload::Bye,
        _ => return Err(malformed(format!("unrecognised line {line:?}"))),
    };
    Ok(Message { id: 0, payload })
}

/// Split `line` into exactly `N` space-separated parts, the last of which
/// takes the remainder of the line.
fn split_exact<const N: usize>(line: &str) -> Result<[&str; N], ProtocolError> {
    let mut parts = [""; N];
    let mut count = 0;
    for (slot, part) in parts.iter_mut().zip(line.splitn(N, ' ')) {
        *slot = part;
        count += 1;
    }
    if count == N {
        Ok(parts)
    } else {
        Err(malformed(format!("expected {N} tokens in {line:?}")))
    }
}

fn expect_keyword(token: &str, keyword: &str) -> Result<(), ProtocolError> {
    if token.eq_ignore_ascii_case(keyword) {
        Ok(())
    } else {
        Err(malformed(format!("expected {keyword}, found {token:?}")))
    }
}

fn parse_auth(line: &str) -> Result<Payload, ProtocolError> {
    let [_, username, as_kw, display_name, using_kw, secret] = split_exact::<6>(line)?;
    expect_keyword(as_kw, "AS")?;
    expect_keyword(using_kw, "USING")?;
    Ok(Payload::Auth {
        username: username.to_string(),
        display_name: display_name.to_string(),
        secret: secret.to_string(),
    })
}

fn parse_join(line: &str) -> Result<Payload, ProtocolError> {
    let [_, channel_id, as_kw, display_name] = split_exact::<4>(line)?;
    expect_keyword(as_kw, "AS")?;
    Ok(Payload::Join {
        channel_id: channel_id.to_string(),
        display_name: display_name.to_string(),
    })
}

fn parse_from_is(line: &str) -> Result<(String, String), ProtocolError> {
    let [_, from_kw, display_name, is_kw, content] = split_exact::<5>(line)?;
    expect_keyword(from_kw, "FROM")?;
    expect_keyword(is_kw, "IS")?;
    Ok((display_name.to_string(), content.to_string()))
}

fn parse_reply(line: &str) -> Result<Payload, ProtocolError> {
    let [_, status, is_kw, content] = split_exact::<4>(line)?;
    let result = if status.eq_ignore_ascii_case("OK") {
        true
    } else if status.eq_ignore_ascii_case("NOK") {
        false
    } else {
        return Err(malformed(format!("invalid REPLY status {status:?}")));
    };
    expect_keyword(is_kw, "IS")?;
    Ok(Payload::Reply {
        result,
        ref_message_id: 0,
        content: content.to_string(),
    })
}
