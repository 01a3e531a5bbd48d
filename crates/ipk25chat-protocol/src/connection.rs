//! Socket ownership and framing.
//!
//! A [`Connection`] wraps either a TCP stream or a UDP socket. Sends are
//! immediate; [`Connection::read_frames`] performs exactly one socket read and
//! returns the complete frames it produced: whole CRLF lines on TCP, one
//! datagram on UDP.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use ipk25chat_types::{Message, Transport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, trace, warn};

use crate::error::ProtocolError;
use crate::wire::{self, stream::TERMINATOR, MAX_DATAGRAM_SIZE, MAX_LINE_SIZE};

const STREAM_READ_CHUNK: usize = 4096;

enum Socket {
    Stream(TcpStream),
    Datagram(UdpSocket),
}

/// The client end of a session's transport.
pub struct Connection {
    socket: Socket,
    /// Where datagrams are sent. Follows the server's dynamic port on UDP.
    peer: SocketAddr,
    read_buf: Vec<u8>,
    /// Bytes of an incomplete line (TCP only).
    partial: Vec<u8>,
}

impl Connection {
    /// Open the transport towards `addr`.
    pub async fn open(transport: Transport, addr: SocketAddr) -> Result<Self, ProtocolError> {
        match transport {
            Transport::Tcp => Self::connect_tcp(addr).await,
            Transport::Udp => Self::bind_udp(addr).await,
        }
    }

    /// Connect a TCP stream to `addr`.
    pub async fn connect_tcp(addr: SocketAddr) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ProtocolError::Connection(format!("connect to {addr}: {e}")))?;
        debug!(peer = %addr, "tcp connected");
        Ok(Self {
            socket: Socket::Stream(stream),
            peer: addr,
            read_buf: vec![0; STREAM_READ_CHUNK],
            partial: Vec::new(),
        })
    }

    /// Bind an ephemeral UDP socket that talks to `addr`.
    pub async fn bind_udp(addr: SocketAddr) -> Result<Self, ProtocolError> {
        let local = if addr.is_ipv4() {
            SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0)
        } else {
            SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0)
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| ProtocolError::Connection(format!("bind udp socket: {e}")))?;
        debug!(peer = %addr, "udp socket bound");
        Ok(Self {
            socket: Socket::Datagram(socket),
            peer: addr,
            read_buf: vec![0; MAX_DATAGRAM_SIZE],
            partial: Vec::new(),
        })
    }

    pub fn transport(&self) -> Transport {
        match self.socket {
            Socket::Stream(_) => Transport::Tcp,
            Socket::Datagram(_) => Transport::Udp,
        }
    }

    /// Current destination of outgoing data.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        let addr = match &self.socket {
            Socket::Stream(s) => s.local_addr()?,
            Socket::Datagram(s) => s.local_addr()?,
        };
        Ok(addr)
    }

    /// Encode and transmit one message.
    pub async fn send(&mut self, msg: &Message) -> Result<(), ProtocolError> {
        let bytes = wire::encode(msg, self.transport())?;
        self.transmit(&bytes).await?;
        trace!(id = msg.id, kind = %msg.kind(), len = bytes.len(), "sent message");
        Ok(())
    }

    /// Write raw bytes to the peer.
    pub async fn transmit(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        match &mut self.socket {
            Socket::Stream(stream) => stream.write_all(bytes).await?,
            Socket::Datagram(socket) => {
                socket.send_to(bytes, self.peer).await?;
            }
        }
        Ok(())
    }

    /// Perform one read and return every complete frame it yielded.
    ///
    /// May return an empty vector (partial line, or a datagram from a foreign
    /// host). Cancel-safe: no bytes are lost if the future is dropped.
    pub async fn read_frames(&mut self) -> Result<Vec<Vec<u8>>, ProtocolError> {
        match &mut self.socket {
            Socket::Stream(stream) => {
                // Left over from a read that also carried complete lines.
                if self.partial.len() > MAX_LINE_SIZE {
                    return Err(overlong_tail(&mut self.partial));
                }
                let n = stream.read(&mut self.read_buf).await?;
                if n == 0 {
                    return Err(ProtocolError::StreamClosed);
                }
                self.partial.extend_from_slice(&self.read_buf[..n]);
                split_lines(&mut self.partial)
            }
            Socket::Datagram(socket) => {
                let (n, from) = socket.recv_from(&mut self.read_buf).await?;
                if from.ip() != self.peer.ip() {
                    warn!(from = %from, "dropping datagram from unknown host");
                    return Ok(Vec::new());
                }
                if from != self.peer {
                    debug!(old = %self.peer, new = %from, "server switched to dynamic port");
                    self.peer = from;
                }
                Ok(vec![self.read_buf[..n].to_vec()])
            }
        }
    }
}

/// Drain every complete CRLF line from `partial`, leaving any incomplete tail.
///
/// An overlong tail is only an error once no complete line precedes it; the
/// next read reports it otherwise.
fn split_lines(partial: &mut Vec<u8>) -> Result<Vec<Vec<u8>>, ProtocolError> {
    let mut lines = Vec::new();
    while let Some(pos) = partial
        .windows(TERMINATOR.len())
        .position(|w| w == TERMINATOR)
    {
        let rest = partial.split_off(pos + TERMINATOR.len());
        lines.push(std::mem::replace(partial, rest));
    }
    if lines.is_empty() && partial.len() > MAX_LINE_SIZE {
        return Err(overlong_tail(partial));
    }
    Ok(lines)
}

fn overlong_tail(partial: &mut Vec<u8>) -> ProtocolError {
    let len = partial.len();
    partial.clear();
    ProtocolError::Malformed {
        transport: Transport::Tcp,
        reason: format!("unterminated line of {len} bytes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines_and_keeps_tail() {
        let mut buf = b"BYE\r\nMSG FROM a IS b\r\nREP".to_vec();
        let lines = split_lines(&mut buf).unwrap();
        assert_eq!(lines, vec![b"BYE\r\n".to_vec(), b"MSG FROM a IS b\r\n".to_vec()]);
        assert_eq!(buf, b"REP");

        buf.extend_from_slice(b"LY OK IS x\r\n");
        let lines = split_lines(&mut buf).unwrap();
        assert_eq!(lines, vec![b"REPLY OK IS x\r\n".to_vec()]);
        assert!(buf.is_empty());
    }

    #[test]
    fn terminator_split_across_reads() {
        let mut buf = b"BYE\r".to_vec();
        assert!(split_lines(&mut buf).unwrap().is_empty());
        buf.push(b'\n');
        assert_eq!(split_lines(&mut buf).unwrap(), vec![b"BYE\r\n".to_vec()]);
    }

    #[test]
    fn overlong_line_is_malformed() {
        let mut buf = vec![b'x'; MAX_LINE_SIZE + 1];
        let err = split_lines(&mut buf).unwrap_err();
        assert!(err.is_malformed());
        assert!(buf.is_empty());
    }

    #[test]
    fn lines_before_an_overlong_tail_survive() {
        let mut buf = b"BYE\r\n".to_vec();
        buf.extend(vec![b'x'; MAX_LINE_SIZE + 1]);
        let lines = split_lines(&mut buf).unwrap();
        assert_eq!(lines, vec![b"BYE\r\n".to_vec()]);
        assert_eq!(buf.len(), MAX_LINE_SIZE + 1);

        let err = split_lines(&mut buf).unwrap_err();
        assert!(err.is_malformed());
        assert!(buf.is_empty());
    }
}
