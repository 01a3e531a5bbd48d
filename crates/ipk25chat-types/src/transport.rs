//! Transport selection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The transport a session runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Reliable byte stream carrying CRLF-terminated text lines.
    Tcp,
    /// Unreliable datagrams carrying binary frames; needs application-level
    /// confirmation and retransmission.
    Udp,
}

impl Transport {
    /// Whether sent messages must be confirmed by the peer.
    pub fn needs_confirmation(self) -> bool {
        self == Self::Udp
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// Error returned when a transport name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transport {0:?} (expected \"tcp\" or \"udp\")")]
pub struct UnknownTransport(pub String);

impl FromStr for Transport {
    type Err = UnknownTransport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(UnknownTransport(s.to_string())),
        }
    }
}
