//! Client configuration loaded from TOML.

use std::time::Duration;

use ipk25chat_types::Transport;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Where and how to reach the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Required before connecting; usually supplied on the command line.
    #[serde(default)]
    pub transport: Option<Transport>,
    /// Hostname or IP literal; required before connecting.
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            transport: None,
            server: None,
            port: default_port(),
        }
    }
}

/// Confirmation and retransmission settings (UDP only).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retransmissions after the first send; 3 means at most 4 transmissions.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
}

impl ReliabilityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    4567
}

fn default_timeout_ms() -> u64 {
    250
}

fn default_max_retries() -> u8 {
    3
}

// stdout belongs to the chat, keep the log quiet unless asked.
fn default_log_level() -> String {
    "warn".to_string()
}
