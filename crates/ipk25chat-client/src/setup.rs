//! Config loading and session setup.

use std::path::{Path, PathBuf};

use ipk25chat_protocol::{resolve, Connection};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::Session;

/// Load configuration from the given path, or the default location.
///
/// A missing file yields the defaults; an explicitly named file must exist.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ClientError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path(),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {e}")))?;
        let config: ClientConfig = toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {e}")))?;
        info!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else if path.is_some() {
        Err(ClientError::Config(format!(
            "config file {} does not exist",
            config_path.display()
        )))
    } else {
        info!("no config file found, using defaults");
        Ok(ClientConfig::default())
    }
}

/// Resolve the server and open the transport. Nothing is sent yet.
pub async fn connect(config: &ClientConfig) -> Result<Session, ClientError> {
    let transport = config
        .connection
        .transport
        .ok_or_else(|| ClientError::Config("no transport given (tcp or udp)".to_string()))?;
    let server = config
        .connection
        .server
        .as_deref()
        .ok_or_else(|| ClientError::Config("no server given".to_string()))?;

    let addr = resolve(server, config.connection.port).await?;
    let connection = Connection::open(transport, addr).await?;
    let local = connection.local_addr()?;
    info!(%transport, server, %addr, %local, "transport ready");
    Ok(Session::new(connection))
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("ipk25chat")
}

/// Get the default config file path.
fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipk25chat_types::Transport;

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/ipk25chat.toml"))).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn reads_explicit_file() {
        let path = std::env::temp_dir().join(format!("ipk25chat-test-{}.toml", std::process::id()));
        std::fs::write(&path, "[connection]\ntransport = \"tcp\"\nport = 9999\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.connection.transport, Some(Transport::Tcp));
        assert_eq!(config.connection.port, 9999);
    }

    #[tokio::test]
    async fn connect_requires_transport_and_server() {
        let mut config = ClientConfig::default();
        config.connection.server = Some("127.0.0.1".into());
        assert!(matches!(
            connect(&config).await,
            Err(ClientError::Config(_))
        ));

        config.connection.transport = Some(Transport::Udp);
        config.connection.server = None;
        assert!(matches!(
            connect(&config).await,
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn connect_binds_udp_without_sending() {
        let mut config = ClientConfig::default();
        config.connection.transport = Some(Transport::Udp);
        config.connection.server = Some("127.0.0.1".into());
        let session = connect(&config).await.unwrap();
        assert_eq!(session.transport(), Transport::Udp);
        assert_eq!(session.peer_addr().port(), 4567);
    }
}
