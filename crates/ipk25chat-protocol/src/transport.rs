//! Server endpoint resolution.

use std::net::{IpAddr, SocketAddr};

use tracing::debug;

use crate::error::ProtocolError;

/// Resolve `host` (an IP literal or a hostname) to a socket address.
///
/// IPv4 results are preferred when a hostname maps to both families.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ProtocolError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ProtocolError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    let addr = addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ProtocolError::Resolve {
            host: host.to_string(),
            reason: "no addresses found".to_string(),
        })?;

    debug!(host, addr = %addr, "resolved server address");
    Ok(addr)
}
