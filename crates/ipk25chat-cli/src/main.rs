//! ipk25chat: interactive client for the IPK25-CHAT protocol.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ipk25chat_client::{setup, Client, ClientConfig, ClientEvent, StdioPresenter};
use ipk25chat_types::Transport;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "ipk25chat",
    about = "Chat client for the IPK25-CHAT protocol over TCP or UDP",
    version
)]
struct Cli {
    /// Transport protocol (tcp or udp).
    #[arg(short, long)]
    transport: Option<Transport>,

    /// Server hostname or IP address.
    #[arg(short, long)]
    server: Option<String>,

    /// Server port.
    #[arg(short, long)]
    port: Option<u16>,

    /// UDP confirmation timeout in milliseconds.
    #[arg(short = 'd', long = "udp-timeout")]
    timeout_ms: Option<u64>,

    /// Maximum number of UDP retransmissions.
    #[arg(short, long)]
    retries: Option<u8>,

    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Command-line values win over the config file.
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(transport) = self.transport {
            config.connection.transport = Some(transport);
        }
        if let Some(server) = &self.server {
            config.connection.server = Some(server.clone());
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.reliability.timeout_ms = timeout_ms;
        }
        if let Some(retries) = self.retries {
            config.reliability.max_retries = retries;
        }
    }
}

fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

/// Read stdin on a plain thread so a pending read never holds up exit.
fn forward_stdin(events: mpsc::Sender<ClientEvent>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if events.blocking_send(ClientEvent::Input(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
        let _ = events.blocking_send(ClientEvent::InputClosed);
    });
}

fn forward_ctrl_c(events: mpsc::Sender<ClientEvent>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            let _ = events.send(ClientEvent::Shutdown).await;
        }
    });
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = setup::load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    init_logging(&config.log.level);

    let session = setup::connect(&config).await?;
    let mut client = Client::new(session, &config.reliability, StdioPresenter);
    forward_stdin(client.event_sender());
    forward_ctrl_c(client.event_sender());

    client.run().await?;

    if client.session().ended_in_error() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "ipk25chat", "-t", "udp", "-s", "127.0.0.1", "-p", "5000", "-d", "100", "-r", "1",
        ]);
        let mut config = ClientConfig::default();
        config.connection.server = Some("elsewhere".into());
        cli.apply(&mut config);

        assert_eq!(config.connection.transport, Some(Transport::Udp));
        assert_eq!(config.connection.server.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.connection.port, 5000);
        assert_eq!(config.reliability.timeout_ms, 100);
        assert_eq!(config.reliability.max_retries, 1);
    }

    #[test]
    fn long_flags() {
        let cli = Cli::parse_from([
            "ipk25chat",
            "--udp-timeout",
            "400",
            "--retries",
            "5",
        ]);
        let mut config = ClientConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.reliability.timeout_ms, 400);
        assert_eq!(config.reliability.max_retries, 5);
    }

    #[test]
    fn unset_flags_keep_config() {
        let cli = Cli::parse_from(["ipk25chat"]);
        let mut config = ClientConfig::default();
        config.connection.port = 1234;
        cli.apply(&mut config);
        assert_eq!(config.connection.port, 1234);
        assert_eq!(config.connection.transport, None);
    }
}
