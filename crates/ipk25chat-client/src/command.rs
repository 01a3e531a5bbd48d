//! Interactive commands: parsing user lines and applying them to the session.

use ipk25chat_types::Message;
use thiserror::Error;
use tokio::time::Instant;

use crate::error::ClientError;
use crate::output::Presenter;
use crate::reliability::PendingConfirmations;
use crate::session::Session;
use crate::state::SessionState;

pub const HELP: &str = "\
Commands:
  /auth <username> <secret> <display name>  authenticate with the server
  /join <channel id>                        switch to another channel
  /rename <display name>                    change the name others see
  /help                                     show this text
  /exit                                     leave and quit
Any other line is sent as a chat message.";

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Auth {
        username: String,
        secret: String,
        display_name: String,
    },
    Join {
        channel_id: String,
    },
    Rename {
        display_name: String,
    },
    Help,
    Exit,
    Chat(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unknown command {0:?}, try /help")]
    Unknown(String),
}

/// Parse one line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Chat(line.to_string())));
    };

    let mut words = rest.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match (verb.as_str(), args.as_slice()) {
        ("auth", [username, secret, display_name]) => Command::Auth {
            username: (*username).to_string(),
            secret: (*secret).to_string(),
            display_name: (*display_name).to_string(),
        },
        ("auth", _) => {
            return Err(CommandError::Usage(
                "/auth <username> <secret> <display name>",
            ))
        }
        ("join", [channel_id]) => Command::Join {
            channel_id: (*channel_id).to_string(),
        },
        ("join", _) => return Err(CommandError::Usage("/join <channel id>")),
        ("rename", [display_name]) => Command::Rename {
            display_name: (*display_name).to_string(),
        },
        ("rename", _) => return Err(CommandError::Usage("/rename <display name>")),
        ("help", []) => Command::Help,
        ("help", _) => return Err(CommandError::Usage("/help")),
        ("exit", []) => Command::Exit,
        ("exit", _) => return Err(CommandError::Usage("/exit")),
        _ => return Err(CommandError::Unknown(format!("/{verb}"))),
    };
    Ok(Some(command))
}

fn track(pending: Option<&mut PendingConfirmations>, msg: Message) {
    if let Some(pending) = pending {
        pending.enqueue(msg, Instant::now());
    }
}

/// Apply a command to the session.
///
/// Every reliability-requiring send is handed to `pending` when one is given.
/// Refusals come back as recoverable [`ClientError`]s; the session is left as
/// it was.
pub async fn dispatch<P: Presenter + ?Sized>(
    command: Command,
    session: &mut Session,
    pending: Option<&mut PendingConfirmations>,
    presenter: &mut P,
) -> Result<(), ClientError> {
    match command {
        Command::Auth {
            username,
            secret,
            display_name,
        } => {
            let msg = session.send_auth(&username, &secret, &display_name).await?;
            track(pending, msg);
        }
        Command::Join { channel_id } => {
            let msg = session.send_join(&channel_id).await?;
            track(pending, msg);
        }
        Command::Chat(content) => {
            let msg = session.send_msg(&content).await?;
            track(pending, msg);
        }
        Command::Rename { display_name } => session.rename(&display_name)?,
        Command::Help => presenter.info(HELP),
        Command::Exit => leave(session, pending).await?,
    }
    Ok(())
}

/// End the session on the user's behalf: Bye when there is something to end,
/// a silent close before authenticating.
pub async fn leave(
    session: &mut Session,
    pending: Option<&mut PendingConfirmations>,
) -> Result<(), ClientError> {
    match session.state() {
        SessionState::Start => session.close(),
        SessionState::End => {}
        SessionState::Auth | SessionState::Open | SessionState::Error => {
            let msg = session.send_bye().await?;
            track(pending, msg);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parsed("/auth bob s3cr3t Bob"),
            Command::Auth {
                username: "bob".into(),
                secret: "s3cr3t".into(),
                display_name: "Bob".into(),
            }
        );
        assert_eq!(
            parsed("/join general"),
            Command::Join {
                channel_id: "general".into()
            }
        );
        assert_eq!(
            parsed("/rename Robert"),
            Command::Rename {
                display_name: "Robert".into()
            }
        );
        assert_eq!(parsed("/help"), Command::Help);
        assert_eq!(parsed("/exit\r\n"), Command::Exit);
    }

    #[test]
    fn command_words_ignore_case() {
        assert_eq!(parsed("/EXIT"), Command::Exit);
        assert!(matches!(parsed("/Join x"), Command::Join { .. }));
    }

    #[test]
    fn plain_lines_are_chat() {
        assert_eq!(
            parsed("hello there /join"),
            Command::Chat("hello there /join".into())
        );
        assert_eq!(parsed("  indented"), Command::Chat("  indented".into()));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   \r\n"), Ok(None));
    }

    #[test]
    fn wrong_arity_reports_usage() {
        assert!(matches!(parse("/auth bob s3cr3t"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("/join a b"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("/rename"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("/exit now"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse("/quit"),
            Err(CommandError::Unknown("/quit".into()))
        );
        assert!(matches!(parse("/"), Err(CommandError::Unknown(_))));
    }
}
