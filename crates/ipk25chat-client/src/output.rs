//! User-visible output.

use std::io::Write;

/// Where the client shows things to the user.
///
/// Chat traffic and help go to stdout; outcomes and errors go to stderr so a
/// transcript of stdout contains only the conversation.
pub trait Presenter: Send {
    fn chat(&mut self, display_name: &str, content: &str);
    fn reply(&mut self, success: bool, content: &str);
    fn server_error(&mut self, display_name: &str, content: &str);
    fn local_error(&mut self, message: &str);
    fn info(&mut self, text: &str);
}

/// Formats a chat line as shown to the user.
pub fn format_chat(display_name: &str, content: &str) -> String {
    format!("{display_name}: {content}")
}

pub fn format_reply(success: bool, content: &str) -> String {
    if success {
        format!("Action Success: {content}")
    } else {
        format!("Action Failure: {content}")
    }
}

pub fn format_server_error(display_name: &str, content: &str) -> String {
    format!("ERR FROM {display_name}: {content}")
}

pub fn format_local_error(message: &str) -> String {
    format!("ERROR: {message}")
}

/// Writes to the process's stdout and stderr.
#[derive(Debug, Default)]
pub struct StdioPresenter;

impl StdioPresenter {
    fn out(line: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }

    fn err(line: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }
}

impl Presenter for StdioPresenter {
    fn chat(&mut self, display_name: &str, content: &str) {
        Self::out(&format_chat(display_name, content));
    }

    fn reply(&mut self, success: bool, content: &str) {
        Self::err(&format_reply(success, content));
    }

    fn server_error(&mut self, display_name: &str, content: &str) {
        Self::err(&format_server_error(display_name, content));
    }

    fn local_error(&mut self, message: &str) {
        Self::err(&format_local_error(message));
    }

    fn info(&mut self, text: &str) {
        Self::out(text);
    }
}
