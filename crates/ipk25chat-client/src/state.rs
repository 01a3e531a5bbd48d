//! Session state machine.

/// State of the chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket ready, nothing sent yet.
    Start,
    /// Auth sent, waiting for a positive Reply.
    Auth,
    /// Authenticated; may join channels and chat.
    Open,
    /// Protocol failure; a final Bye is attempted next.
    Error,
    /// Terminal.
    End,
}

impl SessionState {
    /// Whether an Auth may be sent (first attempt or retry).
    pub fn can_authenticate(self) -> bool {
        matches!(self, Self::Start | Self::Auth)
    }

    /// Whether Join and Msg may be sent.
    pub fn can_chat(self) -> bool {
        self == Self::Open
    }

    /// Whether a Bye may be sent. Before authenticating there is nothing to
    /// terminate.
    pub fn can_say_bye(self) -> bool {
        self != Self::Start
    }

    /// Whether the session is finished or about to be.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::Error)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::Auth => write!(f, "Auth"),
            Self::Open => write!(f, "Open"),
            Self::Error => write!(f, "Error"),
            Self::End => write!(f, "End"),
        }
    }
}
