//! User-facing notices emitted by the session.
//!
//! The connection layer turns protocol events into these; the binary logs
//! them, an embedding application can render them however it likes.

/// Severity for rendering/logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A human-relevant session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected,
    Reconnecting,
    /// An order passed the gate and went out on the wire.
    OrderSubmitted,
    OrderPending,
    OrderFilled,
    UserSwitched { username: String },
    AccountSwitched { name: String },
    ServerError { message: String },
    NotConnected,
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::Connected | Notice::UserSwitched { .. } | Notice::AccountSwitched { .. } => {
                NoticeLevel::Info
            }
            Notice::OrderSubmitted | Notice::OrderPending => NoticeLevel::Info,
            Notice::OrderFilled => NoticeLevel::Success,
            Notice::Reconnecting => NoticeLevel::Warning,
            Notice::ServerError { .. } | Notice::NotConnected => NoticeLevel::Error,
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Connected => write!(f, "connected to venue"),
            Notice::Reconnecting => write!(f, "connection lost, reconnecting"),
            Notice::OrderSubmitted => write!(f, "order submitted"),
            Notice::OrderPending => write!(f, "order accepted, pending fill"),
            Notice::OrderFilled => write!(f, "order filled"),
            Notice::UserSwitched { username } => write!(f, "switched to user {}", username),
            Notice::AccountSwitched { name } => write!(f, "switched to account {}", name),
            Notice::ServerError { message } => write!(f, "server error: {}", message),
            Notice::NotConnected => write!(f, "not connected to venue"),
        }
    }
}
