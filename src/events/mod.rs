use std::fmt;

use serde::{Deserialize, Serialize};

pub mod observers;
pub use observers::{LogEntry, LogHistory, TracingObserver};

/// Default number of log entries kept by [`LogHistory`]
pub const DEFAULT_LOG_HISTORY_CAPACITY: usize = 50;

/// Severity carried by [`LobbyEvent::LogAdded`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Notifications published on the event bus.
///
/// Events are plain values; the bus keeps no history of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LobbyEvent {
    /// A session was registered
    ClientConnected { session_id: String },
    /// A session was removed from the registry
    ClientDisconnected { session_id: String },
    /// Human-readable activity line
    LogAdded { message: String, level: LogLevel },
    /// The server went online or offline
    ServerStatusChanged { is_online: bool },
    /// The advertised address changed
    ServerUrlChanged { url: String },
}

impl LobbyEvent {
    pub fn client_connected(session_id: impl Into<String>) -> Self {
        LobbyEvent::ClientConnected {
            session_id: session_id.into(),
        }
    }

    pub fn client_disconnected(session_id: impl Into<String>) -> Self {
        LobbyEvent::ClientDisconnected {
            session_id: session_id.into(),
        }
    }

    pub fn log(message: impl Into<String>, level: LogLevel) -> Self {
        LobbyEvent::LogAdded {
            message: message.into(),
            level,
        }
    }

    /// The subscription kind this event is delivered under
    pub fn kind(&self) -> EventKind {
        match self {
            LobbyEvent::ClientConnected { .. } => EventKind::ClientConnected,
            LobbyEvent::ClientDisconnected { .. } => EventKind::ClientDisconnected,
            LobbyEvent::LogAdded { .. } => EventKind::LogAdded,
            LobbyEvent::ServerStatusChanged { .. } => EventKind::ServerStatusChanged,
            LobbyEvent::ServerUrlChanged { .. } => EventKind::ServerUrlChanged,
        }
    }
}

/// Discriminant used to subscribe to one family of [`LobbyEvent`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ClientConnected,
    ClientDisconnected,
    LogAdded,
    ServerStatusChanged,
    ServerUrlChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::ClientConnected,
        EventKind::ClientDisconnected,
        EventKind::LogAdded,
        EventKind::ServerStatusChanged,
        EventKind::ServerUrlChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ClientConnected => "client_connected",
            EventKind::ClientDisconnected => "client_disconnected",
            EventKind::LogAdded => "log_added",
            EventKind::ServerStatusChanged => "server_status_changed",
            EventKind::ServerUrlChanged => "server_url_changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
