//! Real-time session server.
//!
//! Accepts WebSocket sessions, answers a small text command protocol, and
//! republishes session activity on an in-process [`EventBus`] for any number of
//! observers.

pub mod commands;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod monitoring;
pub mod server;
pub mod session;

#[cfg(test)]
mod tests;

pub use commands::{interpret, Action, Command, CommandContext};
pub use config::{load_config, Config, EventLogConfig, ServerConfig};
pub use error::{ErrorCategory, ErrorCode, ErrorSeverity, LobbyError, LobbyResult};
pub use event_bus::{EventBus, EventBusStats, SubscriptionId};
pub use events::{EventKind, LobbyEvent, LogEntry, LogHistory, LogLevel, TracingObserver};
pub use monitoring::{Monitor, MonitoringSnapshot};
pub use server::{SessionServer, WsTransport};
pub use session::{Session, SessionId, SessionManager, SessionRegistry, SessionTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Components wired together at the composition root
pub struct Lobby {
    pub bus: EventBus,
    pub registry: SessionRegistry,
    pub monitor: Monitor,
    pub server: SessionServer,
    pub history: LogHistory,
}

impl Lobby {
    /// Build every component from configuration. Nothing is started.
    pub fn from_config(config: &Config) -> Self {
        let bus = EventBus::new();
        let registry = SessionRegistry::new();
        let monitor = Monitor::new(bus.clone(), registry.clone());
        let history = LogHistory::new(config.event_log.capacity);
        history.attach(&bus);
        let server = SessionServer::new(
            config.server.clone(),
            bus.clone(),
            registry.clone(),
            monitor.clone(),
        );

        Self {
            bus,
            registry,
            monitor,
            server,
            history,
        }
    }
}
