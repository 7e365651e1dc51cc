//! Server-wide monitoring state.
//!
//! Holds the online flag and advertised URL, and derives the connected count
//! from the session registry on every read so the two can never drift.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event_bus::EventBus;
use crate::events::{LobbyEvent, LogLevel};
use crate::session::SessionRegistry;

/// Point-in-time view of the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    pub is_online: bool,
    pub server_url: String,
    pub connected_count: usize,
}

#[derive(Debug, Default)]
struct ServerState {
    is_online: bool,
    server_url: String,
}

#[derive(Clone)]
pub struct Monitor {
    bus: EventBus,
    registry: SessionRegistry,
    state: Arc<RwLock<ServerState>>,
}

impl Monitor {
    pub fn new(bus: EventBus, registry: SessionRegistry) -> Self {
        Self {
            bus,
            registry,
            state: Arc::new(RwLock::new(ServerState::default())),
        }
    }

    /// Update the online flag. Publishes only when the value changes.
    pub fn set_server_status(&self, is_online: bool) -> bool {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.is_online == is_online {
                debug!(is_online, "Server status unchanged");
                return false;
            }
            state.is_online = is_online;
        }

        self.bus.publish(LobbyEvent::ServerStatusChanged { is_online });
        let (message, level) = if is_online {
            ("Serveur démarré", LogLevel::Info)
        } else {
            ("Serveur arrêté", LogLevel::Warning)
        };
        self.bus.publish(LobbyEvent::log(message, level));
        true
    }

    /// Update the advertised URL. Publishes only when the value changes.
    pub fn set_server_url(&self, url: &str) -> bool {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.server_url == url {
                return false;
            }
            state.server_url = url.to_string();
        }

        self.bus.publish(LobbyEvent::ServerUrlChanged {
            url: url.to_string(),
        });
        self.bus
            .publish(LobbyEvent::log(format!("URL serveur: {}", url), LogLevel::Info));
        true
    }

    /// Forget the advertised URL without publishing, so the next start cycle
    /// announces it again
    pub fn clear_server_url(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .server_url
            .clear();
    }

    pub fn is_online(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).is_online
    }

    pub fn server_url(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .server_url
            .clone()
    }

    pub async fn connected_count(&self) -> usize {
        self.registry.count().await
    }

    pub async fn snapshot(&self) -> MonitoringSnapshot {
        let (is_online, server_url) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (state.is_online, state.server_url.clone())
        };
        MonitoringSnapshot {
            is_online,
            server_url,
            connected_count: self.registry.count().await,
        }
    }
}
