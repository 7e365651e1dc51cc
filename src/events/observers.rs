//! Ready-made observers for the event bus.
//!
//! The bus never retains events. Observers that want history, such as a
//! dashboard, keep it themselves and bound it.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{EventKind, LobbyEvent, LogLevel};
use crate::event_bus::{EventBus, SubscriptionId};

/// One retained log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
}

/// Keeps the most recent `LogAdded` events, dropping the oldest once full
#[derive(Clone)]
pub struct LogHistory {
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Subscribe this history to `LogAdded` events on the bus
    pub fn attach(&self, bus: &EventBus) -> SubscriptionId {
        let history = self.clone();
        bus.subscribe(EventKind::LogAdded, move |event| {
            if let LobbyEvent::LogAdded { message, level } = event {
                history.push(message.clone(), *level);
            }
            Ok(())
        })
    }

    pub fn push(&self, message: String, level: LogLevel) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            timestamp: Utc::now(),
            message,
            level,
        });
    }

    /// Entries oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Mirrors every bus event into the tracing log
pub struct TracingObserver;

impl TracingObserver {
    pub fn attach(bus: &EventBus) -> SubscriptionId {
        bus.subscribe_all(|event| {
            match event {
                LobbyEvent::LogAdded { message, level } => match level {
                    LogLevel::Info => info!(target: "lobby::activity", "{}", message),
                    LogLevel::Warning => warn!(target: "lobby::activity", "{}", message),
                    LogLevel::Error => error!(target: "lobby::activity", "{}", message),
                },
                LobbyEvent::ClientConnected { session_id } => {
                    info!(target: "lobby::activity", session_id = %session_id, "Client connected");
                }
                LobbyEvent::ClientDisconnected { session_id } => {
                    info!(target: "lobby::activity", session_id = %session_id, "Client disconnected");
                }
                LobbyEvent::ServerStatusChanged { is_online } => {
                    info!(target: "lobby::activity", is_online, "Server status changed");
                }
                LobbyEvent::ServerUrlChanged { url } => {
                    info!(target: "lobby::activity", url = %url, "Server URL changed");
                }
            }
            Ok(())
        })
    }
}
