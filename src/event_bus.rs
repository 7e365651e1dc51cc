use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::EventBusError;
use crate::events::{EventKind, LobbyEvent};

/// Handle returned by [`EventBus::subscribe`] and accepted by [`EventBus::unsubscribe`]
pub type SubscriptionId = Uuid;

/// Observer callback. Returning an error marks the delivery as failed for this
/// handler only.
pub type EventHandler = Arc<dyn Fn(&LobbyEvent) -> anyhow::Result<()> + Send + Sync>;

/// Statistics about event bus activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBusStats {
    /// Number of events that reached at least one handler
    pub events_published: u64,
    /// Number of events published while nobody was subscribed to their kind
    pub events_dropped: u64,
    /// Number of handler invocations that returned an error or panicked
    pub handler_failures: u64,
    /// Count of events by kind
    pub kind_counts: HashMap<String, u64>,
}

type HandlerTable = HashMap<EventKind, Vec<(SubscriptionId, EventHandler)>>;

/// Process-wide fan-out of [`LobbyEvent`]s to registered observers.
///
/// Handlers run synchronously on the publishing thread, in registration order.
/// The handler list is copied before delivery so a handler may subscribe or
/// unsubscribe without deadlocking the bus.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<HandlerTable>>,
    stats: Arc<RwLock<EventBusStats>>,
}

impl EventBus {
    /// Create a new event bus with no observers
    pub fn new() -> Self {
        info!("Creating new event bus");
        Self::default()
    }

    /// Register a handler for a single event kind
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&LobbyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_many(&[kind], handler)
    }

    /// Register one handler under several kinds. A single unsubscribe removes it
    /// from all of them.
    pub fn subscribe_many<F>(&self, kinds: &[EventKind], handler: F) -> SubscriptionId
    where
        F: Fn(&LobbyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let handler: EventHandler = Arc::new(handler);

        let mut table = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for kind in kinds {
            let entries = table.entry(*kind).or_default();
            if !entries.iter().any(|(existing, _)| *existing == id) {
                entries.push((id, Arc::clone(&handler)));
            }
        }
        drop(table);

        debug!(subscription_id = %id, kinds = ?kinds, "Registered event handler");
        id
    }

    /// Register a handler for every event kind
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&LobbyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_many(&EventKind::ALL, handler)
    }

    /// Subscribe through a channel instead of a callback.
    ///
    /// Useful for observers that need to hop onto their own task before reacting.
    pub fn channel(
        &self,
        kinds: &[EventKind],
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<LobbyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe_many(kinds, move |event| {
            if tx.send(event.clone()).is_err() {
                trace!("Event channel receiver dropped, discarding event");
            }
            Ok(())
        });
        (id, rx)
    }

    /// Remove a subscription. Unknown or already removed handles are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut table = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        for entries in table.values_mut() {
            let before = entries.len();
            entries.retain(|(existing, _)| *existing != id);
            removed |= entries.len() != before;
        }
        drop(table);

        if removed {
            debug!(subscription_id = %id, "Unregistered event handler");
        } else {
            debug!(subscription_id = %id, "Attempted to unregister unknown event handler");
        }
        removed
    }

    /// Deliver an event to every handler registered for its kind.
    ///
    /// Returns the number of handlers that completed successfully. A failing or
    /// panicking handler is logged and skipped; delivery continues with the next.
    pub fn publish(&self, event: LobbyEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<(SubscriptionId, EventHandler)> = {
            let table = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            table
                .get(&kind)
                .map(|entries| entries.to_vec())
                .unwrap_or_default()
        };

        trace!(event_kind = %kind, subscriber_count = handlers.len(), "Publishing event");

        if handlers.is_empty() {
            let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
            stats.events_dropped += 1;
            return 0;
        }

        let mut delivered = 0;
        let mut failures = 0;
        for (id, handler) in handlers {
            match Self::invoke(id, &handler, &event) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failures += 1;
                    warn!(subscription_id = %id, event_kind = %kind, error = %e, "Event handler failed");
                }
            }
        }

        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        stats.events_published += 1;
        stats.handler_failures += failures;
        *stats.kind_counts.entry(kind.to_string()).or_insert(0) += 1;

        delivered
    }

    fn invoke(
        id: SubscriptionId,
        handler: &EventHandler,
        event: &LobbyEvent,
    ) -> Result<(), EventBusError> {
        match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(EventBusError::HandlerFailed {
                subscription: id.to_string(),
                message: e.to_string(),
            }),
            Err(payload) => Err(EventBusError::HandlerPanicked {
                subscription: id.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Number of handlers currently registered for a kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Get current event bus statistics
    pub fn stats(&self) -> EventBusStats {
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reset all statistics counters
    pub fn reset_stats(&self) {
        info!("Resetting event bus statistics");
        *self.stats.write().unwrap_or_else(PoisonError::into_inner) = EventBusStats::default();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
