use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::registry::SessionRegistry;
use crate::commands::{self, Action, CommandContext};
use crate::error::{self, LobbyResult};
use crate::event_bus::EventBus;
use crate::events::{LobbyEvent, LogLevel};

/// Delivery side of the transport, as seen by the session layer
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Queue a text frame for one session. Must not wait on the remote peer.
    async fn send(&self, session_id: &str, text: &str) -> LobbyResult<()>;
}

/// Drives session lifecycle from transport notifications.
///
/// Every entry point may be called concurrently from many connection tasks.
/// Once the cancellation token fires the manager stops publishing and ignores
/// further notifications.
#[derive(Clone)]
pub struct SessionManager {
    registry: SessionRegistry,
    bus: EventBus,
    transport: Arc<dyn SessionTransport>,
    cancel: CancellationToken,
}

impl SessionManager {
    pub fn new(
        registry: SessionRegistry,
        bus: EventBus,
        transport: Arc<dyn SessionTransport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            bus,
            transport,
            cancel,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A connection was accepted
    #[instrument(skip(self))]
    pub async fn on_connect(&self, session_id: &str) {
        if self.is_cancelled() {
            debug!("Ignoring connect after shutdown");
            return;
        }
        if !self.registry.add(session_id).await {
            debug!("Duplicate connect notification ignored");
            return;
        }

        info!("Client connected");
        self.publish(LobbyEvent::client_connected(session_id));

        let welcome = format!("Connection succeed. Session ID: {}", session_id);
        if let Err(e) = self.transport.send(session_id, &welcome).await {
            error!(error = %e, "Failed to send welcome message");
            self.publish(LobbyEvent::log(
                format!("Erreur d'envoi ({}): {}", session_id, e),
                LogLevel::Error,
            ));
        }

        self.publish(LobbyEvent::log(
            format!("Client connecté: {}", session_id),
            LogLevel::Info,
        ));
    }

    /// A text payload arrived from a session
    #[instrument(skip(self, payload))]
    pub async fn on_message(&self, session_id: &str, payload: &str) {
        if self.is_cancelled() {
            debug!("Ignoring message after shutdown");
            return;
        }
        if !self.registry.touch(session_id).await {
            debug!("Message from a session that is not registered");
        }

        debug!(session_id = %session_id, message = %payload, "Received message");
        self.publish(LobbyEvent::log(payload, LogLevel::Info));

        let client_count = self.registry.count().await;
        let ctx = CommandContext::new(session_id, client_count);
        let result = match commands::interpret(payload, &ctx) {
            Action::Reply(text) => self.transport.send(session_id, &text).await,
            Action::Broadcast(text) => self.broadcast(&text).await.map(|_| ()),
        };

        if let Err(e) = result {
            error!(error = %e, "Failed message processing");
            self.publish(LobbyEvent::log(
                format!("Erreur d'envoi ({}): {}", session_id, e),
                LogLevel::Error,
            ));

            let notice = format!("Failed to send message: {}", e.message);
            if let Err(e) = self.transport.send(session_id, &notice).await {
                debug!(error = %e, "Could not report failure back to the session");
            }
        }
    }

    /// A connection closed
    #[instrument(skip(self))]
    pub async fn on_disconnect(&self, session_id: &str) {
        if self.is_cancelled() {
            debug!("Ignoring disconnect after shutdown");
            return;
        }
        if !self.registry.remove(session_id).await {
            debug!("Disconnect for unknown session ignored");
            return;
        }

        info!("Client disconnected");
        self.publish(LobbyEvent::client_disconnected(session_id));

        if let Err(e) = self.broadcast(&format!("Session {} closed.", session_id)).await {
            warn!(error = %e, "Close notice did not reach every session");
        }

        self.publish(LobbyEvent::log(
            format!("Client déconnecté: {}", session_id),
            LogLevel::Warning,
        ));
    }

    /// Send a text frame to every session registered right now.
    ///
    /// Each recipient is attempted even if an earlier one fails. Returns the
    /// number of sessions reached, or an error describing the failures.
    pub async fn broadcast(&self, text: &str) -> LobbyResult<usize> {
        let recipients = self.registry.ids().await;
        let mut delivered = 0;
        let mut failed = Vec::new();

        for id in &recipients {
            match self.transport.send(id, text).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(session_id = %id, error = %e, "Broadcast delivery failed");
                    failed.push(id.as_str());
                }
            }
        }

        if failed.is_empty() {
            Ok(delivered)
        } else {
            Err(error::websocket_send_failed(
                &failed.join(", "),
                format!("{} of {} broadcast deliveries failed", failed.len(), recipients.len()),
            ))
        }
    }

    /// Send a text frame to one session
    pub async fn send_to(&self, session_id: &str, text: &str) -> LobbyResult<()> {
        if !self.registry.contains(session_id).await {
            return Err(error::session_not_found(session_id));
        }
        self.transport.send(session_id, text).await
    }

    /// Cancel the session layer and drop every session.
    ///
    /// No lifecycle events are published for the dropped sessions.
    pub async fn shutdown(&self) -> usize {
        self.cancel.cancel();
        let cleared = self.registry.clear().await;
        info!(sessions = cleared, "Session manager shut down");
        cleared
    }

    fn publish(&self, event: LobbyEvent) {
        if self.is_cancelled() {
            return;
        }
        self.bus.publish(event);
    }
}
