use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{self, LobbyResult};
use crate::session::{SessionId, SessionTransport};

/// Outbound half of every open WebSocket, keyed by session id.
///
/// Each connection task drains its own queue, so `send` only enqueues and never
/// waits on a slow peer.
#[derive(Clone, Default)]
pub struct WsTransport {
    peers: Arc<DashMap<SessionId, mpsc::UnboundedSender<String>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an outbound queue for a freshly accepted connection
    pub fn register(&self, session_id: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.insert(session_id.to_string(), tx);
        trace!(session_id = %session_id, peers = self.peers.len(), "Registered outbound queue");
        rx
    }

    pub fn unregister(&self, session_id: &str) -> bool {
        self.peers.remove(session_id).is_some()
    }

    /// Drop every outbound queue
    pub fn close_all(&self) {
        self.peers.clear();
    }
}

#[async_trait]
impl SessionTransport for WsTransport {
    async fn send(&self, session_id: &str, text: &str) -> LobbyResult<()> {
        let peer = self
            .peers
            .get(session_id)
            .ok_or_else(|| error::session_not_found(session_id))?;
        peer.send(text.to_string())
            .map_err(|e| error::websocket_send_failed(session_id, e))
    }
}
