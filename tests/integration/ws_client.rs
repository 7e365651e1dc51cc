//! WebSocket client for integration testing
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// WebSocket test client for integration testing
pub struct WebSocketTestClient {
    /// Client label for logging
    client_id: String,
    /// Write half of the socket
    sink: Mutex<Option<WsSink>>,
    /// Text frames received so far
    messages: Arc<Mutex<Vec<String>>>,
    /// Cleared once the server closes the connection
    pub connected: Arc<Mutex<bool>>,
    /// Ping frames received from the server
    pings: Arc<AtomicUsize>,
}

impl WebSocketTestClient {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            sink: Mutex::new(None),
            messages: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(false)),
            pings: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Connect to a WebSocket URL and start collecting text frames
    pub async fn connect(&self, url: &str) -> Result<()> {
        println!("Client {} connecting to {}", self.client_id, url);

        let (ws_stream, _) = timeout(Duration::from_secs(5), connect_async(url)).await??;
        let (sink, mut read) = ws_stream.split();
        *self.sink.lock().await = Some(sink);
        *self.connected.lock().await = true;

        let client_id = self.client_id.clone();
        let messages = Arc::clone(&self.messages);
        let connected = Arc::clone(&self.connected);
        let pings = Arc::clone(&self.pings);
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        println!("Client {} received: {}", client_id, text.as_str());
                        messages.lock().await.push(text.as_str().to_string());
                    }
                    Ok(Message::Ping(_)) => {
                        pings.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        println!("Client {} error: {}", client_id, e);
                        break;
                    }
                }
            }
            *connected.lock().await = false;
            println!("Client {} reader exited", client_id);
        });

        Ok(())
    }

    pub async fn get_messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    pub async fn clear_messages(&self) {
        self.messages.lock().await.clear();
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.lock().await
    }

    /// Wait until a received frame satisfies the predicate
    pub async fn wait_for<F>(&self, predicate: F, timeout_ms: u64) -> Option<String>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        while tokio::time::Instant::now() < deadline {
            if let Some(found) = self
                .get_messages()
                .await
                .into_iter()
                .find(|m| predicate(m))
            {
                return Some(found);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }

    /// Wait until at least `count` frames have arrived
    pub async fn wait_for_messages(&self, count: usize, timeout_ms: u64) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        while tokio::time::Instant::now() < deadline {
            if self.messages.lock().await.len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    /// Wait until the server side closes the socket
    pub async fn wait_for_disconnect(&self, timeout_ms: u64) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        while tokio::time::Instant::now() < deadline {
            if !self.is_connected().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    pub async fn send_text(&self, text: &str) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or_else(|| anyhow!("Not connected"))?;
        sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    pub async fn send_binary(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or_else(|| anyhow!("Not connected"))?;
        sink.send(Message::Binary(data.to_vec().into())).await?;
        Ok(())
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Send a close frame and drop the write half
    pub async fn close(&self) -> Result<()> {
        if let Some(mut sink) = self.sink.lock().await.take() {
            sink.send(Message::Close(None)).await?;
            sink.close().await.ok();
        }
        Ok(())
    }
}
