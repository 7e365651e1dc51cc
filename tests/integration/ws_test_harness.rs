//! Server test harness
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use lobby_lib::config::{default_ping_interval, default_timeout};
use lobby_lib::{Config, EventLogConfig, Lobby, ServerConfig};

use crate::ws_client::WebSocketTestClient;

/// A lobby bound to an ephemeral loopback port
pub struct TestEnvironment {
    pub lobby: Lobby,
    pub addr: Option<SocketAddr>,
}

pub fn test_config(max_connections: usize) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            advertised_host: None,
            max_connections,
            timeout_seconds: default_timeout(),
            ping_interval: default_ping_interval(),
            cors_enabled: true,
        },
        event_log: EventLogConfig { capacity: 50 },
    }
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_max_connections(100)
    }

    pub fn with_max_connections(max_connections: usize) -> Self {
        Self::with_config(test_config(max_connections))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            lobby: Lobby::from_config(&config),
            addr: None,
        }
    }

    pub async fn start(&mut self) -> Result<SocketAddr> {
        let addr = self.lobby.server.start().await?;
        self.addr = Some(addr);
        Ok(addr)
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.lobby.server.stop().await?;
        self.addr = None;
        Ok(())
    }

    fn addr(&self) -> Result<SocketAddr> {
        self.addr.ok_or_else(|| anyhow!("Server not started"))
    }

    pub fn ws_url(&self) -> Result<String> {
        Ok(format!("ws://{}/ws", self.addr()?))
    }

    pub fn http_url(&self, path: &str) -> Result<String> {
        Ok(format!("http://{}{}", self.addr()?, path))
    }

    /// Connect a client and wait for its welcome frame
    pub async fn connect_client(&self, label: &str) -> Result<Arc<WebSocketTestClient>> {
        let client = Arc::new(WebSocketTestClient::new(label));
        client.connect(&self.ws_url()?).await?;
        client
            .wait_for(|m| m.starts_with("Connection succeed. Session ID: "), 2000)
            .await
            .ok_or_else(|| anyhow!("No welcome message for {}", label))?;
        Ok(client)
    }

    /// Session id announced in the client's welcome frame
    pub async fn session_id_of(client: &WebSocketTestClient) -> Option<String> {
        client
            .get_messages()
            .await
            .iter()
            .find_map(|m| m.strip_prefix("Connection succeed. Session ID: "))
            .map(str::to_string)
    }

    /// Poll until the registry reaches the expected size
    pub async fn wait_for_count(&self, expected: usize, timeout_ms: u64) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        while tokio::time::Instant::now() < deadline {
            if self.lobby.server.connected_count().await == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}
