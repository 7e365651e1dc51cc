//! Listening endpoint lifecycle.
//!
//! `SessionServer` binds the socket, wires a fresh [`SessionManager`] and
//! transport into the HTTP router for each start cycle, and tears everything
//! down cooperatively on stop.

mod handler;
mod transport;

pub use handler::GREETING;
pub use transport::WsTransport;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{self, LobbyResult};
use crate::event_bus::EventBus;
use crate::monitoring::Monitor;
use crate::session::{SessionManager, SessionRegistry};
use handler::AppState;

/// How long `stop` waits for the accept loop before aborting it
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct RunningServer {
    manager: SessionManager,
    transport: WsTransport,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

pub struct SessionServer {
    config: ServerConfig,
    bus: EventBus,
    registry: SessionRegistry,
    monitor: Monitor,
    running: Arc<Mutex<Option<RunningServer>>>,
}

impl SessionServer {
    pub fn new(
        config: ServerConfig,
        bus: EventBus,
        registry: SessionRegistry,
        monitor: Monitor,
    ) -> Self {
        Self {
            config,
            bus,
            registry,
            monitor,
            running: Arc::new(Mutex::new(None)),
        }
    }

    /// Bind the listener and begin accepting sessions.
    ///
    /// The online status and advertised URL are published before the accept
    /// loop starts. Starting twice is an error.
    pub async fn start(&self) -> LobbyResult<SocketAddr> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(error::server_already_running());
        }

        self.config.validate()?;
        let addr = self.config.bind_address();
        info!(address = %addr, "Starting server");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| error::websocket_bind_failed(&addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| error::websocket_bind_failed(&addr, e))?;

        let cancel = CancellationToken::new();
        let transport = WsTransport::new();
        let manager = SessionManager::new(
            self.registry.clone(),
            self.bus.clone(),
            Arc::new(transport.clone()),
            cancel.clone(),
        );

        let url = format!(
            "ws://{}:{}/ws",
            self.config.advertised_host(),
            local_addr.port()
        );
        self.monitor.set_server_status(true);
        self.monitor.set_server_url(&url);

        let app = handler::router(AppState {
            manager: manager.clone(),
            transport: transport.clone(),
            monitor: self.monitor.clone(),
            config: self.config.clone(),
        });

        let shutdown = cancel.clone();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "Server accept loop failed");
            }
            info!("Server accept loop stopped");
        });

        info!(local_addr = %local_addr, url = %url, "Server listening");
        *running = Some(RunningServer {
            manager,
            transport,
            handle,
            local_addr,
        });

        Ok(local_addr)
    }

    /// Cancel all in-flight work, drop every session and release the listener.
    ///
    /// Fails without side effects if the server is not running, including after
    /// a failed start. The lifecycle lock is held until teardown completes, so
    /// a concurrent `start` waits and then begins a clean cycle.
    pub async fn stop(&self) -> LobbyResult<()> {
        let mut running = self.running.lock().await;
        let server = running.take().ok_or_else(error::server_not_running)?;

        info!("Stopping server");
        server.manager.shutdown().await;
        server.transport.close_all();

        let abort = server.handle.abort_handle();
        match timeout(SHUTDOWN_GRACE, server.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Server task ended abnormally"),
            Err(_) => {
                warn!(grace = ?SHUTDOWN_GRACE, "Server did not stop in time, aborting");
                abort.abort();
            }
        }

        // A connect racing the cancellation may have slipped in after the first clear
        self.registry.clear().await;

        self.monitor.set_server_status(false);
        self.monitor.clear_server_url();
        drop(running);
        info!("Server stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Address actually bound, while running
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|s| s.local_addr)
    }

    pub fn url_prefix(&self) -> String {
        self.config.url_prefix()
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn connected_count(&self) -> usize {
        self.registry.count().await
    }
}
