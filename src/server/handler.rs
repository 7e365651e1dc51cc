//! HTTP routes and the per-connection WebSocket loop

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{sleep_until, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::transport::WsTransport;
use crate::config::ServerConfig;
use crate::monitoring::{Monitor, MonitoringSnapshot};
use crate::session::SessionManager;

pub const GREETING: &str = "Hello from the lobby server!";

/// State shared by every route for one start cycle
#[derive(Clone)]
pub(crate) struct AppState {
    pub manager: SessionManager,
    pub transport: WsTransport,
    pub monitor: Monitor,
    pub config: ServerConfig,
}

pub(crate) fn router(state: AppState) -> Router {
    let cors_enabled = state.config.cors_enabled;
    let router = Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/api/hello", get(hello))
        .route("/api/status", get(status))
        .with_state(state);

    let router = if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

async fn hello() -> &'static str {
    GREETING
}

async fn status(State(state): State<AppState>) -> Json<MonitoringSnapshot> {
    Json(state.monitor.snapshot().await)
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.manager.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down").into_response();
    }

    // Best effort: sessions register in `on_connect`, so simultaneous upgrades
    // can briefly exceed the limit.
    let current = state.manager.registry().count().await;
    if current >= state.config.max_connections {
        warn!(
            max_connections = state.config.max_connections,
            current_connections = current,
            "Maximum connections reached, rejecting new connection"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Maximum connections reached").into_response();
    }

    let session_id = Uuid::new_v4().to_string();
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

#[instrument(skip(socket, state))]
async fn handle_socket(socket: WebSocket, session_id: String, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut outbound = state.transport.register(&session_id);
    let cancel = state.manager.cancellation_token().clone();

    state.manager.on_connect(&session_id).await;

    let idle_timeout = Duration::from_secs(state.config.timeout_seconds);
    let mut ping = tokio::time::interval(Duration::from_secs(state.config.ping_interval));
    // The first tick completes immediately
    ping.tick().await;

    let connection_start = Instant::now();
    let mut last_activity = Instant::now();
    let mut messages_received: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Server shutting down, closing session");
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }

            Some(text) = outbound.recv() => {
                if let Err(e) = ws_sender.send(Message::Text(text)).await {
                    error!(error = %e, "Error sending WebSocket message");
                    break;
                }
            }

            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_activity = Instant::now();
                        messages_received += 1;
                        state.manager.on_message(&session_id, &text).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        last_activity = Instant::now();
                        messages_received += 1;
                        let text = String::from_utf8_lossy(&data);
                        state.manager.on_message(&session_id, &text).await;
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket client requested close");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error from client");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            _ = ping.tick() => {
                debug!("Sending ping to check if client is alive");
                if let Err(e) = ws_sender.send(Message::Ping(Vec::new())).await {
                    error!(error = %e, "Error sending ping");
                    break;
                }
            }

            _ = sleep_until(last_activity + idle_timeout) => {
                info!(
                    timeout_seconds = state.config.timeout_seconds,
                    "WebSocket client timed out due to inactivity"
                );
                break;
            }
        }
    }

    state.manager.on_disconnect(&session_id).await;
    state.transport.unregister(&session_id);

    info!(
        duration = ?connection_start.elapsed(),
        messages = messages_received,
        "WebSocket session ended"
    );
}
