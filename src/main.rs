use anyhow::Result;
use tracing::{debug, error, info};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lobby_lib::{config, Lobby, TracingObserver};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let env_file_path = dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                "lobby_lib=debug,lobby=debug,warn".into()
            } else {
                "lobby_lib=info,lobby=info,warn".into()
            }
        }))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!(version = lobby_lib::VERSION, "Lobby server starting");

    match env_file_path {
        Some(path) => info!("Loaded environment variables from {}", path.display()),
        None => debug!("No .env file found. Using existing environment variables."),
    };

    let config = config::load_config().await?;
    debug!(config = ?config, "Configuration loaded");

    let lobby = Lobby::from_config(&config);
    TracingObserver::attach(&lobby.bus);

    let addr = lobby.server.start().await?;
    info!(
        address = %addr,
        url = %lobby.monitor.server_url(),
        "Server started successfully"
    );
    info!("Press Ctrl+C to stop the server");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping server...");

    if let Err(e) = lobby.server.stop().await {
        error!(error = %e, "Failed to stop server cleanly");
    }

    info!(
        retained_log_entries = lobby.history.len(),
        "Server shutdown complete"
    );
    Ok(())
}
