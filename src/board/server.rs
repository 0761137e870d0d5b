use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::api::{self, AppState};
use super::db::SqliteGateway;
use super::gateway::Gateway;
use super::service::BoardService;
use super::ws;

const WS_CHANNEL_CAPACITY: usize = 256;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub owner: String,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            db_path: PathBuf::from(".taskboard/taskboard.db"),
            owner: "local".to_string(),
            dev_mode: false,
        }
    }
}

/// Build the full application router: REST API plus the live socket.
pub fn build_router(state: Arc<AppState>) -> Router {
    let ws_tx = state.ws_tx.clone();

    api::api_router()
        .route(
            "/ws",
            get(move |ws_upgrade| ws::ws_handler_with_sender(ws_upgrade, ws_tx)),
        )
        .with_state(state)
}

/// Open the store and serve until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let gateway =
        SqliteGateway::open(&config.db_path).context("Failed to initialize board database")?;
    let (ws_tx, _rx) = broadcast::channel::<String>(WS_CHANNEL_CAPACITY);
    let relay = tokio::spawn(ws::forward_changes(gateway.changes(), ws_tx.clone()));

    let state = Arc::new(AppState {
        service: BoardService::new(gateway.clone(), config.owner.clone()),
        ws_tx,
    });

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, db = %config.db_path.display(), "Board server listening");
    println!("Taskboard running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    gateway.close().await.context("Failed to close board database")?;
    relay.abort();
    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler; serving until killed");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
