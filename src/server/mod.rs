//! HTTP + WebSocket surface for the pipeline board.
//!
//! REST endpoints live in [`api`]; [`ws`] pushes deal events to connected
//! clients.

pub mod api;
pub mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::BoardSection;
use crate::store::db::{CrmDb, DbHandle};
use api::AppState;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
    pub board: BoardSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3142,
            db_path: PathBuf::from(".pipeline/crm.db"),
            dev_mode: false,
            board: BoardSection::default(),
        }
    }
}

/// Build the full application router with the API and WebSocket endpoint.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Open the database, seed the default stage catalog if empty and serve
/// until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db = CrmDb::new(&config.db_path).context("Failed to initialize CRM database")?;
    let stages = db
        .seed_default_stages()
        .context("Failed to seed stage catalog")?;
    info!(stages = stages.len(), db = %config.db_path.display(), "Database ready");

    let (ws_tx, _rx) = broadcast::channel::<String>(256);
    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        ws_tx,
        board: config.board.clone(),
    });

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, dev_mode = config.dev_mode, "Server listening");
    println!("Pipeline board running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C; shutting down");
    }
    println!("\nShutting down...");
}
